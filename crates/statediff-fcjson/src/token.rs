//! The token stream and the collecting sink.

use crate::error::SinkResult;

/// One step of a JSON-shaped token stream.
///
/// Container open tokens carry the entry count. A map is followed by
/// alternating key and value tokens; keys are always [`Token::String`].
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    MapOpen(usize),
    MapClose,
    ArrOpen(usize),
    ArrClose,
    String(String),
    Int(i64),
    Float64(f64),
    Bool(bool),
    Null,
}

impl Token {
    pub fn name(&self) -> &'static str {
        match self {
            Token::MapOpen(_) => "map open",
            Token::MapClose => "map close",
            Token::ArrOpen(_) => "array open",
            Token::ArrClose => "array close",
            Token::String(_) => "string",
            Token::Int(_) => "int",
            Token::Float64(_) => "float",
            Token::Bool(_) => "bool",
            Token::Null => "null",
        }
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Token::String(s.to_string())
    }
}

/// Consumer of a token stream.
pub trait TokenSink {
    fn step(&mut self, token: Token) -> SinkResult<()>;
}

impl<S: TokenSink + ?Sized> TokenSink for &mut S {
    fn step(&mut self, token: Token) -> SinkResult<()> {
        (**self).step(token)
    }
}

/// Collects tokens in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenBuffer {
    tokens: Vec<Token>,
}

impl TokenBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Replay the buffered tokens into another sink.
    pub fn replay<S: TokenSink + ?Sized>(&self, sink: &mut S) -> SinkResult<()> {
        for token in &self.tokens {
            sink.step(token.clone())?;
        }
        Ok(())
    }
}

impl TokenSink for TokenBuffer {
    fn step(&mut self, token: Token) -> SinkResult<()> {
        self.tokens.push(token);
        Ok(())
    }
}
