//! Indented JSON text output.

use std::io::Write;

use crate::error::{SinkError, SinkResult};
use crate::token::{Token, TokenSink};

const INDENT: &[u8] = b"  ";

#[derive(Debug)]
enum Frame {
    Map { count: usize, expect_key: bool },
    Array { count: usize },
}

/// Writes a token stream as JSON indented by two spaces per level.
///
/// Empty containers are written as `{}` and `[]`. Strings are escaped by
/// `serde_json`.
#[derive(Debug)]
pub struct JsonWriter<W: Write> {
    out: W,
    stack: Vec<Frame>,
    done: bool,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            stack: Vec::new(),
            done: false,
        }
    }

    /// Check the document is complete and return the writer.
    pub fn finish(mut self) -> SinkResult<W> {
        if !self.done || !self.stack.is_empty() {
            return Err(SinkError::Incomplete);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn newline(&mut self, depth: usize) -> SinkResult<()> {
        self.out.write_all(b"\n")?;
        for _ in 0..depth {
            self.out.write_all(INDENT)?;
        }
        Ok(())
    }

    /// Write whatever must precede a value or key at the current position.
    /// Returns true when the token is in key position.
    fn before(&mut self, token: &Token) -> SinkResult<bool> {
        if self.done {
            return Err(SinkError::Unexpected {
                token: token.name(),
                reason: "document already complete",
            });
        }
        let depth = self.stack.len();
        match self.stack.last_mut() {
            None => Ok(false),
            Some(Frame::Map { count, expect_key }) => {
                if !*expect_key {
                    return Ok(false);
                }
                if !matches!(token, Token::String(_)) {
                    return Err(SinkError::Unexpected {
                        token: token.name(),
                        reason: "map keys must be strings",
                    });
                }
                let first = *count == 0;
                if !first {
                    self.out.write_all(b",")?;
                }
                self.newline(depth)?;
                Ok(true)
            }
            Some(Frame::Array { count }) => {
                if *count > 0 {
                    self.out.write_all(b",")?;
                }
                self.newline(depth)?;
                Ok(false)
            }
        }
    }

    /// Bookkeeping after a complete value.
    fn after_value(&mut self) {
        match self.stack.last_mut() {
            None => self.done = true,
            Some(Frame::Map { count, expect_key }) => {
                *count += 1;
                *expect_key = true;
            }
            Some(Frame::Array { count }) => *count += 1,
        }
    }

    fn close(&mut self, token: &Token) -> SinkResult<()> {
        let frame = self.stack.pop();
        let (count, bracket) = match (token, frame) {
            (Token::MapClose, Some(Frame::Map { count, expect_key: true })) => (count, b"}"),
            (Token::ArrClose, Some(Frame::Array { count })) => (count, b"]"),
            _ => {
                return Err(SinkError::Unexpected {
                    token: token.name(),
                    reason: "does not match the open container",
                })
            }
        };
        if count > 0 {
            self.newline(self.stack.len())?;
        }
        self.out.write_all(bracket)?;
        self.after_value();
        Ok(())
    }
}

impl<W: Write> TokenSink for JsonWriter<W> {
    fn step(&mut self, token: Token) -> SinkResult<()> {
        if matches!(token, Token::MapClose | Token::ArrClose) {
            return self.close(&token);
        }
        let is_key = self.before(&token)?;
        match token {
            Token::String(s) if is_key => {
                serde_json::to_writer(&mut self.out, &s)?;
                self.out.write_all(b": ")?;
                if let Some(Frame::Map { expect_key, .. }) = self.stack.last_mut() {
                    *expect_key = false;
                }
                return Ok(());
            }
            Token::MapOpen(_) => {
                self.out.write_all(b"{")?;
                self.stack.push(Frame::Map {
                    count: 0,
                    expect_key: true,
                });
                return Ok(());
            }
            Token::ArrOpen(_) => {
                self.out.write_all(b"[")?;
                self.stack.push(Frame::Array { count: 0 });
                return Ok(());
            }
            Token::String(s) => serde_json::to_writer(&mut self.out, &s)?,
            Token::Int(i) => write!(self.out, "{i}")?,
            Token::Float64(v) if !v.is_finite() => return Err(SinkError::NonFiniteFloat(v)),
            Token::Float64(v) => serde_json::to_writer(&mut self.out, &v)?,
            Token::Bool(b) => write!(self.out, "{b}")?,
            Token::Null => self.out.write_all(b"null")?,
            Token::MapClose | Token::ArrClose => unreachable!("handled above"),
        }
        self.after_value();
        Ok(())
    }
}

/// Render a token stream to a JSON string.
pub fn to_json_string(tokens: impl IntoIterator<Item = Token>) -> SinkResult<String> {
    let mut writer = JsonWriter::new(Vec::new());
    for token in tokens {
        writer.step(token)?;
    }
    let bytes = writer.finish()?;
    String::from_utf8(bytes).map_err(|_| SinkError::Unexpected {
        token: "string",
        reason: "output is not UTF-8",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn s(v: &str) -> Token {
        Token::from(v)
    }

    #[test]
    fn nested_document() {
        let out = to_json_string([
            Token::MapOpen(3),
            s("a"),
            Token::Int(1),
            s("b"),
            Token::ArrOpen(2),
            Token::Bool(true),
            Token::MapOpen(0),
            Token::MapClose,
            Token::ArrClose,
            s("c"),
            Token::Null,
            Token::MapClose,
        ])
        .unwrap();
        assert_eq!(
            out,
            "{\n  \"a\": 1,\n  \"b\": [\n    true,\n    {}\n  ],\n  \"c\": null\n}"
        );
    }

    #[test]
    fn scalars_and_escaping() {
        assert_eq!(to_json_string([s("q\"\n")]).unwrap(), r#""q\"\n""#);
        assert_eq!(to_json_string([Token::Float64(1.5)]).unwrap(), "1.5");
        assert_eq!(to_json_string([Token::ArrOpen(0), Token::ArrClose]).unwrap(), "[]");
    }

    #[test]
    fn rejects_malformed_streams() {
        assert!(matches!(
            to_json_string([Token::MapOpen(1), Token::Int(1)]),
            Err(SinkError::Unexpected { .. })
        ));
        assert!(matches!(
            to_json_string([Token::ArrOpen(1), Token::MapClose]),
            Err(SinkError::Unexpected { .. })
        ));
        assert!(matches!(
            to_json_string([Token::ArrOpen(1)]),
            Err(SinkError::Incomplete)
        ));
        assert!(matches!(
            to_json_string([Token::Null, Token::Null]),
            Err(SinkError::Unexpected { .. })
        ));
        assert!(matches!(
            to_json_string([Token::Float64(f64::NAN)]),
            Err(SinkError::NonFiniteFloat(_))
        ));
    }

    #[test]
    fn map_close_after_key_is_rejected() {
        assert!(to_json_string([Token::MapOpen(1), s("k"), Token::MapClose]).is_err());
    }
}
