//! `serde_json::Value` output.

use serde_json::{Map, Number, Value};

use crate::error::{SinkError, SinkResult};
use crate::token::{Token, TokenSink};

#[derive(Debug)]
enum Frame {
    Map { map: Map<String, Value>, key: Option<String> },
    Array(Vec<Value>),
}

/// Builds a `serde_json::Value` from a token stream. Map entry order is
/// preserved.
#[derive(Debug, Default)]
pub struct ValueSink {
    stack: Vec<Frame>,
    root: Option<Value>,
}

impl ValueSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The finished value.
    pub fn into_value(self) -> SinkResult<Value> {
        match (self.stack.is_empty(), self.root) {
            (true, Some(value)) => Ok(value),
            _ => Err(SinkError::Incomplete),
        }
    }

    fn push_value(&mut self, token: &'static str, value: Value) -> SinkResult<()> {
        match self.stack.last_mut() {
            None if self.root.is_none() => {
                self.root = Some(value);
                Ok(())
            }
            None => Err(SinkError::Unexpected {
                token,
                reason: "document already complete",
            }),
            Some(Frame::Array(items)) => {
                items.push(value);
                Ok(())
            }
            Some(Frame::Map { map, key }) => match key.take() {
                Some(k) => {
                    map.insert(k, value);
                    Ok(())
                }
                None => Err(SinkError::Unexpected {
                    token,
                    reason: "map keys must be strings",
                }),
            },
        }
    }
}

impl TokenSink for ValueSink {
    fn step(&mut self, token: Token) -> SinkResult<()> {
        let name = token.name();
        match token {
            Token::String(s) => {
                if let Some(Frame::Map { key: key @ None, .. }) = self.stack.last_mut() {
                    *key = Some(s);
                    return Ok(());
                }
                self.push_value(name, Value::String(s))
            }
            Token::MapOpen(n) => {
                if self.root.is_some() {
                    return Err(SinkError::Unexpected {
                        token: name,
                        reason: "document already complete",
                    });
                }
                self.stack.push(Frame::Map {
                    map: Map::with_capacity(n),
                    key: None,
                });
                Ok(())
            }
            Token::ArrOpen(n) => {
                if self.root.is_some() {
                    return Err(SinkError::Unexpected {
                        token: name,
                        reason: "document already complete",
                    });
                }
                self.stack.push(Frame::Array(Vec::with_capacity(n)));
                Ok(())
            }
            Token::MapClose => match self.stack.pop() {
                Some(Frame::Map { map, key: None }) => self.push_value(name, Value::Object(map)),
                _ => Err(SinkError::Unexpected {
                    token: name,
                    reason: "does not match the open container",
                }),
            },
            Token::ArrClose => match self.stack.pop() {
                Some(Frame::Array(items)) => self.push_value(name, Value::Array(items)),
                _ => Err(SinkError::Unexpected {
                    token: name,
                    reason: "does not match the open container",
                }),
            },
            Token::Int(i) => self.push_value(name, Value::from(i)),
            Token::Float64(v) => {
                let n = Number::from_f64(v).ok_or(SinkError::NonFiniteFloat(v))?;
                self.push_value(name, Value::Number(n))
            }
            Token::Bool(b) => self.push_value(name, Value::Bool(b)),
            Token::Null => self.push_value(name, Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn build(tokens: Vec<Token>) -> SinkResult<Value> {
        let mut sink = ValueSink::new();
        for t in tokens {
            sink.step(t)?;
        }
        sink.into_value()
    }

    #[test]
    fn builds_nested_value_in_order() {
        let v = build(vec![
            Token::MapOpen(2),
            Token::from("z"),
            Token::ArrOpen(2),
            Token::Int(1),
            Token::from("x"),
            Token::ArrClose,
            Token::from("a"),
            Token::Null,
            Token::MapClose,
        ])
        .unwrap();
        assert_eq!(v, json!({"z": [1, "x"], "a": null}));
        let keys: Vec<_> = v.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn incomplete_and_unbalanced_streams_fail() {
        assert!(matches!(
            build(vec![Token::MapOpen(1), Token::from("k")]),
            Err(SinkError::Incomplete)
        ));
        assert!(build(vec![Token::MapOpen(1), Token::Int(1)]).is_err());
        assert!(build(vec![Token::MapOpen(1), Token::from("k"), Token::MapClose]).is_err());
        assert!(build(vec![Token::Int(1), Token::Int(2)]).is_err());
    }
}
