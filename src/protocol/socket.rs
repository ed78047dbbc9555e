//! Inner namespace layer carried inside [`RawFrame::Message`](super::RawFrame).

use serde_json::Value;

use crate::error::{Error, Result};

/// A decoded namespace frame.
#[derive(Debug, Clone, PartialEq)]
pub enum NamespaceFrame {
    /// `0` - connect request (client) or acknowledgement (server).
    Connect(Option<Value>),
    /// `1` - namespace disconnect.
    Disconnect,
    /// `2` - application event: `[name, payload]`.
    Event { name: String, payload: Value },
}

impl NamespaceFrame {
    /// Build an event frame.
    pub fn event(name: impl Into<String>, payload: Value) -> Self {
        NamespaceFrame::Event {
            name: name.into(),
            payload,
        }
    }

    /// Decode the body of a message frame.
    pub fn decode(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| Error::Decode("empty message frame".into()))?;
        let rest = chars.as_str();

        match kind {
            '0' => {
                if rest.is_empty() {
                    Ok(NamespaceFrame::Connect(None))
                } else {
                    Ok(NamespaceFrame::Connect(Some(serde_json::from_str(rest)?)))
                }
            }
            '1' => Ok(NamespaceFrame::Disconnect),
            '2' => decode_event(rest),
            other => Err(Error::Decode(format!("unknown message kind '{other}'"))),
        }
    }

    /// Encode to the body of a message frame.
    pub fn encode(&self) -> String {
        match self {
            NamespaceFrame::Connect(None) => "0".to_string(),
            NamespaceFrame::Connect(Some(data)) => format!("0{data}"),
            NamespaceFrame::Disconnect => "1".to_string(),
            NamespaceFrame::Event { name, payload } => {
                let array = Value::Array(vec![Value::String(name.clone()), payload.clone()]);
                format!("2{array}")
            }
        }
    }
}

fn decode_event(body: &str) -> Result<NamespaceFrame> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Array(mut items) = value else {
        return Err(Error::Decode("event payload is not an array".into()));
    };
    if items.is_empty() {
        return Err(Error::Decode("event array is empty".into()));
    }

    let payload = if items.len() > 1 {
        items.swap_remove(1)
    } else {
        Value::Null
    };
    let Value::String(name) = items.swap_remove(0) else {
        return Err(Error::Decode("event name is not a string".into()));
    };

    Ok(NamespaceFrame::Event { name, payload })
}
