//! Outer transport layer: one leading character tags each text frame.

use crate::error::{Error, Result};

/// A decoded outer frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFrame {
    /// `0` - connection opened; carries the server's JSON handshake.
    Open(String),
    /// `1` - server-initiated close.
    Close,
    /// `2` - keepalive probe from the server.
    Ping(String),
    /// `3` - keepalive reply.
    Pong(String),
    /// `4` - application message, decoded further by [`super::socket`].
    Message(String),
}

impl RawFrame {
    /// Decode a single text frame.
    pub fn decode(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| Error::Decode("empty frame".into()))?;
        let rest = chars.as_str().to_string();

        match kind {
            '0' => Ok(RawFrame::Open(rest)),
            '1' => Ok(RawFrame::Close),
            '2' => Ok(RawFrame::Ping(rest)),
            '3' => Ok(RawFrame::Pong(rest)),
            '4' => Ok(RawFrame::Message(rest)),
            other => Err(Error::Decode(format!("unknown frame kind '{other}'"))),
        }
    }

    /// Encode back to wire text.
    pub fn encode(&self) -> String {
        match self {
            RawFrame::Open(rest) => format!("0{rest}"),
            RawFrame::Close => "1".to_string(),
            RawFrame::Ping(rest) => format!("2{rest}"),
            RawFrame::Pong(rest) => format!("3{rest}"),
            RawFrame::Message(rest) => format!("4{rest}"),
        }
    }
}

/// Fields of interest from the open handshake.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

impl OpenHandshake {
    /// Parse the JSON body of an open frame.
    pub fn parse(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}
