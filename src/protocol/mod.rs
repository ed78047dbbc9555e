//! Realtime wire protocol.
//!
//! Two nested single-character-tagged text layers: [`engine`] frames wrap
//! [`socket`] frames, whose events carry a JSON `[name, payload]` array.
//! Both layers are pure encode/decode; the session owns the actual socket.

pub mod engine;
pub mod socket;

pub use engine::{OpenHandshake, RawFrame};
pub use socket::NamespaceFrame;

use url::Url;

use crate::error::{Error, Result};

/// Path the realtime endpoint is mounted on.
pub const SOCKET_PATH: &str = "/socket.io/";

/// Fixed query selecting protocol revision 4 over websocket.
pub const SOCKET_QUERY: &str = "EIO=4&transport=websocket";

/// Wrap a namespace frame in a message frame and encode it.
pub fn encode_message(frame: &NamespaceFrame) -> String {
    RawFrame::Message(frame.encode()).encode()
}

/// Decode the namespace frame carried by a message frame body.
pub fn decode_message(body: &str) -> Result<NamespaceFrame> {
    NamespaceFrame::decode(body)
}

/// Derive the realtime connection URL from the configured host.
///
/// `http` becomes `ws` and `https` becomes `wss`; a bare host is assumed to be
/// plain `http`. Any path or query on the host is replaced.
pub fn connection_url(host: &str) -> Result<Url> {
    let host = host.trim();
    let with_scheme = if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    };

    let mut url = Url::parse(&with_scheme)
        .map_err(|e| Error::Config(format!("invalid host '{host}': {e}")))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(Error::Config(format!("unsupported scheme '{other}'"))),
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::Config(format!("cannot use scheme '{scheme}' for '{host}'")))?;
    url.set_path(SOCKET_PATH);
    url.set_query(Some(SOCKET_QUERY));
    url.set_fragment(None);

    Ok(url)
}
