//! Wire protocol between the dev server and attached app instances

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Messages the server generates in normal mode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Push changed source files; the recipient applies them and reloads
    Reload {
        /// Relative path -> current file contents
        files: BTreeMap<String, String>,
    },
}

impl ServerMessage {
    /// Serialize for the wire
    pub fn to_json(&self) -> String {
        // A reload message is a map of strings; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// An opaque payload travelling through a client channel.
///
/// In forwarding mode payloads relay between peers untouched, so both text
/// and binary frames are preserved as received.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_message_shape() {
        let mut files = BTreeMap::new();
        files.insert("view.py".to_string(), "print('hi')".to_string());
        let json = ServerMessage::Reload { files }.to_json();

        assert!(json.starts_with(r#"{"type":"reload""#));
        assert!(json.contains(r#""view.py":"print('hi')""#));
    }

    #[test]
    fn test_reload_message_round_trip() {
        let mut files = BTreeMap::new();
        files.insert("widget.py".to_string(), "x = 1".to_string());
        let msg = ServerMessage::Reload { files };
        let parsed: ServerMessage = serde_json::from_str(&msg.to_json()).unwrap();
        assert_eq!(parsed, msg);
    }
}
