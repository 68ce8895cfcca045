//! Observer channel messages.
//!
//! `NotificationEvent` is everything the server pushes to the connected
//! observer; `ClientRequest` is everything the observer may send. Both are
//! closed enums encoded/decoded explicitly at the channel boundary.
//!
//! Wire shapes:
//!
//! ```text
//! server -> client  {"event":"log","data":{"message":"..."}}
//!                   {"event":"ai_token","data":{"token":"..."}}
//!                   {"event":"file_create","data":{"path":"...","content":"..."}}
//!                   {"event":"file_update","data":{"path":"...","content":"...","old_content":"..."}}
//!                   {"event":"status","data":{"status":"generating"}}
//! client -> server  {"url":"https://..."}
//!                   {"type":"modification","prompt":"..."}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;
use crate::pipeline::RunStatus;

/// A change to a file in the artifact, as reported to the observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path relative to the output directory.
    pub path: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_content: Option<String>,
}

/// Notification pushed to the observer, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// Human-readable progress line.
    Log { message: String },
    /// One token streamed from a generation stage.
    AiToken { token: String },
    /// A file was written for the first time in this run.
    FileCreate(FileChange),
    /// An existing file was overwritten (carries the previous content).
    FileUpdate(FileChange),
    /// Lifecycle transition of the current run.
    Status { status: RunStatus },
}

impl NotificationEvent {
    /// Short tag name, matching the wire `event` field.
    pub fn tag(&self) -> &'static str {
        match self {
            NotificationEvent::Log { .. } => "log",
            NotificationEvent::AiToken { .. } => "ai_token",
            NotificationEvent::FileCreate(_) => "file_create",
            NotificationEvent::FileUpdate(_) => "file_update",
            NotificationEvent::Status { .. } => "status",
        }
    }

    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}

/// Request sent by the observer over the duplex connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    /// Start (or restart) a clone run for the given page.
    Clone { url: String },
    /// Apply a natural-language edit to the current artifact.
    Modify { prompt: String },
}

impl ClientRequest {
    /// Decode a text frame. Messages missing a required field are rejected.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        let obj = value
            .as_object()
            .ok_or_else(|| ProtocolError::Malformed("expected a JSON object".to_string()))?;

        match obj.get("type").and_then(Value::as_str) {
            Some("modification") => {
                let prompt = obj
                    .get("prompt")
                    .and_then(Value::as_str)
                    .ok_or(ProtocolError::MissingField("prompt"))?;
                Ok(ClientRequest::Modify {
                    prompt: prompt.to_string(),
                })
            }
            Some(other) => Err(ProtocolError::UnknownType(other.to_string())),
            None => {
                let url = obj
                    .get("url")
                    .and_then(Value::as_str)
                    .ok_or(ProtocolError::MissingField("url"))?;
                Ok(ClientRequest::Clone {
                    url: url.to_string(),
                })
            }
        }
    }

    /// Encode into the wire shape accepted by [`ClientRequest::decode`].
    pub fn encode(&self) -> String {
        match self {
            ClientRequest::Clone { url } => serde_json::json!({ "url": url }).to_string(),
            ClientRequest::Modify { prompt } => {
                serde_json::json!({ "type": "modification", "prompt": prompt }).to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_wire_shape() {
        let event = NotificationEvent::Log {
            message: "Taking screenshot...".to_string(),
        };
        let json: Value = serde_json::from_str(&event.encode().unwrap()).unwrap();
        assert_eq!(json["event"], "log");
        assert_eq!(json["data"]["message"], "Taking screenshot...");
    }

    #[test]
    fn test_token_and_status_wire_shape() {
        let token = serde_json::to_value(NotificationEvent::AiToken {
            token: "<div".to_string(),
        })
        .unwrap();
        assert_eq!(token["event"], "ai_token");
        assert_eq!(token["data"]["token"], "<div");

        let status = serde_json::to_value(NotificationEvent::Status {
            status: RunStatus::Generating,
        })
        .unwrap();
        assert_eq!(status["event"], "status");
        assert_eq!(status["data"]["status"], "generating");
    }

    #[test]
    fn test_file_events_omit_missing_old_content() {
        let created = serde_json::to_value(NotificationEvent::FileCreate(FileChange {
            path: "index.html".to_string(),
            content: "<html></html>".to_string(),
            old_content: None,
        }))
        .unwrap();
        assert_eq!(created["event"], "file_create");
        assert!(created["data"].get("old_content").is_none());

        let updated = serde_json::to_value(NotificationEvent::FileUpdate(FileChange {
            path: "index.html".to_string(),
            content: "new".to_string(),
            old_content: Some("old".to_string()),
        }))
        .unwrap();
        assert_eq!(updated["event"], "file_update");
        assert_eq!(updated["data"]["old_content"], "old");
    }

    #[test]
    fn test_event_decodes_back() {
        let event = NotificationEvent::Status {
            status: RunStatus::Ready,
        };
        let decoded: NotificationEvent = serde_json::from_str(&event.encode().unwrap()).unwrap();
        assert_eq!(decoded, event);
        assert_eq!(decoded.tag(), "status");
    }

    #[test]
    fn test_decode_clone_request() {
        let req = ClientRequest::decode(r#"{"url":"https://example.com"}"#).unwrap();
        assert_eq!(
            req,
            ClientRequest::Clone {
                url: "https://example.com".to_string()
            }
        );
    }

    #[test]
    fn test_decode_modification_request() {
        let req =
            ClientRequest::decode(r#"{"type":"modification","prompt":"make it blue"}"#).unwrap();
        assert_eq!(
            req,
            ClientRequest::Modify {
                prompt: "make it blue".to_string()
            }
        );
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        assert!(matches!(
            ClientRequest::decode(r#"{"type":"modification"}"#),
            Err(ProtocolError::MissingField("prompt"))
        ));
        assert!(matches!(
            ClientRequest::decode(r#"{"hello":"world"}"#),
            Err(ProtocolError::MissingField("url"))
        ));
        assert!(matches!(
            ClientRequest::decode(r#"{"type":"delete"}"#),
            Err(ProtocolError::UnknownType(_))
        ));
        assert!(matches!(
            ClientRequest::decode("not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            ClientRequest::decode("[1,2]"),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_encode_matches_decode() {
        let req = ClientRequest::Modify {
            prompt: "add a footer".to_string(),
        };
        assert_eq!(ClientRequest::decode(&req.encode()).unwrap(), req);
    }
}
