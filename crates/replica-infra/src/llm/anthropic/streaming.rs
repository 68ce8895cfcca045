//! SSE stream creation and event mapping for the Anthropic Messages API.
//!
//! The streaming protocol:
//! 1. `message_start` -- message object with initial usage
//! 2. Per block: `content_block_start` -> N x `content_block_delta` -> `content_block_stop`
//! 3. `message_delta` -- stop_reason and cumulative usage
//! 4. `message_stop` -- final event
//! 5. `ping` events may appear anywhere (keepalive)
//! 6. `error` events may appear mid-stream
//!
//! Only text deltas are surfaced; the pipeline never requests tools.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use reqwest_eventsource::{Event, EventSource, retry};
use secrecy::{ExposeSecret, SecretString};

use replica_types::llm::{LlmError, StopReason, StreamEvent, Usage};

use super::types::{
    AnthropicDelta, AnthropicRequest, ContentBlockDeltaPayload, ErrorPayload,
    MessageDeltaPayload, MessageStartPayload,
};

/// The Anthropic API version header value.
pub const API_VERSION: &str = "2023-06-01";

/// Map one SSE event to zero or more [`StreamEvent`]s.
pub fn process_event(event_type: &str, data: &str) -> Result<Vec<StreamEvent>, LlmError> {
    let mut events = Vec::new();

    match event_type {
        "message_start" => {
            let payload: MessageStartPayload = serde_json::from_str(data)
                .map_err(|e| LlmError::Deserialization(format!("message_start: {e}")))?;
            tracing::debug!(id = %payload.message.id, model = %payload.message.model, "message started");
            if let Some(usage) = payload.message.usage {
                events.push(StreamEvent::Usage(Usage {
                    input_tokens: usage.input_tokens,
                    output_tokens: usage.output_tokens,
                }));
            }
        }

        "content_block_delta" => {
            let payload: ContentBlockDeltaPayload = serde_json::from_str(data)
                .map_err(|e| LlmError::Deserialization(format!("content_block_delta: {e}")))?;
            match payload.delta {
                AnthropicDelta::TextDelta { text } => events.push(StreamEvent::TextDelta { text }),
                AnthropicDelta::Other => {
                    tracing::debug!(index = payload.index, "non-text delta, skipping");
                }
            }
        }

        "message_delta" => {
            let payload: MessageDeltaPayload = serde_json::from_str(data)
                .map_err(|e| LlmError::Deserialization(format!("message_delta: {e}")))?;
            let stop_reason = match payload.delta.stop_reason.as_deref() {
                Some("max_tokens") => StopReason::MaxTokens,
                Some("stop_sequence") => StopReason::StopSequence,
                _ => StopReason::EndTurn,
            };
            events.push(StreamEvent::Usage(Usage {
                input_tokens: payload.usage.input_tokens,
                output_tokens: payload.usage.output_tokens,
            }));
            events.push(StreamEvent::MessageDelta { stop_reason });
        }

        "message_stop" => events.push(StreamEvent::Done),

        "ping" | "content_block_start" | "content_block_stop" => {}

        "error" => {
            let payload: ErrorPayload = serde_json::from_str(data)
                .map_err(|e| LlmError::Deserialization(format!("error event: {e}")))?;
            return Err(api_error(&payload.error.error_type, payload.error.message));
        }

        unknown => {
            tracing::warn!(event_type = unknown, "unknown Anthropic event type, skipping");
        }
    }

    Ok(events)
}

fn api_error(error_type: &str, message: String) -> LlmError {
    match error_type {
        "overloaded_error" => LlmError::Overloaded(message),
        "rate_limit_error" => LlmError::RateLimited,
        "authentication_error" | "permission_error" => LlmError::AuthenticationFailed,
        "invalid_request_error" => LlmError::InvalidRequest(message),
        _ => LlmError::Provider { message },
    }
}

/// Map a non-2xx HTTP response to an [`LlmError`].
pub fn status_error(status: u16, body: String) -> LlmError {
    match status {
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited,
        529 => LlmError::Overloaded(body),
        400 => {
            let message = serde_json::from_str::<ErrorPayload>(&body)
                .map(|p| p.error.message)
                .unwrap_or(body);
            LlmError::InvalidRequest(message)
        }
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {body}"),
        },
    }
}

/// Create a streaming SSE connection to the Anthropic Messages API.
///
/// Returns a `Stream` of [`StreamEvent`]s. The connection is never retried;
/// any transport error, or a close before `message_stop`, ends the stream
/// with `LlmError::Stream`.
///
/// # Arguments
///
/// * `client` - Shared reqwest HTTP client
/// * `url` - Full API URL (e.g., "https://api.anthropic.com/v1/messages")
/// * `body` - Anthropic request with `stream: true`
/// * `api_key` - API key wrapped in SecretString
pub fn create_anthropic_stream(
    client: &reqwest::Client,
    url: &str,
    body: AnthropicRequest,
    api_key: &SecretString,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
    let request = client
        .post(url)
        .header("x-api-key", api_key.expose_secret())
        .header("anthropic-version", API_VERSION)
        .header("content-type", "application/json")
        .json(&body);

    Box::pin(async_stream::try_stream! {
        let mut source = EventSource::new(request)
            .map_err(|e| LlmError::Stream(format!("cannot open event stream: {e}")))?;
        source.set_retry_policy(Box::new(retry::Never));
        let mut stopped = false;

        while let Some(next) = source.next().await {
            match next {
                Ok(Event::Open) => yield StreamEvent::Connected,
                Ok(Event::Message(message)) => {
                    for event in process_event(&message.event, &message.data)? {
                        stopped |= matches!(event, StreamEvent::Done);
                        yield event;
                    }
                    if stopped {
                        source.close();
                        break;
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    if !stopped {
                        Err::<(), LlmError>(LlmError::Stream(
                            "stream ended before message_stop".to_string(),
                        ))?;
                    }
                    break;
                }
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    let body = response.text().await.unwrap_or_default();
                    tracing::warn!(status = %status, "Anthropic API error response");
                    Err::<(), LlmError>(status_error(status.as_u16(), body))?;
                }
                Err(e) => {
                    Err::<(), LlmError>(LlmError::Stream(e.to_string()))?;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{http_response, serve_once};

    fn request() -> AnthropicRequest {
        AnthropicRequest {
            model: "claude-3-haiku-20240307".to_string(),
            max_tokens: 512,
            messages: vec![],
            system: Some("Summarize.".to_string()),
            stream: true,
            temperature: None,
        }
    }

    fn sse_body(events: &[(&str, &str)]) -> String {
        events
            .iter()
            .map(|(name, data)| format!("event: {name}\ndata: {data}\n\n"))
            .collect()
    }

    #[test]
    fn text_delta_maps_to_token() {
        let events = process_event(
            "content_block_delta",
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"<div>"}}"#,
        )
        .unwrap();
        assert!(matches!(&events[..], [StreamEvent::TextDelta { text }] if text == "<div>"));
    }

    #[test]
    fn message_delta_carries_stop_reason_and_usage() {
        let events = process_event(
            "message_delta",
            r#"{"type":"message_delta","delta":{"stop_reason":"max_tokens"},"usage":{"output_tokens":4096}}"#,
        )
        .unwrap();
        assert!(matches!(&events[0], StreamEvent::Usage(u) if u.output_tokens == 4096));
        assert!(matches!(
            &events[1],
            StreamEvent::MessageDelta { stop_reason: StopReason::MaxTokens }
        ));
    }

    #[test]
    fn keepalives_and_block_markers_are_silent() {
        assert!(process_event("ping", "{}").unwrap().is_empty());
        assert!(process_event("content_block_stop", r#"{"index":0}"#).unwrap().is_empty());
        assert!(process_event("something_new", "{}").unwrap().is_empty());
    }

    #[test]
    fn error_event_maps_to_error() {
        let err = process_event(
            "error",
            r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, LlmError::Overloaded(m) if m == "Overloaded"));
    }

    #[test]
    fn malformed_payload_is_deserialization_error() {
        let err = process_event("content_block_delta", "not json").unwrap_err();
        assert!(matches!(err, LlmError::Deserialization(_)));
    }

    #[test]
    fn status_codes_map_to_errors() {
        assert!(matches!(status_error(401, String::new()), LlmError::AuthenticationFailed));
        assert!(matches!(status_error(429, String::new()), LlmError::RateLimited));
        assert!(matches!(status_error(529, "busy".into()), LlmError::Overloaded(b) if b == "busy"));
        assert!(matches!(
            status_error(400, r#"{"type":"error","error":{"type":"invalid_request_error","message":"max_tokens too large"}}"#.into()),
            LlmError::InvalidRequest(m) if m == "max_tokens too large"
        ));
        assert!(matches!(status_error(500, "oops".into()), LlmError::Provider { .. }));
    }

    #[tokio::test]
    async fn streams_tokens_from_server() {
        let body = sse_body(&[
            ("message_start", r#"{"type":"message_start","message":{"id":"msg_1","model":"claude-3-haiku-20240307","usage":{"input_tokens":12,"output_tokens":1}}}"#),
            ("content_block_start", r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#),
            ("ping", r#"{"type":"ping"}"#),
            ("content_block_delta", r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}"#),
            ("content_block_delta", r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":" world"}}"#),
            ("content_block_stop", r#"{"type":"content_block_stop","index":0}"#),
            ("message_delta", r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":2}}"#),
            ("message_stop", r#"{"type":"message_stop"}"#),
        ]);
        let (base_url, server) =
            serve_once(http_response("200 OK", "text/event-stream", &body)).await;

        let client = reqwest::Client::new();
        let events: Vec<_> = create_anthropic_stream(
            &client,
            &format!("{base_url}/v1/messages"),
            request(),
            &SecretString::from("sk-test"),
        )
        .collect()
        .await;

        let text: String = events
            .iter()
            .filter_map(|e| match e {
                Ok(StreamEvent::TextDelta { text }) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Hello world");
        assert!(matches!(events.first(), Some(Ok(StreamEvent::Connected))));
        assert!(matches!(events.last(), Some(Ok(StreamEvent::Done))));

        let raw = server.await.unwrap().remove(0);
        assert!(raw.starts_with("POST /v1/messages"));
        assert!(raw.to_ascii_lowercase().contains("x-api-key: sk-test"));
        assert!(raw.contains(API_VERSION));
        assert!(raw.contains(r#""stream":true"#));
    }

    #[tokio::test]
    async fn connection_closed_before_message_stop_is_an_error() {
        let body = sse_body(&[
            ("message_start", r#"{"type":"message_start","message":{"id":"msg_2","model":"claude-3-haiku-20240307","usage":{"input_tokens":12,"output_tokens":1}}}"#),
            ("content_block_delta", r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"<html><bo"}}"#),
        ]);
        let (base_url, _server) =
            serve_once(http_response("200 OK", "text/event-stream", &body)).await;

        let client = reqwest::Client::new();
        let events: Vec<_> = create_anthropic_stream(
            &client,
            &format!("{base_url}/v1/messages"),
            request(),
            &SecretString::from("sk-test"),
        )
        .collect()
        .await;

        assert!(events
            .iter()
            .any(|e| matches!(e, Ok(StreamEvent::TextDelta { text }) if text == "<html><bo")));
        assert!(matches!(
            events.last(),
            Some(Err(LlmError::Stream(m))) if m.contains("before message_stop")
        ));
    }

    #[tokio::test]
    async fn unauthorized_response_ends_stream_with_error() {
        let body = r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;
        let (base_url, _server) =
            serve_once(http_response("401 Unauthorized", "application/json", body)).await;

        let client = reqwest::Client::new();
        let events: Vec<_> = create_anthropic_stream(
            &client,
            &format!("{base_url}/v1/messages"),
            request(),
            &SecretString::from("bad"),
        )
        .collect()
        .await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(LlmError::AuthenticationFailed)));
    }
}
