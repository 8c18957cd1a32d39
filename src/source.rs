//! # ntfy Stream Consumer
//!
//! Subscribes to `<host>/<topic>/json`, which holds the connection open and
//! writes one JSON event per line:
//!
//! ```text
//! {"id":"x1","time":1700000000,"event":"open","topic":"printer"}
//! {"id":"x2","time":1700000001,"event":"message","topic":"printer","message":"Lunch Time!"}
//! {"id":"x3","time":1700000046,"event":"keepalive","topic":"printer"}
//! ```
//!
//! Only `message` events with a non-empty body reach the print worker. Lines
//! that don't decode are logged and skipped. When the connection drops the
//! consumer reports it and reconnects after [`RECONNECT_DELAY`].

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{ReceiptError, Result};
use crate::notify::ErrorNotifier;
use crate::pipeline::Incoming;

pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Longest stream line kept while waiting for its newline.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Build the streaming URL, defaulting to https when no scheme is given.
pub fn stream_url(host: &str, topic: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    let topic = topic.trim().trim_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{}/{}/json", host, topic)
    } else {
        format!("https://{}/{}/json", host, topic)
    }
}

/// One line of the JSON stream.
#[derive(Debug, Deserialize)]
pub struct StreamEvent {
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub message: Option<String>,
    /// Everything else (title, tags, priority, click, ...)
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Decode one stream line into a printable message.
pub fn decode_line(line: &str) -> Option<Incoming> {
    let event: StreamEvent = match serde_json::from_str(line) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Skipping undecodable line: {}", line);
            return None;
        }
    };

    if event.event != "message" {
        return None;
    }
    let message = event.message.filter(|m| !m.is_empty())?;

    Some(Incoming {
        message,
        metadata: Some(event.rest),
    })
}

pub struct NtfySource {
    client: reqwest::Client,
    url: String,
    notifier: Option<Arc<ErrorNotifier>>,
}

impl NtfySource {
    pub fn new(url: impl Into<String>, notifier: Option<Arc<ErrorNotifier>>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ntfy-receipt/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReceiptError::Config(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            notifier,
        })
    }

    /// Forward messages to `tx` until cancelled or the receiver goes away.
    pub async fn run(self, tx: mpsc::Sender<Incoming>, cancel: CancellationToken) {
        info!(url = %self.url, "Listening");

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.consume(&tx) => result,
            };
            if tx.is_closed() {
                break;
            }

            match result {
                Ok(()) => warn!("ntfy stream closed, reconnecting in 5s"),
                Err(e) => {
                    error!("Connection to ntfy failed, retrying in 5s: {}", e);
                    if let Some(notifier) = &self.notifier {
                        notifier
                            .notify("Connection Error", &format!("Failed to connect to ntfy: {}", e))
                            .await;
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }

        debug!("Stream consumer stopped");
    }

    async fn consume(&self, tx: &mpsc::Sender<Incoming>) -> Result<()> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ReceiptError::Stream(e.to_string()))?;

        let mut body = response.bytes_stream();
        let mut pending: Vec<u8> = Vec::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| ReceiptError::Stream(e.to_string()))?;
            pending.extend_from_slice(&chunk);

            for line in drain_lines(&mut pending) {
                if let Some(incoming) = decode_line(&line) {
                    debug!(len = incoming.message.len(), "Message received");
                    if tx.send(incoming).await.is_err() {
                        return Ok(());
                    }
                }
            }
        }

        Ok(())
    }
}

/// Split complete lines off the front of `pending`, keeping any partial tail.
///
/// A tail that grows past [`MAX_LINE_BYTES`] without a newline is discarded.
fn drain_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(last) = pending.iter().rposition(|&b| b == b'\n') {
        let tail = pending.split_off(last + 1);
        for raw in pending.split(|&b| b == b'\n') {
            let line = String::from_utf8_lossy(raw).trim().to_string();
            if !line.is_empty() {
                lines.push(line);
            }
        }
        *pending = tail;
    }

    if pending.len() > MAX_LINE_BYTES {
        warn!(len = pending.len(), "Dropping oversized stream line");
        pending.clear();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stream_url() {
        assert_eq!(stream_url("ntfy.sh", "printer"), "https://ntfy.sh/printer/json");
        assert_eq!(
            stream_url("http://10.0.0.5:8080/", "/office/"),
            "http://10.0.0.5:8080/office/json"
        );
    }

    #[test]
    fn test_decode_message_event() {
        let line = r#"{"id":"a","event":"message","topic":"t","message":"Lunch Time!","priority":4}"#;
        let incoming = decode_line(line).unwrap();
        assert_eq!(incoming.message, "Lunch Time!");
        let metadata = incoming.metadata.unwrap();
        assert_eq!(metadata.get("priority"), Some(&Value::from(4)));
    }

    #[test]
    fn test_decode_skips_other_events() {
        assert!(decode_line(r#"{"event":"open","topic":"t"}"#).is_none());
        assert!(decode_line(r#"{"event":"keepalive"}"#).is_none());
        assert!(decode_line(r#"{"event":"message","message":""}"#).is_none());
        assert!(decode_line(r#"{"message":"no event"}"#).is_none());
    }

    #[test]
    fn test_decode_skips_non_json() {
        assert!(decode_line("not json").is_none());
        assert!(decode_line("[1,2,3]").is_none());
    }

    #[test]
    fn test_drain_lines_keeps_partial_tail() {
        let mut pending = b"{\"a\":1}\n\n{\"b\":".to_vec();
        assert_eq!(drain_lines(&mut pending), vec!["{\"a\":1}".to_string()]);
        assert_eq!(pending, b"{\"b\":".to_vec());

        pending.extend_from_slice(b"2}\r\n");
        assert_eq!(drain_lines(&mut pending), vec!["{\"b\":2}".to_string()]);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_drain_lines_splits_many_lines_in_one_chunk() {
        let mut pending = b"one\ntwo\r\n\nthree\nfour".to_vec();
        assert_eq!(
            drain_lines(&mut pending),
            vec!["one".to_string(), "two".to_string(), "three".to_string()]
        );
        assert_eq!(pending, b"four".to_vec());
    }

    #[test]
    fn test_drain_lines_drops_oversized_line() {
        let mut pending = vec![b'x'; MAX_LINE_BYTES + 1];
        assert!(drain_lines(&mut pending).is_empty());
        assert!(pending.is_empty());

        // the stream resumes cleanly at the next line
        pending.extend_from_slice(b"{\"a\":1}\n");
        assert_eq!(drain_lines(&mut pending), vec!["{\"a\":1}".to_string()]);
    }
}
