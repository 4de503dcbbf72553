//! SSE subscription: incremental frame decoding and reconnect handling

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

use super::EventStream;
use super::error::ApiError;
use crate::proto::EventFrame;

/// What a subscription yields. `Opened` follows every successful connect,
/// `Disconnected` every transport failure; reconnection is internal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportItem {
    Opened,
    Event(EventFrame),
    Disconnected { error: String },
}

type BodyStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send + Sync>>;

/// Incremental text/event-stream decoder. Fed raw chunks, yields complete
/// frames; partial frames survive chunk boundaries in the buffer.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buf: BytesMut,
    event_name: String,
    data: String,
    has_data: bool,
    last_id: Option<i64>,
    retry_hint: Option<Duration>,
}

impl SseDecoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_chunk(&mut self, chunk: &[u8]) -> Vec<EventFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(line) = self.take_line() {
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    pub(crate) fn take_retry_hint(&mut self) -> Option<Duration> {
        self.retry_hint.take()
    }

    fn take_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let raw = self.buf.split_to(pos + 1);
        let mut line = &raw[..raw.len() - 1];
        if line.ends_with(b"\r") {
            line = &line[..line.len() - 1];
        }
        Some(String::from_utf8_lossy(line).into_owned())
    }

    fn process_line(&mut self, line: &str) -> Option<EventFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            // keep-alive comment
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event_name = value.to_string(),
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
                self.has_data = true;
            }
            "id" => {
                if !value.contains('\0') {
                    if let Ok(id) = value.parse::<i64>() {
                        self.last_id = Some(id);
                    }
                }
            }
            "retry" => {
                if let Ok(ms) = value.parse::<u64>() {
                    self.retry_hint = Some(Duration::from_millis(ms));
                }
            }
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<EventFrame> {
        if !self.has_data {
            self.event_name.clear();
            return None;
        }
        let mut data = std::mem::take(&mut self.data);
        if data.ends_with('\n') {
            data.pop();
        }
        self.has_data = false;
        let name = std::mem::take(&mut self.event_name);
        Some(EventFrame {
            id: self.last_id,
            name: if name.is_empty() {
                "message".to_string()
            } else {
                name
            },
            data,
        })
    }
}

/// Connection state machine behind one logical subscription.
pub(crate) struct StreamDriver {
    http: reqwest::Client,
    url: String,
    reconnect_initial: Duration,
    reconnect_max: Duration,
    decoder: SseDecoder,
    body: Option<BodyStream>,
    pending: VecDeque<EventFrame>,
    attempts: u32,
    server_retry: Option<Duration>,
    last_event_id: Option<i64>,
}

impl StreamDriver {
    pub(crate) fn new(
        http: reqwest::Client,
        url: String,
        reconnect_initial: Duration,
        reconnect_max: Duration,
    ) -> Self {
        Self {
            http,
            url,
            reconnect_initial,
            reconnect_max,
            decoder: SseDecoder::new(),
            body: None,
            pending: VecDeque::new(),
            attempts: 0,
            server_retry: None,
            last_event_id: None,
        }
    }

    pub(crate) fn into_stream(self) -> EventStream {
        Box::pin(stream::unfold(self, |mut driver| async move {
            let item = driver.next_item().await;
            Some((item, driver))
        }))
    }

    async fn next_item(&mut self) -> TransportItem {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                if let Some(id) = frame.id {
                    self.last_event_id = Some(self.last_event_id.map_or(id, |prev| prev.max(id)));
                }
                return TransportItem::Event(frame);
            }

            match self.body.as_mut() {
                None => {
                    let delay = self.backoff_delay();
                    if !delay.is_zero() {
                        debug!(delay_ms = delay.as_millis() as u64, "waiting before reconnect");
                        tokio::time::sleep(delay).await;
                    }
                    match self.connect().await {
                        Ok(body) => {
                            self.body = Some(body);
                            // partial frames from the old connection are gone
                            self.decoder = SseDecoder::new();
                            self.attempts = 0;
                            return TransportItem::Opened;
                        }
                        Err(err) => {
                            self.attempts += 1;
                            warn!(error = %err, attempts = self.attempts, "event stream connect failed");
                            return TransportItem::Disconnected {
                                error: err.to_string(),
                            };
                        }
                    }
                }
                Some(body) => match body.next().await {
                    Some(Ok(chunk)) => {
                        let frames = self.decoder.push_chunk(&chunk);
                        if let Some(hint) = self.decoder.take_retry_hint() {
                            self.server_retry = Some(hint);
                        }
                        self.pending.extend(frames);
                    }
                    Some(Err(err)) => {
                        self.body = None;
                        self.attempts += 1;
                        warn!(error = %err, "event stream read failed");
                        return TransportItem::Disconnected {
                            error: err.to_string(),
                        };
                    }
                    None => {
                        self.body = None;
                        self.attempts += 1;
                        return TransportItem::Disconnected {
                            error: "stream closed by server".to_string(),
                        };
                    }
                },
            }
        }
    }

    async fn connect(&self) -> Result<BodyStream, ApiError> {
        let mut request = self
            .http
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        if let Some(id) = self.last_event_id {
            request = request.header("Last-Event-ID", id.to_string());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let parsed: mime::Mime = content_type
            .parse()
            .map_err(|_| ApiError::ContentType(content_type.clone()))?;
        if parsed.type_() != mime::TEXT || parsed.subtype() != "event-stream" {
            return Err(ApiError::ContentType(content_type));
        }

        Ok(Box::pin(response.bytes_stream()))
    }

    fn backoff_delay(&self) -> Duration {
        if self.attempts == 0 {
            return Duration::ZERO;
        }
        let base = self.server_retry.unwrap_or(self.reconnect_initial);
        let shift = (self.attempts - 1).min(6);
        base.saturating_mul(1u32 << shift).min(self.reconnect_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(decoder: &mut SseDecoder, input: &str) -> Vec<EventFrame> {
        decoder.push_chunk(input.as_bytes())
    }

    #[test]
    fn test_decodes_single_frame() {
        let mut decoder = SseDecoder::new();
        let out = frames(
            &mut decoder,
            "id: 7\nevent: ops.queue\ndata: {\"queue\":{}}\n\n",
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, Some(7));
        assert_eq!(out[0].name, "ops.queue");
        assert_eq!(out[0].data, "{\"queue\":{}}");
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(frames(&mut decoder, "id: 3\nevent: ops.lo").is_empty());
        assert!(frames(&mut decoder, "g\ndata: {\"a\"").is_empty());
        let out = frames(&mut decoder, ":1}\n\n");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "ops.log");
        assert_eq!(out[0].data, "{\"a\":1}");
    }

    #[test]
    fn test_crlf_lines() {
        let mut decoder = SseDecoder::new();
        let out = frames(&mut decoder, "event: ops.hello\r\ndata: {}\r\n\r\n");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "ops.hello");
        assert_eq!(out[0].data, "{}");
    }

    #[test]
    fn test_multi_line_data_joined_with_newline() {
        let mut decoder = SseDecoder::new();
        let out = frames(&mut decoder, "data: first\ndata: second\n\n");
        assert_eq!(out[0].data, "first\nsecond");
    }

    #[test]
    fn test_comments_are_dropped() {
        let mut decoder = SseDecoder::new();
        assert!(frames(&mut decoder, ": keep-alive\n\n").is_empty());
        let out = frames(&mut decoder, ": ping\ndata: x\n\n");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].data, "x");
    }

    #[test]
    fn test_id_persists_across_frames() {
        let mut decoder = SseDecoder::new();
        let out = frames(&mut decoder, "id: 5\ndata: a\n\ndata: b\n\n");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, Some(5));
        assert_eq!(out[1].id, Some(5));
    }

    #[test]
    fn test_event_name_without_data_not_dispatched() {
        let mut decoder = SseDecoder::new();
        assert!(frames(&mut decoder, "event: ops.hello\n\n").is_empty());
        // the un-dispatched name must not leak into the next frame
        let out = frames(&mut decoder, "data: x\n\n");
        assert_eq!(out[0].name, "message");
    }

    #[test]
    fn test_default_event_name_is_message() {
        let mut decoder = SseDecoder::new();
        let out = frames(&mut decoder, "data: hi\n\n");
        assert_eq!(out[0].name, "message");
    }

    #[test]
    fn test_retry_hint() {
        let mut decoder = SseDecoder::new();
        frames(&mut decoder, "retry: 2500\n");
        assert_eq!(decoder.take_retry_hint(), Some(Duration::from_millis(2500)));
        assert_eq!(decoder.take_retry_hint(), None);
    }

    #[test]
    fn test_non_numeric_id_ignored() {
        let mut decoder = SseDecoder::new();
        let out = frames(&mut decoder, "id: abc\ndata: x\n\n");
        assert_eq!(out[0].id, None);
    }
}
