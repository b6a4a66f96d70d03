use crate::infrastructure::api::ChatByteStream;
use crate::util::errors::{FinChatError, FinChatResult};
use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::StreamExt;
use log::{debug, trace, warn};
use serde_json::Value;
use std::io;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder, FramedRead};
use tokio_util::io::StreamReader;

const DATA_PREFIX: &str = "data:";
const UNKNOWN_BACKEND_ERROR: &str = "unknown backend error";

/// One decoded `data:` line of the chat reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatStreamEvent {
    Content(String),
    Error(String),
    Done,
}

pub type LineStream = BoxStream<'static, FinChatResult<String>>;

/// Newline framing that never fails on line content.
///
/// Bytes that are not valid UTF-8 are replaced with U+FFFD. A line longer than
/// the limit is dropped up to its terminating newline and reading continues.
struct ReplyLineCodec {
    inner: AnyDelimiterCodec,
}

impl ReplyLineCodec {
    fn new(max_line_length: usize) -> Self {
        Self {
            inner: AnyDelimiterCodec::new_with_max_length(
                b"\n".to_vec(),
                Vec::new(),
                max_line_length,
            ),
        }
    }

    fn to_line(chunk: Bytes) -> String {
        let raw = chunk.strip_suffix(b"\r").unwrap_or(&chunk[..]);
        match std::str::from_utf8(raw) {
            Ok(line) => line.to_string(),
            Err(e) => {
                warn!("Chat stream line is not valid UTF-8 ({}), decoding lossily", e);
                String::from_utf8_lossy(raw).into_owned()
            }
        }
    }
}

impl Decoder for ReplyLineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        loop {
            match self.inner.decode(buf) {
                Ok(chunk) => return Ok(chunk.map(Self::to_line)),
                Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => {
                    warn!("Skipping chat stream line longer than the line limit");
                }
                Err(AnyDelimiterCodecError::Io(e)) => return Err(e),
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        loop {
            match self.inner.decode_eof(buf) {
                Ok(chunk) => return Ok(chunk.map(Self::to_line)),
                Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => {
                    warn!("Skipping chat stream line longer than the line limit");
                }
                Err(AnyDelimiterCodecError::Io(e)) => return Err(e),
            }
        }
    }
}

/// Split a reply body into lines.
///
/// Partial lines are buffered across chunk boundaries, `\r\n` is accepted as a
/// terminator, and an unterminated final line is still yielded at end of stream.
/// Only transport failures surface as errors.
pub fn frame_lines(body: ChatByteStream, max_line_length: usize) -> LineStream {
    let reader = StreamReader::new(
        body.map(|chunk| chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e))),
    );
    FramedRead::new(reader, ReplyLineCodec::new(max_line_length))
        .map(|line| line.map_err(|e| FinChatError::Stream(e.to_string())))
        .boxed()
}

/// Decode one line of the reply.
///
/// Returns `None` for anything that is not a usable event: lines without the
/// `data:` prefix, invalid JSON, a missing or unknown `type`. Such lines are
/// logged and skipped; they never end the stream.
pub fn parse_event_line(line: &str) -> Option<ChatStreamEvent> {
    let payload = line.strip_prefix(DATA_PREFIX)?;
    trace!("Chat SSE: {:?}", payload);

    let event_json: Value = match serde_json::from_str(payload) {
        Ok(json) => json,
        Err(e) => {
            warn!("Skipping malformed chat event: {}, data: {}", e, payload);
            return None;
        }
    };

    match event_json.get("type").and_then(Value::as_str) {
        Some("content") => match event_json.get("content").and_then(Value::as_str) {
            Some(content) => Some(ChatStreamEvent::Content(content.to_string())),
            None => {
                warn!("Skipping content event without text: {}", payload);
                None
            }
        },
        Some("error") => {
            let message = match event_json.get("error") {
                Some(Value::String(message)) => message.clone(),
                Some(Value::Null) | None => UNKNOWN_BACKEND_ERROR.to_string(),
                Some(other) => other.to_string(),
            };
            Some(ChatStreamEvent::Error(message))
        }
        Some("done") => Some(ChatStreamEvent::Done),
        Some(other) => {
            debug!("Skipping chat event with unknown type: {}", other);
            None
        }
        None => {
            warn!("Skipping chat event without type: {}", payload);
            None
        }
    }
}
