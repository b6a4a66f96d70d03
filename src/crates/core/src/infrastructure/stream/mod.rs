//! Chat reply stream decoding

pub mod stream_handler;

pub use stream_handler::{frame_lines, parse_event_line, ChatStreamEvent, LineStream};
