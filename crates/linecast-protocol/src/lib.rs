//! linecast protocol - newline-delimited wire framing
//!
//! The relay speaks the simplest possible protocol: every message is a run
//! of bytes terminated by a single `\n`. This crate provides the message
//! type and an async reader that splits a byte stream into lines.

pub mod error;
pub mod line;
pub mod reader;

pub use error::ProtocolError;
pub use line::{Line, LINE_TERMINATOR};
pub use reader::LineReader;
