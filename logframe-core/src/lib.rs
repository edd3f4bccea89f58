//! Transport, buffering and bookmark primitives shared by every stream
//! protocol in `logframe-proto`.
//!
//! This crate owns the pieces that are protocol-agnostic: how bytes are
//! read from and written to a transport, how a record buffer tracks its
//! consumed/valid window, and how that window is captured into a
//! [`Bookmark`] for crash-safe resumption. The actual framing decisions
//! (where a record ends) live one layer up, in `logframe-proto`.

pub mod bookmark;
pub mod buffer;
pub mod config;
pub mod encoding;
pub mod error;
pub mod poll;
pub mod record_source;
pub mod transport;

pub use bookmark::Bookmark;
pub use buffer::Buffer;
pub use config::ProtoOptions;
pub use error::{ConfigError, ProtoError};
pub use poll::{IoCond, PollEvents, PrepareAction};
pub use record_source::{FetchResult, RecordSource};
pub use transport::{IoResult, Transport};
