//! Record framing, multi-line aggregation and batched output on top of
//! `logframe-core`'s transport/buffer primitives.

pub mod auto;
pub mod config;
pub mod framed;
pub mod multiline;
pub mod text;
pub mod writer;

pub use auto::AutoServer;
pub use config::{build_multiline_logic, MultiLineConfig, MultiLineMode};
pub use framed::{encode_frame, FramedServer};
pub use multiline::{
	EmptyLineSeparated, Indented, MultiLineLogic, NoMultiLine, RegexMode, RegexMultiLine, RuleTable, Smart, Verdict,
};
pub use text::TextServer;
pub use writer::{Acker, FileWriter, PostResult};
