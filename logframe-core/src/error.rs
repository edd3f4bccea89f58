use std::io;

/// Errors surfaced while a protocol is running.
///
/// Mirrors the error kinds a source can report: end of stream, a
/// transient would-block, an OS-level I/O failure, or a framing
/// violation. `Again` is rarely constructed directly -- transports
/// translate `WouldBlock`/`EINTR` into it, and the scheduler is
/// expected to retry rather than treat it as a failure.
#[derive(thiserror::Error, Debug)]
pub enum ProtoError {
	#[error("end of stream")]
	Eof,

	#[error("operation would block")]
	Again,

	#[error("io error: {0}")]
	Io(#[from] io::Error),

	#[error("protocol error at offset {offset}: {reason}")]
	Protocol { offset: u64, reason: String },

	#[error("record of {0} bytes exceeds max_msg_size, truncated")]
	Truncated(usize),

	#[error("rewind of a segment that was already rewound once")]
	DoubleRewind,

	#[error("invalid multi-line verdict: {0}")]
	InvalidVerdict(&'static str),
}

impl ProtoError {
	pub fn is_again(&self) -> bool {
		matches!(self, ProtoError::Again)
			|| matches!(self, ProtoError::Io(e) if e.kind() == io::ErrorKind::WouldBlock)
	}

	pub fn is_eof(&self) -> bool {
		matches!(self, ProtoError::Eof)
	}
}

/// Errors that can only occur at configuration/init time -- a source
/// that fails here never starts.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
	#[error("failed to compile regex {pattern:?}: {reason}")]
	InvalidRegex { pattern: String, reason: String },

	#[error("pad_size and multi_line.mode cannot both be set")]
	PadSizeWithMultiLine,

	#[error("multi_line.mode is regex-based but {0} was not set")]
	MissingRegex(&'static str),

	#[error("smart multi-line rules file {path} could not be read: {source}")]
	RulesFileUnreadable {
		path: String,
		#[source]
		source: io::Error,
	},

	#[error("smart multi-line rules file {path} defines no rules reachable from start_state")]
	EmptyRuleTable { path: String },
}
