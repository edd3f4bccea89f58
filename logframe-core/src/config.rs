use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::encoding::Encoding;

/// The options the core recognises (§6.3), shared by every protocol
/// and by the file writer. Protocol-specific knobs (multi-line mode,
/// regexes) live next to the protocol that interprets them, in
/// `logframe-proto`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProtoOptions {
	/// Hard buffer cap; oversize records are truncated to this size.
	pub max_msg_size: usize,
	/// `follow_freq_ms`: poll interval for the file-changes PollEvents
	/// variant.
	pub follow_freq: Duration,
	/// If non-zero, switch to a fixed-record-size reader. Mutually
	/// exclusive with a non-`None` multi-line mode (validated at
	/// config-init time, not here).
	pub pad_size: usize,
	/// Batch size for the file writer; defaults to 1 when unset.
	pub flush_lines: usize,
	pub fsync: bool,
	pub timeout: Option<Duration>,
	/// Reader exits the process loop on EOF (used for e.g. `stdin`).
	pub exit_on_eof: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	encoding_name: Option<String>,
}

impl ProtoOptions {
	pub fn encoding(&self) -> Encoding {
		self
			.encoding_name
			.as_deref()
			.map(Encoding::parse)
			.unwrap_or(Encoding::Other)
	}

	pub fn set_encoding(&mut self, name: impl Into<String>) {
		self.encoding_name = Some(name.into());
	}
}

impl Default for ProtoOptions {
	fn default() -> Self {
		ProtoOptions {
			max_msg_size: 64 * 1024,
			follow_freq: Duration::from_secs(1),
			pad_size: 0,
			flush_lines: 1,
			fsync: false,
			timeout: None,
			exit_on_eof: false,
			encoding_name: None,
		}
	}
}
