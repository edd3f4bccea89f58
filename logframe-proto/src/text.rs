use bytes::Bytes;
use logframe_core::{Bookmark, Buffer, FetchResult, IoResult, PrepareAction, ProtoError, ProtoOptions, RecordSource, Transport};

use crate::multiline::{MultiLineLogic, Readiness, SegmentDisposition};

/// Locates the next record terminator inside `data`, returning its
/// offset relative to `data`'s start. Two stock variants are named in
/// the source; in Rust both reduce to the same `memchr` scan, since
/// `memchr` (unlike a C `strchr`-based scan) never stops early at an
/// embedded NUL.
pub type FindEom = fn(&[u8]) -> Option<usize>;

pub fn find_eol(data: &[u8]) -> Option<usize> {
	memchr::memchr(b'\n', data)
}

pub fn find_eol_allow_embedded_nul(data: &[u8]) -> Option<usize> {
	memchr::memchr(b'\n', data)
}

/// §4.4: the text-with-EOL protocol. Locates `\n`-terminated
/// segments, runs them through a [`MultiLineLogic`] policy, and emits
/// whatever the policy decides is a complete record.
pub struct TextServer {
	transport: Box<dyn Transport>,
	buffer: Buffer,
	logic: Box<dyn MultiLineLogic>,
	find_eom: FindEom,
	max_msg_size: usize,
	input_closed: bool,
	closed: bool,
	exit_on_eof: bool,
	/// Absolute offset of the most recently rewound segment's
	/// terminator; guards invariant I5 (a segment is never rewound
	/// more than once).
	last_rewound_eol: Option<usize>,
}

impl TextServer {
	pub fn new(transport: Box<dyn Transport>, logic: Box<dyn MultiLineLogic>, options: &ProtoOptions) -> TextServer {
		TextServer {
			transport,
			buffer: Buffer::new(options.max_msg_size),
			logic,
			find_eom: find_eol,
			max_msg_size: options.max_msg_size,
			input_closed: false,
			closed: false,
			exit_on_eof: options.exit_on_eof,
			last_rewound_eol: None,
		}
	}

	pub fn with_find_eom(mut self, find_eom: FindEom) -> TextServer {
		self.find_eom = find_eom;
		self
	}

	fn trim_record(&self, mut record: Bytes) -> Bytes {
		if self.logic.keep_trailing_newline() {
			return record;
		}
		let mut end = record.len();
		while end > 0 && matches!(record[end - 1], b'\r' | b'\n' | 0) {
			end -= 1;
		}
		record.truncate(end);
		record
	}

	/// Yields the entire unconsumed window as one record: the §4.3/§4.4
	/// fallback for an oversize line or a trailing partial line at EOF.
	fn flush_whole_window(&mut self, was_oversize: bool) -> Bytes {
		let start = self.buffer.pending_buffer_pos();
		let end = self.buffer.pending_buffer_end();
		let record = self.buffer.to_bytes(start, end);
		self.buffer.advance_to(end);
		self.buffer.consumed_len = None;
		self.buffer.cached_eol_pos = None;
		self.last_rewound_eol = None;
		if was_oversize {
			tracing::warn!(max_msg_size = self.max_msg_size, "record exceeded max_msg_size, emitting truncated");
		}
		self.trim_record(record)
	}

	/// One pass of the extraction state machine (§4.4). Loops silently
	/// through `WAITING` verdicts (no I/O involved); returns `Ok(None)`
	/// when more bytes are needed from the transport.
	fn try_extract(&mut self) -> Result<Option<Bytes>, ProtoError> {
		loop {
			let buffer_start = self.buffer.pending_buffer_pos();
			let buffer_end = self.buffer.pending_buffer_end();
			let consumed = self.buffer.consumed_len;
			let segment_start = buffer_start + consumed.map_or(0, |c| c + 1);
			let prefix_end = buffer_start + consumed.map_or(0, |c| c);

			let eol = match self.buffer.cached_eol_pos.take() {
				Some(eol) => Some(eol),
				None if segment_start > buffer_end => None,
				None => (self.find_eom)(self.buffer.slice_abs(segment_start, buffer_end)).map(|rel| segment_start + rel),
			};

			let Some(eol) = eol else {
				let oversize = self.buffer.is_full();
				let trailing_partial = self.input_closed && self.buffer.available() > 0;
				if oversize || trailing_partial {
					return Ok(Some(self.flush_whole_window(oversize)));
				}
				return Ok(None);
			};

			let next_line_pos = eol + 1;
			if let Some(rel) = (self.find_eom)(self.buffer.slice_abs(next_line_pos, buffer_end)) {
				self.buffer.cached_eol_pos = Some(next_line_pos + rel);
			}

			let prefix = self.buffer.slice_abs(buffer_start, prefix_end).to_vec();
			let segment = self.buffer.slice_abs(segment_start, eol).to_vec();
			let verdict = self.logic.accumulate(&prefix, &segment);

			match (verdict.readiness(), verdict.disposition()) {
				(Readiness::Extracted, SegmentDisposition::Consume) => {
					self.last_rewound_eol = None;
					let record_end = eol.saturating_sub(verdict.drop_length() as usize).max(buffer_start);
					let record = self.buffer.to_bytes(buffer_start, record_end);
					self.buffer.advance_to(next_line_pos);
					self.buffer.consumed_len = None;
					return Ok(Some(self.trim_record(record)));
				},
				(Readiness::Extracted, SegmentDisposition::Rewind) => {
					if self.last_rewound_eol == Some(eol) {
						return Err(ProtoError::DoubleRewind);
					}
					self.last_rewound_eol = Some(eol);
					let record = self.buffer.to_bytes(buffer_start, prefix_end);
					self.buffer.advance_to(segment_start);
					self.buffer.cached_eol_pos = Some(eol);
					self.buffer.consumed_len = None;
					return Ok(Some(self.trim_record(record)));
				},
				(Readiness::Waiting, SegmentDisposition::Consume) => {
					self.last_rewound_eol = None;
					debug_assert_eq!(verdict.drop_length(), 0, "partial drop mid-record is disallowed");
					self.buffer.consumed_len = Some(eol - buffer_start);
				},
				(Readiness::Waiting, SegmentDisposition::Rewind) => {
					unreachable!("Verdict has no constructor for WAITING + REWIND")
				},
			}
		}
	}
}

impl RecordSource for TextServer {
	fn poll_prepare(&mut self) -> PrepareAction {
		if self.closed {
			return PrepareAction::Suspend;
		}
		if self.buffer.cached_eol_pos.is_some() || (self.input_closed && self.buffer.available() > 0) {
			return PrepareAction::ForceScheduleFetch;
		}
		PrepareAction::PollIo
	}

	fn fetch(&mut self) -> Result<FetchResult, ProtoError> {
		if self.closed {
			return Err(ProtoError::Eof);
		}
		loop {
			if let Some(record) = self.try_extract()? {
				let bookmark = self.buffer.bookmark();
				return Ok(FetchResult::Record { data: record, bookmark });
			}
			if self.input_closed {
				if self.exit_on_eof {
					self.closed = true;
				}
				return Ok(FetchResult::Eof);
			}
			match self.buffer.refill(self.transport.as_mut()) {
				IoResult::Ok(_) => {
					if self.transport.one_message_per_read() {
						return Ok(FetchResult::Record {
							data: self.flush_whole_window(false),
							bookmark: self.buffer.bookmark(),
						});
					}
				},
				IoResult::Eof => self.input_closed = true,
				IoResult::Again => return Ok(FetchResult::WouldBlock),
				IoResult::Error(e) => return Err(ProtoError::Io(e)),
			}
		}
	}

	fn restore(&mut self, bookmark: &Bookmark) -> Result<(), ProtoError> {
		self.buffer.restore(bookmark)?;
		self.input_closed = false;
		self.last_rewound_eol = None;
		Ok(())
	}

	fn close(&mut self) {
		self.closed = true;
		self.buffer.clear();
	}
}

/// A fixed byte slice played back as a one-shot [`Transport`], used by
/// every protocol's test module in this crate: `read` yields the
/// remaining bytes, then `Eof` once, then `Again` forever after (the
/// same shape a closed stream would present to a scheduler that keeps
/// polling it).
#[cfg(test)]
pub(crate) mod tests_support {
	use logframe_core::{IoResult, Transport};

	pub(crate) struct SliceTransport {
		data: Vec<u8>,
		pos: usize,
		delivered_eof: bool,
	}

	impl SliceTransport {
		pub(crate) fn new(data: &[u8]) -> SliceTransport {
			SliceTransport { data: data.to_vec(), pos: 0, delivered_eof: false }
		}
	}

	impl Transport for SliceTransport {
		fn read(&mut self, buf: &mut [u8]) -> IoResult {
			if self.pos >= self.data.len() {
				if self.delivered_eof {
					return IoResult::Again;
				}
				self.delivered_eof = true;
				return IoResult::Eof;
			}
			let n = buf.len().min(self.data.len() - self.pos);
			buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
			self.pos += n;
			IoResult::Ok(n)
		}

		fn read_ahead(&mut self, buf: &mut [u8]) -> IoResult {
			let n = buf.len().min(self.data.len().saturating_sub(self.pos));
			buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
			IoResult::Ok(n)
		}

		fn write(&mut self, _buf: &[u8]) -> IoResult {
			unimplemented!("SliceTransport is read-only")
		}

		fn fd(&self) -> std::os::fd::RawFd {
			-1
		}
	}
}

#[cfg(test)]
mod tests {
	use super::tests_support::SliceTransport;
	use super::*;
	use crate::multiline::{Indented, NoMultiLine};

	fn drain(mut server: TextServer) -> Vec<Vec<u8>> {
		let mut out = Vec::new();
		loop {
			match server.fetch().unwrap() {
				FetchResult::Record { data, .. } => out.push(data.to_vec()),
				FetchResult::WouldBlock => continue,
				FetchResult::Eof => break,
			}
		}
		out
	}

	#[test]
	fn scenario_1_simple_text() {
		let transport = Box::new(SliceTransport::new(b"hello\nworld\n"));
		let options = ProtoOptions { max_msg_size: 64, exit_on_eof: true, ..Default::default() };
		let server = TextServer::new(transport, Box::new(NoMultiLine), &options);
		assert_eq!(drain(server), vec![b"hello".to_vec(), b"world".to_vec()]);
	}

	#[test]
	fn scenario_2_indented() {
		let transport = Box::new(SliceTransport::new(b"A\n B\n C\nD\n"));
		let options = ProtoOptions { exit_on_eof: true, ..Default::default() };
		let server = TextServer::new(transport, Box::new(Indented), &options);
		assert_eq!(drain(server), vec![b"A\n B\n C".to_vec(), b"D".to_vec()]);
	}

	#[test]
	fn round_trip_r1_many_records() {
		let input = (1..=20).map(|i| format!("msg{i}\n")).collect::<String>();
		let expected: Vec<Vec<u8>> = (1..=20).map(|i| format!("msg{i}").into_bytes()).collect();
		let transport = Box::new(SliceTransport::new(input.as_bytes()));
		let options = ProtoOptions { exit_on_eof: true, ..Default::default() };
		let server = TextServer::new(transport, Box::new(NoMultiLine), &options);
		assert_eq!(drain(server), expected);
	}

	#[test]
	fn oversize_line_is_truncated_and_emitted() {
		let transport = Box::new(SliceTransport::new(b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"));
		let options = ProtoOptions { max_msg_size: 16, exit_on_eof: true, ..Default::default() };
		let server = TextServer::new(transport, Box::new(NoMultiLine), &options);
		let records = drain(server);
		assert!(records.iter().all(|r| r.len() <= 16));
		assert_eq!(records.iter().map(|r| r.len()).sum::<usize>(), 40);
	}
}
