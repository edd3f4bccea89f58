use bytes::Bytes;

use crate::bookmark::Bookmark;
use crate::error::ProtoError;
use crate::transport::{IoResult, Transport};

/// Buffer starts small and doubles on demand, the same progressive
/// sizing `agent-core`'s connection buffers use, capped at
/// `max_msg_size`.
const INITIAL_BUFFER_SIZE: usize = 4096;

/// The record buffer (§3): a contiguous byte region of bounded
/// capacity that tracks which bytes are unconsumed, which are the
/// still-unread tail, and (opportunistically) where the next record
/// boundary is.
///
/// Invariants (checked with `debug_assert!` at the points that could
/// violate them):
/// - `0 <= pending_buffer_pos <= pending_buffer_end <= data.len() <= max_capacity`
/// - `cached_eol_pos`, when `Some`, is `> pending_buffer_pos` and points
///   at a byte inside `[pending_buffer_pos, pending_buffer_end)`.
pub struct Buffer {
	data: Vec<u8>,
	max_capacity: usize,
	pending_buffer_pos: usize,
	pending_buffer_end: usize,
	pub raw_stream_pos: u64,
	pub cached_eol_pos: Option<usize>,
	/// -1 in the source; `None` here means "not in the middle of a
	/// partial multi-line extraction".
	pub consumed_len: Option<usize>,
}

impl Buffer {
	pub fn new(max_capacity: usize) -> Buffer {
		Buffer {
			data: vec![0u8; INITIAL_BUFFER_SIZE.min(max_capacity).max(1)],
			max_capacity,
			pending_buffer_pos: 0,
			pending_buffer_end: 0,
			raw_stream_pos: 0,
			cached_eol_pos: None,
			consumed_len: None,
		}
	}

	pub fn pending_buffer_pos(&self) -> usize {
		self.pending_buffer_pos
	}

	pub fn pending_buffer_end(&self) -> usize {
		self.pending_buffer_end
	}

	pub fn max_capacity(&self) -> usize {
		self.max_capacity
	}

	/// Unconsumed bytes currently sitting in the buffer.
	pub fn available(&self) -> usize {
		self.pending_buffer_end - self.pending_buffer_pos
	}

	/// The window of bytes not yet handed to the consumer.
	pub fn window(&self) -> &[u8] {
		&self.data[self.pending_buffer_pos..self.pending_buffer_end]
	}

	/// A slice anchored at absolute buffer offsets, as used by
	/// `find_eom` results and multi-line verdicts.
	pub fn slice_abs(&self, start: usize, end: usize) -> &[u8] {
		&self.data[start..end]
	}

	pub fn is_at_max_capacity(&self) -> bool {
		self.data.len() >= self.max_capacity
	}

	/// Have we filled the entire buffer without finding a record
	/// boundary? This is the trigger for the "oversize line" fallback
	/// in §4.3/§4.4.
	pub fn is_full(&self) -> bool {
		self.available() >= self.max_capacity
	}

	/// Advances `pending_buffer_pos` to `new_pos` (absolute), moving
	/// `raw_stream_pos` forward by the same amount. `new_pos` must be
	/// `<= pending_buffer_end`.
	pub fn advance_to(&mut self, new_pos: usize) {
		debug_assert!(new_pos <= self.pending_buffer_end);
		debug_assert!(new_pos >= self.pending_buffer_pos);
		let delta = new_pos - self.pending_buffer_pos;
		self.pending_buffer_pos = new_pos;
		self.raw_stream_pos += delta as u64;
	}

	/// Slides unconsumed bytes to offset 0 and grows the backing
	/// allocation (up to `max_capacity`) if it is already full,
	/// preparing room for `Transport::read`. Returns the writable tail
	/// slice to read into.
	pub fn prepare_for_read(&mut self) -> &mut [u8] {
		if self.pending_buffer_pos > 0 {
			self.data.copy_within(self.pending_buffer_pos..self.pending_buffer_end, 0);
			self.pending_buffer_end -= self.pending_buffer_pos;
			if let Some(eol) = self.cached_eol_pos {
				self.cached_eol_pos = Some(eol - self.pending_buffer_pos);
			}
			self.pending_buffer_pos = 0;
		}
		if self.pending_buffer_end == self.data.len() && self.data.len() < self.max_capacity {
			let new_len = (self.data.len() * 2).min(self.max_capacity);
			self.data.resize(new_len, 0);
		}
		&mut self.data[self.pending_buffer_end..]
	}

	pub fn commit_read(&mut self, n: usize) {
		self.pending_buffer_end += n;
	}

	/// Reads one chunk from `transport` into spare buffer capacity,
	/// compacting/growing first if needed.
	pub fn refill(&mut self, transport: &mut dyn Transport) -> IoResult {
		let spare = self.prepare_for_read();
		if spare.is_empty() {
			// Buffer is already at max capacity and full: caller must
			// flush a partial record before we can read more.
			return IoResult::Again;
		}
		let result = transport.read(spare);
		if let IoResult::Ok(n) = result {
			self.commit_read(n);
		}
		result
	}

	pub fn to_bytes(&self, start: usize, end: usize) -> Bytes {
		Bytes::copy_from_slice(&self.data[start..end])
	}

	pub fn bookmark(&self) -> Bookmark {
		Bookmark {
			raw_stream_pos: self.raw_stream_pos,
			pending_buffer_pos: 0,
			pending_buffer_end: self.available() as u32,
			buffer: self.window().to_vec(),
		}
	}

	/// Re-primes the buffer from a persisted bookmark (§3); the caller
	/// is responsible for seeking the transport to
	/// `bookmark.raw_stream_pos` first.
	pub fn restore(&mut self, bookmark: &Bookmark) -> Result<(), ProtoError> {
		let len = bookmark.buffer.len();
		if len > self.max_capacity {
			return Err(ProtoError::Protocol {
				offset: bookmark.raw_stream_pos,
				reason: "bookmarked buffer window exceeds max_msg_size".to_string(),
			});
		}
		if self.data.len() < len {
			self.data.resize(len.max(INITIAL_BUFFER_SIZE.min(self.max_capacity)), 0);
		}
		self.data[..len].copy_from_slice(&bookmark.buffer);
		self.pending_buffer_pos = 0;
		self.pending_buffer_end = len;
		self.raw_stream_pos = bookmark.raw_stream_pos;
		self.cached_eol_pos = None;
		self.consumed_len = None;
		Ok(())
	}

	pub fn clear(&mut self) {
		self.pending_buffer_pos = 0;
		self.pending_buffer_end = 0;
		self.cached_eol_pos = None;
		self.consumed_len = None;
	}
}
