use bytes::{Bytes, BytesMut};
use logframe_core::{Bookmark, Buffer, FetchResult, IoResult, PrepareAction, ProtoError, ProtoOptions, RecordSource, Transport};

/// Upper bound on the digit count of the decimal length field: caps a
/// malformed/hostile stream from accumulating an unbounded "length"
/// before ever seeing a space (§4.6, `10^RFC6587_MAX_FRAME_LEN_DIGITS - 1`).
const RFC6587_MAX_FRAME_LEN_DIGITS: usize = 9;

/// §4.6: RFC6587 octet-counted framing, `<decimal-length> SP <N-bytes>`.
///
/// The source models this as two states, `READ_FRAME_LENGTH` and
/// `READ_MESSAGE`. Here both collapse into one rescan of the current
/// buffer window on every `fetch`: since the window is bounded by
/// `max_msg_size`, rescanning the (short) length prefix from the start
/// of the window each time is cheap and avoids carrying a separate
/// digit accumulator across partial reads.
pub struct FramedServer {
	transport: Box<dyn Transport>,
	buffer: Buffer,
	max_msg_size: usize,
	input_closed: bool,
	closed: bool,
}

impl FramedServer {
	pub fn new(transport: Box<dyn Transport>, options: &ProtoOptions) -> FramedServer {
		FramedServer {
			transport,
			buffer: Buffer::new(options.max_msg_size),
			max_msg_size: options.max_msg_size,
			input_closed: false,
			closed: false,
		}
	}

	fn protocol_error(&self, reason: impl Into<String>) -> ProtoError {
		ProtoError::Protocol { offset: self.buffer.raw_stream_pos, reason: reason.into() }
	}

	fn try_extract(&mut self) -> Result<Option<Bytes>, ProtoError> {
		let start = self.buffer.pending_buffer_pos();
		let end = self.buffer.pending_buffer_end();
		let window = self.buffer.slice_abs(start, end);

		let Some(space_at) = window.iter().position(|&b| b == b' ') else {
			if window.iter().any(|b| !b.is_ascii_digit()) {
				return Err(self.protocol_error("non-digit byte before the frame length's terminating space"));
			}
			if window.len() > RFC6587_MAX_FRAME_LEN_DIGITS {
				return Err(self.protocol_error("frame length field exceeds the maximum digit count"));
			}
			if self.input_closed {
				return if window.is_empty() { Ok(None) } else { Err(self.protocol_error("stream closed mid frame-length")) };
			}
			return Ok(None);
		};

		let digits = &window[..space_at];
		if digits.is_empty() || digits.iter().any(|b| !b.is_ascii_digit()) {
			return Err(self.protocol_error("frame length field is empty or non-numeric"));
		}
		let len: u64 = std::str::from_utf8(digits)
			.expect("validated ASCII digits")
			.parse()
			.map_err(|_| self.protocol_error("frame length field does not fit a u64"))?;
		if len > self.max_msg_size as u64 {
			return Err(self.protocol_error(format!("frame length {len} exceeds max_msg_size {}", self.max_msg_size)));
		}
		let len = len as usize;
		let msg_start = space_at + 1;

		if window.len() < msg_start + len {
			if self.input_closed {
				return Err(self.protocol_error("stream closed before the full frame arrived"));
			}
			return Ok(None);
		}

		let record = self.buffer.to_bytes(start + msg_start, start + msg_start + len);
		self.buffer.advance_to(start + msg_start + len);
		Ok(Some(record))
	}
}

impl RecordSource for FramedServer {
	fn poll_prepare(&mut self) -> PrepareAction {
		if self.closed {
			return PrepareAction::Suspend;
		}
		PrepareAction::PollIo
	}

	fn fetch(&mut self) -> Result<FetchResult, ProtoError> {
		if self.closed {
			return Err(ProtoError::Eof);
		}
		loop {
			if let Some(record) = self.try_extract()? {
				return Ok(FetchResult::Record { data: record, bookmark: self.buffer.bookmark() });
			}
			if self.input_closed {
				return Ok(FetchResult::Eof);
			}
			match self.buffer.refill(self.transport.as_mut()) {
				IoResult::Ok(_) => continue,
				IoResult::Eof => self.input_closed = true,
				IoResult::Again => return Ok(FetchResult::WouldBlock),
				IoResult::Error(e) => return Err(ProtoError::Io(e)),
			}
		}
	}

	fn restore(&mut self, bookmark: &Bookmark) -> Result<(), ProtoError> {
		self.buffer.restore(bookmark)?;
		self.input_closed = false;
		Ok(())
	}

	fn close(&mut self) {
		self.closed = true;
		self.buffer.clear();
	}
}

/// Writer-side encoding (`logproto-framed-client.c`'s `FRAME_SEND` /
/// `MESSAGE_SEND` states): producing the wire form of a frame is a
/// pure function of the record. Resuming a partial write of that
/// output is [`crate::writer::FileWriter`]'s job -- it already tracks
/// partial writes generically, so there is no separate send-side state
/// machine to maintain here.
pub fn encode_frame(record: &[u8]) -> Bytes {
	let mut out = BytesMut::with_capacity(record.len() + 12);
	out.extend_from_slice(record.len().to_string().as_bytes());
	out.extend_from_slice(b" ");
	out.extend_from_slice(record);
	out.freeze()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::text::tests_support::SliceTransport;

	#[test]
	fn scenario_5_framed() {
		let transport = Box::new(SliceTransport::new(b"5 hello11 hello world"));
		let options = ProtoOptions::default();
		let mut server = FramedServer::new(transport, &options);

		let FetchResult::Record { data, .. } = server.fetch().unwrap() else { panic!() };
		assert_eq!(&data[..], b"hello");
		let FetchResult::Record { data, .. } = server.fetch().unwrap() else { panic!() };
		assert_eq!(&data[..], b"hello world");
	}

	#[test]
	fn round_trip_r2_encode_then_decode() {
		let records: Vec<Vec<u8>> = (0..25).map(|i| format!("record number {i}").into_bytes()).collect();
		let mut wire = Vec::new();
		for r in &records {
			wire.extend_from_slice(&encode_frame(r));
		}
		let transport = Box::new(SliceTransport::new(&wire));
		let options = ProtoOptions::default();
		let mut server = FramedServer::new(transport, &options);

		let mut decoded = Vec::new();
		loop {
			match server.fetch().unwrap() {
				FetchResult::Record { data, .. } => decoded.push(data.to_vec()),
				FetchResult::WouldBlock => continue,
				FetchResult::Eof => break,
			}
		}
		assert_eq!(decoded, records);
	}

	#[test]
	fn non_digit_before_space_is_a_protocol_error() {
		let transport = Box::new(SliceTransport::new(b"5x hello"));
		let options = ProtoOptions::default();
		let mut server = FramedServer::new(transport, &options);
		assert!(matches!(server.fetch(), Err(ProtoError::Protocol { .. })));
	}

	#[test]
	fn oversize_frame_is_a_protocol_error() {
		let transport = Box::new(SliceTransport::new(b"999999 x"));
		let options = ProtoOptions { max_msg_size: 64, ..Default::default() };
		let mut server = FramedServer::new(transport, &options);
		assert!(matches!(server.fetch(), Err(ProtoError::Protocol { .. })));
	}
}
