use std::time::{Duration, Instant};

use bytes::Bytes;
use logframe_core::{IoResult, ProtoError, ProtoOptions, Transport};

/// The platform `IOV_MAX` is environment-specific; this is a
/// conservative stand-in rather than a binding to `libc`'s (not
/// universally exposed) constant, per §4.8.
const IOV_MAX_FALLBACK: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostResult {
	Success,
	/// Some bytes of a batch are still unwritten; call `flush` before
	/// posting again.
	Partial,
}

/// Callbacks a [`FileWriter`] uses to release or requeue posted
/// records (§4.8). `ack`/`rewind` fire in the order records were
/// posted.
pub trait Acker: Send {
	/// The first `n` records posted (in FIFO order) are durably
	/// handed to the OS (and fsync'd, if enabled).
	fn ack(&mut self, n: usize);
	/// The entire in-flight batch failed non-recoverably; the caller
	/// should repost every record in it.
	fn rewind(&mut self);
}

/// §4.8: batches posted records into `writev` calls, tracking partial
/// writes so a short write never loses or duplicates a byte.
pub struct FileWriter {
	transport: Box<dyn Transport>,
	acker: Box<dyn Acker>,
	batch: Vec<Bytes>,
	/// Bytes of `batch[0]` already handed to the OS by a previous
	/// short write.
	write_offset: usize,
	flush_lines: usize,
	fsync: bool,
	timeout: Option<Duration>,
	last_progress_at: Option<Instant>,
}

impl FileWriter {
	pub fn new(transport: Box<dyn Transport>, acker: Box<dyn Acker>, options: &ProtoOptions) -> FileWriter {
		FileWriter {
			transport,
			acker,
			batch: Vec::new(),
			write_offset: 0,
			flush_lines: options.flush_lines.max(1),
			fsync: options.fsync,
			timeout: options.timeout,
			last_progress_at: None,
		}
	}

	pub fn is_drained(&self) -> bool {
		self.batch.is_empty()
	}

	/// Whether the scheduler should reassert writability: a write is
	/// pending and none has completed within `timeout` (§4.8, §5).
	pub fn idle_timeout_elapsed(&self, now: Instant) -> bool {
		let Some(timeout) = self.timeout else {
			return false;
		};
		if self.batch.is_empty() {
			return false;
		}
		match self.last_progress_at {
			Some(last) => now.duration_since(last) >= timeout,
			None => true,
		}
	}

	/// Queues `record`; flushes automatically once `flush_lines` are
	/// buffered. Returns `Partial` immediately, without queueing,
	/// while a previous short write is still unresolved -- the caller
	/// is expected to hold off posting until `flush` drains it.
	pub fn post(&mut self, record: Bytes) -> Result<PostResult, ProtoError> {
		if self.write_offset > 0 {
			return Ok(PostResult::Partial);
		}
		self.batch.push(record);
		if self.batch.len() >= self.flush_lines {
			self.flush()
		} else {
			Ok(PostResult::Success)
		}
	}

	/// Tries to complete any pending partial write, then attempts to
	/// drain up to `flush_lines` (capped by `IOV_MAX`) queued records
	/// in one `writev`.
	pub fn flush(&mut self) -> Result<PostResult, ProtoError> {
		if self.batch.is_empty() {
			return Ok(PostResult::Success);
		}

		let take = self.flush_lines.min(IOV_MAX_FALLBACK).min(self.batch.len());
		let result = {
			let mut iovs: Vec<&[u8]> = Vec::with_capacity(take);
			iovs.push(&self.batch[0][self.write_offset..]);
			for record in &self.batch[1..take] {
				iovs.push(&record[..]);
			}
			self.transport.writev(&iovs)
		};

		match result {
			IoResult::Ok(written) => {
				self.last_progress_at = Some(Instant::now());
				let mut remaining = written;
				let mut fully_written = 0usize;
				for (i, record) in self.batch.iter().take(take).enumerate() {
					let len = if i == 0 { record.len() - self.write_offset } else { record.len() };
					if remaining >= len {
						remaining -= len;
						fully_written += 1;
					} else {
						break;
					}
				}
				self.batch.drain(..fully_written);
				self.write_offset = remaining;

				if fully_written > 0 {
					self.acker.ack(fully_written);
					if self.fsync {
						self.fsync_now()?;
					}
				}
				Ok(if self.write_offset > 0 { PostResult::Partial } else { PostResult::Success })
			},
			IoResult::Again => Ok(PostResult::Partial),
			IoResult::Eof => Err(ProtoError::Eof),
			IoResult::Error(e) => {
				self.acker.rewind();
				self.batch.clear();
				self.write_offset = 0;
				Err(ProtoError::Io(e))
			},
		}
	}

	fn fsync_now(&self) -> Result<(), ProtoError> {
		let rc = unsafe { libc::fsync(self.transport.fd()) };
		if rc != 0 {
			return Err(ProtoError::Io(std::io::Error::last_os_error()));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::os::fd::RawFd;
	use std::sync::{Arc, Mutex};

	use super::*;

	struct CappedTransport {
		wire: Arc<Mutex<Vec<u8>>>,
		cap: usize,
	}

	impl Transport for CappedTransport {
		fn read(&mut self, _buf: &mut [u8]) -> IoResult {
			unimplemented!("write-only in this test")
		}

		fn read_ahead(&mut self, _buf: &mut [u8]) -> IoResult {
			unimplemented!("write-only in this test")
		}

		fn write(&mut self, buf: &[u8]) -> IoResult {
			let n = buf.len().min(self.cap);
			self.wire.lock().unwrap().extend_from_slice(&buf[..n]);
			IoResult::Ok(n)
		}

		fn writev(&mut self, iovs: &[&[u8]]) -> IoResult {
			let mut budget = self.cap;
			let mut total = 0usize;
			let mut wire = self.wire.lock().unwrap();
			for iov in iovs {
				if budget == 0 {
					break;
				}
				let n = iov.len().min(budget);
				wire.extend_from_slice(&iov[..n]);
				total += n;
				budget -= n;
				if n < iov.len() {
					break;
				}
			}
			IoResult::Ok(total)
		}

		fn fd(&self) -> RawFd {
			-1
		}
	}

	#[derive(Default)]
	struct RecordingAckerState {
		acked: Vec<usize>,
		rewound: bool,
	}

	struct RecordingAcker(Arc<Mutex<RecordingAckerState>>);

	impl Acker for RecordingAcker {
		fn ack(&mut self, n: usize) {
			self.0.lock().unwrap().acked.push(n);
		}

		fn rewind(&mut self) {
			self.0.lock().unwrap().rewound = true;
		}
	}

	#[test]
	fn scenario_6_batching_with_partial_writes() {
		let wire = Arc::new(Mutex::new(Vec::new()));
		let transport = Box::new(CappedTransport { wire: wire.clone(), cap: 2 });
		let acker_state = Arc::new(Mutex::new(RecordingAckerState::default()));
		let acker = Box::new(RecordingAcker(acker_state.clone()));
		let options = ProtoOptions { flush_lines: 10, ..Default::default() };
		let mut writer = FileWriter::new(transport, acker, &options);

		let records: Vec<Bytes> = (0..10).map(|i| Bytes::from(vec![b'0' + i as u8; 100])).collect();
		for record in &records {
			writer.post(record.clone()).unwrap();
		}
		while !writer.is_drained() {
			writer.flush().unwrap();
		}

		let acker_state = acker_state.lock().unwrap();
		assert_eq!(acker_state.acked.iter().sum::<usize>(), 10);
		assert!(!acker_state.rewound);

		let expected: Vec<u8> = records.iter().flat_map(|r| r.to_vec()).collect();
		assert_eq!(*wire.lock().unwrap(), expected);
	}

	#[test]
	fn writev_error_rewinds_and_clears_the_batch() {
		struct FailingTransport;
		impl Transport for FailingTransport {
			fn read(&mut self, _buf: &mut [u8]) -> IoResult {
				unimplemented!()
			}

			fn read_ahead(&mut self, _buf: &mut [u8]) -> IoResult {
				unimplemented!()
			}

			fn write(&mut self, _buf: &[u8]) -> IoResult {
				IoResult::Error(std::io::Error::other("disk full"))
			}

			fn fd(&self) -> RawFd {
				-1
			}
		}

		let acker_state = Arc::new(Mutex::new(RecordingAckerState::default()));
		let acker = Box::new(RecordingAcker(acker_state.clone()));
		let options = ProtoOptions { flush_lines: 1, ..Default::default() };
		let mut writer = FileWriter::new(Box::new(FailingTransport), acker, &options);
		let result = writer.post(Bytes::from_static(b"record"));
		assert!(result.is_err());
		assert!(writer.is_drained());
		assert!(acker_state.lock().unwrap().rewound);
	}
}
