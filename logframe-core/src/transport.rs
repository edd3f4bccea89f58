use std::io;
use std::os::fd::RawFd;

use crate::poll::IoCond;

/// Outcome of a single non-blocking `read`/`write`/`writev` attempt.
///
/// This is the synchronous analogue of `Poll<io::Result<usize>>`: a
/// source drives many transports from one thread, one event loop
/// iteration at a time, so a transport reports `Again` rather than
/// parking a task. `n == 0` from a successful read always means EOF,
/// never "nothing available" -- that case is `Again`.
#[derive(Debug)]
pub enum IoResult {
	Ok(usize),
	Eof,
	Again,
	Error(io::Error),
}

impl IoResult {
	pub fn is_again(&self) -> bool {
		matches!(self, IoResult::Again)
	}

	/// Maps the common `std::io` non-blocking result shape onto
	/// [`IoResult`], retrying transparently on `EINTR`-equivalents is
	/// the caller's job (see [`Transport::read`] implementations).
	pub fn from_io(res: io::Result<usize>) -> Self {
		match res {
			Ok(0) => IoResult::Eof,
			Ok(n) => IoResult::Ok(n),
			Err(e) if e.kind() == io::ErrorKind::WouldBlock => IoResult::Again,
			Err(e) if e.kind() == io::ErrorKind::Interrupted => IoResult::Again,
			Err(e) => IoResult::Error(e),
		}
	}
}

/// A byte source/sink behind a single interface, covering every
/// transport a source can be bound to: a TCP-like stream, a datagram
/// socket, a named pipe, a regular file being followed, or a char
/// device. Every method is non-blocking: a call that cannot make
/// progress right now returns [`IoResult::Again`] rather than parking
/// the calling thread, so a single-threaded event loop can multiplex
/// many transports.
pub trait Transport: Send {
	/// Read up to `buf.len()` bytes, consuming them.
	fn read(&mut self, buf: &mut [u8]) -> IoResult;

	/// Peek up to `buf.len()` bytes without consuming them. Calling
	/// this repeatedly with the same or a growing buffer must return
	/// the same prefix -- [`crate::poll`]'s auto-detection relies on
	/// that to look at the first few bytes before committing to a
	/// protocol.
	fn read_ahead(&mut self, buf: &mut [u8]) -> IoResult;

	fn write(&mut self, buf: &[u8]) -> IoResult;

	/// Scatter-gather write. Transports that can't do vectored I/O
	/// fall back to writing each slice in turn and stop at the first
	/// short write, so callers see it as a single `IoResult` the same
	/// way a real `writev(2)` would report a short write.
	fn writev(&mut self, iovs: &[&[u8]]) -> IoResult {
		let mut total = 0usize;
		for iov in iovs {
			match self.write(&iov[..]) {
				IoResult::Ok(n) => {
					total += n;
					if n < iov.len() {
						return IoResult::Ok(total);
					}
				},
				IoResult::Again if total > 0 => return IoResult::Ok(total),
				other => return if total > 0 { IoResult::Ok(total) } else { other },
			}
		}
		IoResult::Ok(total)
	}

	/// The underlying file descriptor, for registering with a reactor.
	fn fd(&self) -> RawFd;

	/// The I/O condition the scheduler should currently wait for.
	/// `None` means "no outstanding interest", leaving the caller to
	/// default to read-readiness.
	fn cond(&self) -> Option<IoCond> {
		None
	}

	/// Whether a single `read` call is expected to return at most one
	/// complete record (e.g. `/proc/kmsg`-style devices). `TextServer`
	/// uses this to avoid accumulating a device read across calls.
	fn one_message_per_read(&self) -> bool {
		false
	}
}
