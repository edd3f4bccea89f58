//! Top-level facade: re-exports the framing/aggregation core together
//! with one concrete [`Transport`] so the crate is directly usable
//! against a TCP stream without pulling in a config parser, a queue,
//! or any of the other driver plumbing the core deliberately doesn't
//! specify.

use std::io::{Read, Write};
use std::os::fd::{AsRawFd, RawFd};

use logframe_core::{IoResult, Transport};
use mio::net::TcpStream;

pub use logframe_core::*;
pub use logframe_proto::*;

/// A non-blocking TCP transport backed by `mio`. `read_ahead` uses
/// `MSG_PEEK` (via `TcpStream::peek`), so repeated peeks return the
/// same prefix without disturbing what a later `read` sees.
pub struct MioTcpTransport {
	stream: TcpStream,
}

impl MioTcpTransport {
	pub fn new(stream: TcpStream) -> MioTcpTransport {
		MioTcpTransport { stream }
	}

	pub fn inner(&self) -> &TcpStream {
		&self.stream
	}
}

impl Transport for MioTcpTransport {
	fn read(&mut self, buf: &mut [u8]) -> IoResult {
		loop {
			match self.stream.read(buf) {
				Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
				res => return IoResult::from_io(res),
			}
		}
	}

	fn read_ahead(&mut self, buf: &mut [u8]) -> IoResult {
		loop {
			match self.stream.peek(buf) {
				Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
				res => return IoResult::from_io(res),
			}
		}
	}

	fn write(&mut self, buf: &[u8]) -> IoResult {
		loop {
			match self.stream.write(buf) {
				Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
				res => return IoResult::from_io(res),
			}
		}
	}

	fn fd(&self) -> RawFd {
		self.stream.as_raw_fd()
	}
}
