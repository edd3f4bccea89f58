use logframe_core::{Bookmark, FetchResult, IoResult, PrepareAction, ProtoError, ProtoOptions, RecordSource, Transport};

use crate::framed::FramedServer;
use crate::multiline::NoMultiLine;
use crate::text::TextServer;

/// §4.7: peeks the first non-empty byte of a stream to decide between
/// [`TextServer`] and [`FramedServer`], then dissolves into whichever
/// it picked. Modeled as an enum rather than a `Box<dyn RecordSource>`
/// swap so the "peeking" and "decided" states are distinguished by the
/// type system instead of an `Option`.
pub enum AutoServer {
	Peeking { transport: Option<Box<dyn Transport>>, options: ProtoOptions },
	Decided(Box<dyn RecordSource>),
}

impl AutoServer {
	pub fn new(transport: Box<dyn Transport>, options: ProtoOptions) -> AutoServer {
		AutoServer::Peeking { transport: Some(transport), options }
	}

	/// Peeks without consuming; installs the concrete protocol the
	/// first time a non-empty peek succeeds.
	fn resolve(&mut self) -> Result<(), ProtoError> {
		let AutoServer::Peeking { transport, options } = self else {
			return Ok(());
		};
		let mut peek = [0u8; 1];
		let mut owned_transport = transport.take().expect("transport only taken once, on a successful resolve");
		match owned_transport.read_ahead(&mut peek) {
			IoResult::Ok(1) => {
				let installed: Box<dyn RecordSource> = if peek[0].is_ascii_digit() {
					Box::new(FramedServer::new(owned_transport, &*options))
				} else {
					// `<` (classic RFC3164/5424 priority prefix) and
					// every other byte both resolve to TextServer
					// (§4.7): the leading `<` carries no special
					// handling here, it's just ordinary text framing.
					Box::new(TextServer::new(owned_transport, Box::new(NoMultiLine), &*options))
				};
				*self = AutoServer::Decided(installed);
				Ok(())
			},
			IoResult::Ok(_) | IoResult::Again => {
				// Nothing to peek yet; put the transport back for the
				// next call to resolve().
				*transport = Some(owned_transport);
				Ok(())
			},
			IoResult::Eof => {
				let installed = Box::new(TextServer::new(owned_transport, Box::new(NoMultiLine), &*options));
				*self = AutoServer::Decided(installed);
				Ok(())
			},
			IoResult::Error(e) => Err(ProtoError::Io(e)),
		}
	}
}

impl RecordSource for AutoServer {
	fn poll_prepare(&mut self) -> PrepareAction {
		match self {
			AutoServer::Peeking { .. } => PrepareAction::PollIo,
			AutoServer::Decided(inner) => inner.poll_prepare(),
		}
	}

	fn fetch(&mut self) -> Result<FetchResult, ProtoError> {
		self.resolve()?;
		match self {
			AutoServer::Peeking { .. } => Ok(FetchResult::WouldBlock),
			AutoServer::Decided(inner) => inner.fetch(),
		}
	}

	fn restore(&mut self, bookmark: &Bookmark) -> Result<(), ProtoError> {
		self.resolve()?;
		match self {
			AutoServer::Peeking { .. } => Err(ProtoError::Protocol {
				offset: bookmark.raw_stream_pos,
				reason: "cannot restore a bookmark before a protocol has been detected".to_string(),
			}),
			AutoServer::Decided(inner) => inner.restore(bookmark),
		}
	}

	fn close(&mut self) {
		if let AutoServer::Decided(inner) = self {
			inner.close();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::text::tests_support::SliceTransport;

	#[test]
	fn digit_prefix_installs_framed_server() {
		let transport = Box::new(SliceTransport::new(b"5 hello"));
		let mut server = AutoServer::new(transport, ProtoOptions::default());
		let FetchResult::Record { data, .. } = server.fetch().unwrap() else { panic!("expected a record") };
		assert_eq!(&data[..], b"hello");
		assert!(matches!(server, AutoServer::Decided(_)));
	}

	#[test]
	fn non_digit_prefix_installs_text_server() {
		let transport = Box::new(SliceTransport::new(b"<13>hello world\n"));
		let options = ProtoOptions { exit_on_eof: true, ..Default::default() };
		let mut server = AutoServer::new(transport, options);
		let FetchResult::Record { data, .. } = server.fetch().unwrap() else { panic!("expected a record") };
		assert_eq!(&data[..], b"<13>hello world");
	}
}
