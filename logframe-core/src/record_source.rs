use bytes::Bytes;

use crate::bookmark::Bookmark;
use crate::error::ProtoError;
use crate::poll::PrepareAction;

/// Outcome of a single [`RecordSource::fetch`] call (§6.1). `Error` is
/// not a variant here: fetch returns `Result`, and the `Err` side
/// carries the same information `ProtoError` already models (`Eof` is
/// the one exception -- it's common enough that callers want to match
/// on it without going through an error path).
#[derive(Debug)]
pub enum FetchResult {
	Record { data: Bytes, bookmark: Bookmark },
	WouldBlock,
	Eof,
}

/// The consumer-facing interface every protocol (`TextServer`,
/// `FramedServer`, `AutoServer`) implements. A scheduler drives many
/// sources from one loop by alternating `poll_prepare` (decide what to
/// wait for) and `fetch` (try to make progress) -- see §5.
pub trait RecordSource: Send {
	/// What the scheduler should do before calling `fetch` again.
	fn poll_prepare(&mut self) -> PrepareAction;

	/// Attempt to produce one record. The returned `Bytes` borrows
	/// nothing from `self` -- to keep the trait object-safe and avoid
	/// tying the record's lifetime to the `&mut self` call, it is an
	/// owned copy out of the internal buffer (see `Buffer::to_bytes`).
	fn fetch(&mut self) -> Result<FetchResult, ProtoError>;

	/// Re-seeks the underlying transport (when supported) and
	/// re-primes the internal buffer from a previously persisted
	/// bookmark, per §3.
	fn restore(&mut self, bookmark: &Bookmark) -> Result<(), ProtoError>;

	/// Asynchronous close (§5 Cancellation): unregister poll interest,
	/// discard any buffered partial record, and flush the bookmark.
	fn close(&mut self);
}
