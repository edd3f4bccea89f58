use std::time::Duration;

/// What a source wants the scheduler to wait for, read from
/// [`Transport::cond`](crate::transport::Transport::cond) or defaulted
/// to read-readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoCond {
	Read,
	Write,
}

/// What `RecordSource::poll_prepare` tells the scheduler to do before
/// calling `fetch` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareAction {
	/// Wait for the transport's fd to become ready (or for a timer, in
	/// the file-follow case) before calling `fetch` again.
	PollIo,
	/// We already have a cached EOL / a full frame sitting in the
	/// buffer -- call `fetch` again right away, no I/O wait needed.
	ForceScheduleFetch,
	/// Nothing to do; don't reschedule at all (closed source).
	Suspend,
}

/// Strategy for deciding when the scheduler should re-invoke a source.
///
/// This is intentionally a tiny enum rather than a trait object: there
/// are exactly three shapes of "when do we come back", and unlike
/// `Transport` or `MultiLineLogic` there's no meaningful way to add a
/// fourth without also teaching the scheduler about it.
pub enum PollEvents {
	/// Register interest in read or write readiness on a file
	/// descriptor.
	FdEvents { want: IoCond },
	/// No event-driven notification is available (e.g. a regular file
	/// that doesn't support `epoll`): poll `stat()` every `follow_freq`
	/// and synthesize readability when the file has grown, been
	/// truncated, or been replaced.
	FileChanges { follow_freq: Duration },
	/// One-shot source; never re-arm.
	None,
}

impl PollEvents {
	/// What a registration attempt for `FdEvents` should fall back to
	/// when the OS rejects the fd as non-pollable (e.g. a regular
	/// file): `file-changes` at the given frequency, per §4.2.
	pub fn fallback_to_file_changes(follow_freq: Duration) -> PollEvents {
		PollEvents::FileChanges { follow_freq }
	}
}

/// Outcome of a `file-changes` stat poll, compared against the last
/// known read position and inode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeNotice {
	/// Size grew past the last read position: data is available now.
	Grown,
	/// We are exactly at EOF; nothing to do.
	AtEof,
	/// Current read position is past the file size: truncated.
	Truncated,
	/// The path's inode no longer matches ours: renamed or replaced.
	Moved,
}

/// Compares a freshly-`stat`ed file against the last known state and
/// classifies what happened, per `poll_file_changes_check_file` in the
/// source implementation.
pub fn classify_file_change(
	last_read_pos: u64,
	current_size: u64,
	same_inode: bool,
) -> FileChangeNotice {
	if !same_inode {
		return FileChangeNotice::Moved;
	}
	if last_read_pos < current_size {
		FileChangeNotice::Grown
	} else if last_read_pos == current_size {
		FileChangeNotice::AtEof
	} else {
		FileChangeNotice::Truncated
	}
}
