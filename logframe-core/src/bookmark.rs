use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error};

/// Opaque, serializable buffer position, enough to resume a source
/// exactly where it left off after a crash, given the same underlying
/// byte stream.
///
/// `raw_stream_pos` is the position of `pending_buffer_pos` in the
/// original (pre-decoding) stream; restoring a bookmark re-seeks the
/// transport to that offset and re-primes the buffer with the
/// persisted window before resuming normal `fetch` calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
	pub raw_stream_pos: u64,
	pub pending_buffer_pos: u32,
	pub pending_buffer_end: u32,
	/// Verbatim snapshot of the buffer window at the time the bookmark
	/// was taken, `[pending_buffer_pos, pending_buffer_end)` relative
	/// to offset zero of this vec -- i.e. index 0 here corresponds to
	/// buffer offset `pending_buffer_pos`.
	#[serde(
		serialize_with = "serialize_buffer_b64",
		deserialize_with = "deserialize_buffer_b64"
	)]
	pub buffer: Vec<u8>,
}

impl Bookmark {
	pub fn serialize_to_string(&self) -> serde_json::Result<String> {
		serde_json::to_string(self)
	}

	pub fn deserialize_from_str(s: &str) -> serde_json::Result<Bookmark> {
		serde_json::from_str(s)
	}
}

/// Bookmarks are persisted as JSON per the on-disk format in the
/// configuration surface; storing the buffer window as base64 keeps
/// the JSON text-safe regardless of the bytes read off the wire.
fn serialize_buffer_b64<S: Serializer>(bytes: &Vec<u8>, s: S) -> Result<S::Ok, S::Error> {
	s.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
}

fn deserialize_buffer_b64<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
	let s = String::deserialize(d)?;
	base64::engine::general_purpose::STANDARD
		.decode(s)
		.map_err(D::Error::custom)
}
