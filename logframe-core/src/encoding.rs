/// The `encoding` configuration option (§6.3). When set to a
/// fixed-width encoding, byte-count <-> char-count conversion for
/// bookmark math is exact and cheap; otherwise callers fall back to a
/// (slower) path that doesn't assume a fixed byte-per-char ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
	Ascii,
	Iso8859,
	Ucs2,
	Ucs4,
	Utf16,
	Utf32,
	WChar,
	/// Anything else: no fast byte<->char conversion is available.
	Other,
}

impl Encoding {
	/// Bytes per character for the fixed-width encodings; `None` means
	/// the slow, encoding-aware path must be used instead.
	pub fn fixed_width(self) -> Option<usize> {
		match self {
			Encoding::Ascii | Encoding::Iso8859 => Some(1),
			Encoding::Ucs2 | Encoding::Utf16 => Some(2),
			Encoding::Ucs4 | Encoding::Utf32 | Encoding::WChar => Some(4),
			Encoding::Other => None,
		}
	}

	/// Converts a byte offset into the corresponding character offset,
	/// when the encoding is fixed-width. Used to translate
	/// `raw_stream_pos` (bytes) into a position meaningful to a
	/// consumer that thinks in characters.
	pub fn byte_offset_to_char_offset(self, byte_offset: u64) -> Option<u64> {
		self.fixed_width()
			.map(|width| byte_offset / width as u64)
	}

	pub fn parse(name: &str) -> Encoding {
		match name.to_ascii_lowercase().as_str() {
			"ascii" => Encoding::Ascii,
			s if s.starts_with("iso-8859") || s.starts_with("iso8859") => Encoding::Iso8859,
			"ucs-2" | "ucs2" => Encoding::Ucs2,
			"ucs-4" | "ucs4" => Encoding::Ucs4,
			"utf-16" | "utf16" => Encoding::Utf16,
			"utf-32" | "utf32" => Encoding::Utf32,
			"wchar_t" => Encoding::WChar,
			_ => Encoding::Other,
		}
	}
}
