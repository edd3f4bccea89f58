use regex::bytes::Regex;

use super::{MultiLineLogic, Verdict};

/// Where the configured `drop_length` is measured from (§4.5.3 vs
/// §4.5.4): the start of the garbage match (garbage itself is
/// dropped), or its end (a matched suffix is kept in the record).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexMode {
	PrefixGarbage,
	PrefixSuffix,
}

/// §4.5.3 / §4.5.4: a *prefix* regex marks where a new record starts;
/// a *garbage* regex marks trailing text to strip (or, in suffix
/// mode, trailing text to keep) before handing the record over.
pub struct RegexMultiLine {
	prefix: Regex,
	garbage: Regex,
	mode: RegexMode,
}

impl RegexMultiLine {
	pub fn new(prefix: Regex, garbage: Regex, mode: RegexMode) -> RegexMultiLine {
		RegexMultiLine { prefix, garbage, mode }
	}
}

impl MultiLineLogic for RegexMultiLine {
	fn accumulate(&mut self, prefix: &[u8], segment: &[u8]) -> Verdict {
		if let Some(m) = self.garbage.find(segment) {
			let drop_length = match self.mode {
				RegexMode::PrefixGarbage => segment.len() - m.start(),
				RegexMode::PrefixSuffix => segment.len() - m.end(),
			};
			return Verdict::extracted_consume(drop_length as u32);
		}
		if prefix.is_empty() {
			return Verdict::waiting_consume();
		}
		if self.prefix.is_match(segment) {
			return Verdict::extracted_rewind();
		}
		Verdict::waiting_consume()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::multiline::{Readiness, SegmentDisposition};

	fn policy(mode: RegexMode) -> RegexMultiLine {
		RegexMultiLine::new(
			Regex::new(r"^\d{4}-").unwrap(),
			Regex::new(r" END_OF_RECORD").unwrap(),
			mode,
		)
	}

	#[test]
	fn garbage_match_extracts_with_drop_length_from_match_start() {
		let mut logic = policy(RegexMode::PrefixGarbage);
		let segment = b"2024-01-01 10:00 msg1 END_OF_RECORD";
		let v = logic.accumulate(b"", segment);
		assert_eq!(v.readiness(), Readiness::Extracted);
		assert_eq!(v.drop_length() as usize, segment.len() - 22);
	}

	#[test]
	fn prefix_suffix_mode_measures_drop_length_from_match_end() {
		let mut logic = policy(RegexMode::PrefixSuffix);
		let segment = b"2024-01-01 10:00 msg1 END_OF_RECORD trailer";
		let v = logic.accumulate(b"", segment);
		let match_end = 22 + " END_OF_RECORD".len();
		assert_eq!(v.drop_length() as usize, segment.len() - match_end);
	}

	#[test]
	fn prefix_regex_on_continuation_ends_record_via_rewind() {
		let mut logic = policy(RegexMode::PrefixGarbage);
		let v = logic.accumulate(b"2024-01-01 10:00 msg1", b"2024-01-01 10:01 msg2");
		assert_eq!(v.readiness(), Readiness::Extracted);
		assert_eq!(v.disposition(), SegmentDisposition::Rewind);
	}

	#[test]
	fn no_match_waits() {
		let mut logic = policy(RegexMode::PrefixGarbage);
		let v = logic.accumulate(b"2024-01-01 10:00 msg1", b"continuation text");
		assert_eq!(v, Verdict::waiting_consume());
	}
}
