use super::{MultiLineLogic, Verdict};

/// §4.5.2: a line starting with SPACE or TAB continues the previous
/// record; a record only ends once the *next* non-indented line
/// arrives, so the first line of every record is always accumulated
/// -- there is nothing yet to compare it against.
#[derive(Debug, Default, Clone, Copy)]
pub struct Indented;

impl MultiLineLogic for Indented {
	fn accumulate(&mut self, prefix: &[u8], segment: &[u8]) -> Verdict {
		if prefix.is_empty() {
			return Verdict::waiting_consume();
		}
		let continues = matches!(segment.first(), Some(b' ') | Some(b'\t'));
		if continues {
			Verdict::waiting_consume()
		} else {
			Verdict::extracted_rewind()
		}
	}
}

#[cfg(test)]
mod tests {
	use test_case::test_case;

	use super::*;
	use crate::multiline::{Readiness, SegmentDisposition};

	#[test_case(b' ', Readiness::Waiting, SegmentDisposition::Consume ; "leading space continues")]
	#[test_case(b'\t', Readiness::Waiting, SegmentDisposition::Consume ; "leading tab continues")]
	#[test_case(b'A', Readiness::Extracted, SegmentDisposition::Rewind ; "non-indented byte ends the record")]
	fn continuation_is_decided_by_the_first_byte(first: u8, readiness: Readiness, disposition: SegmentDisposition) {
		let mut logic = Indented;
		let segment = [first, b'x'];
		let v = logic.accumulate(b"A", &segment);
		assert_eq!(v.readiness(), readiness);
		assert_eq!(v.disposition(), disposition);
	}

	#[test]
	fn first_line_of_a_record_always_accumulates() {
		let mut logic = Indented;
		let v = logic.accumulate(b"", b"A");
		assert_eq!(v, Verdict::waiting_consume());
	}

	#[test]
	fn continuation_line_waits() {
		let mut logic = Indented;
		let v = logic.accumulate(b"A", b"  more");
		assert_eq!(v.readiness(), Readiness::Waiting);
		assert_eq!(v.disposition(), SegmentDisposition::Consume);
	}

	#[test]
	fn non_indented_line_after_a_prefix_ends_the_record() {
		let mut logic = Indented;
		let v = logic.accumulate(b"A\n B\n C", b"D");
		assert_eq!(v.readiness(), Readiness::Extracted);
		assert_eq!(v.disposition(), SegmentDisposition::Rewind);
	}
}
