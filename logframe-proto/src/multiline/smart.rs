use std::collections::HashMap;
use std::sync::Mutex;

use logframe_core::ConfigError;
use regex::bytes::Regex;

use super::{MultiLineLogic, Verdict};

/// `start_state` is always the first state name encountered while
/// loading the rules file (§4.5.6).
pub const START_STATE: u32 = 1;

/// "An implementation limit of ~64 states is fine." Not a hard error,
/// just a sanity bound we warn past.
const SOFT_STATE_LIMIT: usize = 64;

/// An immutable, `Arc`-shared table of FSM transitions, loaded once
/// from a TSV rules file and handed to every `Smart` instance that
/// uses it (§5, §6.4).
pub struct RuleTable {
	/// Indexed by state id; `rules_by_state[0]` is unused since state
	/// ids start at 1.
	rules_by_state: Vec<Vec<(Regex, u32)>>,
}

impl RuleTable {
	/// Parses the TSV format from §6.4: `#`-prefixed and empty lines
	/// are skipped; every other line must have exactly three
	/// tab-separated fields (`from_states`, `/regex/`, `to_state`) or
	/// it is warned about and skipped. `source_path` is used only to
	/// label the `EmptyRuleTable` error.
	pub fn load(contents: &str, source_path: &str) -> Result<RuleTable, ConfigError> {
		let mut state_ids: HashMap<String, u32> = HashMap::new();
		let mut rules_by_state: Vec<Vec<(Regex, u32)>> = vec![Vec::new(), Vec::new()];

		fn id_for(name: &str, state_ids: &mut HashMap<String, u32>, rules_by_state: &mut Vec<Vec<(Regex, u32)>>) -> u32 {
			if let Some(&id) = state_ids.get(name) {
				return id;
			}
			let id = (state_ids.len() + 1) as u32;
			state_ids.insert(name.to_string(), id);
			while rules_by_state.len() <= id as usize {
				rules_by_state.push(Vec::new());
			}
			id
		}

		for (lineno, raw_line) in contents.lines().enumerate() {
			let line = raw_line.trim();
			if line.is_empty() || line.starts_with('#') {
				continue;
			}
			let fields: Vec<&str> = raw_line.split('\t').collect();
			if fields.len() != 3 {
				tracing::warn!(line = lineno + 1, "smart multi-line rule: expected 3 tab-separated fields, skipping");
				continue;
			}
			let Some(pattern) = strip_delimiters(fields[1]) else {
				tracing::warn!(line = lineno + 1, "smart multi-line rule: regex field has mismatched delimiters, skipping");
				continue;
			};
			let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidRegex {
				pattern: pattern.to_string(),
				reason: e.to_string(),
			})?;
			let to_state = id_for(fields[2].trim(), &mut state_ids, &mut rules_by_state);
			for from_name in fields[0].split(',').map(str::trim).filter(|s| !s.is_empty()) {
				let from_state = id_for(from_name, &mut state_ids, &mut rules_by_state);
				rules_by_state[from_state as usize].push((regex.clone(), to_state));
			}
		}

		if state_ids.is_empty() {
			return Err(ConfigError::EmptyRuleTable { path: source_path.to_string() });
		}
		if state_ids.len() > SOFT_STATE_LIMIT {
			tracing::warn!(count = state_ids.len(), limit = SOFT_STATE_LIMIT, "smart multi-line rule table exceeds the recommended state count");
		}

		Ok(RuleTable { rules_by_state })
	}

	fn step(&self, from: u32, segment: &[u8]) -> Option<u32> {
		self
			.rules_by_state
			.get(from as usize)?
			.iter()
			.find_map(|(re, to)| re.is_match(segment).then_some(*to))
	}
}

/// Strips matching outer delimiters from a regex field (typically
/// `/.../`); the delimiter is whatever character opens the field.
fn strip_delimiters(field: &str) -> Option<&str> {
	let delim = field.chars().next()?;
	field.strip_prefix(delim).and_then(|s| s.strip_suffix(delim))
}

#[derive(Debug, Default)]
struct SmartState {
	current_state: u32,
	last_segment_rewound: bool,
	rewound_segment_is_trace: bool,
	consumed_message_is_trace: bool,
}

/// §4.5.6: a table-driven FSM that recognises multi-line constructs
/// (stack traces) spanning many physical lines. Guarded by a mutex
/// per §5: state is per-instance, but an operator may in principle
/// drive one logic object from several sources.
pub struct Smart {
	table: std::sync::Arc<RuleTable>,
	state: Mutex<SmartState>,
}

impl Smart {
	pub fn new(table: std::sync::Arc<RuleTable>) -> Smart {
		Smart {
			table,
			state: Mutex::new(SmartState {
				current_state: START_STATE,
				..Default::default()
			}),
		}
	}
}

impl MultiLineLogic for Smart {
	fn accumulate(&mut self, prefix: &[u8], segment: &[u8]) -> Verdict {
		let mut state = self.state.lock().unwrap();

		if state.last_segment_rewound {
			state.last_segment_rewound = false;
			return if state.rewound_segment_is_trace {
				state.consumed_message_is_trace = true;
				Verdict::waiting_consume()
			} else {
				state.consumed_message_is_trace = false;
				Verdict::extracted_consume(0)
			};
		}

		let prefix_empty = prefix.is_empty();
		let consumed_is_trace = state.consumed_message_is_trace;

		let segment_is_trace;
		let mut segment_starts_a_new_trace = false;
		let mut segment_ends_trace = false;

		if let Some(to) = self.table.step(state.current_state, segment) {
			segment_ends_trace = to == START_STATE;
			state.current_state = to;
			segment_is_trace = true;
		} else {
			state.current_state = START_STATE;
			if let Some(to) = self.table.step(START_STATE, segment) {
				state.current_state = to;
				segment_is_trace = true;
				segment_starts_a_new_trace = true;
				segment_ends_trace = to == START_STATE;
			} else {
				segment_is_trace = false;
			}
		}

		match (prefix_empty, consumed_is_trace, segment_is_trace, segment_starts_a_new_trace, segment_ends_trace) {
			(true, _, false, _, _) => Verdict::extracted_consume(0),
			(true, _, true, _, _) => {
				state.consumed_message_is_trace = true;
				Verdict::waiting_consume()
			},
			(false, true, true, true, _) => {
				state.last_segment_rewound = true;
				state.rewound_segment_is_trace = true;
				Verdict::extracted_rewind()
			},
			(false, true, true, false, true) => Verdict::extracted_consume(0),
			(false, true, true, false, false) => Verdict::waiting_consume(),
			(false, true, false, _, _) => {
				state.last_segment_rewound = true;
				state.rewound_segment_is_trace = false;
				state.consumed_message_is_trace = false;
				Verdict::extracted_rewind()
			},
			(false, false, _, _, _) => {
				unreachable!("a non-empty prefix is only ever accumulated while consumed_message_is_trace is set")
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::multiline::{Readiness, SegmentDisposition};

	fn java_trace_rules() -> RuleTable {
		RuleTable::load(
			"START\t/^\\S.*Exception.*/\tTRACE\n\
			 TRACE\t/^\\s+at\\s.*/\tTRACE\n",
			"<test>",
		)
		.unwrap()
	}

	#[test]
	fn plain_line_extracts_immediately() {
		let table = std::sync::Arc::new(java_trace_rules());
		let mut logic = Smart::new(table);
		let v = logic.accumulate(b"", b"unrelated");
		assert_eq!(v.readiness(), Readiness::Extracted);
	}

	#[test]
	fn exception_header_waits_then_continuation_lines_wait_then_next_line_rewinds() {
		let table = std::sync::Arc::new(java_trace_rules());
		let mut logic = Smart::new(table);

		let v1 = logic.accumulate(b"", b"java.lang.RuntimeException: boom");
		assert_eq!(v1.readiness(), Readiness::Waiting);

		let v2 = logic.accumulate(b"java.lang.RuntimeException: boom", b"  at com.x.Y.m(Y.java:1)");
		assert_eq!(v2.readiness(), Readiness::Waiting);

		let v3 = logic.accumulate(
			b"java.lang.RuntimeException: boom\n  at com.x.Y.m(Y.java:1)",
			b"  at com.x.Y.n(Y.java:2)",
		);
		assert_eq!(v3.readiness(), Readiness::Waiting);

		let prefix = b"java.lang.RuntimeException: boom\n  at com.x.Y.m(Y.java:1)\n  at com.x.Y.n(Y.java:2)";
		let v4 = logic.accumulate(prefix, b"next-line");
		assert_eq!(v4.readiness(), Readiness::Extracted);
		assert_eq!(v4.disposition(), SegmentDisposition::Rewind);

		let v5 = logic.accumulate(b"", b"next-line");
		assert_eq!(v5.readiness(), Readiness::Extracted);
		assert_eq!(v5.disposition(), SegmentDisposition::Consume);
	}

	#[test]
	fn malformed_lines_are_skipped_not_fatal() {
		let table = RuleTable::load("# comment\n\nSTART\tbadregexnodeliimiters\tTRACE\nSTART\t/^x/\tTRACE\n", "<test>").unwrap();
		assert!(table.step(START_STATE, b"x").is_some());
	}
}
