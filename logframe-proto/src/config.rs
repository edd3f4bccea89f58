use std::path::Path;
use std::sync::Arc;

use logframe_core::ConfigError;
use regex::bytes::Regex;

use crate::multiline::{EmptyLineSeparated, Indented, MultiLineLogic, NoMultiLine, RegexMode, RegexMultiLine, RuleTable, Smart};

/// `multi_line.mode` (§6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiLineMode {
	None,
	Indented,
	PrefixGarbage,
	PrefixSuffix,
	EmptyLineSeparated,
	Smart,
}

/// The multi-line-related slice of the configuration surface (§6.3):
/// `multi_line.mode`, the two regex fields it needs in regex-based
/// modes, and the rules file path for `smart`.
#[derive(Debug, Clone, Default)]
pub struct MultiLineConfig {
	pub mode: Option<MultiLineMode>,
	pub prefix_regex: Option<String>,
	pub garbage_regex: Option<String>,
	pub rules_file: Option<std::path::PathBuf>,
}

/// Validates and builds the `MultiLineLogic` named by `multi_line`,
/// enforcing the two init-time-only failure modes in §6.3/§7:
/// `pad_size` and a non-`none` multi-line mode are mutually exclusive,
/// and the regex-based modes require both regex fields set.
pub fn build_multiline_logic(pad_size: usize, multi_line: &MultiLineConfig) -> Result<Box<dyn MultiLineLogic>, ConfigError> {
	let mode = multi_line.mode.clone().unwrap_or(MultiLineMode::None);

	if pad_size != 0 && mode != MultiLineMode::None {
		return Err(ConfigError::PadSizeWithMultiLine);
	}

	match mode {
		MultiLineMode::None => Ok(Box::new(NoMultiLine)),
		MultiLineMode::Indented => Ok(Box::new(Indented)),
		MultiLineMode::EmptyLineSeparated => Ok(Box::new(EmptyLineSeparated)),
		MultiLineMode::PrefixGarbage | MultiLineMode::PrefixSuffix => {
			let prefix_src = multi_line.prefix_regex.as_deref().ok_or(ConfigError::MissingRegex("prefix_regex"))?;
			let garbage_src = multi_line.garbage_regex.as_deref().ok_or(ConfigError::MissingRegex("garbage_regex"))?;
			let prefix = compile(prefix_src)?;
			let garbage = compile(garbage_src)?;
			let regex_mode = if mode == MultiLineMode::PrefixGarbage { RegexMode::PrefixGarbage } else { RegexMode::PrefixSuffix };
			Ok(Box::new(RegexMultiLine::new(prefix, garbage, regex_mode)))
		},
		MultiLineMode::Smart => {
			let path = multi_line.rules_file.as_deref().ok_or(ConfigError::MissingRegex("rules_file"))?;
			Ok(Box::new(Smart::new(Arc::new(load_rule_table(path)?))))
		},
	}
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
	Regex::new(pattern).map_err(|e| ConfigError::InvalidRegex { pattern: pattern.to_string(), reason: e.to_string() })
}

fn load_rule_table(path: &Path) -> Result<RuleTable, ConfigError> {
	let contents = std::fs::read_to_string(path)
		.map_err(|source| ConfigError::RulesFileUnreadable { path: path.display().to_string(), source })?;
	RuleTable::load(&contents, &path.display().to_string())
}
