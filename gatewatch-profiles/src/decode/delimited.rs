//! Positional delimited payloads.
//!
//! Some firmware packs the channel table into a string instead of markup:
//!
//! ```text
//! 1^Locked^QAM256^20^507.0^ 4.5^40.3^12^3^|+|2^Locked^QAM256^21^513.0^ 4.3^40.1^0^0^
//! '8|1|Locked|QAM256|1|483000000 Hz|7.1|40.3|0|0|2|Locked|...'
//! ```
//!
//! The first form splits records on a separator string; the second prefixes a
//! record count and relies on a fixed number of fields per record. The
//! string itself comes from a JSON value, a script variable or the raw body
//! (see [`PayloadSource`]).

use gatewatch_core::ChannelDirection;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{ChannelDecoder, DecodeOutput, FieldMap, RowOutcome};
use crate::error::ParseError;

/// Upper bound on a declared record count.
const MAX_RECORDS: usize = 256;

/// Upper bound on the fields of one counted record.
pub const MAX_FIELDS_PER_RECORD: usize = 64;

// ============================================================================
// Layout
// ============================================================================

/// How records are told apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "split", rename_all = "snake_case")]
pub enum RecordSplit {
    /// Records joined by a separator string (`|+|`).
    Separator {
        /// Record separator.
        separator: String,
    },
    /// A leading record count, then fixed-width records.
    Counted {
        /// Fields in each record.
        fields_per_record: usize,
    },
}

/// Layout of one delimited channel string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelimitedLayout {
    /// Field separator (`^`, `|`).
    pub field_separator: String,
    /// Record splitting rule.
    pub records: RecordSplit,
    /// Field indices within a record.
    pub fields: FieldMap,
}

impl DelimitedLayout {
    /// Checks separators and record width.
    pub fn check(&self) -> Result<(), String> {
        if self.field_separator.is_empty() {
            return Err("empty field separator".to_string());
        }
        match &self.records {
            RecordSplit::Separator { separator } if separator.is_empty() => {
                Err("empty record separator".to_string())
            }
            RecordSplit::Counted { fields_per_record } if *fields_per_record == 0 => {
                Err("record width is zero".to_string())
            }
            RecordSplit::Counted { fields_per_record } if *fields_per_record > MAX_FIELDS_PER_RECORD => {
                Err(format!("implausible record width {fields_per_record}"))
            }
            _ => Ok(()),
        }
    }

    /// Decodes a payload string.
    ///
    /// A blank payload is zero records, not an error. Each short or
    /// unreadable record is skipped and counted.
    pub fn decode(&self, payload: &str, direction: ChannelDirection) -> Result<DecodeOutput, ParseError> {
        let payload = payload.trim();
        if payload.is_empty() {
            return Ok(DecodeOutput::new());
        }

        match &self.records {
            RecordSplit::Separator { separator } => Ok(payload
                .split(separator.as_str())
                .map(str::trim)
                .filter(|record| !record.is_empty())
                .map(|record| {
                    let fields: Vec<&str> = record.split(self.field_separator.as_str()).collect();
                    self.fields.extract_positional(&fields, direction)
                })
                .collect()),
            RecordSplit::Counted { fields_per_record } => {
                self.decode_counted(payload, *fields_per_record, direction)
            }
        }
    }

    fn decode_counted(
        &self,
        payload: &str,
        width: usize,
        direction: ChannelDirection,
    ) -> Result<DecodeOutput, ParseError> {
        if width == 0 {
            return Err(ParseError::NoMatch("record width is zero".to_string()));
        }

        let mut tokens = payload
            .trim_end_matches(self.field_separator.as_str())
            .split(self.field_separator.as_str());
        let count_raw = tokens.next().unwrap_or_default().trim();
        let count: usize = count_raw
            .parse()
            .map_err(|_| ParseError::NoMatch(format!("invalid record count {count_raw:?}")))?;
        if count > MAX_RECORDS {
            return Err(ParseError::NoMatch(format!("implausible record count {count}")));
        }

        let tokens: Vec<&str> = tokens.collect();
        let output = (0..count)
            .map(|i| {
                let start = match i.checked_mul(width) {
                    Some(start) if start < tokens.len() => start,
                    _ => return RowOutcome::Malformed(format!("record {} missing", i + 1)),
                };
                let end = start.saturating_add(width).min(tokens.len());
                self.fields.extract_positional(&tokens[start..end], direction)
            })
            .collect();

        Ok(output)
    }
}

// ============================================================================
// Payload Source
// ============================================================================

/// Where the delimited string lives in a fetched body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum PayloadSource {
    /// A string value in a JSON document, addressed by JSON pointer.
    Json {
        /// JSON pointer (`/GetMultipleHNAPsResponse/...`).
        pointer: String,
    },
    /// A quoted string assigned to a script variable.
    Script {
        /// Only search after `function <name>` when set.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        function: Option<String>,
        /// Variable name.
        variable: String,
    },
    /// The whole body.
    Body,
}

impl PayloadSource {
    /// Extracts the payload string.
    pub fn extract(&self, body: &str) -> Result<String, ParseError> {
        match self {
            Self::Json { pointer } => {
                let value: serde_json::Value = serde_json::from_str(body)
                    .map_err(|e| ParseError::NoMatch(format!("body is not JSON: {e}")))?;
                match value.pointer(pointer) {
                    Some(serde_json::Value::String(s)) => Ok(s.clone()),
                    Some(_) => Err(ParseError::NoMatch(format!("{pointer} is not a string"))),
                    None => Err(ParseError::NoMatch(format!("{pointer} not found"))),
                }
            }
            Self::Script { function, variable } => {
                let scope = match function {
                    Some(name) => {
                        let marker = format!("function {name}");
                        let start = body.find(&marker).ok_or_else(|| {
                            ParseError::NoMatch(format!("script function {name} not found"))
                        })?;
                        &body[start..]
                    }
                    None => body,
                };
                let pattern = format!(r#"{}\s*=\s*['"]([^'"]*)['"]"#, regex::escape(variable));
                let re = Regex::new(&pattern)
                    .map_err(|e| ParseError::NoMatch(format!("bad variable pattern: {e}")))?;
                re.captures(scope)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
                    .ok_or_else(|| ParseError::NoMatch(format!("script variable {variable} not found")))
            }
            Self::Body => Ok(body.to_string()),
        }
    }
}

/// A payload source paired with its layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelimitedSection {
    /// Where to find the string.
    pub source: PayloadSource,
    /// How to split it.
    pub layout: DelimitedLayout,
}

impl ChannelDecoder for DelimitedSection {
    fn decode(&self, body: &str, direction: ChannelDirection) -> Result<DecodeOutput, ParseError> {
        let payload = self.source.extract(body)?;
        self.layout.decode(&payload, direction)
    }
}
