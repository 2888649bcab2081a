//! System information (firmware, hardware, uptime).

use gatewatch_core::SystemInfo;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::structured::scalar_text;
use super::table::label_pairs;
use super::values::{clean_text, parse_uptime};
use crate::error::ParseError;

/// Where a profile's system information lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum InfoSpec {
    /// `Label | Value` table cells, or `Label: value` text.
    Labels {
        /// Firmware version label.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        firmware: Option<String>,
        /// Hardware version label.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hardware: Option<String>,
        /// Uptime label.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        uptime: Option<String>,
    },
    /// JSON pointers.
    Json {
        /// Firmware version pointer.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        firmware: Option<String>,
        /// Hardware version pointer.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hardware: Option<String>,
        /// Uptime pointer.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        uptime: Option<String>,
    },
}

impl InfoSpec {
    /// Extracts whatever system information the body carries.
    ///
    /// Returns `NoMatch` only when none of the declared fields were found.
    pub fn decode(&self, body: &str) -> Result<SystemInfo, ParseError> {
        let (firmware, hardware, uptime) = match self {
            Self::Labels {
                firmware,
                hardware,
                uptime,
            } => {
                let pairs = label_pairs(body);
                let find = |label: &Option<String>| {
                    label.as_deref().and_then(|l| find_label(&pairs, body, l))
                };
                (find(firmware), find(hardware), find(uptime))
            }
            Self::Json {
                firmware,
                hardware,
                uptime,
            } => {
                let document: Value = serde_json::from_str(body)
                    .map_err(|e| ParseError::NoMatch(format!("body is not JSON: {e}")))?;
                let find = |pointer: &Option<String>| {
                    pointer
                        .as_deref()
                        .and_then(|p| document.pointer(p))
                        .and_then(scalar_text)
                        .map(|s| clean_text(&s))
                        .filter(|s| !s.is_empty())
                };
                (find(firmware), find(hardware), find(uptime))
            }
        };

        let info = SystemInfo {
            firmware_version: firmware,
            hardware_version: hardware,
            uptime: uptime.as_deref().and_then(parse_uptime),
        };

        if info.is_empty() {
            Err(ParseError::NoMatch("no system information found".to_string()))
        } else {
            Ok(info)
        }
    }
}

fn find_label(pairs: &[(String, String)], body: &str, label: &str) -> Option<String> {
    let wanted = label.to_ascii_lowercase();
    let from_cells = pairs
        .iter()
        .find(|(l, _)| l.to_ascii_lowercase().trim_end_matches(':').trim() == wanted)
        .map(|(_, value)| value.clone());

    from_cells.or_else(|| {
        let pattern = format!(r"(?i){}\s*:\s*([^<\r\n]+)", regex::escape(label));
        Regex::new(&pattern)
            .ok()?
            .captures(body)?
            .get(1)
            .map(|m| clean_text(m.as_str()))
    })
    .filter(|v| !v.is_empty())
}
