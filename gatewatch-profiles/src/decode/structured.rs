//! JSON arrays of channel objects.

use gatewatch_core::ChannelDirection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ChannelDecoder, DecodeOutput, KeyMap, RowOutcome};
use crate::error::ParseError;

/// Layout of a JSON channel array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredLayout {
    /// JSON pointer to the array (`/Freq_List`).
    pub pointer: String,
    /// Object keys for each field.
    pub keys: KeyMap,
}

impl ChannelDecoder for StructuredLayout {
    fn decode(&self, body: &str, direction: ChannelDirection) -> Result<DecodeOutput, ParseError> {
        let document: Value = serde_json::from_str(body)
            .map_err(|e| ParseError::NoMatch(format!("body is not JSON: {e}")))?;
        let entries = document
            .pointer(&self.pointer)
            .and_then(Value::as_array)
            .ok_or_else(|| ParseError::NoMatch(format!("no array at {}", self.pointer)))?;

        let output = entries
            .iter()
            .map(|entry| match entry.as_object() {
                Some(object) => self
                    .keys
                    .extract(direction, |key| object.get(key.as_str()).and_then(scalar_text)),
                None => RowOutcome::Malformed("channel entry is not an object".to_string()),
            })
            .collect();

        Ok(output)
    }
}

/// Renders a string or number as text.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hitron_layout() -> StructuredLayout {
        StructuredLayout {
            pointer: "/Freq_List".to_string(),
            keys: KeyMap {
                channel_id: "channelId".to_string(),
                lock: None,
                modulation: Some("modulation".to_string()),
                frequency: Some("frequency".to_string()),
                power: Some("signalStrength".to_string()),
                snr: Some("snr".to_string()),
                corrected: Some("correcteds".to_string()),
                uncorrected: Some("uncorrect".to_string()),
            },
        }
    }

    #[test]
    fn test_decode_strings_and_numbers() {
        let body = r#"{"Freq_List":[
            {"channelId":"11","frequency":"579000000","modulation":"QAM256","signalStrength":"3.700","snr":"40.946","correcteds":"12","uncorrect":"0"},
            {"channelId":12,"frequency":585000000,"signalStrength":3.5,"snr":40.1,"correcteds":0,"uncorrect":2}
        ]}"#;
        let output = hitron_layout().decode(body, ChannelDirection::Downstream).unwrap();
        assert_eq!(output.channels.len(), 2);
        assert_eq!(output.channels[0].frequency_hz, Some(579_000_000));
        assert_eq!(output.channels[0].snr_db, Some(40.946));
        assert_eq!(output.channels[1].channel_id, 12);
        assert_eq!(output.channels[1].uncorrected, Some(2));
    }

    #[test]
    fn test_non_object_entry_is_counted() {
        let body = r#"{"Freq_List":[{"channelId":"1"}, 5, {"frequency":"1"}]}"#;
        let output = hitron_layout().decode(body, ChannelDirection::Downstream).unwrap();
        assert_eq!(output.channels.len(), 1);
        assert_eq!(output.errors, 2);
    }

    #[test]
    fn test_missing_array_is_no_match() {
        let err = hitron_layout()
            .decode(r#"{"error":"login"}"#, ChannelDirection::Downstream)
            .unwrap_err();
        assert!(matches!(err, ParseError::NoMatch(_)));
    }
}
