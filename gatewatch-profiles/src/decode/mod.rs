//! Shared channel decoding primitives.
//!
//! Three payload shapes cover every supported device:
//!
//! - [`table`] - HTML tables, rows-are-channels or transposed
//! - [`delimited`] - positional fields packed into strings
//! - [`structured`] - JSON arrays of channel objects
//!
//! Each shape implements [`ChannelDecoder`]: it locates raw field values and
//! hands them to [`FieldMap::extract`], which turns them into a
//! [`ChannelRecord`]. The field maps are profile data, so a vendor layout can
//! be corrected without touching code.
//!
//! Decoders hold no state: the same payload always decodes to the same
//! output.

pub mod delimited;
pub mod info;
pub mod structured;
pub mod table;
pub mod values;

use gatewatch_core::{ChannelDirection, ChannelRecord, ChannelTechnology, LockStatus};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ParseError;
use values::{clean_text, parse_channel_id, parse_count, parse_frequency_hz, parse_number};

// ============================================================================
// Decoder Trait
// ============================================================================

/// A layout that can pull one direction's channels out of a body.
pub trait ChannelDecoder {
    /// Decodes channels for one direction.
    ///
    /// Returns `NoMatch` when the expected structure is absent; skipped
    /// records are reported through [`DecodeOutput::errors`].
    fn decode(&self, body: &str, direction: ChannelDirection) -> Result<DecodeOutput, ParseError>;
}

// ============================================================================
// Field Map
// ============================================================================

/// Where each channel field lives in a raw record.
///
/// `K` is a column/field index for positional layouts and a key or row label
/// for structured and transposed ones. Only `channel_id` is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap<K = usize> {
    /// Channel id.
    pub channel_id: K,
    /// Lock status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<K>,
    /// Modulation or channel type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modulation: Option<K>,
    /// Frequency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<K>,
    /// Power level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<K>,
    /// Signal-to-noise ratio (downstream only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snr: Option<K>,
    /// Corrected codewords (downstream only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected: Option<K>,
    /// Uncorrectable codewords (downstream only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncorrected: Option<K>,
}

/// Field map keyed by JSON object key or table row label.
pub type KeyMap = FieldMap<String>;

impl FieldMap<usize> {
    /// Number of fields a positional record must have.
    pub fn min_len(&self) -> usize {
        [
            Some(self.channel_id),
            self.lock,
            self.modulation,
            self.frequency,
            self.power,
            self.snr,
            self.corrected,
            self.uncorrected,
        ]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(0)
            + 1
    }

    /// Extracts a channel from a positional record.
    ///
    /// A record shorter than [`Self::min_len`] is malformed.
    pub fn extract_positional<S: AsRef<str>>(
        &self,
        fields: &[S],
        direction: ChannelDirection,
    ) -> RowOutcome {
        if fields.len() < self.min_len() {
            return RowOutcome::Malformed(format!(
                "record has {} fields, expected at least {}",
                fields.len(),
                self.min_len()
            ));
        }
        self.extract(direction, |i| fields.get(*i).map(|s| s.as_ref().to_string()))
    }
}

impl<K> FieldMap<K> {
    /// Builds a record by looking up each mapped field with `get`.
    ///
    /// Unparseable metrics become `None`; only a missing or invalid channel id
    /// makes the record malformed. Channel id 0 marks an unused slot.
    pub fn extract<F>(&self, direction: ChannelDirection, mut get: F) -> RowOutcome
    where
        F: FnMut(&K) -> Option<String>,
    {
        let Some(raw_id) = get(&self.channel_id) else {
            return RowOutcome::Malformed("missing channel id".to_string());
        };
        let Some(channel_id) = parse_channel_id(&raw_id) else {
            return RowOutcome::Malformed(format!("invalid channel id {:?}", raw_id.trim()));
        };
        if channel_id == 0 {
            return RowOutcome::Placeholder;
        }

        let mut lookup = |key: Option<&K>| key.and_then(&mut get).map(|v| clean_text(&v));

        let mut record = ChannelRecord::new(channel_id, direction);
        record.modulation = lookup(self.modulation.as_ref()).filter(|m| !m.is_empty());
        record.technology = record
            .modulation
            .as_deref()
            .map_or(ChannelTechnology::Unknown, |m| {
                ChannelTechnology::classify(m, direction)
            });
        record.lock = lookup(self.lock.as_ref()).map_or(LockStatus::Unknown, |l| LockStatus::parse(&l));
        record.frequency_hz = lookup(self.frequency.as_ref()).and_then(|f| parse_frequency_hz(&f));
        record.power_dbmv = lookup(self.power.as_ref()).and_then(|p| parse_number(&p));

        if direction == ChannelDirection::Downstream {
            record.snr_db = lookup(self.snr.as_ref()).and_then(|s| parse_number(&s));
            record.corrected = lookup(self.corrected.as_ref()).and_then(|c| parse_count(&c));
            record.uncorrected = lookup(self.uncorrected.as_ref()).and_then(|c| parse_count(&c));
        }

        RowOutcome::Record(record)
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Result of decoding one raw record.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// A usable channel.
    Record(ChannelRecord),
    /// An unused slot the device pads its table with.
    Placeholder,
    /// Too short or unreadable; counted as a decode error.
    Malformed(String),
}

/// Channels decoded from one payload plus the number of skipped records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeOutput {
    /// Decoded channels in payload order.
    pub channels: Vec<ChannelRecord>,
    /// Records skipped as malformed.
    pub errors: usize,
}

impl DecodeOutput {
    /// Creates an empty output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one row outcome.
    ///
    /// A channel id already seen in the same direction counts as an error.
    pub fn push(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Record(record) => {
                let duplicate = self
                    .channels
                    .iter()
                    .any(|c| c.direction == record.direction && c.channel_id == record.channel_id);
                if duplicate {
                    debug!(
                        channel = record.channel_id,
                        direction = %record.direction,
                        "Skipping duplicate channel"
                    );
                    self.errors += 1;
                } else {
                    self.channels.push(record);
                }
            }
            RowOutcome::Placeholder => {}
            RowOutcome::Malformed(reason) => {
                debug!(%reason, "Skipping malformed record");
                self.errors += 1;
            }
        }
    }

    /// Appends another output.
    pub fn extend(&mut self, other: DecodeOutput) {
        self.errors += other.errors;
        for record in other.channels {
            self.push(RowOutcome::Record(record));
        }
    }

    /// Number of channels in a direction.
    pub fn count(&self, direction: ChannelDirection) -> usize {
        self.channels.iter().filter(|c| c.direction == direction).count()
    }

    /// Returns true if nothing was decoded.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Returns the partial-decode error when records were skipped.
    pub fn partial_error(&self) -> Option<ParseError> {
        (self.errors > 0).then(|| ParseError::PartialDecode {
            decoded: self.channels.len(),
            skipped: self.errors,
        })
    }
}

impl FromIterator<RowOutcome> for DecodeOutput {
    fn from_iter<I: IntoIterator<Item = RowOutcome>>(iter: I) -> Self {
        let mut output = Self::new();
        for outcome in iter {
            output.push(outcome);
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn motorola_map() -> FieldMap {
        FieldMap {
            channel_id: 3,
            lock: Some(1),
            modulation: Some(2),
            frequency: Some(4),
            power: Some(5),
            snr: Some(6),
            corrected: Some(7),
            uncorrected: Some(8),
        }
    }

    #[test]
    fn test_min_len() {
        assert_eq!(motorola_map().min_len(), 9);
    }

    #[test]
    fn test_extract_positional_downstream() {
        let fields = ["1", "Locked", "QAM256", "20", "507.0", " 4.5", "40.3", "12", "3"];
        let RowOutcome::Record(record) =
            motorola_map().extract_positional(&fields, ChannelDirection::Downstream)
        else {
            panic!("expected record");
        };
        assert_eq!(record.channel_id, 20);
        assert_eq!(record.technology, ChannelTechnology::ScQam);
        assert_eq!(record.lock, LockStatus::Locked);
        assert_eq!(record.frequency_hz, Some(507_000_000));
        assert_eq!(record.power_dbmv, Some(4.5));
        assert_eq!(record.snr_db, Some(40.3));
        assert_eq!(record.corrected, Some(12));
        assert_eq!(record.uncorrected, Some(3));
    }

    #[test]
    fn test_upstream_ignores_downstream_metrics() {
        let fields = ["1", "Locked", "SC-QAM", "2", "36.2", "44.0", "99", "5", "6"];
        let RowOutcome::Record(record) =
            motorola_map().extract_positional(&fields, ChannelDirection::Upstream)
        else {
            panic!("expected record");
        };
        assert_eq!(record.technology, ChannelTechnology::Atdma);
        assert!(record.snr_db.is_none());
        assert!(record.uncorrected.is_none());
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_short_record_is_malformed() {
        let fields = ["1", "Locked", "QAM256", "20"];
        assert!(matches!(
            motorola_map().extract_positional(&fields, ChannelDirection::Downstream),
            RowOutcome::Malformed(_)
        ));
    }

    #[test]
    fn test_unparseable_metric_becomes_none() {
        let fields = ["1", "Locked", "QAM256", "20", "----", "n/a", "40.3", "0", "0"];
        let RowOutcome::Record(record) =
            motorola_map().extract_positional(&fields, ChannelDirection::Downstream)
        else {
            panic!("expected record");
        };
        assert!(record.frequency_hz.is_none());
        assert!(record.power_dbmv.is_none());
    }

    #[test]
    fn test_zero_channel_id_is_placeholder() {
        let fields = ["1", "Not Locked", "Unknown", "0", "0", "0", "0", "0", "0"];
        assert_eq!(
            motorola_map().extract_positional(&fields, ChannelDirection::Downstream),
            RowOutcome::Placeholder
        );
    }

    #[test]
    fn test_output_counts_duplicates_and_malformed() {
        let mut output = DecodeOutput::new();
        output.push(RowOutcome::Record(ChannelRecord::new(1, ChannelDirection::Downstream)));
        output.push(RowOutcome::Record(ChannelRecord::new(1, ChannelDirection::Upstream)));
        output.push(RowOutcome::Record(ChannelRecord::new(1, ChannelDirection::Downstream)));
        output.push(RowOutcome::Malformed("short".to_string()));
        output.push(RowOutcome::Placeholder);

        assert_eq!(output.channels.len(), 2);
        assert_eq!(output.errors, 2);
        assert_eq!(
            output.partial_error(),
            Some(ParseError::PartialDecode {
                decoded: 2,
                skipped: 2
            })
        );
    }
}
