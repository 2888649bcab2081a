//! Built-in device profiles, grouped by vendor.
//!
//! Field layouts here were taken from captured pages and are not verified
//! against every firmware build. They are plain profile data: a user profile
//! with the same id replaces the built-in one.

pub mod arris;
pub mod generic;
pub mod hitron;
pub mod motorola;
pub mod netgear;
pub mod technicolor;
pub mod ubee;

use crate::decode::FieldMap;
use crate::decode::delimited::{DelimitedLayout, DelimitedSection, PayloadSource, RecordSplit};

/// HNAP batch results nest under this key.
const HNAP_MULTIPLE_RESPONSE: &str = "GetMultipleHNAPsResponse";

/// JSON pointer to a field of one action inside a `GetMultipleHNAPs` response.
pub(crate) fn hnap_pointer(action: &str, field: &str) -> String {
    format!("/{HNAP_MULTIPLE_RESPONSE}/{action}Response/{field}")
}

/// `^`-separated fields, `|+|`-separated records, inside an HNAP response.
pub(crate) fn hnap_section(action: &str, field: &str, fields: FieldMap) -> DelimitedSection {
    DelimitedSection {
        source: PayloadSource::Json {
            pointer: hnap_pointer(action, field),
        },
        layout: DelimitedLayout {
            field_separator: "^".to_string(),
            records: RecordSplit::Separator {
                separator: "|+|".to_string(),
            },
            fields,
        },
    }
}

/// Count-prefixed `|`-separated records in a script variable.
pub(crate) fn script_section(function: &str, fields_per_record: usize, fields: FieldMap) -> DelimitedSection {
    DelimitedSection {
        source: PayloadSource::Script {
            function: Some(function.to_string()),
            variable: "tagValueList".to_string(),
        },
        layout: DelimitedLayout {
            field_separator: "|".to_string(),
            records: RecordSplit::Counted { fields_per_record },
            fields,
        },
    }
}

/// The common `index, lock, modulation, id, frequency, power, snr,
/// corrected, uncorrected` downstream record.
pub(crate) fn indexed_downstream_fields() -> FieldMap {
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

/// The common `index, lock, type, id, symbol rate, frequency, power`
/// upstream record.
pub(crate) fn indexed_upstream_fields() -> FieldMap {
    FieldMap {
        channel_id: 3,
        lock: Some(1),
        modulation: Some(2),
        frequency: Some(5),
        power: Some(6),
        ..FieldMap::default()
    }
}

pub(crate) fn key(label: &str) -> Option<String> {
    Some(label.to_string())
}
