//! Parser variants.
//!
//! A [`ParserVariant`] is picked once, when a profile is resolved, and reused
//! for every poll. Each variant pairs a downstream layout with an optional
//! upstream one of the same payload shape.

use gatewatch_core::{Capability, CapabilitySet, ChannelDirection};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decode::delimited::DelimitedSection;
use crate::decode::structured::StructuredLayout;
use crate::decode::table::{TableLayout, TransposedLayout};
use crate::decode::{ChannelDecoder, DecodeOutput};
use crate::error::ParseError;

/// How a profile's data page is decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ParserVariant {
    /// Rows-are-channels HTML tables.
    Table {
        /// Downstream table.
        downstream: TableLayout,
        /// Upstream table.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        upstream: Option<TableLayout>,
    },
    /// Rows-are-metrics HTML tables.
    Transposed {
        /// Downstream tables.
        downstream: TransposedLayout,
        /// Upstream tables.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        upstream: Option<TransposedLayout>,
    },
    /// Positional delimited strings.
    Delimited {
        /// Downstream string.
        downstream: DelimitedSection,
        /// Upstream string.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        upstream: Option<DelimitedSection>,
    },
    /// JSON channel arrays.
    Structured {
        /// Downstream array.
        downstream: StructuredLayout,
        /// Upstream array.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        upstream: Option<StructuredLayout>,
    },
    /// No decoding; the page is kept verbatim.
    RawCapture,
}

impl ParserVariant {
    /// Returns the variant name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Table { .. } => "table",
            Self::Transposed { .. } => "transposed",
            Self::Delimited { .. } => "delimited",
            Self::Structured { .. } => "structured",
            Self::RawCapture => "raw_capture",
        }
    }

    /// Returns true for the raw-capture variant.
    pub fn is_raw_capture(&self) -> bool {
        matches!(self, Self::RawCapture)
    }

    /// Channel capabilities this variant can actually deliver.
    pub fn capabilities(&self) -> CapabilitySet {
        let has_upstream = match self {
            Self::Table { upstream, .. } => upstream.is_some(),
            Self::Transposed { upstream, .. } => upstream.is_some(),
            Self::Delimited { upstream, .. } => upstream.is_some(),
            Self::Structured { upstream, .. } => upstream.is_some(),
            Self::RawCapture => return CapabilitySet::default(),
        };

        let mut set = CapabilitySet::from([Capability::DownstreamChannels]);
        if has_upstream {
            set.insert(Capability::UpstreamChannels);
        }
        set
    }

    /// Decodes a data page.
    ///
    /// A missing downstream section is `NoMatch`; a missing upstream section
    /// only means the page carries no upstream channels.
    pub fn decode(&self, body: &str) -> Result<DecodeOutput, ParseError> {
        match self {
            Self::Table { downstream, upstream } => decode_pair(downstream, upstream.as_ref(), body),
            Self::Transposed { downstream, upstream } => {
                decode_pair(downstream, upstream.as_ref(), body)
            }
            Self::Delimited { downstream, upstream } => {
                decode_pair(downstream, upstream.as_ref(), body)
            }
            Self::Structured { downstream, upstream } => {
                decode_pair(downstream, upstream.as_ref(), body)
            }
            Self::RawCapture => Err(ParseError::NoMatch("raw capture does not decode".to_string())),
        }
    }
}

fn decode_pair<D: ChannelDecoder>(
    downstream: &D,
    upstream: Option<&D>,
    body: &str,
) -> Result<DecodeOutput, ParseError> {
    let mut output = downstream.decode(body, ChannelDirection::Downstream)?;

    if let Some(layout) = upstream {
        match layout.decode(body, ChannelDirection::Upstream) {
            Ok(up) => output.extend(up),
            Err(e) => debug!(error = %e, "No upstream channels on page"),
        }
    }

    Ok(output)
}
