//! HTML table decoding.
//!
//! Two layouts exist in the wild:
//!
//! - rows-are-channels ([`TableLayout`]): one `<tr>` per channel, columns
//!   addressed by index
//! - transposed ([`TransposedLayout`]): one `<tr>` per metric, labelled in the
//!   first cell, with one column per channel
//!
//! Modem status pages nest tables freely, so a table is located by a cell
//! starting with its title and only its own rows are read (never those of a
//! nested table).

use gatewatch_core::ChannelDirection;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::values::clean_text;
use super::{ChannelDecoder, DecodeOutput, FieldMap, KeyMap};
use crate::error::ParseError;

static TABLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("Invalid selector"));

static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("Invalid selector"));

// ============================================================================
// Layouts
// ============================================================================

/// Rows-are-channels table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLayout {
    /// Text identifying the table (case-insensitive). Empty selects the
    /// first table.
    pub title: String,
    /// Data rows to skip after title and header rows (header rows some
    /// firmware builds with `<td>`).
    #[serde(default)]
    pub skip_rows: usize,
    /// Column indices.
    pub fields: FieldMap,
}

/// Rows-are-metrics table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransposedLayout {
    /// Titles of the tables to read rows from. The first occurrence of a
    /// label wins.
    pub titles: Vec<String>,
    /// Row labels (case-insensitive prefix of the first cell).
    pub rows: KeyMap,
}

// ============================================================================
// Decoding
// ============================================================================

impl ChannelDecoder for TableLayout {
    fn decode(&self, body: &str, direction: ChannelDirection) -> Result<DecodeOutput, ParseError> {
        let document = Html::parse_document(body);
        let table = find_table(&document, &self.title)
            .ok_or_else(|| ParseError::NoMatch(format!("no table titled {:?}", self.title)))?;

        let title = self.title.to_ascii_lowercase();
        let output = own_rows(table)
            .filter(|row| !is_header_row(row))
            .map(|row| cell_texts(&row))
            .filter(|cells| cells.len() > 1)
            .filter(|cells| title.is_empty() || !cells.iter().any(|c| c.to_ascii_lowercase() == title))
            .skip(self.skip_rows)
            .map(|cells| self.fields.extract_positional(&cells, direction))
            .collect();

        Ok(output)
    }
}

impl ChannelDecoder for TransposedLayout {
    fn decode(&self, body: &str, direction: ChannelDirection) -> Result<DecodeOutput, ParseError> {
        let document = Html::parse_document(body);
        let mut rows: Vec<(String, Vec<String>)> = Vec::new();

        for title in &self.titles {
            let Some(table) = find_table(&document, title) else {
                continue;
            };
            for row in own_rows(table) {
                let mut cells = cell_texts(&row).into_iter();
                let Some(label) = cells.next() else {
                    continue;
                };
                let values: Vec<String> = cells.collect();
                if !values.is_empty() {
                    rows.push((label.to_ascii_lowercase(), values));
                }
            }
        }

        let lookup = |label: &String| {
            let wanted = label.to_ascii_lowercase();
            rows.iter()
                .find(|(l, _)| l.starts_with(&wanted))
                .map(|(_, values)| values)
        };

        let ids = lookup(&self.rows.channel_id).ok_or_else(|| {
            ParseError::NoMatch(format!("no {:?} row in tables {:?}", self.rows.channel_id, self.titles))
        })?;

        let output = (0..ids.len())
            .map(|column| {
                self.rows.extract(direction, |label| {
                    lookup(label).and_then(|values| values.get(column).cloned())
                })
            })
            .collect::<DecodeOutput>();

        Ok(output)
    }
}

/// Collects the label/value pairs of every two-or-more-cell row.
///
/// Used for system info pages laid out as `Label | Value` tables.
pub fn label_pairs(body: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(body);
    document
        .select(&ROW_SELECTOR)
        .filter_map(|row| {
            let cells = cell_texts(&row);
            match cells.as_slice() {
                [label, value, ..] if !label.is_empty() => Some((label.clone(), value.clone())),
                _ => None,
            }
        })
        .collect()
}

// ============================================================================
// Helpers
// ============================================================================

/// Finds the innermost table with a cell starting with `title`.
fn find_table<'a>(document: &'a Html, title: &str) -> Option<ElementRef<'a>> {
    let wanted = title.to_ascii_lowercase();
    let candidates: Vec<ElementRef<'a>> = document
        .select(&TABLE_SELECTOR)
        .filter(|t| {
            wanted.is_empty()
                || own_rows(*t).any(|row| {
                    cells(&row).any(|c| element_text(&c).to_ascii_lowercase().starts_with(&wanted))
                })
        })
        .collect();

    if wanted.is_empty() {
        return candidates.into_iter().next();
    }

    candidates.iter().copied().find(|table| {
        !table
            .select(&TABLE_SELECTOR)
            .any(|inner| inner.id() != table.id() && candidates.iter().any(|c| c.id() == inner.id()))
    })
}

/// Rows whose nearest enclosing table is `table`.
fn own_rows<'a>(table: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let table_id = table.id();
    table.select(&ROW_SELECTOR).filter(move |row| {
        row.ancestors()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "table")
            .is_some_and(|t| t.id() == table_id)
    })
}

/// Direct `td`/`th` children of a row.
fn cells<'a>(row: &ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| matches!(e.value().name(), "td" | "th"))
}

fn cell_texts(row: &ElementRef<'_>) -> Vec<String> {
    cells(row).map(|c| element_text(&c)).collect()
}

fn is_header_row(row: &ElementRef<'_>) -> bool {
    let mut any = false;
    for cell in cells(row) {
        if cell.value().name() != "th" {
            return false;
        }
        any = true;
    }
    any
}

fn element_text(el: &ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatewatch_core::ChannelTechnology;

    const ROWS_TABLE: &str = r#"
        <html><body>
        <table>
          <tr><td>
            <table>
              <tr><th colspan="9">Downstream Bonded Channels</th></tr>
              <tr><td>Channel</td><td>Lock Status</td><td>Modulation</td><td>Channel ID</td>
                  <td>Frequency</td><td>Power</td><td>SNR</td><td>Corrected</td><td>Uncorrectables</td></tr>
              <tr><td>1</td><td>Locked</td><td>QAM256</td><td>5</td><td>591000000 Hz</td>
                  <td>2.1 dBmV</td><td>40.9 dB</td><td>10</td><td>0</td></tr>
              <tr><td>2</td><td>Locked</td><td>QAM256</td><td>6</td><td>597000000 Hz</td>
                  <td>2.0 dBmV</td><td>40.7 dB</td><td>4</td><td>1</td></tr>
              <tr><td>3</td><td>Locked</td><td>QAM256</td></tr>
            </table>
          </td></tr>
        </table>
        </body></html>
    "#;

    fn rows_layout() -> TableLayout {
        TableLayout {
            title: "Downstream Bonded Channels".to_string(),
            skip_rows: 1,
            fields: FieldMap {
                channel_id: 3,
                lock: Some(1),
                modulation: Some(2),
                frequency: Some(4),
                power: Some(5),
                snr: Some(6),
                corrected: Some(7),
                uncorrected: Some(8),
            },
        }
    }

    #[test]
    fn test_rows_table_decodes_inner_table() {
        let output = rows_layout().decode(ROWS_TABLE, ChannelDirection::Downstream).unwrap();
        assert_eq!(output.channels.len(), 2);
        assert_eq!(output.errors, 1);
        assert_eq!(output.channels[0].channel_id, 5);
        assert_eq!(output.channels[0].frequency_hz, Some(591_000_000));
        assert_eq!(output.channels[1].uncorrected, Some(1));
    }

    #[test]
    fn test_missing_table_is_no_match() {
        let err = rows_layout()
            .decode("<html><body><p>Login</p></body></html>", ChannelDirection::Downstream)
            .unwrap_err();
        assert!(matches!(err, ParseError::NoMatch(_)));
    }

    #[test]
    fn test_decoding_is_repeatable() {
        let layout = rows_layout();
        let a = layout.decode(ROWS_TABLE, ChannelDirection::Downstream).unwrap();
        let b = layout.decode(ROWS_TABLE, ChannelDirection::Downstream).unwrap();
        assert_eq!(a, b);
    }

    const TRANSPOSED: &str = r#"
        <table>
          <tr><th colspan="4">Downstream</th></tr>
          <tr><td>Channel ID</td><td>1</td><td>2</td><td>3</td></tr>
          <tr><td>Frequency</td><td>507000000 Hz</td><td>513000000 Hz</td><td>519000000 Hz</td></tr>
          <tr><td>Signal to Noise Ratio</td><td>38 dB</td><td>37 dB</td><td>38 dB</td></tr>
          <tr><td>Downstream Modulation</td><td>QAM256</td><td>QAM256</td><td>QAM256</td></tr>
          <tr><td>Power Level<table><tr><td>The Downstream Power Level reading is a snapshot</td></tr></table></td>
              <td>-1 dBmV</td><td>0 dBmV</td><td>1 dBmV</td></tr>
        </table>
        <table>
          <tr><th colspan="4">Signal Stats (Codewords)</th></tr>
          <tr><td>Channel ID</td><td>1</td><td>2</td><td>3</td></tr>
          <tr><td>Total Correctable Codewords</td><td>15</td><td>0</td><td>2</td></tr>
          <tr><td>Total Uncorrectable Codewords</td><td>7</td><td>0</td><td>0</td></tr>
        </table>
    "#;

    #[test]
    fn test_transposed_table() {
        let layout = TransposedLayout {
            titles: vec!["Downstream".to_string(), "Signal Stats (Codewords)".to_string()],
            rows: KeyMap {
                channel_id: "Channel ID".to_string(),
                lock: None,
                modulation: Some("Downstream Modulation".to_string()),
                frequency: Some("Frequency".to_string()),
                power: Some("Power Level".to_string()),
                snr: Some("Signal to Noise Ratio".to_string()),
                corrected: Some("Total Correctable Codewords".to_string()),
                uncorrected: Some("Total Uncorrectable Codewords".to_string()),
            },
        };

        let output = layout.decode(TRANSPOSED, ChannelDirection::Downstream).unwrap();
        assert_eq!(output.channels.len(), 3);
        assert_eq!(output.errors, 0);
        let first = &output.channels[0];
        assert_eq!(first.frequency_hz, Some(507_000_000));
        assert_eq!(first.power_dbmv, Some(-1.0));
        assert_eq!(first.snr_db, Some(38.0));
        assert_eq!(first.corrected, Some(15));
        assert_eq!(first.uncorrected, Some(7));
        assert_eq!(first.technology, ChannelTechnology::ScQam);
    }

    #[test]
    fn test_label_pairs() {
        let pairs = label_pairs("<table><tr><td>Software Version</td><td>AB01.02</td></tr></table>");
        assert_eq!(pairs, vec![("Software Version".to_string(), "AB01.02".to_string())]);
    }
}
