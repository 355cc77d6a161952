//! The row codec: the flat wire form of a [`TagMap`].
//!
//! Across the call boundary a tag set travels as a null-terminated array of
//! UTF-8 rows, each row being `key + "\t" + value`. The tab is the key/value
//! separator; a vertical tab (`'\u{0B}'`) is the private separator for
//! multiple sub-values inside one value segment.
//!
//! The two directions use different multi-value conventions:
//!
//! - outbound (read path): a key with N values encodes to N rows sharing
//!   the key, one value per row;
//! - inbound (write path): a row's value segment may carry N sub-values
//!   joined by the private separator, split on ingestion.
//!
//! Decoding is lenient: a row without a tab is skipped, never an error.

use crate::tags::TagMap;

/// Separator between the key and the value segment of a row.
pub const ROW_SEPARATOR: char = '\t';

/// Private separator joining sub-values inside one value segment.
pub const VALUE_SEPARATOR: char = '\u{0B}';

/// Encode a tag map as rows, one per (key, value) pair.
///
/// Row count equals [`TagMap::value_count`], not the key count. Rows come
/// out in sorted key order with value order preserved.
pub fn encode(map: &TagMap) -> Vec<String> {
    let mut rows = Vec::with_capacity(map.value_count());
    for (key, values) in map.iter() {
        for value in values {
            rows.push(format!("{key}{ROW_SEPARATOR}{value}"));
        }
    }
    rows
}

/// Split a row at the FIRST tab into (key, value segment).
///
/// Returns `None` for rows without a tab; callers skip those silently.
/// An empty key is legal and passes through unchanged.
pub fn decode_row(row: &str) -> Option<(&str, &str)> {
    row.split_once(ROW_SEPARATOR)
}

/// Split a value segment on the private separator into its sub-values.
pub fn split_values(segment: &str) -> Vec<String> {
    segment.split(VALUE_SEPARATOR).map(str::to_owned).collect()
}

/// Decode rows back into a tag map, the inverse of [`encode`].
///
/// Values accumulate per key in row order. Sub-values joined by the private
/// separator are split out. Malformed rows (no tab) and rows with an empty
/// value segment are skipped; the empty segment is a deletion signal that
/// only the write-merge path interprets (see [`crate::merge`]).
pub fn decode<'a, I>(rows: I) -> TagMap
where
    I: IntoIterator<Item = &'a str>,
{
    let mut map = TagMap::new();
    for row in rows {
        let Some((key, segment)) = decode_row(row) else {
            continue;
        };
        if segment.is_empty() {
            continue;
        }
        for value in segment.split(VALUE_SEPARATOR) {
            map.push_value(key, value.to_owned());
        }
    }
    map
}
