//! Marker-based fragment extraction.
//!
//! A marker is a literal string optionally split into ordered parts by a
//! wildcard tag. Every part must be found in sequence, each search
//! resuming at the end of the previous match. Naive substring search;
//! no HTML awareness.

use crate::types::ParseError;

/// Split a marker into its literal parts. An empty tag never splits.
fn marker_parts<'a>(marker: &'a str, any_tag: &str) -> Vec<&'a str> {
    if any_tag.is_empty() {
        vec![marker]
    } else {
        marker.split(any_tag).collect()
    }
}

/// Find all parts in order. Returns the offset where the first part
/// starts and the offset just past the last part.
fn find_parts(data: &str, parts: &[&str]) -> Option<(usize, usize)> {
    let mut start = None;
    let mut offset = 0;
    for part in parts {
        let idx = offset + data[offset..].find(part)?;
        start.get_or_insert(idx);
        offset = idx + part.len();
    }
    Some((start.unwrap_or(0), offset))
}

/// Extract the text strictly between the matched `before` marker and the
/// matched `after` marker.
///
/// The `after` marker is searched only in the remainder of `data`
/// following the `before` match.
pub fn extract_value<'a>(
    data: &'a str,
    before: &str,
    after: &str,
    any_tag: &str,
) -> Result<&'a str, ParseError> {
    let (_, begin) = find_parts(data, &marker_parts(before, any_tag))
        .ok_or(ParseError::BeginningNotFound)?;

    let rest = &data[begin..];
    let (end, _) =
        find_parts(rest, &marker_parts(after, any_tag)).ok_or(ParseError::EndingNotFound)?;

    Ok(&rest[..end])
}
