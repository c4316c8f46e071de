//! Line tokenizer (`spec.md` §4.1): splits a raw data line into eight typed
//! fields plus an attribute mapping.

use crate::attrs::{AttrMap, AttrValue};
use crate::config::LineFlag;
use crate::diagnostic::Diagnostic;
use crate::error::TokenError;
use crate::strand::{Phase, Strand};

/// The eight typed columns plus the parsed attribute map of a data line.
#[derive(Debug, Clone)]
pub struct RawFields {
    pub seq_name: String,
    pub source: String,
    pub feature_type: String,
    pub start: u64,
    pub end: u64,
    pub score: String,
    pub strand: Strand,
    pub phase: Phase,
    pub attributes: AttrMap,
}

/// Splits `line` on `sep` and parses it into [`RawFields`].
///
/// Returns `Ok(None)` when the column-count check is configured with the
/// `skip` flag and fails — the builder treats that as a no-op for the line
/// (`spec.md` §4.1). `diagnostics` receives a warning when the `warn` flag
/// fires.
pub fn tokenize(
    line: &str,
    sep: char,
    expect_columns: Option<(usize, LineFlag)>,
    line_no: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Option<RawFields>, TokenError> {
    let actual = line.split(sep).count();
    let (expected, flag) = expect_columns.unwrap_or((9, LineFlag::Warn));

    if actual != expected {
        match flag {
            LineFlag::Ignore => {}
            LineFlag::Warn => {
                let diag = Diagnostic::warning(format!(
                    "line {}: expected {} columns, found {}",
                    line_no, expected, actual
                ))
                .with_line(line_no);
                diag.emit();
                diagnostics.push(diag);
            }
            LineFlag::Die => {
                return Err(TokenError::ColumnCountMismatch(expected, actual, line_no))
            }
            LineFlag::Skip => return Ok(None),
        }
    }

    let parts: Vec<&str> = line.splitn(9, sep).collect();
    if parts.len() < 8 {
        return Err(TokenError::ColumnCountMismatch(8, parts.len(), line_no));
    }

    let start: u64 = parts[3]
        .parse()
        .map_err(|_| TokenError::InvalidCoordinate(line_no, parts[3].to_owned()))?;
    let end: u64 = parts[4]
        .parse()
        .map_err(|_| TokenError::InvalidCoordinate(line_no, parts[4].to_owned()))?;
    if start > end {
        return Err(TokenError::InvalidCoordinate(
            line_no,
            format!("{}..{}", parts[3], parts[4]),
        ));
    }

    let strand_char = parts[6]
        .chars()
        .next()
        .ok_or_else(|| TokenError::InvalidEnumField(line_no, "strand", parts[6].to_owned()))?;
    let strand = Strand::from_char(strand_char)
        .ok_or_else(|| TokenError::InvalidEnumField(line_no, "strand", parts[6].to_owned()))?;

    let phase_char = parts[7]
        .chars()
        .next()
        .ok_or_else(|| TokenError::InvalidEnumField(line_no, "phase", parts[7].to_owned()))?;
    let phase = Phase::from_char(phase_char)
        .ok_or_else(|| TokenError::InvalidEnumField(line_no, "phase", parts[7].to_owned()))?;

    let raw_attrs = parts.get(8).copied().unwrap_or("");
    let attributes = parse_attribute_column(raw_attrs, line_no)?;

    Ok(Some(RawFields {
        seq_name: parts[0].to_owned(),
        source: parts[1].to_owned(),
        feature_type: parts[2].to_owned(),
        start,
        end,
        score: parts[5].to_owned(),
        strand,
        phase,
        attributes,
    }))
}

/// Parses column 9: splits on `;` then on the first `=`, percent-decodes
/// the value, and comma-splits list-valued attributes. Empty values drop
/// their key (`spec.md` §4.1).
pub fn parse_attribute_column(raw: &str, _line_no: usize) -> Result<AttrMap, TokenError> {
    let mut map = AttrMap::new();
    if raw.trim().is_empty() {
        return Ok(map);
    }
    for pair in raw.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let mut kv = pair.splitn(2, '=');
        let key = match kv.next() {
            Some(k) if !k.is_empty() => k.trim(),
            _ => continue,
        };
        let raw_value = kv.next().unwrap_or("").trim();
        let value = percent_decode(raw_value);
        if value.is_empty() {
            continue;
        }
        let _ = map.insert(key.to_owned(), AttrValue::from_raw(&value));
    }
    Ok(map)
}

/// Replaces `%XX` hex escapes with the corresponding byte.
pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 3 <= bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Percent-encodes `=` and `;`, the two characters GFF3 attribute values
/// must escape (`spec.md` §4.7).
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '=' => out.push_str("%3D"),
            ';' => out.push_str("%3B"),
            _ => out.push(c),
        }
    }
    out
}
