use super::validate::DATE_FORMAT;
use super::ValueContext;
use crate::error::{ForgeError, Result};
use crate::paths;
use chrono::NaiveDate;

// Stored values should already be valid. These checks catch rows written by
// hand or by an older format.

pub(super) fn user(cx: &ValueContext<'_>, stored: &str) -> Result<String> {
    let id: u64 = stored
        .parse()
        .map_err(|_| ForgeError::invalid(format!("invalid value for user: {}", stored)))?;
    let accessor = cx
        .accessors
        .accessor_by_id(id)
        .ok_or_else(|| ForgeError::not_found(format!("accessor {}", id)))?;
    Ok(accessor.display_name().to_string())
}

pub(super) fn timecode(stored: &str) -> Result<String> {
    let bytes = stored.as_bytes();
    let ok = bytes.len() == 11
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| if i % 3 == 2 { *b == b':' } else { b.is_ascii_digit() });
    if !ok {
        return Err(ForgeError::invalid(format!("invalid value for timecode: {}", stored)));
    }
    Ok(stored.to_string())
}

pub(super) fn date(stored: &str) -> Result<String> {
    NaiveDate::parse_from_str(stored, DATE_FORMAT)
        .map_err(|_| ForgeError::invalid(format!("invalid value for date: {}", stored)))?;
    Ok(stored.to_string())
}

pub(super) fn int(stored: &str) -> Result<String> {
    stored
        .parse::<i64>()
        .map_err(|_| ForgeError::invalid(format!("invalid value for int: {}", stored)))?;
    Ok(stored.to_string())
}

pub(super) fn entry_path(cx: &ValueContext<'_>, stored: &str) -> Result<String> {
    Ok(paths::join(cx.entry_path, stored))
}

pub(super) fn entry_name(cx: &ValueContext<'_>, stored: &str) -> Result<String> {
    let path = paths::join(cx.entry_path, stored);
    Ok(paths::base_name(&path).to_string())
}

pub(super) fn line_set(stored: &str) -> String {
    stored.trim_matches('\n').to_string()
}
