use super::ValueContext;
use crate::error::{ForgeError, Result};
use crate::model::AccessorId;
use chrono::{NaiveDate, TimeDelta};
use std::collections::BTreeSet;

pub const DATE_FORMAT: &str = "%Y/%m/%d";

/// Takes a user name, or an already stored user id. Stored as the id.
pub(super) fn user(cx: &ValueContext<'_>, input: &str) -> Result<String> {
    let accessor = cx.accessors.accessor_by_name(input).or_else(|| {
        input
            .parse::<AccessorId>()
            .ok()
            .and_then(|id| cx.accessors.accessor_by_id(id))
    });
    match accessor {
        Some(a) if a.is_group() => Err(ForgeError::invalid(format!("not a user: {} is a group", a.name))),
        Some(a) => Ok(a.id.to_string()),
        None => Err(ForgeError::invalid(format!("unknown user: {}", input))),
    }
}

/// Splits on runs of non-digits.
fn digit_groups(input: &str) -> Vec<&str> {
    input
        .split(|c: char| !c.is_ascii_digit())
        .filter(|g| !g.is_empty())
        .collect()
}

/// Either one block of exactly `total` digits, or one group per field whose
/// length lies in the field's `(min, width)` range, zero padded to `width`.
fn fixed_digits(input: &str, fields: &[(usize, usize)]) -> Option<String> {
    let groups = digit_groups(input);
    let total: usize = fields.iter().map(|(_, w)| w).sum();
    if groups.len() == fields.len()
        && groups
            .iter()
            .zip(fields)
            .all(|(g, (min, w))| g.len() >= *min && g.len() <= *w)
    {
        let mut out = String::with_capacity(total);
        for (g, (_, w)) in groups.iter().zip(fields) {
            out.push_str(&format!("{:0>width$}", g, width = w));
        }
        return Some(out);
    }
    let all: String = groups.concat();
    if all.len() == total {
        Some(all)
    } else {
        None
    }
}

pub(super) fn timecode(input: &str) -> Result<String> {
    let tc = fixed_digits(input, &[(1, 2); 4])
        .ok_or_else(|| ForgeError::invalid(format!("invalid timecode string: {}", input)))?;
    Ok(format!("{}:{}:{}:{}", &tc[0..2], &tc[2..4], &tc[4..6], &tc[6..8]))
}

pub(super) fn date(input: &str, old: Option<&str>) -> Result<String> {
    if let Some(days) = relative_days(input)? {
        let base = old.unwrap_or_default();
        if base.is_empty() {
            return Err(ForgeError::invalid(format!(
                "invalid date operation: {} needs an existing date",
                input
            )));
        }
        let day = NaiveDate::parse_from_str(base, DATE_FORMAT)
            .map_err(|e| ForgeError::invalid(format!("invalid date string {}: {}", base, e)))?;
        let moved = TimeDelta::try_days(days)
            .and_then(|d| day.checked_add_signed(d))
            .ok_or_else(|| ForgeError::invalid(format!("date out of range: {}", input)))?;
        return Ok(moved.format(DATE_FORMAT).to_string());
    }
    let digits = fixed_digits(input, &[(4, 4), (1, 2), (1, 2)])
        .ok_or_else(|| ForgeError::invalid(format!("invalid date string: want yyyy/mm/dd, got {}", input)))?;
    let val = format!("{}/{}/{}", &digits[0..4], &digits[4..6], &digits[6..8]);
    NaiveDate::parse_from_str(&val, DATE_FORMAT)
        .map_err(|e| ForgeError::invalid(format!("invalid date string {}: {}", val, e)))?;
    Ok(val)
}

/// `+N` / `-N` day offsets.
fn relative_days(input: &str) -> Result<Option<i64>> {
    let (sign, rest) = match input.as_bytes().first() {
        Some(b'+') => (1, &input[1..]),
        Some(b'-') => (-1, &input[1..]),
        _ => return Ok(None),
    };
    let n: i64 = rest.trim().parse().map_err(|_| {
        ForgeError::invalid(format!(
            "invalid date operation: +/- needs digits only, got {}",
            rest
        ))
    })?;
    Ok(Some(sign * n))
}

pub(super) fn int(input: &str) -> Result<String> {
    let n: i64 = input
        .parse()
        .map_err(|_| ForgeError::invalid(format!("cannot convert to int: {}", input)))?;
    Ok(n.to_string())
}

pub(super) fn entry_ref(input: &str) -> Result<String> {
    if input == "." {
        return Ok(input.to_string());
    }
    Err(ForgeError::invalid(format!(
        "entry reference only accepts '.' for now, got {}",
        input
    )))
}

pub(super) fn search(input: &str) -> Result<String> {
    let mut lines = Vec::new();
    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() {
            lines.push(String::new());
            continue;
        }
        let (name, query) = line
            .split_once('|')
            .ok_or_else(|| ForgeError::invalid(format!("search should be name|query form: got {}", line)))?;
        let (name, query) = (name.trim(), query.trim());
        if name.is_empty() {
            return Err(ForgeError::invalid(format!("search name shouldn't be empty: got {}", line)));
        }
        if query.is_empty() {
            return Err(ForgeError::invalid(format!("search query shouldn't be empty: got {}", line)));
        }
        lines.push(format!("{}|{}", name, query));
    }
    Ok(lines.join("\n"))
}

/// Tags must not contain characters the search syntax gives meaning to.
pub(super) fn clean_tag(v: &str) -> String {
    v.trim().replace([' ', '+', '-', ','], "_")
}

pub(super) fn clean_link(v: &str) -> String {
    v.trim().to_string()
}

/// Applies `+v` / `-v` lines to the old set. Input without any operator
/// lines replaces the set instead, which is what keeps validation idempotent
/// on the stored form.
pub(super) fn line_set(input: &str, old: Option<&str>, clean: fn(&str) -> String) -> String {
    let lines: Vec<&str> = input.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let is_delta = lines.iter().any(|l| l.starts_with('+') || l.starts_with('-'));

    let mut have: BTreeSet<String> = BTreeSet::new();
    if is_delta {
        if let Some(old) = old {
            have.extend(old.lines().filter(|l| !l.trim().is_empty()).map(str::to_string));
        }
    }
    for line in lines {
        let (remove, raw) = match line.as_bytes()[0] {
            b'+' => (false, &line[1..]),
            b'-' => (true, &line[1..]),
            _ => (false, line),
        };
        let v = clean(raw);
        if v.is_empty() {
            continue;
        }
        if remove {
            have.remove(&v);
        } else {
            have.insert(v);
        }
    }
    if have.is_empty() {
        return String::new();
    }
    let joined: Vec<String> = have.into_iter().collect();
    format!("\n{}\n", joined.join("\n"))
}
