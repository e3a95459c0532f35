//! Compiles parsed keywords into entry predicates.
//!
//! Every keyword becomes one [`Filter`]. A candidate entry is a result only
//! when every filter holds (AND); the comma separated values inside one
//! keyword are alternatives (OR).
//!
//! Property filters look at the entry's *own* property rows, not inherited
//! ones. A dotted key moves the check to a direct sub-entry and selects the
//! parent when any matching sub-entry holds.

use super::parse::{Key, Keyword, Op, SubEntry};
use crate::model::AccessorId;
use crate::paths;
use crate::store::tables::{EntryRow, PropertyRow, Tables};
use crate::types::{AccessorLookup, AttrType};
use chrono::{Local, NaiveDate, TimeDelta};
use glob::Pattern;

const TODAY: &str = "@today";
const CALLER: &str = "@user";
const MAX_DAY_OFFSET: i64 = 10000;

/// Values that are substituted before matching.
pub struct Expander<'a> {
    pub user: &'a str,
    pub today: NaiveDate,
}

impl<'a> Expander<'a> {
    pub fn new(user: &'a str) -> Self {
        Self {
            user,
            today: Local::now().date_naive(),
        }
    }

    pub fn expand(&self, v: &str) -> String {
        if v == CALLER {
            return self.user.to_string();
        }
        let Some(suffix) = v.strip_prefix(TODAY) else {
            return v.to_string();
        };
        let day = if suffix.is_empty() {
            Some(self.today)
        } else {
            let (sign, n) = if let Some(n) = suffix.strip_prefix('+') {
                (1, n)
            } else if let Some(n) = suffix.strip_prefix('-') {
                (-1, n)
            } else {
                return v.to_string();
            };
            let Ok(n) = n.parse::<i64>() else {
                return v.to_string();
            };
            TimeDelta::try_days(sign * n.min(MAX_DAY_OFFSET))
                .and_then(|d| self.today.checked_add_signed(d))
        };
        match day {
            Some(d) => d.format(crate::types::DATE_FORMAT).to_string(),
            None => v.to_string(),
        }
    }
}

/// A string matcher built from a search value.
#[derive(Debug, Clone)]
pub enum TextMatch {
    Exact(String),
    Glob(Pattern),
    /// Fallback for values that are not a valid glob.
    Contains(String),
}

impl TextMatch {
    /// `*v*` as a glob.
    pub fn contains(v: &str) -> Self {
        Self::glob_or(&format!("*{}*", v), || TextMatch::Contains(v.to_string()))
    }

    /// `v` itself as a glob.
    pub fn glob(v: &str) -> Self {
        Self::glob_or(v, || TextMatch::Exact(v.to_string()))
    }

    fn glob_or(pattern: &str, fallback: impl FnOnce() -> TextMatch) -> Self {
        match Pattern::new(pattern) {
            Ok(p) => TextMatch::Glob(p),
            Err(_) => fallback(),
        }
    }

    pub fn for_op(op: Op, v: &str) -> Self {
        if op.is_exact() {
            TextMatch::Exact(v.to_string())
        } else {
            TextMatch::contains(v)
        }
    }

    pub fn is_match(&self, s: &str) -> bool {
        match self {
            TextMatch::Exact(v) => s == v,
            TextMatch::Glob(p) => p.matches(s),
            TextMatch::Contains(v) => s.contains(v.as_str()),
        }
    }
}

/// One comma separated alternative of a property keyword.
#[derive(Debug, Clone)]
pub enum ValueTest {
    Match { exact: bool, text: String, m: TextMatch },
    Order { op: Op, bound: String },
}

#[derive(Debug, Clone)]
pub enum Filter {
    /// Bare term: path glob, or any non-hidden property value.
    Generic { path: TextMatch, value: TextMatch },
    Path { negate: bool, any: Vec<TextMatch> },
    Name { negate: bool, any: Vec<TextMatch> },
    Type { negate: bool, any: Vec<String> },
    Property {
        sub: Option<SubEntry>,
        name: String,
        negate: bool,
        any: Vec<ValueTest>,
    },
}

/// Builds the filter for one keyword. `root` is the search root path.
pub fn compile(kw: &Keyword, root: &str, ex: &Expander<'_>) -> Filter {
    match &kw.key {
        Key::Generic => {
            let raw = ex.expand(&kw.value);
            let path = if raw.starts_with('/') {
                TextMatch::glob(&format!("{}*", raw))
            } else {
                let prefix = if root == paths::ROOT { "" } else { root };
                TextMatch::glob(&format!("{}*{}*", prefix, raw))
            };
            Filter::Generic {
                path,
                value: TextMatch::contains(&raw),
            }
        }
        Key::Path => Filter::Path {
            negate: kw.negate,
            any: non_empty(kw)
                .map(|v| TextMatch::for_op(kw.op, &ex.expand(v)))
                .collect(),
        },
        Key::Name => Filter::Name {
            negate: kw.negate,
            any: non_empty(kw)
                .map(|v| {
                    let v = ex.expand(v);
                    if kw.op.is_exact() {
                        TextMatch::glob(&v)
                    } else {
                        TextMatch::contains(&v)
                    }
                })
                .collect(),
        },
        Key::Type => Filter::Type {
            negate: kw.negate,
            any: non_empty(kw).map(|v| ex.expand(v)).collect(),
        },
        Key::Property { sub, name } => Filter::Property {
            sub: sub.clone(),
            name: name.clone(),
            negate: kw.negate,
            any: kw
                .values()
                .into_iter()
                .map(|v| {
                    let v = ex.expand(v);
                    if kw.op.is_ordering() {
                        ValueTest::Order {
                            op: kw.op,
                            bound: v,
                        }
                    } else {
                        ValueTest::Match {
                            exact: kw.op.is_exact(),
                            m: TextMatch::for_op(kw.op, &v),
                            text: v,
                        }
                    }
                })
                .collect(),
        },
    }
}

/// Reserved keys with an empty value put no restriction on the query.
fn non_empty<'k>(kw: &'k Keyword) -> impl Iterator<Item = &'k str> {
    let empty = kw.value.is_empty();
    kw.values().into_iter().filter(move |_| !empty)
}

impl Filter {
    pub fn matches(&self, tables: &Tables, entry: &EntryRow) -> bool {
        match self {
            Filter::Generic { path, value } => {
                path.is_match(&entry.path)
                    || tables
                        .properties_of(entry.id)
                        .filter(|(name, _)| !name.starts_with('.'))
                        .any(|(_, row)| generic_value_matches(tables, row, value))
            }
            Filter::Path { negate, any } => {
                any.is_empty() || any.iter().any(|m| m.is_match(&entry.path)) != *negate
            }
            Filter::Name { negate, any } => {
                let name = paths::base_name(&entry.path);
                any.is_empty() || any.iter().any(|m| m.is_match(name)) != *negate
            }
            Filter::Type { negate, any } => {
                any.is_empty() || any.iter().any(|t| *t == entry.type_name) != *negate
            }
            Filter::Property {
                sub,
                name,
                negate,
                any,
            } => match sub {
                None => own_property_matches(tables, entry, name, *negate, any),
                Some(sub) => tables.children(entry.id).iter().any(|child| {
                    let Some(child) = tables.entry(*child) else {
                        return false;
                    };
                    let selected = match sub {
                        SubEntry::Any => true,
                        SubEntry::Named(n) => paths::base_name(&child.path) == n,
                    };
                    selected && own_property_matches(tables, child, name, *negate, any)
                }),
            },
        }
    }
}

/// The entry must hold the property itself, negated or not.
fn own_property_matches(
    tables: &Tables,
    entry: &EntryRow,
    name: &str,
    negate: bool,
    any: &[ValueTest],
) -> bool {
    match tables.property(entry.id, name) {
        Some(row) => any.iter().any(|t| value_matches(tables, row, t)) != negate,
        None => false,
    }
}

fn user_of<'t>(tables: &'t Tables, stored: &str) -> Option<&'t crate::model::Accessor> {
    stored
        .parse::<AccessorId>()
        .ok()
        .and_then(|id| tables.accessor_by_id(id))
}

fn generic_value_matches(tables: &Tables, row: &PropertyRow, m: &TextMatch) -> bool {
    match row.type_name {
        AttrType::User => user_of(tables, &row.value)
            .is_some_and(|a| m.is_match(&a.called) || m.is_match(&a.name)),
        _ => m.is_match(&row.value),
    }
}

fn value_matches(tables: &Tables, row: &PropertyRow, test: &ValueTest) -> bool {
    let (exact, text, m) = match test {
        ValueTest::Order { op, bound } => return ordered(row, *op, bound),
        ValueTest::Match { exact, text, m } => (*exact, text.as_str(), m),
    };
    match row.type_name {
        AttrType::Tag | AttrType::EntryLink => {
            if !exact {
                m.is_match(&row.value)
            } else if text.is_empty() {
                row.value.is_empty()
            } else {
                row.value.lines().any(|l| l == text)
            }
        }
        AttrType::User => match user_of(tables, &row.value) {
            _ if text.is_empty() && !exact => true,
            None => text.is_empty(),
            Some(a) => !text.is_empty() && (m.is_match(&a.called) || m.is_match(&a.name)),
        },
        _ => m.is_match(&row.value),
    }
}

/// `<`, `<=`, `>`, `>=`. Dates compare as `yyyy/mm/dd` strings after padding
/// a partial bound, ints numerically, anything else as plain strings. Unset
/// values never match.
fn ordered(row: &PropertyRow, op: Op, bound: &str) -> bool {
    if row.value.is_empty() {
        return false;
    }
    let ord = match row.type_name {
        AttrType::Date => {
            let rest = if matches!(op, Op::Gt | Op::Le) {
                "9999/99/99"
            } else {
                "0000/00/00"
            };
            let mut padded = bound.to_string();
            if padded.len() < rest.len() {
                padded.push_str(rest.get(padded.len()..).unwrap_or_default());
            }
            row.value.as_str().cmp(padded.as_str())
        }
        AttrType::Int => match (row.value.parse::<i64>(), bound.parse::<i64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            _ => return false,
        },
        _ => row.value.as_str().cmp(bound),
    };
    match op {
        Op::Lt => ord.is_lt(),
        Op::Le => ord.is_le(),
        Op::Gt => ord.is_gt(),
        Op::Ge => ord.is_ge(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::parse::parse_keyword;

    fn expander() -> Expander<'static> {
        Expander {
            user: "kim",
            today: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    #[test]
    fn today_expansion() {
        let ex = expander();
        assert_eq!(ex.expand("@today"), "2024/03/01");
        assert_eq!(ex.expand("@today+1"), "2024/03/02");
        assert_eq!(ex.expand("@today-1"), "2024/02/29");
        assert_eq!(ex.expand("@todayx"), "@todayx");
        assert_eq!(ex.expand("@user"), "kim");
        assert_eq!(ex.expand("wip"), "wip");
    }

    #[test]
    fn today_offset_is_capped() {
        let ex = expander();
        assert_eq!(ex.expand("@today+99999999"), ex.expand("@today+10000"));
    }

    #[test]
    fn invalid_glob_falls_back_to_substring() {
        let m = TextMatch::contains("[oops");
        assert!(m.is_match("an [oops here"));
        assert!(!m.is_match("fine"));
    }

    #[test]
    fn glob_is_case_sensitive_and_crosses_slashes() {
        let m = TextMatch::glob("/show*a001*");
        assert!(m.is_match("/show/s01/a001"));
        assert!(!m.is_match("/SHOW/s01/a001"));
    }

    fn date_row(v: &str) -> PropertyRow {
        PropertyRow {
            type_name: AttrType::Date,
            value: v.to_string(),
            inherit: false,
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn partial_dates_are_padded() {
        let row = date_row("2024/03/15");
        assert!(ordered(&row, Op::Le, "2024/03"));
        assert!(ordered(&row, Op::Ge, "2024/03"));
        assert!(!ordered(&row, Op::Gt, "2024/03"));
        assert!(!ordered(&row, Op::Lt, "2024/03"));
        assert!(ordered(&row, Op::Gt, "2024/02"));
        assert!(!ordered(&date_row(""), Op::Lt, "9999"));
    }

    #[test]
    fn compile_property_keyword() {
        let kw = parse_keyword("status:wip,done").unwrap();
        match compile(&kw, "/", &expander()) {
            Filter::Property { name, any, negate, .. } => {
                assert_eq!(name, "status");
                assert_eq!(any.len(), 2);
                assert!(!negate);
            }
            other => panic!("unexpected filter {:?}", other),
        }
    }
}
