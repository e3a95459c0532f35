//! Keyword tokens: `term`, `key<op>value`, `!key<op>value`, `sub.key<op>value`.

/// Comparison operators, in the order they are tried. When two operators
/// start at the same index the earlier one here wins, so `<=` is seen before
/// `<`.
const OPERATORS: &[(&str, Op)] = &[
    ("=", Op::Eq),
    ("!=", Op::NotEq),
    (":", Op::Contains),
    ("!:", Op::NotContains),
    ("<=", Op::Le),
    (">=", Op::Ge),
    ("<", Op::Lt),
    (">", Op::Gt),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    NotEq,
    Contains,
    NotContains,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    /// Operators spelled with `=` match whole values.
    pub fn is_exact(&self) -> bool {
        matches!(self, Op::Eq | Op::NotEq | Op::Le | Op::Ge)
    }

    pub fn is_negated(&self) -> bool {
        matches!(self, Op::NotEq | Op::NotContains)
    }

    pub fn is_ordering(&self) -> bool {
        matches!(self, Op::Lt | Op::Le | Op::Gt | Op::Ge)
    }
}

/// Which direct sub-entry a dotted key looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubEntry {
    Named(String),
    /// `(sub)`: any direct sub-entry.
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// A bare term, matched against path and property values.
    Generic,
    Path,
    Name,
    Type,
    Property {
        sub: Option<SubEntry>,
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    pub key: Key,
    pub op: Op,
    pub negate: bool,
    pub value: String,
}

impl Keyword {
    /// Comma separated alternatives. Bare terms are never split.
    pub fn values(&self) -> Vec<&str> {
        match self.key {
            Key::Generic => vec![self.value.as_str()],
            _ => self.value.split(',').collect(),
        }
    }
}

/// Parses one whitespace separated token. Returns `None` for blank tokens
/// and for operators with nothing on their left.
pub fn parse_keyword(token: &str) -> Option<Keyword> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    let found = OPERATORS
        .iter()
        .filter_map(|(text, op)| token.find(text).map(|i| (i, *text, *op)))
        .min_by_key(|(i, _, _)| *i);
    let (idx, text, op) = match found {
        Some(f) => f,
        None => {
            return Some(Keyword {
                key: Key::Generic,
                op: Op::Contains,
                negate: false,
                value: token.to_string(),
            })
        }
    };
    let mut key = &token[..idx];
    let value = &token[idx + text.len()..];
    let mut negate = op.is_negated();
    if let Some(rest) = key.strip_prefix('!') {
        key = rest;
        negate = !negate;
    }
    if key.is_empty() {
        return None;
    }
    let key = match key {
        "path" => Key::Path,
        "name" => Key::Name,
        "type" => Key::Type,
        _ => match key.split_once('.') {
            Some((sub, prop)) if !sub.is_empty() && !prop.is_empty() => Key::Property {
                sub: Some(if sub == "(sub)" {
                    SubEntry::Any
                } else {
                    SubEntry::Named(sub.to_string())
                }),
                name: prop.to_string(),
            },
            _ => Key::Property {
                sub: None,
                name: key.to_string(),
            },
        },
    };
    Some(Keyword {
        key,
        op,
        negate,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(name: &str) -> Key {
        Key::Property {
            sub: None,
            name: name.to_string(),
        }
    }

    #[test]
    fn bare_term() {
        let kw = parse_keyword("comp").unwrap();
        assert_eq!(kw.key, Key::Generic);
        assert_eq!(kw.value, "comp");
        assert!(!kw.negate);
    }

    #[test]
    fn blank_and_keyless_tokens_are_dropped() {
        assert_eq!(parse_keyword("   "), None);
        assert_eq!(parse_keyword(":wip"), None);
        assert_eq!(parse_keyword("=x"), None);
    }

    #[test]
    fn reserved_keys() {
        assert_eq!(parse_keyword("type=shot").unwrap().key, Key::Type);
        assert_eq!(parse_keyword("path:/show").unwrap().key, Key::Path);
        assert_eq!(parse_keyword("name:a00").unwrap().key, Key::Name);
    }

    #[test]
    fn earliest_operator_wins() {
        let kw = parse_keyword("note:a=b").unwrap();
        assert_eq!(kw.key, prop("note"));
        assert_eq!(kw.op, Op::Contains);
        assert_eq!(kw.value, "a=b");

        let kw = parse_keyword("due<=2024/01").unwrap();
        assert_eq!(kw.op, Op::Le);
        assert_eq!(kw.value, "2024/01");

        let kw = parse_keyword("status!=done").unwrap();
        assert_eq!(kw.op, Op::NotEq);
        assert!(kw.negate);
        assert_eq!(kw.value, "done");
    }

    #[test]
    fn bang_prefix_negates() {
        let kw = parse_keyword("!status:wip").unwrap();
        assert_eq!(kw.key, prop("status"));
        assert!(kw.negate);
        assert_eq!(kw.op, Op::Contains);
    }

    #[test]
    fn dotted_keys_select_sub_entries() {
        let kw = parse_keyword("comp.status=wip").unwrap();
        assert_eq!(
            kw.key,
            Key::Property {
                sub: Some(SubEntry::Named("comp".into())),
                name: "status".into()
            }
        );
        let kw = parse_keyword("(sub).status=wip").unwrap();
        assert_eq!(
            kw.key,
            Key::Property {
                sub: Some(SubEntry::Any),
                name: "status".into()
            }
        );
    }

    #[test]
    fn values_split_on_commas() {
        let kw = parse_keyword("status:wip,done").unwrap();
        assert_eq!(kw.values(), vec!["wip", "done"]);
        let kw = parse_keyword("a,b").unwrap();
        assert_eq!(kw.values(), vec!["a,b"]);
    }
}
