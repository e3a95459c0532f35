//! Output formatting.
//!
//! Each printer takes API results as they are. With `--json` the value is
//! serialized as-is with `serde_json`; otherwise it becomes one line per item
//! so the output greps well.

use super::styles;
use forgeapp::model::{AccessRule, Accessor, Entry, Environ, LogRecord, Member, Property, UserSetting};
use serde::Serialize;
use serde_json::json;

pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn emit<T: Serialize + ?Sized>(&self, value: &T, plain: impl FnOnce(&T)) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            plain(value);
        }
        Ok(())
    }

    pub fn message(&self, text: &str) -> anyhow::Result<()> {
        self.emit(&json!({ "ok": true, "message": text }), |_| {
            println!("{}", styles::success().apply_to(text));
        })
    }

    pub fn count(&self, path: &str, count: usize) -> anyhow::Result<()> {
        self.emit(&json!({ "path": path, "count": count }), |_| println!("{}", count))
    }

    pub fn entry(&self, entry: &Entry) -> anyhow::Result<()> {
        self.emit(entry, |e| {
            println!("{}", entry_line(e));
            for prop in e.properties.values() {
                println!("  {}", property_line(prop, &e.path));
            }
        })
    }

    pub fn entries(&self, entries: &[Entry]) -> anyhow::Result<()> {
        self.emit(entries, |list| {
            for e in list {
                println!("{}", entry_line(e));
            }
        })
    }

    pub fn properties(&self, path: &str, props: &[Property]) -> anyhow::Result<()> {
        self.emit(props, |list| {
            for p in list {
                println!("{}", property_line(p, path));
            }
        })
    }

    pub fn property(&self, prop: &Property) -> anyhow::Result<()> {
        self.emit(prop, |p| println!("{}", property_line(p, &p.entry_path)))
    }

    pub fn environs(&self, path: &str, envs: &[Environ]) -> anyhow::Result<()> {
        self.emit(envs, |list| {
            for e in list {
                println!("{}", environ_line(e, path));
            }
        })
    }

    pub fn environ(&self, env: &Environ) -> anyhow::Result<()> {
        self.emit(env, |e| println!("{}", environ_line(e, &e.entry_path)))
    }

    pub fn access_rules(&self, path: &str, rules: &[AccessRule]) -> anyhow::Result<()> {
        self.emit(rules, |list| {
            for r in list {
                println!("{}", access_line(r, path));
            }
        })
    }

    pub fn access_rule(&self, rule: &AccessRule) -> anyhow::Result<()> {
        self.emit(rule, |r| println!("{}", access_line(r, &r.entry_path)))
    }

    pub fn accessors(&self, accessors: &[Accessor]) -> anyhow::Result<()> {
        self.emit(accessors, |list| {
            for a in list {
                println!("{}", accessor_line(a));
            }
        })
    }

    pub fn accessor(&self, accessor: &Accessor) -> anyhow::Result<()> {
        self.emit(accessor, |a| println!("{}", accessor_line(a)))
    }

    pub fn members(&self, members: &[Member]) -> anyhow::Result<()> {
        self.emit(members, |list| {
            for m in list {
                println!("{}", m.member);
            }
        })
    }

    pub fn logs(&self, logs: &[LogRecord]) -> anyhow::Result<()> {
        self.emit(logs, |list| {
            for l in list {
                let what = if l.name.is_empty() {
                    l.category.to_string()
                } else {
                    format!("{} {}", l.category, l.name)
                };
                println!(
                    "{}  {}  {} {} {}",
                    styles::muted().apply_to(l.when.format("%Y-%m-%d %H:%M:%S")),
                    l.user,
                    l.action,
                    what,
                    l.value
                );
            }
        })
    }

    pub fn setting(&self, user: &str, setting: &UserSetting) -> anyhow::Result<()> {
        self.emit(setting, |s| println!("{}: show_archived={}", user, s.show_archived))
    }
}

fn entry_line(e: &Entry) -> String {
    let mut line = format!("{}  {}", styles::path().apply_to(&e.path), e.type_name);
    if e.archived {
        line.push_str(&format!("  {}", styles::archived().apply_to("[archived]")));
    }
    line
}

/// Values declared on another entry carry their origin.
fn origin(entry_path: &str, seen_from: &str) -> String {
    if entry_path == seen_from {
        String::new()
    } else {
        format!("  {}", styles::muted().apply_to(format!("(from {})", entry_path)))
    }
}

fn property_line(p: &Property, seen_from: &str) -> String {
    let flag = if p.inherit { "*" } else { "" };
    format!(
        "{}{} ({}) = {}{}",
        styles::name().apply_to(&p.name),
        flag,
        p.type_name,
        p.value.replace('\n', " "),
        origin(&p.entry_path, seen_from)
    )
}

fn environ_line(e: &Environ, seen_from: &str) -> String {
    format!(
        "{}={}{}",
        styles::name().apply_to(&e.name),
        e.value,
        origin(&e.entry_path, seen_from)
    )
}

fn access_line(r: &AccessRule, seen_from: &str) -> String {
    format!(
        "{} {} {}{}",
        r.accessor_kind,
        styles::name().apply_to(&r.accessor),
        r.permission,
        origin(&r.entry_path, seen_from)
    )
}

fn accessor_line(a: &Accessor) -> String {
    format!("{}  {}", styles::name().apply_to(&a.name), a.display_name())
}
