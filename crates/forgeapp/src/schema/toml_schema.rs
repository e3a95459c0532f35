use super::{Declaration, SchemaProvider};
use crate::error::{ForgeError, Result};
use crate::model::{Permission, ROOT_TYPE};
use crate::types::AttrType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SubEntryDecl {
    name: String,
    #[serde(rename = "type")]
    entry_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AttrDecl {
    name: String,
    #[serde(rename = "type")]
    type_name: AttrType,
    #[serde(default)]
    value: String,
    #[serde(default)]
    inherit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AccessDecl {
    name: String,
    value: Permission,
}

/// Definition of a single entry type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeDef {
    sub_entry_types: Vec<String>,
    sub_entries: Vec<SubEntryDecl>,
    properties: Vec<AttrDecl>,
    environs: Vec<AttrDecl>,
    access: Vec<AccessDecl>,
    globals: BTreeMap<String, String>,
}

impl TypeDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sub_entry_type(mut self, entry_type: &str) -> Self {
        self.sub_entry_types.push(entry_type.to_string());
        self
    }

    pub fn sub_entry(mut self, name: &str, entry_type: &str) -> Self {
        self.sub_entries.push(SubEntryDecl {
            name: name.to_string(),
            entry_type: entry_type.to_string(),
        });
        self
    }

    pub fn property(mut self, name: &str, type_name: AttrType, value: &str, inherit: bool) -> Self {
        self.properties.push(AttrDecl {
            name: name.to_string(),
            type_name,
            value: value.to_string(),
            inherit,
        });
        self
    }

    pub fn environ(mut self, name: &str, type_name: AttrType, value: &str) -> Self {
        self.environs.push(AttrDecl {
            name: name.to_string(),
            type_name,
            value: value.to_string(),
            inherit: true,
        });
        self
    }

    pub fn access(mut self, name: &str, permission: Permission) -> Self {
        self.access.push(AccessDecl {
            name: name.to_string(),
            value: permission,
        });
        self
    }

    pub fn global(mut self, name: &str, value: &str) -> Self {
        self.globals.insert(name.to_string(), value.to_string());
        self
    }

    fn declarations(&self) -> Vec<Declaration> {
        let props = self.properties.iter().map(|d| Declaration::Property {
            name: d.name.clone(),
            type_name: d.type_name,
            value: d.value.clone(),
            inherit: d.inherit,
        });
        let envs = self.environs.iter().map(|d| Declaration::Environ {
            name: d.name.clone(),
            type_name: d.type_name,
            value: d.value.clone(),
        });
        let access = self.access.iter().map(|d| Declaration::Access {
            name: d.name.clone(),
            permission: d.value,
        });
        let subs = self.sub_entries.iter().map(|d| Declaration::SubEntry {
            name: d.name.clone(),
            entry_type: d.entry_type.clone(),
        });
        props.chain(envs).chain(access).chain(subs).collect()
    }
}

/// Entry type schema held in memory, usually read from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSchema {
    #[serde(default)]
    types: BTreeMap<String, TypeDef>,
}

impl TypeSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, name: &str, def: TypeDef) -> Self {
        self.types.insert(name.to_string(), def);
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let schema: TypeSchema = toml::from_str(content)?;
        schema.check()?;
        Ok(schema)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Sub-entry references must point at declared types.
    fn check(&self) -> Result<()> {
        for (name, def) in &self.types {
            let referenced = def
                .sub_entry_types
                .iter()
                .chain(def.sub_entries.iter().map(|s| &s.entry_type));
            for sub in referenced {
                if !self.knows(sub) {
                    return Err(ForgeError::UnknownType(format!(
                        "entry type {:?} referenced by {:?}",
                        sub, name
                    )));
                }
            }
        }
        for name in self.types.keys() {
            self.check_sub_entry_cycle(name, &mut Vec::new())?;
        }
        Ok(())
    }

    /// Default sub-entries are created recursively, so following them from
    /// any type must come to an end.
    fn check_sub_entry_cycle<'s>(&'s self, entry_type: &'s str, chain: &mut Vec<&'s str>) -> Result<()> {
        if chain.contains(&entry_type) {
            chain.push(entry_type);
            return Err(ForgeError::invalid(format!(
                "sub entries form a cycle: {}",
                chain.join(" -> ")
            )));
        }
        let Some(def) = self.types.get(entry_type) else {
            return Ok(());
        };
        chain.push(entry_type);
        for sub in &def.sub_entries {
            self.check_sub_entry_cycle(&sub.entry_type, chain)?;
        }
        chain.pop();
        Ok(())
    }

    fn knows(&self, entry_type: &str) -> bool {
        entry_type == ROOT_TYPE || self.types.contains_key(entry_type)
    }
}

impl SchemaProvider for TypeSchema {
    fn has_type(&self, entry_type: &str) -> Result<bool> {
        Ok(self.knows(entry_type))
    }

    fn defaults_for(&self, entry_type: &str) -> Result<Vec<Declaration>> {
        Ok(self
            .types
            .get(entry_type)
            .map(TypeDef::declarations)
            .unwrap_or_default())
    }

    fn sub_entry_types_for(&self, entry_type: &str) -> Result<Vec<String>> {
        Ok(self
            .types
            .get(entry_type)
            .map(|d| d.sub_entry_types.clone())
            .unwrap_or_default())
    }

    fn global_setting(&self, entry_type: &str, name: &str) -> Result<Option<String>> {
        Ok(self
            .types
            .get(entry_type)
            .and_then(|d| d.globals.get(name).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{property_decl, DeclCategory};

    const SAMPLE: &str = r#"
[types.show]
sub_entry_types = ["shot"]
properties = [
    { name = "status", type = "text", value = "wait" },
    { name = "due", type = "date", inherit = true },
]
environs = [{ name = "SHOW", type = "entry_name", value = "." }]
access = [{ name = "coord", value = "rw" }]

[types.show.globals]
status = "wait,wip,done"

[types.shot]
sub_entries = [{ name = "comp", type = "task" }]

[types.task]
"#;

    #[test]
    fn loads_toml() {
        let schema = TypeSchema::from_toml_str(SAMPLE).unwrap();
        assert!(schema.has_type("show").unwrap());
        assert!(schema.has_type("root").unwrap());
        assert!(!schema.has_type("asset").unwrap());

        let defaults = schema.defaults_for("show").unwrap();
        let categories: Vec<DeclCategory> = defaults.iter().map(|d| d.category()).collect();
        assert_eq!(
            categories,
            vec![
                DeclCategory::Property,
                DeclCategory::Property,
                DeclCategory::Environ,
                DeclCategory::Access
            ]
        );
        assert_eq!(schema.sub_entry_types_for("show").unwrap(), vec!["shot"]);
        assert_eq!(
            schema.global_setting("show", "status").unwrap().as_deref(),
            Some("wait,wip,done")
        );
        assert_eq!(schema.global_setting("shot", "status").unwrap(), None);
    }

    #[test]
    fn property_declarations() {
        let schema = TypeSchema::from_toml_str(SAMPLE).unwrap();
        assert_eq!(
            property_decl(&schema, "show", "due").unwrap(),
            Some((AttrType::Date, true))
        );
        assert_eq!(property_decl(&schema, "show", "nope").unwrap(), None);
    }

    #[test]
    fn unknown_attribute_type_fails_to_load() {
        let bad = r#"
[types.show]
properties = [{ name = "status", type = "colour" }]
"#;
        assert!(matches!(
            TypeSchema::from_toml_str(bad),
            Err(ForgeError::Schema(_))
        ));
    }

    #[test]
    fn dangling_sub_entry_type_fails() {
        let bad = r#"
[types.show]
sub_entry_types = ["episode"]
"#;
        assert!(matches!(
            TypeSchema::from_toml_str(bad),
            Err(ForgeError::UnknownType(_))
        ));
    }

    #[test]
    fn sub_entry_cycle_fails_to_load() {
        let direct = r#"
[types.dir]
sub_entries = [{ name = "sub", type = "dir" }]
"#;
        assert!(matches!(
            TypeSchema::from_toml_str(direct),
            Err(ForgeError::InvalidInput(_))
        ));

        let indirect = r#"
[types.shot]
sub_entries = [{ name = "comp", type = "task" }]

[types.task]
sub_entries = [{ name = "again", type = "shot" }]
"#;
        let err = TypeSchema::from_toml_str(indirect).unwrap_err();
        assert!(err.to_string().contains("shot -> task -> shot"), "{}", err);

        // sub_entry_types only name what may be added by hand
        let open = r#"
[types.dir]
sub_entry_types = ["dir"]
"#;
        assert!(TypeSchema::from_toml_str(open).is_ok());
    }

    #[test]
    fn builder_matches_toml() {
        let built = TypeSchema::new()
            .with_type("task", TypeDef::new())
            .with_type("shot", TypeDef::new().sub_entry("comp", "task"));
        assert_eq!(
            built.defaults_for("shot").unwrap(),
            vec![Declaration::SubEntry {
                name: "comp".into(),
                entry_type: "task".into()
            }]
        );
    }
}
