use forgeapp::api::ForgeApi;
use forgeapp::caller::{CancelToken, Caller};
use forgeapp::error::ForgeError;
use forgeapp::model::{Category, Permission, PropertyUpdater};
use forgeapp::schema::TypeSchema;
use forgeapp::store::FileStore;
use std::sync::Arc;
use tempfile::TempDir;

const TYPES: &str = r#"
[types.root]
sub_entry_types = ["show"]

[types.show]
sub_entry_types = ["shot"]
properties = [
    { name = "fps", type = "int", value = "24", inherit = true },
    { name = "sup", type = "user", inherit = true },
]
environs = [{ name = "SHOW", type = "entry_name", value = "." }]

[types.shot]
sub_entry_types = ["task"]
sub_entries = [{ name = "comp", type = "task" }]
properties = [
    { name = "status", type = "text", value = "wait" },
    { name = "due", type = "date" },
    { name = "assignee", type = "user" },
]

[types.task]
properties = [
    { name = "status", type = "text" },
    { name = "assignee", type = "user" },
]
"#;

fn setup() -> (TempDir, ForgeApi<FileStore>) {
    let dir = TempDir::new().unwrap();
    let schema = TypeSchema::from_toml_str(TYPES).unwrap();
    let store = FileStore::open(dir.path().to_path_buf(), Arc::new(schema));
    let api = ForgeApi::new(store);
    let sys = Caller::system();
    api.add_user(&sys, "ada", "Ada").unwrap();
    api.add_user(&sys, "kim", "Kim").unwrap();
    api.add_entry(&sys, "/", "show", "").unwrap();
    api.add_entry(&sys, "/show", "s01", "").unwrap();
    api.add_entry(&sys, "/show", "s02", "").unwrap();
    (dir, api)
}

#[test]
fn test_defaults_and_inheritance_on_disk() {
    let (_dir, api) = setup();
    let sys = Caller::system();
    let comp = api.get_entry(&sys, "/show/s01/comp").unwrap();
    assert_eq!(comp.type_name, "task");
    assert_eq!(comp.properties["fps"].value, "24");
    assert_eq!(comp.properties["fps"].entry_path, "/show");
    assert!(!comp.properties.contains_key("due"));

    let envs = api.entry_environs(&sys, "/show/s01/comp").unwrap();
    assert_eq!(envs.len(), 1);
    assert_eq!(envs[0].value, "show");
}

#[test]
fn test_search_with_access() {
    let (_dir, api) = setup();
    let sys = Caller::system();
    let kim = Caller::new("kim");
    api.update_property(&sys, PropertyUpdater::new("/show/s01", "status").with_value("wip"))
        .unwrap();
    api.update_property(&sys, PropertyUpdater::new("/show/s02", "status").with_value("blocked"))
        .unwrap();

    assert!(api.search_entries(&kim, "/", "type=shot").unwrap().is_empty());
    api.add_access(&sys, "/show", "kim", Permission::Read).unwrap();
    let found = api.search_entries(&kim, "/", "type=shot status:wip,done").unwrap();
    let paths: Vec<&str> = found.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["/show/s01"]);
}

#[test]
fn test_assignee_reaches_task() {
    let (_dir, api) = setup();
    let sys = Caller::system();
    let kim = Caller::new("kim");
    assert!(api.get_entry(&kim, "/show/s02/comp").unwrap_err().is_not_found());
    api.update_property(&sys, PropertyUpdater::new("/show/s02/comp", "assignee").with_value("kim"))
        .unwrap();
    let comp = api.get_entry(&kim, "/show/s02/comp").unwrap();
    assert_eq!(comp.properties["assignee"].value, "Kim");
    api.update_property(&kim, PropertyUpdater::new("/show/s02/comp", "status").with_value("wip"))
        .unwrap();
    let logs = api.get_logs(&sys, "/show/s02/comp", Category::Property, "status").unwrap();
    assert_eq!(logs.last().unwrap().user, "kim");
}

#[test]
fn test_rename_keeps_tree_consistent() {
    let (_dir, api) = setup();
    let ada = Caller::new("ada");
    api.rename_entry(&ada, "/show", "film").unwrap();
    let kids = api.find_entries(&ada, "/film").unwrap();
    let paths: Vec<&str> = kids.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["/film/s01", "/film/s02"]);
    let envs = api.entry_environs(&ada, "/film/s02/comp").unwrap();
    assert_eq!(envs[0].value, "film");
    assert!(api.get_entry(&ada, "/show").unwrap_err().is_not_found());
}

#[test]
fn test_recursive_delete_and_count() {
    let (_dir, api) = setup();
    let sys = Caller::system();
    assert_eq!(api.count_all_sub_entries(&sys, "/show").unwrap(), 4);
    assert!(matches!(
        api.delete_entry(&sys, "/show/s01"),
        Err(ForgeError::Conflict(_))
    ));
    api.delete_entry_recursive(&sys, "/show/s01").unwrap();
    assert_eq!(api.count_all_sub_entries(&sys, "/show").unwrap(), 2);
}

#[test]
fn test_cancelled_write_is_not_persisted() {
    let (_dir, api) = setup();
    let token = CancelToken::new();
    token.cancel();
    let caller = Caller::system().with_cancel(token);
    assert!(matches!(
        api.add_entry(&caller, "/show", "s03", ""),
        Err(ForgeError::Cancelled)
    ));
    assert!(api
        .get_entry(&Caller::system(), "/show/s03")
        .unwrap_err()
        .is_not_found());
}
