//! Command dispatch: one match arm per subcommand, each a single API call
//! followed by a render call.

use super::render::Output;
use super::setup::{AccessCommand, Commands, EnvCommand, GroupCommand, LogCategory, PropCommand, UserCommand};
use forgeapp::error::ForgeError;
use forgeapp::init::ForgeContext;
use forgeapp::model::{AccessUpdater, Category, EnvironUpdater, Permission, PropertyUpdater};
use forgeapp::types::AttrType;

pub fn dispatch(ctx: &ForgeContext, command: Commands, json: bool) -> anyhow::Result<()> {
    let out = Output::new(json);
    run_command(ctx, command, &out).map_err(|e| match e.downcast::<ForgeError>() {
        Ok(forge) => anyhow::anyhow!(forge.user_message()),
        Err(other) => other,
    })
}

fn run_command(ctx: &ForgeContext, command: Commands, out: &Output) -> anyhow::Result<()> {
    let api = &ctx.api;
    let caller = &ctx.caller;
    tracing::debug!(user = caller.user(), ?command, "dispatching");

    match command {
        Commands::Add {
            parent,
            name,
            entry_type,
        } => {
            let entry = api.add_entry(caller, &parent, &name, &entry_type)?;
            out.entry(&entry)
        }
        Commands::Get { path } => out.entry(&api.get_entry(caller, &path)?),
        Commands::Ls { path } => out.entries(&api.find_entries(caller, &path)?),
        Commands::Rm { path, recursive } => {
            if recursive {
                let count = api.count_all_sub_entries(caller, &path)?;
                api.delete_entry_recursive(caller, &path)?;
                out.message(&format!("deleted {} and {} sub-entries", path, count))
            } else {
                api.delete_entry(caller, &path)?;
                out.message(&format!("deleted {}", path))
            }
        }
        Commands::Mv { path, new_name } => out.entry(&api.rename_entry(caller, &path, &new_name)?),
        Commands::Archive { path, undo } => {
            if undo {
                api.unarchive_entry(caller, &path)?;
                out.message(&format!("unarchived {}", path))
            } else {
                api.archive_entry(caller, &path)?;
                out.message(&format!("archived {}", path))
            }
        }
        Commands::Prop(cmd) => run_prop(ctx, cmd, out),
        Commands::Env(cmd) => run_env(ctx, cmd, out),
        Commands::Access(cmd) => run_access(ctx, cmd, out),
        Commands::Search {
            root,
            terms,
            saved,
            property,
        } => {
            let found = match saved {
                Some(name) => api.run_saved_search(caller, &root, &property, &name)?,
                None => api.search_entries(caller, &root, &terms.join(" "))?,
            };
            out.entries(&found)
        }
        Commands::User(cmd) => run_user(ctx, cmd, out),
        Commands::Group(cmd) => run_group(ctx, cmd, out),
        Commands::Log { path, filter } => {
            let logs = match (filter.category, filter.name) {
                (Some(category), Some(name)) => api.get_logs(caller, &path, category.into(), &name)?,
                _ => api.find_logs(caller, &path)?,
            };
            out.logs(&logs)
        }
    }
}

fn run_prop(ctx: &ForgeContext, cmd: PropCommand, out: &Output) -> anyhow::Result<()> {
    let (api, caller) = (&ctx.api, &ctx.caller);
    match cmd {
        PropCommand::List { path } => out.properties(&path, &api.entry_properties(caller, &path)?),
        PropCommand::Get { path, name } => out.property(&api.get_property(caller, &path, &name)?),
        PropCommand::Add {
            path,
            name,
            value,
            type_name,
            inherit,
        } => {
            let type_name = type_name.map(|t| t.parse::<AttrType>()).transpose()?;
            out.property(&api.add_property(caller, &path, &name, type_name, &value, inherit)?)
        }
        PropCommand::Set {
            path,
            name,
            value,
            inherit,
        } => {
            let mut upd = PropertyUpdater::new(&path, &name);
            if let Some(value) = value {
                upd = upd.with_value(value);
            }
            if let Some(inherit) = inherit {
                upd = upd.with_inherit(inherit);
            }
            api.update_property(caller, upd)?;
            out.property(&api.get_property(caller, &path, &name)?)
        }
        PropCommand::Rm { path, name } => {
            api.delete_property(caller, &path, &name)?;
            out.message(&format!("deleted property {} of {}", name, path))
        }
    }
}

fn run_env(ctx: &ForgeContext, cmd: EnvCommand, out: &Output) -> anyhow::Result<()> {
    let (api, caller) = (&ctx.api, &ctx.caller);
    match cmd {
        EnvCommand::List { path } => out.environs(&path, &api.entry_environs(caller, &path)?),
        EnvCommand::Get { path, name } => out.environ(&api.get_environ(caller, &path, &name)?),
        EnvCommand::Add {
            path,
            name,
            value,
            type_name,
        } => {
            let type_name = type_name.parse::<AttrType>()?;
            out.environ(&api.add_environ(caller, &path, &name, type_name, &value)?)
        }
        EnvCommand::Set { path, name, value } => {
            api.update_environ(caller, EnvironUpdater::new(&path, &name).with_value(value))?;
            out.environ(&api.get_environ(caller, &path, &name)?)
        }
        EnvCommand::Rm { path, name } => {
            api.delete_environ(caller, &path, &name)?;
            out.message(&format!("deleted environ {} of {}", name, path))
        }
    }
}

fn run_access(ctx: &ForgeContext, cmd: AccessCommand, out: &Output) -> anyhow::Result<()> {
    let (api, caller) = (&ctx.api, &ctx.caller);
    match cmd {
        AccessCommand::List { path } => out.access_rules(&path, &api.entry_access_list(caller, &path)?),
        AccessCommand::Get { path, name } => out.access_rule(&api.get_access(caller, &path, &name)?),
        AccessCommand::Add { path, name, mode } => {
            let permission = mode.parse::<Permission>()?;
            out.access_rule(&api.add_access(caller, &path, &name, permission)?)
        }
        AccessCommand::Set { path, name, mode } => {
            let permission = mode.parse::<Permission>()?;
            api.update_access(caller, AccessUpdater::new(&path, &name).with_permission(permission))?;
            out.access_rule(&api.get_access(caller, &path, &name)?)
        }
        AccessCommand::Rm { path, name } => {
            api.delete_access(caller, &path, &name)?;
            out.message(&format!("deleted access of {} on {}", name, path))
        }
    }
}

fn run_user(ctx: &ForgeContext, cmd: UserCommand, out: &Output) -> anyhow::Result<()> {
    let (api, caller) = (&ctx.api, &ctx.caller);
    match cmd {
        UserCommand::Add { name, called } => out.accessor(&api.add_user(caller, &name, &called)?),
        UserCommand::List => out.accessors(&api.find_users(caller)?),
        UserCommand::Get { name } => out.accessor(&api.get_user(caller, &name)?),
        UserCommand::Called { name, called } => {
            api.update_user_called(caller, &name, &called)?;
            out.accessor(&api.get_user(caller, &name)?)
        }
        UserCommand::Whoami => out.accessor(&api.whoami(caller)?),
        UserCommand::ShowArchived { on } => {
            api.set_show_archived(caller, on)?;
            out.setting(caller.user(), &api.user_setting(caller)?)
        }
    }
}

fn run_group(ctx: &ForgeContext, cmd: GroupCommand, out: &Output) -> anyhow::Result<()> {
    let (api, caller) = (&ctx.api, &ctx.caller);
    match cmd {
        GroupCommand::Add { name, called } => out.accessor(&api.add_group(caller, &name, &called)?),
        GroupCommand::List => out.accessors(&api.find_groups(caller)?),
        GroupCommand::Rename { name, new_name } => {
            api.rename_group(caller, &name, &new_name)?;
            out.accessor(&api.get_group(caller, &new_name)?)
        }
        GroupCommand::Members { name } => out.members(&api.find_group_members(caller, &name)?),
        GroupCommand::Join { group, member } => {
            api.add_group_member(caller, &group, &member)?;
            out.message(&format!("{} joined {}", member, group))
        }
        GroupCommand::Leave { group, member } => {
            api.delete_group_member(caller, &group, &member)?;
            out.message(&format!("{} left {}", member, group))
        }
    }
}

impl From<LogCategory> for Category {
    fn from(c: LogCategory) -> Self {
        match c {
            LogCategory::Entry => Category::Entry,
            LogCategory::Property => Category::Property,
            LogCategory::Environ => Category::Environ,
            LogCategory::Access => Category::Access,
        }
    }
}
