//! Users, groups and group membership.
//!
//! Users and groups share one namespace. `admin` and `everyone` exist from
//! the start; `everyone` has every user as an implicit member and takes no
//! explicit ones. The first user ever added joins `admin`.

use super::caller_id;
use crate::error::{ForgeError, Result};
use crate::model::{Accessor, AccessorId, AccessorKind, Member, ADMIN_GROUP, EVERYONE_GROUP};
use crate::resolve::access;
use crate::store::Transaction;
use crate::types::AccessorLookup;

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ForgeError::invalid("accessor name empty"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(ForgeError::invalid(format!(
            "accessor name cannot have whitespaces: {:?}",
            name
        )));
    }
    if name.chars().all(|c| c.is_ascii_digit()) {
        return Err(ForgeError::invalid(format!("accessor name cannot be all digits: {}", name)));
    }
    if name == EVERYONE_GROUP {
        return Err(ForgeError::invalid(format!("accessor name is reserved: {}", name)));
    }
    Ok(())
}

fn lookup(tx: &Transaction, name: &str, kind: AccessorKind) -> Result<Accessor> {
    tx.tables()
        .accessor_by_name(name)
        .filter(|a| a.kind == kind)
        .cloned()
        .ok_or_else(|| ForgeError::not_found(format!("{} {}", kind, name)))
}

fn sorted(tx: &Transaction, kind: AccessorKind) -> Vec<Accessor> {
    let mut found: Vec<Accessor> = tx
        .tables()
        .accessors()
        .filter(|a| a.kind == kind)
        .cloned()
        .collect();
    found.sort_by(|a, b| a.name.cmp(&b.name));
    found
}

// --- Users ---

pub fn add_user(tx: &mut Transaction, name: &str, called: &str) -> Result<Accessor> {
    check_name(name)?;
    let first = tx.tables().user_count() == 0;
    let t = tx.tables_mut();
    let id = t.insert_accessor(name, called.trim(), AccessorKind::User)?;
    if first {
        let admin = t
            .accessor_by_name(ADMIN_GROUP)
            .map(|a| a.id)
            .ok_or_else(|| ForgeError::Store("admin group missing".to_string()))?;
        t.add_member(admin, id)?;
    }
    tracing::info!(user = %name, admin = first, "user added");
    lookup(tx, name, AccessorKind::User)
}

pub fn get_user(tx: &Transaction, name: &str) -> Result<Accessor> {
    lookup(tx, name, AccessorKind::User)
}

pub fn find_users(tx: &Transaction) -> Vec<Accessor> {
    sorted(tx, AccessorKind::User)
}

/// Changes a user's display name. Users may change their own, admins anyone's.
pub fn update_user_called(tx: &mut Transaction, name: &str, called: &str) -> Result<()> {
    let user = lookup(tx, name, AccessorKind::User)?;
    if tx.caller().user() != name && !access::is_admin(tx) {
        return Err(ForgeError::denied(format!(
            "{} cannot update user {}",
            tx.caller().user(),
            name
        )));
    }
    if let Some(a) = tx.tables_mut().accessor_mut(user.id) {
        a.called = called.trim().to_string();
    }
    Ok(())
}

// --- Groups ---

pub fn add_group(tx: &mut Transaction, name: &str, called: &str) -> Result<Accessor> {
    access::ensure_admin(tx)?;
    check_name(name)?;
    tx.tables_mut()
        .insert_accessor(name, called.trim(), AccessorKind::Group)?;
    tracing::info!(group = %name, "group added");
    lookup(tx, name, AccessorKind::Group)
}

pub fn get_group(tx: &Transaction, name: &str) -> Result<Accessor> {
    lookup(tx, name, AccessorKind::Group)
}

pub fn find_groups(tx: &Transaction) -> Vec<Accessor> {
    sorted(tx, AccessorKind::Group)
}

pub fn rename_group(tx: &mut Transaction, name: &str, new_name: &str) -> Result<()> {
    access::ensure_admin(tx)?;
    if name == ADMIN_GROUP || name == EVERYONE_GROUP {
        return Err(ForgeError::invalid(format!("cannot rename {} group", name)));
    }
    check_name(new_name)?;
    let group = lookup(tx, name, AccessorKind::Group)?;
    tx.tables_mut().rename_accessor(group.id, new_name)
}

// --- Members ---

fn member_ids(tx: &Transaction, group: &str, member: &str) -> Result<(AccessorId, AccessorId)> {
    if group == EVERYONE_GROUP {
        return Err(ForgeError::invalid(
            "everyone group cannot have explicit members",
        ));
    }
    let group = lookup(tx, group, AccessorKind::Group)?;
    let user = lookup(tx, member, AccessorKind::User)?;
    Ok((group.id, user.id))
}

pub fn add_group_member(tx: &mut Transaction, group: &str, member: &str) -> Result<()> {
    access::ensure_admin(tx)?;
    let (gid, uid) = member_ids(tx, group, member)?;
    tx.tables_mut().add_member(gid, uid)?;
    tracing::info!(group = %group, member = %member, "group member added");
    Ok(())
}

pub fn delete_group_member(tx: &mut Transaction, group: &str, member: &str) -> Result<()> {
    access::ensure_admin(tx)?;
    let (gid, uid) = member_ids(tx, group, member)?;
    if group == ADMIN_GROUP {
        let members = tx.tables().members_of(gid);
        if members.len() == 1 && members[0] == uid {
            return Err(ForgeError::conflict("cannot remove the last admin"));
        }
    }
    tx.tables_mut().remove_member(gid, uid)?;
    tracing::info!(group = %group, member = %member, "group member removed");
    Ok(())
}

/// Members of `group`, sorted by member name. `everyone` lists every user.
pub fn find_group_members(tx: &Transaction, group: &str) -> Result<Vec<Member>> {
    let g = lookup(tx, group, AccessorKind::Group)?;
    let tables = tx.tables();
    let mut names: Vec<String> = if g.name == EVERYONE_GROUP {
        tables
            .accessors()
            .filter(|a| !a.is_group())
            .map(|a| a.name.clone())
            .collect()
    } else {
        tables
            .members_of(g.id)
            .iter()
            .filter_map(|id| tables.accessor_by_id(*id))
            .map(|a| a.name.clone())
            .collect()
    };
    names.sort();
    Ok(names
        .into_iter()
        .map(|member| Member {
            group: g.name.clone(),
            member,
        })
        .collect())
}

/// The calling user's own accessor record.
pub fn whoami(tx: &Transaction) -> Result<Accessor> {
    let id = caller_id(tx)?;
    tx.tables()
        .accessor_by_id(id)
        .cloned()
        .ok_or_else(|| ForgeError::not_found(format!("user {}", tx.caller().user())))
}
