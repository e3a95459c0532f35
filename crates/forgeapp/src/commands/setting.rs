//! Per-user settings of the calling user.

use super::caller_id;
use crate::error::Result;
use crate::model::UserSetting;
use crate::store::Transaction;

pub fn get_setting(tx: &Transaction) -> Result<UserSetting> {
    let uid = caller_id(tx)?;
    Ok(tx.tables().setting(uid))
}

/// Whether listings and search include archived branches. Only has an effect
/// for admins.
pub fn set_show_archived(tx: &mut Transaction, show: bool) -> Result<()> {
    let uid = caller_id(tx)?;
    tx.tables_mut().setting_mut(uid).show_archived = show;
    Ok(())
}
