//! Runtime-toggleable shop settings.
//!
//! Channel flags, the admin phone number and the public site URL live in the
//! `settings` table and are read at call time, so toggling notifications on
//! or off takes effect without a restart.

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

use crate::entity::settings::{Column as SettingCol, Entity as Settings};

pub const SITE_URL: &str = "site_url";
pub const ADMIN_PHONE: &str = "admin_phone";
pub const WHATSAPP_ENABLED: &str = "whatsapp_enabled";
pub const EMAIL_ENABLED: &str = "email_enabled";

pub async fn get_setting<C: ConnectionTrait>(
    conn: &C,
    key: &str,
) -> Result<Option<String>, DbErr> {
    let row = Settings::find()
        .filter(SettingCol::Key.eq(key))
        .one(conn)
        .await?;
    Ok(row.map(|s| s.value))
}

/// A channel flag counts as enabled only when explicitly set to "true".
pub async fn channel_enabled<C: ConnectionTrait>(conn: &C, key: &str) -> Result<bool, DbErr> {
    Ok(get_setting(conn, key).await?.as_deref() == Some("true"))
}
