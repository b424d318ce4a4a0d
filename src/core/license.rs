//! License key generation and issuance.
//!
//! Every purchased unit gets one key. Keys carry 128 bits from the thread-local CSPRNG,
//! rendered as eight groups of four uppercase hex digits:
//!
//! ```text
//! 9F3A-07C2-E1B4-5D60-AA18-3C7F-0B92-C01D
//! ```
//!
//! Randomness makes collisions practically impossible, but the UNIQUE constraint on
//! `license_keys.key_string` is the real guarantee. A rejected insert is reported as
//! [`CheckoutError::KeyCollision`] and retried with a fresh key inside a savepoint, so the
//! surrounding checkout transaction stays usable.

use crate::{
    entities::license_key,
    errors::CheckoutError,
};
use chrono::{DateTime, Days, Utc};
use rand::RngCore;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, SqlErr, TransactionTrait};
use std::fmt::Write as _;
use tracing::warn;

/// Random bytes per key.
pub const KEY_ENTROPY_BYTES: usize = 16;
const GROUP_LEN: usize = 4;
/// Length of a rendered key including separators.
pub const KEY_DISPLAY_WIDTH: usize = KEY_ENTROPY_BYTES * 2 + KEY_ENTROPY_BYTES * 2 / GROUP_LEN - 1;

/// Where license keys come from.
pub trait KeySource {
    /// Draws the next candidate key.
    fn next_key(&mut self) -> String;
}

/// Keys drawn from `rand::rng()`, which is seeded from the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomKeySource;

impl KeySource for RandomKeySource {
    fn next_key(&mut self) -> String {
        let mut bytes = [0u8; KEY_ENTROPY_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        format_key(&bytes)
    }
}

/// Renders raw key bytes in the canonical display form.
#[must_use]
pub fn format_key(bytes: &[u8; KEY_ENTROPY_BYTES]) -> String {
    let mut key = String::with_capacity(KEY_DISPLAY_WIDTH);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 && i % (GROUP_LEN / 2) == 0 {
            key.push('-');
        }
        write!(key, "{byte:02X}").ok();
    }
    key
}

/// Whether `key` has the canonical shape produced by [`format_key`].
#[must_use]
pub fn is_well_formed_key(key: &str) -> bool {
    key.len() == KEY_DISPLAY_WIDTH
        && key.split('-').count() == KEY_ENTROPY_BYTES * 2 / GROUP_LEN
        && key.split('-').all(|group| {
            group.len() == GROUP_LEN
                && group
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        })
}

/// End of a license term: `activated_at` plus `term_days` calendar days, in UTC.
///
/// Returns `None` only if the result falls outside chrono's representable range.
#[must_use]
pub fn expiry_for(activated_at: DateTime<Utc>, term_days: u32) -> Option<DateTime<Utc>> {
    activated_at.checked_add_days(Days::new(u64::from(term_days)))
}

/// Issues one license for one purchased unit of `line_id`.
///
/// Draws up to `max_attempts` keys from `keys`. Each attempt runs in its own savepoint;
/// a UNIQUE violation rolls back just that savepoint and draws again. Exhausting the
/// attempts degrades to `StorageFailure`, which aborts the whole checkout.
pub async fn issue_license<C, K>(
    db: &C,
    line_id: i64,
    activated_at: DateTime<Utc>,
    term_days: u32,
    keys: &mut K,
    max_attempts: u32,
) -> Result<license_key::Model, CheckoutError>
where
    C: ConnectionTrait + TransactionTrait,
    K: KeySource + ?Sized,
{
    let expires_at = expiry_for(activated_at, term_days).ok_or_else(|| {
        CheckoutError::StorageFailure(format!(
            "license term of {term_days} days overflows the calendar"
        ))
    })?;

    for attempt in 1..=max_attempts.max(1) {
        let key = keys.next_key();
        match insert_license(db, line_id, key, activated_at, expires_at).await {
            Ok(license) => return Ok(license),
            Err(CheckoutError::KeyCollision { key }) => {
                warn!("License key collision on line {line_id} (attempt {attempt}): {key}");
            }
            Err(other) => return Err(other),
        }
    }

    Err(CheckoutError::StorageFailure(format!(
        "could not draw a unique license key for line {line_id} after {max_attempts} attempts"
    )))
}

async fn insert_license<C>(
    db: &C,
    line_id: i64,
    key: String,
    activated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<license_key::Model, CheckoutError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let savepoint = db.begin().await?;

    let license = license_key::ActiveModel {
        line_id: Set(line_id),
        key_string: Set(key.clone()),
        activated_at: Set(activated_at),
        expires_at: Set(expires_at),
        ..Default::default()
    };

    match license.insert(&savepoint).await {
        Ok(model) => {
            savepoint.commit().await?;
            Ok(model)
        }
        Err(err) => {
            savepoint.rollback().await?;
            if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                Err(CheckoutError::KeyCollision { key })
            } else {
                Err(err.into())
            }
        }
    }
}

/// Replays a fixed list of keys, then falls back to random ones. Test-only.
#[cfg(test)]
pub(crate) struct ScriptedKeys {
    script: std::collections::VecDeque<String>,
}

#[cfg(test)]
impl ScriptedKeys {
    pub(crate) fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: keys.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
impl KeySource for ScriptedKeys {
    fn next_key(&mut self) -> String {
        self.script
            .pop_front()
            .unwrap_or_else(|| RandomKeySource.next_key())
    }
}
