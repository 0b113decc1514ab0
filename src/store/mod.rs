pub mod migrations;

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::drift::DeploymentSource;
use crate::store::migrations::BASE_MIGRATION;
use crate::types::{DeploymentRecord, NewRelease, Release, User};

pub struct ReleaseStore {
    conn: Connection,
}

impl ReleaseStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed creating data directory: {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed opening database: {}", path.display()))?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(BASE_MIGRATION)?;
        Ok(())
    }

    pub fn insert_release(&self, release: &NewRelease) -> Result<i64> {
        self.conn.execute(
            r#"
INSERT INTO releases(name, version, account, region, created_at)
VALUES (?1, ?2, ?3, ?4, ?5)
"#,
            params![
                release.name,
                release.version,
                release.account,
                release.region,
                now_timestamp()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_releases(&self, limit: u32, offset: u32) -> Result<Vec<Release>> {
        let mut stmt = self.conn.prepare(
            r#"
SELECT id, name, version, account, region, created_at
FROM releases
ORDER BY created_at DESC, id DESC
LIMIT ?1 OFFSET ?2
"#,
        )?;
        let rows = stmt
            .query_map(params![limit, offset], row_to_release)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn insert_user(&self, username: &str, password: &str) -> Result<i64> {
        self.conn
            .execute(
                r#"
INSERT INTO users(username, password_hash, created_at)
VALUES (?1, ?2, ?3)
"#,
                params![username, hash_password(password)?, now_timestamp()],
            )
            .with_context(|| format!("failed creating user {username}"))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Returns the user when `password` matches, `None` otherwise.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        let row = self
            .conn
            .query_row(
                r#"
SELECT id, username, password_hash
FROM users
WHERE username = ?1
"#,
                params![username],
                |row| {
                    Ok((
                        User {
                            id: row.get(0)?,
                            username: row.get(1)?,
                        },
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((user, stored)) if verify_password(password, &stored)? => Ok(Some(user)),
            _ => Ok(None),
        }
    }
}

impl DeploymentSource for ReleaseStore {
    fn list_deployments(&self) -> Result<Vec<DeploymentRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
SELECT name, account, region, version
FROM releases
ORDER BY id DESC
"#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DeploymentRecord {
                    name: row.get(0)?,
                    account: row.get(1)?,
                    region: row.get(2)?,
                    version: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn row_to_release(row: &rusqlite::Row<'_>) -> rusqlite::Result<Release> {
    Ok(Release {
        id: row.get(0)?,
        name: row.get(1)?,
        version: row.get(2)?,
        account: row.get(3)?,
        region: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("failed hashing password: {e}"))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(stored).map_err(|e| anyhow!("stored password hash is malformed: {e}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
