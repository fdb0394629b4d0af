//! SQLite storage for the books
//!
//! The books are stored as JSON snapshots, one row per collection, plus a
//! small table of document counters:
//! - `snapshots` - business details, clients, vendors, products, invoices,
//!   quotations, purchases, recurring profiles, bank transactions
//! - `counters` - invoice and quotation sequence numbers
//!
//! Typed access to the snapshots lives in `snapshots`.

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

mod snapshots;

pub use snapshots::Collection;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Passphrase variable; when set, the file is opened with SQLCipher
pub const DB_KEY_ENV: &str = "KHATA_DB_KEY";

/// Turn a passphrase into a hex SQLCipher key with Argon2
///
/// The salt is fixed, so a key depends only on the passphrase and a
/// backup restored under another path still opens.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::password_hash::{self, PasswordHasher, SaltString};

    // Changing this invalidates every existing encrypted database
    const KEY_SALT: &[u8; 16] = b"khata-salt-v1-fx";

    let failed = |step: &str, e: password_hash::Error| Error::Encryption(format!("{}: {}", step, e));

    let salt = SaltString::encode_b64(KEY_SALT).map_err(|e| failed("Invalid key salt", e))?;
    let digest = argon2::Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| failed("Key derivation failed", e))?
        .hash
        .ok_or_else(|| Error::Encryption("Key derivation produced no output".to_string()))?;
    Ok(hex::encode(digest.as_bytes()))
}

/// Pooled handle to the books file
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Location on disk
    db_path: String,
    encrypted: bool,
}

impl Database {
    /// Open (or create) an encrypted database
    ///
    /// Requires `KHATA_DB_KEY` to be set. The database is encrypted with
    /// SQLCipher using a key derived from the passphrase via Argon2.
    /// Use `new_unencrypted()` for development databases.
    pub fn new(path: &str) -> Result<Self> {
        let passphrase = std::env::var(DB_KEY_ENV).map_err(|_| {
            Error::Encryption(format!(
                "{} is not set. Export your passphrase, or pass --no-encrypt to keep the books in plain SQLite.",
                DB_KEY_ENV
            ))
        })?;
        Self::new_with_key(path, Some(&passphrase))
    }

    /// Open (or create) an unencrypted database
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Open (or create) a database with an explicit passphrase
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let mut manager = SqliteConnectionManager::file(path);
        if let Some(pass) = passphrase {
            let unlock = format!("PRAGMA key = 'x\"{}\"';", derive_key(pass)?);
            // Every pooled connection has to unlock the file
            manager = manager.with_init(move |conn| conn.execute_batch(&unlock));
        }
        let pool = Pool::builder().max_size(4).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
            encrypted: passphrase.is_some(),
        };
        db.run_migrations()?;
        debug!("Opened database at {}", path);

        Ok(db)
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` because every pooled
    /// connection to `:memory:` would see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "khata_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().to_string();

        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Location of the books file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Whether the database was opened with a passphrase
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Borrow a pooled connection
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL: readers don't block the writer
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- One JSON document per collection
            CREATE TABLE IF NOT EXISTS snapshots (
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Document sequence numbers
            CREATE TABLE IF NOT EXISTS counters (
                name TEXT PRIMARY KEY,
                value INTEGER NOT NULL DEFAULT 0
            );

            INSERT OR IGNORE INTO counters (name, value) VALUES ('invoice', 0);
            INSERT OR IGNORE INTO counters (name, value) VALUES ('quotation', 0);
            "#,
        )?;

        info!("Database migrations complete");
        Ok(())
    }

    /// Read a snapshot, `None` when it has never been written
    pub fn load_snapshot<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let conn = self.conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM snapshots WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Replace a snapshot
    #[cfg(test)]
    pub(crate) fn save_snapshot<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let conn = self.conn()?;
        write_snapshot(&conn, key, value)
    }

    /// Current value of a counter (0 when never set)
    pub fn counter(&self, name: &str) -> Result<u64> {
        let conn = self.conn()?;
        let value: Option<i64> = conn
            .query_row(
                "SELECT value FROM counters WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.map(|v| v.max(0) as u64).unwrap_or(0))
    }

    #[cfg(test)]
    pub(crate) fn set_counter(&self, name: &str, value: u64) -> Result<()> {
        let conn = self.conn()?;
        write_counter(&conn, name, value)
    }

    /// Keys of all stored snapshots with their last write time
    pub fn list_snapshots(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key, updated_at FROM snapshots ORDER BY key")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn write_snapshot<T: Serialize + ?Sized>(
    conn: &rusqlite::Connection,
    key: &str,
    value: &T,
) -> Result<()> {
    let payload = serde_json::to_string(value)?;
    conn.execute(
        r#"
        INSERT INTO snapshots (key, payload, updated_at)
        VALUES (?1, ?2, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, updated_at = CURRENT_TIMESTAMP
        "#,
        params![key, payload],
    )?;
    Ok(())
}

fn write_counter(conn: &rusqlite::Connection, name: &str, value: u64) -> Result<()> {
    let value = i64::try_from(value)
        .map_err(|_| Error::InvalidData(format!("Counter {} out of range: {}", name, value)))?;
    conn.execute(
        r#"
        INSERT INTO counters (name, value) VALUES (?1, ?2)
        ON CONFLICT(name) DO UPDATE SET value = excluded.value
        "#,
        params![name, value],
    )?;
    Ok(())
}
