//! Modelcat Storage Layer
//!
//! Implements the `LedgerStore` and `RecordStore` traits using SQLite, plus
//! in-memory variants for tests and dry runs.
//!
//! # Architecture
//!
//! - One SQLite file holds both the deduplication ledger and the catalogue
//!   tables
//! - The ledger is append-only; a partial unique index allows at most one
//!   accepted row per source key
//! - Catalogue tables carry a unique natural key per entity kind
//!
//! # Examples
//!
//! ```no_run
//! use modelcat_store::{SqliteLedger, SqliteRecordStore};
//!
//! let ledger = SqliteLedger::new("modelcat.db").unwrap();
//! let records = SqliteRecordStore::new("modelcat.db").unwrap();
//! ```

#![warn(missing_docs)]

mod error;
mod ledger;
mod records;

use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

pub use error::StoreError;
pub use ledger::{LedgerCounts, MemoryLedger, SqliteLedger};
pub use records::{MemoryRecordStore, SqliteRecordStore};

/// Open a connection and make sure the schema exists
///
/// The ledger and the record store may share one database file; each opens
/// its own connection, and the busy timeout lets them wait on each other.
fn open_connection<P: AsRef<Path>>(path: P) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch(include_str!("schema.sql"))?;
    Ok(conn)
}
