// 🗄️ Reconciling Loader - Batch → SQLite `transactions`
// The table has no uniqueness constraint on `id`, so upsert is emulated with
// delete + insert inside one transaction.

use crate::error::{EtlError, EtlResult};
use crate::normalize::{Batch, TransactionRecord};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub fn setup_database(conn: &Connection) -> EtlResult<()> {
    // Enable WAL mode for crash recovery (in-memory databases report "memory")
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

    ensure_schema(conn)
}

/// Create the `transactions` table if missing. `id` carries no key constraint.
fn ensure_schema(conn: &Connection) -> EtlResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id TEXT NOT NULL,
            transaction_date TEXT NOT NULL,
            category TEXT NOT NULL,
            name TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            amount_excl_tax REAL NOT NULL,
            amount_inc_tax REAL NOT NULL
        )",
        [],
    )?;

    // Lookup index only; not UNIQUE
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_id ON transactions(id)",
        [],
    )?;

    Ok(())
}

pub fn count_transactions(conn: &Connection) -> EtlResult<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;

    Ok(count)
}

// ============================================================================
// RECONCILIATION
// ============================================================================

/// Row counts recorded around one reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub rows_before: i64,
    /// Existing rows superseded by an id present in the batch
    pub rows_deleted: i64,
    pub rows_inserted: i64,
    pub rows_after: i64,
}

/// Delete every stored row whose id is in `batch`, then insert the batch.
///
/// Runs in a single transaction: on any error the transaction is dropped
/// uncommitted and the store keeps its previous state.
pub fn reconcile(conn: &mut Connection, batch: &Batch) -> EtlResult<LoadReport> {
    let tx = conn.transaction()?;

    let rows_before = count_transactions(&tx)?;
    tracing::info!("Initial table size: {}", rows_before);

    tracing::debug!("Delete already existing ID");
    let mut rows_deleted: i64 = 0;
    {
        let mut stmt = tx.prepare("DELETE FROM transactions WHERE id = ?1")?;
        for id in batch.ids() {
            rows_deleted += stmt.execute([id])? as i64;
        }
    }
    tracing::info!(
        "Number of line deleted cause ID already exist : {}",
        rows_deleted
    );

    let mut rows_inserted: i64 = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO transactions (
                id, transaction_date, category, name,
                quantity, amount_excl_tax, amount_inc_tax
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for record in batch.records() {
            rows_inserted += stmt.execute(params![
                record.id,
                record.transaction_date,
                record.category,
                record.name,
                record.quantity,
                record.amount_excl_tax,
                record.amount_inc_tax,
            ])? as i64;
        }
    }

    let rows_after = count_transactions(&tx)?;
    tracing::info!("Table size after insertion: {}", rows_after);

    let expected = rows_before - rows_deleted + rows_inserted;
    if rows_after != expected {
        return Err(EtlError::CountMismatch {
            expected,
            actual: rows_after,
        });
    }

    tx.commit()?;
    tracing::info!("Change have been commited");

    Ok(LoadReport {
        rows_before,
        rows_deleted,
        rows_inserted,
        rows_after,
    })
}

// ============================================================================
// LOADER
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Committed(LoadReport),
    /// The transaction was rolled back; the message has already been logged
    Failed(String),
}

impl LoadOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, LoadOutcome::Committed(_))
    }
}

/// Opens one connection per `load` call and never propagates load failures
#[derive(Debug, Clone)]
pub struct ReconcilingLoader {
    db_path: PathBuf,
}

impl ReconcilingLoader {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        ReconcilingLoader {
            db_path: db_path.into(),
        }
    }

    pub fn load(&self, batch: &Batch) -> LoadOutcome {
        tracing::debug!("Start load_to_db");

        let outcome = match self.try_load(batch) {
            Ok(report) => LoadOutcome::Committed(report),
            Err(e) => {
                tracing::error!("Error occured during load_to_db: {}", e);
                LoadOutcome::Failed(e.to_string())
            }
        };

        // The connection lives inside try_load and is dropped on every path
        tracing::info!("DB connection is closed");
        outcome
    }

    fn try_load(&self, batch: &Batch) -> EtlResult<LoadReport> {
        let mut conn = Connection::open(&self.db_path)?;
        tracing::info!("DB connected");

        setup_database(&conn)?;
        reconcile(&mut conn, batch)
    }
}

// ============================================================================
// QUERIES
// ============================================================================

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<TransactionRecord> {
    Ok(TransactionRecord {
        id: row.get(0)?,
        transaction_date: row.get(1)?,
        category: row.get(2)?,
        name: row.get(3)?,
        quantity: row.get(4)?,
        amount_excl_tax: row.get(5)?,
        amount_inc_tax: row.get(6)?,
    })
}

pub fn get_all_transactions(conn: &Connection) -> EtlResult<Vec<TransactionRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, transaction_date, category, name,
                quantity, amount_excl_tax, amount_inc_tax
         FROM transactions
         ORDER BY id, transaction_date",
    )?;

    let transactions = stmt
        .query_map([], row_to_record)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(transactions)
}

/// All stored rows for one business key (more than one means the store was
/// written outside the loader)
pub fn get_transactions_by_id(conn: &Connection, id: &str) -> EtlResult<Vec<TransactionRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, transaction_date, category, name,
                quantity, amount_excl_tax, amount_inc_tax
         FROM transactions
         WHERE id = ?1
         ORDER BY transaction_date",
    )?;

    let transactions = stmt
        .query_map([id], row_to_record)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(transactions)
}
