/// Database module for the progression workflow tables

pub mod admin;
pub mod records;
mod types;

pub use types::{
    AllocationStatus, DbAcademicYear, DbEnrollmentPeriod, DbFeeBalance, DbGradeBand, DbProgramme,
    DbProgrammeUnit, DbResitExam, DbSemester, DbSemesterReport, DbSemesterResult, DbStudent,
    DbUnitEnrollment, DbUnitRegistration, EnrollmentStatus, EnrollmentType, RegistrationStatus,
    ReportStatus, ResitStatus, SemesterNumber, UnknownVariant,
};

use rusqlite::types::Type;
use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::info;

use crate::error::{Result, WorkflowError};

const SCHEMA_SQL: &str = include_str!("../../../../sql/init_workflow.sql");

/// Owns the single SQLite connection. Every workflow operation runs inside one
/// transaction taken under this lock.
pub struct WorkflowDb {
    db: Mutex<Connection>,
}

impl WorkflowDb {
    /// Opens (or creates) the database file and initializes the schema
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref();
        let conn = Connection::open(path)?;
        info!("Opened workflow database at {}", path.display());
        Self::with_connection(conn)
    }

    /// Creates a private in-memory database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Runs `f` inside an immediate transaction. The transaction commits only
    /// if `f` returns `Ok`; otherwise it is dropped and rolled back.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut db = self.db.lock().map_err(|_| WorkflowError::LockPoisoned)?;
        let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Runs a read-only closure against the connection
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let db = self.db.lock().map_err(|_| WorkflowError::LockPoisoned)?;
        f(&db)
    }
}

/// Reads a TEXT decimal column
pub(crate) fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    parse_decimal(idx, &raw)
}

/// Reads a nullable TEXT decimal column
pub(crate) fn opt_decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_decimal(idx, &s)).transpose()
}

fn parse_decimal(idx: usize, raw: &str) -> rusqlite::Result<Decimal> {
    Decimal::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
