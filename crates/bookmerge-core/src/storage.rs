use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::error::{CatalogError, Result};
use crate::models::{
    Alias, Book, Conflict, ImportRecord, CONFLICT_DESCRIPTION_MAX_LEN, FILENAME_MAX_LEN,
};

/// SQLite-backed catalog store: books, their aliases, recorded conflicts
/// and the import ledger.
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Open or create the catalog database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let catalog = Self { conn };
        catalog.init_schema()?;
        Ok(catalog)
    }

    /// Open an in-memory catalog (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let catalog = Self { conn };
        catalog.init_schema()?;
        Ok(catalog)
    }

    /// Create all tables if they don't exist.
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS books (
                id          INTEGER PRIMARY KEY,
                title       TEXT NOT NULL,
                description TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS aliases (
                id         INTEGER PRIMARY KEY,
                book_id    INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
                scheme     TEXT,
                value      TEXT,
                created_at TEXT NOT NULL,
                UNIQUE (book_id, scheme, value)
            );

            CREATE TABLE IF NOT EXISTS conflicts (
                id          INTEGER PRIMARY KEY,
                book_id     INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
                alias_id    INTEGER NOT NULL REFERENCES aliases(id),
                description TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                UNIQUE (book_id, alias_id)
            );

            CREATE TABLE IF NOT EXISTS imports (
                id         INTEGER PRIMARY KEY,
                filename   TEXT NOT NULL,
                sha1       TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_aliases_scheme_value ON aliases(scheme, value);
            CREATE INDEX IF NOT EXISTS idx_aliases_book         ON aliases(book_id);
            CREATE INDEX IF NOT EXISTS idx_conflicts_book       ON conflicts(book_id);
            ",
        )?;
        Ok(())
    }

    /// Drop all catalog tables and recreate an empty schema.
    pub fn reset_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            DROP TABLE IF EXISTS conflicts;
            DROP TABLE IF EXISTS aliases;
            DROP TABLE IF EXISTS imports;
            DROP TABLE IF EXISTS books;
            ",
        )?;
        self.init_schema()
    }

    /// Begin a write transaction. The engine wraps each incoming record's
    /// persistence in one of these; dropping it without commit rolls back.
    pub(crate) fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    // ─── Books ──────────────────────────────────────────────

    /// Get a book by id.
    pub fn get_book(&self, id: i64) -> Result<Book> {
        ops::get_book(&self.conn, id)
    }

    /// List all books, ordered by title.
    pub fn list_books(&self) -> Result<Vec<Book>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, created_at, updated_at
             FROM books ORDER BY title",
        )?;
        let rows = stmt
            .query_map([], ops::row_to_book)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_books(&self) -> Result<usize> {
        ops::count(&self.conn, "books")
    }

    // ─── Aliases ────────────────────────────────────────────

    /// All aliases matching a (scheme, value) pair, across every book.
    pub fn find_aliases(&self, scheme: &str, value: &str) -> Result<Vec<Alias>> {
        ops::find_aliases(&self.conn, scheme, value)
    }

    /// All aliases matching a (scheme, value) pair on books other than
    /// `excluding_book`.
    pub fn find_foreign_aliases(
        &self,
        scheme: &str,
        value: &str,
        excluding_book: i64,
    ) -> Result<Vec<Alias>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, book_id, scheme, value, created_at
             FROM aliases WHERE scheme = ?1 AND value = ?2 AND book_id != ?3
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![scheme, value, excluding_book], ops::row_to_alias)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All aliases owned by one book, in insertion order.
    pub fn aliases_for_book(&self, book_id: i64) -> Result<Vec<Alias>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, book_id, scheme, value, created_at
             FROM aliases WHERE book_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![book_id], ops::row_to_alias)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_aliases(&self) -> Result<usize> {
        ops::count(&self.conn, "aliases")
    }

    // ─── Conflicts ──────────────────────────────────────────

    /// Conflicts recorded against one book.
    pub fn conflicts_for_book(&self, book_id: i64) -> Result<Vec<Conflict>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, book_id, alias_id, description, created_at
             FROM conflicts WHERE book_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![book_id], ops::row_to_conflict)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Every recorded conflict joined with both sides' display data,
    /// ordered by the owning book's title.
    pub fn list_conflict_details(&self) -> Result<Vec<ConflictDetail>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.book_id, b.title, other.title, a.scheme, a.value
             FROM conflicts c
             JOIN books b      ON b.id = c.book_id
             JOIN aliases a    ON a.id = c.alias_id
             JOIN books other  ON other.id = a.book_id
             ORDER BY b.title, other.title",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ConflictDetail {
                    book_id: row.get(0)?,
                    book_title: row.get(1)?,
                    other_title: row.get(2)?,
                    scheme: row.get(3)?,
                    value: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_conflicts(&self) -> Result<usize> {
        ops::count(&self.conn, "conflicts")
    }

    // ─── Import ledger ──────────────────────────────────────

    /// Look up a prior import by content hash.
    pub fn find_import_by_hash(&self, sha1: &str) -> Result<Option<ImportRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, filename, sha1, created_at FROM imports WHERE sha1 = ?1",
                params![sha1],
                ops::row_to_import,
            )
            .optional()?;
        Ok(record)
    }

    /// Record a successfully processed file. The hash must be new; a prior
    /// entry for it surfaces as `DuplicateHash`.
    pub fn record_import(&self, filename: &str, sha1: &str) -> Result<ImportRecord> {
        ops::check_len("filename", filename, FILENAME_MAX_LEN)?;
        if self.find_import_by_hash(sha1)?.is_some() {
            return Err(CatalogError::DuplicateHash(sha1.to_string()));
        }

        let now = Utc::now();
        let inserted = self.conn.execute(
            "INSERT INTO imports (filename, sha1, created_at) VALUES (?1, ?2, ?3)",
            params![filename, sha1, now.to_rfc3339()],
        );
        match inserted {
            Ok(_) => Ok(ImportRecord {
                id: self.conn.last_insert_rowid(),
                filename: filename.to_string(),
                sha1: sha1.to_string(),
                created_at: now,
            }),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(CatalogError::DuplicateHash(sha1.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn count_imports(&self) -> Result<usize> {
        ops::count(&self.conn, "imports")
    }
}

/// One recorded conflict flattened for display: the owning book, the other
/// book claiming the alias, and the shared pair.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConflictDetail {
    pub book_id: i64,
    pub book_title: String,
    pub other_title: String,
    pub scheme: Option<String>,
    pub value: Option<String>,
}

/// Low-level operations shared between `Catalog` reads and the engine's
/// transaction-scoped writes (`rusqlite::Transaction` derefs to
/// `Connection`, so both call through here).
pub(crate) mod ops {
    use super::*;
    use crate::models::{DESCRIPTION_MAX_LEN, SCHEME_MAX_LEN, TITLE_MAX_LEN, VALUE_MAX_LEN};

    pub(crate) fn check_len(field: &'static str, value: &str, max: usize) -> Result<()> {
        if value.chars().count() > max {
            return Err(CatalogError::Validation(format!(
                "{field} exceeds {max} characters"
            )));
        }
        Ok(())
    }

    fn parse_ts(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
    }

    // ─── Row mappers ────────────────────────────────────────

    pub(crate) fn row_to_book(row: &rusqlite::Row) -> rusqlite::Result<Book> {
        Ok(Book {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            created_at: parse_ts(3, row.get(3)?)?,
            updated_at: parse_ts(4, row.get(4)?)?,
        })
    }

    pub(crate) fn row_to_alias(row: &rusqlite::Row) -> rusqlite::Result<Alias> {
        Ok(Alias {
            id: row.get(0)?,
            book_id: row.get(1)?,
            scheme: row.get(2)?,
            value: row.get(3)?,
            created_at: parse_ts(4, row.get(4)?)?,
        })
    }

    pub(crate) fn row_to_conflict(row: &rusqlite::Row) -> rusqlite::Result<Conflict> {
        Ok(Conflict {
            id: row.get(0)?,
            book_id: row.get(1)?,
            alias_id: row.get(2)?,
            description: row.get(3)?,
            created_at: parse_ts(4, row.get(4)?)?,
        })
    }

    pub(crate) fn row_to_import(row: &rusqlite::Row) -> rusqlite::Result<ImportRecord> {
        Ok(ImportRecord {
            id: row.get(0)?,
            filename: row.get(1)?,
            sha1: row.get(2)?,
            created_at: parse_ts(3, row.get(3)?)?,
        })
    }

    // ─── Entity ops ─────────────────────────────────────────

    pub(crate) fn get_book(conn: &Connection, id: i64) -> Result<Book> {
        conn.query_row(
            "SELECT id, title, description, created_at, updated_at
             FROM books WHERE id = ?1",
            params![id],
            row_to_book,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => CatalogError::BookNotFound(id),
            other => CatalogError::Database(other),
        })
    }

    pub(crate) fn insert_book(
        conn: &Connection,
        title: &str,
        description: Option<&str>,
    ) -> Result<i64> {
        check_len("title", title, TITLE_MAX_LEN)?;
        if let Some(desc) = description {
            check_len("description", desc, DESCRIPTION_MAX_LEN)?;
        }
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO books (title, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![title, description, now],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub(crate) fn update_book(
        conn: &Connection,
        id: i64,
        title: &str,
        description: Option<&str>,
    ) -> Result<()> {
        check_len("title", title, TITLE_MAX_LEN)?;
        if let Some(desc) = description {
            check_len("description", desc, DESCRIPTION_MAX_LEN)?;
        }
        let updated = conn.execute(
            "UPDATE books SET title = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
            params![title, description, Utc::now().to_rfc3339(), id],
        )?;
        if updated == 0 {
            return Err(CatalogError::BookNotFound(id));
        }
        Ok(())
    }

    pub(crate) fn find_aliases(
        conn: &Connection,
        scheme: &str,
        value: &str,
    ) -> Result<Vec<Alias>> {
        let mut stmt = conn.prepare(
            "SELECT id, book_id, scheme, value, created_at
             FROM aliases WHERE scheme = ?1 AND value = ?2 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![scheme, value], row_to_alias)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Insert an alias unless the (book, scheme, value) triple already
    /// exists. `IS` comparison so NULL-attribute duplicates are no-ops
    /// too. Returns whether a row was created.
    pub(crate) fn upsert_alias(
        conn: &Connection,
        book_id: i64,
        scheme: Option<&str>,
        value: Option<&str>,
    ) -> Result<bool> {
        if let Some(scheme) = scheme {
            check_len("scheme", scheme, SCHEME_MAX_LEN)?;
        }
        if let Some(value) = value {
            check_len("value", value, VALUE_MAX_LEN)?;
        }
        let exists = conn
            .prepare(
                "SELECT 1 FROM aliases
                 WHERE book_id = ?1 AND scheme IS ?2 AND value IS ?3",
            )?
            .exists(params![book_id, scheme, value])?;
        if exists {
            return Ok(false);
        }
        conn.execute(
            "INSERT INTO aliases (book_id, scheme, value, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![book_id, scheme, value, Utc::now().to_rfc3339()],
        )?;
        Ok(true)
    }

    /// Insert a conflict unless the (book, alias) pair already exists.
    /// Returns whether a row was created.
    pub(crate) fn upsert_conflict(
        conn: &Connection,
        book_id: i64,
        alias_id: i64,
        description: &str,
    ) -> Result<bool> {
        check_len("description", description, CONFLICT_DESCRIPTION_MAX_LEN)?;
        let exists = conn
            .prepare("SELECT 1 FROM conflicts WHERE book_id = ?1 AND alias_id = ?2")?
            .exists(params![book_id, alias_id])?;
        if exists {
            return Ok(false);
        }
        conn.execute(
            "INSERT INTO conflicts (book_id, alias_id, description, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![book_id, alias_id, description, Utc::now().to_rfc3339()],
        )?;
        Ok(true)
    }

    pub(crate) fn count(conn: &Connection, table: &str) -> Result<usize> {
        // Table names come from a fixed internal set, never user input.
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }
}
