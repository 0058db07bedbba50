use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::conflicts::{detect_conflicts, record_conflicts};
use crate::error::{CatalogError, Result};
use crate::extract::extract_record;
use crate::fingerprint::fingerprint;
use crate::models::{Book, ChangeKind};
use crate::resolve::resolve_and_persist;
use crate::storage::Catalog;

/// What importing one file did.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum ImportOutcome {
    /// The exact bytes were processed before; nothing was touched.
    /// Filename and timestamp are those of the *prior* import.
    AlreadyImported {
        filename: String,
        imported_at: DateTime<Utc>,
    },
    /// The record was applied to the catalog.
    Applied {
        book: Book,
        change: ChangeKind,
        new_conflicts: usize,
    },
}

/// Import one file's bytes into the catalog.
///
/// Flow: fingerprint, short-circuit on a ledger hit, extract the record,
/// resolve and persist the book with its aliases, detect and record
/// conflicts, then write the ledger entry. Extraction failures surface as
/// [`CatalogError::MissingField`] / [`CatalogError::MalformedXml`]; batch
/// drivers skip that file and continue.
pub fn import_bytes(
    catalog: &mut Catalog,
    filename: &str,
    bytes: &[u8],
) -> Result<ImportOutcome> {
    let hash = fingerprint(bytes);

    if let Some(prior) = catalog.find_import_by_hash(&hash)? {
        info!(filename, prior = %prior.filename, "already imported, skipping");
        return Ok(ImportOutcome::AlreadyImported {
            filename: prior.filename,
            imported_at: prior.created_at,
        });
    }

    let xml = std::str::from_utf8(bytes)
        .map_err(|e| CatalogError::MalformedXml(e.to_string()))?;
    let record = extract_record(xml)?;

    let (book, change) = resolve_and_persist(catalog, &record)?;
    let conflicted = detect_conflicts(catalog, book.id)?;
    let new_conflicts = record_conflicts(catalog, book.id, &conflicted)?;
    catalog.record_import(filename, &hash)?;

    info!(filename, book_id = book.id, %change, new_conflicts, "imported");
    Ok(ImportOutcome::Applied {
        book,
        change,
        new_conflicts,
    })
}

/// Read a file from disk and import it. The ledger records the file's
/// name; dedup is by content, so the same bytes under another name still
/// short-circuit.
pub fn import_path(catalog: &mut Catalog, path: &Path) -> Result<ImportOutcome> {
    let bytes = fs::read(path)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    import_bytes(catalog, &filename, &bytes)
}
