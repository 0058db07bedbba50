use tracing::debug;

use crate::error::Result;
use crate::extract::BookRecord;
use crate::models::{Book, ChangeKind, PUB_ID_SCHEME};
use crate::storage::{ops, Catalog};

/// Resolve an extracted record against the catalog and persist it.
///
/// Exactly one existing `PUB_ID` alias match means the record updates that
/// alias's book; zero matches means a new book. More than one match also
/// falls through to creating a new book rather than treating the ambiguity
/// itself as a conflict — a known latent gap, kept deliberately. The
/// collision still gets recorded, because the new book's own PUB_ID alias
/// makes the conflict scan find the prior claimants.
///
/// The book write and all alias upserts happen in one transaction: a
/// validation failure on any field leaves no partial state behind.
pub fn resolve_and_persist(
    catalog: &mut Catalog,
    record: &BookRecord,
) -> Result<(Book, ChangeKind)> {
    let tx = catalog.transaction()?;

    let matches = ops::find_aliases(&tx, PUB_ID_SCHEME, &record.publisher_id)?;
    let (book_id, change) = if matches.len() == 1 {
        let id = matches[0].book_id;
        ops::update_book(&tx, id, &record.title, record.description.as_deref())?;
        (id, ChangeKind::Updated)
    } else {
        let id = ops::insert_book(&tx, &record.title, record.description.as_deref())?;
        (id, ChangeKind::Created)
    };

    for alias in &record.aliases {
        ops::upsert_alias(&tx, book_id, alias.scheme.as_deref(), alias.value.as_deref())?;
    }

    let book = ops::get_book(&tx, book_id)?;
    tx.commit()?;

    debug!(book_id, %change, title = %book.title, "resolved record");
    Ok((book, change))
}
