use std::collections::HashSet;

use tracing::warn;

use crate::error::Result;
use crate::models::Alias;
use crate::storage::{ops, Catalog};

/// Description written onto every auto-detected conflict.
const AUTO_DESCRIPTION: &str = "[Auto] created on import";

/// Every alias belonging to some other book whose (scheme, value) matches
/// one of `book_id`'s own current aliases.
///
/// Matching uses SQL `=`, so aliases with a NULL scheme or value never
/// match anything. Results are flattened across the book's aliases and
/// deduplicated by alias id, first-seen order preserved.
pub fn detect_conflicts(catalog: &Catalog, book_id: i64) -> Result<Vec<Alias>> {
    let mut seen: HashSet<i64> = HashSet::new();
    let mut conflicted = Vec::new();

    for alias in catalog.aliases_for_book(book_id)? {
        let (Some(scheme), Some(value)) = (alias.scheme.as_deref(), alias.value.as_deref())
        else {
            continue;
        };
        for foreign in catalog.find_foreign_aliases(scheme, value, book_id)? {
            if seen.insert(foreign.id) {
                conflicted.push(foreign);
            }
        }
    }

    Ok(conflicted)
}

/// Record a conflict for each foreign alias unless that exact
/// (book, alias) pair already exists. All inserts share one transaction.
/// Returns only the number of conflicts that did not already exist.
pub fn record_conflicts(
    catalog: &mut Catalog,
    book_id: i64,
    foreign_aliases: &[Alias],
) -> Result<usize> {
    let tx = catalog.transaction()?;
    let mut created = 0;
    for alias in foreign_aliases {
        if ops::upsert_conflict(&tx, book_id, alias.id, AUTO_DESCRIPTION)? {
            created += 1;
        }
    }
    tx.commit()?;

    if created > 0 {
        warn!(book_id, created, "recorded alias conflicts");
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_record;
    use crate::resolve::resolve_and_persist;

    fn seed(catalog: &mut Catalog, xml: &str) -> i64 {
        let record = extract_record(xml).unwrap();
        resolve_and_persist(catalog, &record).unwrap().0.id
    }

    #[test]
    fn test_detects_single_cross_book_collision() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let existing = seed(
            &mut catalog,
            r#"<book id="123"><title>The Title</title><aliases>
                <alias scheme="THIS" value="THAT"/>
                <alias scheme="FOO" value="BAR"/>
            </aliases></book>"#,
        );
        let newcomer = seed(
            &mut catalog,
            r#"<book id="789"><title>Ninjas are for Movies</title><aliases>
                <alias scheme="THIS" value="THAT"/>
            </aliases></book>"#,
        );

        let conflicted = detect_conflicts(&catalog, newcomer).unwrap();
        assert_eq!(conflicted.len(), 1);
        assert_eq!(conflicted[0].book_id, existing);
        assert_eq!(conflicted[0].scheme.as_deref(), Some("THIS"));
        assert_eq!(conflicted[0].value.as_deref(), Some("THAT"));
    }

    #[test]
    fn test_own_aliases_are_not_conflicts() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let book = seed(
            &mut catalog,
            r#"<book id="123"><title>The Title</title><aliases>
                <alias scheme="THIS" value="THAT"/>
                <alias scheme="FOO" value="BAR"/>
            </aliases></book>"#,
        );

        assert!(detect_conflicts(&catalog, book).unwrap().is_empty());
    }

    #[test]
    fn test_null_attribute_aliases_never_match() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let a = seed(
            &mut catalog,
            r#"<book id="1"><title>A</title><aliases><alias scheme="X"/></aliases></book>"#,
        );
        let b = seed(
            &mut catalog,
            r#"<book id="2"><title>B</title><aliases><alias scheme="X"/></aliases></book>"#,
        );

        assert!(detect_conflicts(&catalog, a).unwrap().is_empty());
        assert!(detect_conflicts(&catalog, b).unwrap().is_empty());
    }

    #[test]
    fn test_record_conflicts_counts_only_new() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        seed(
            &mut catalog,
            r#"<book id="123"><title>A</title><aliases>
                <alias scheme="THIS" value="THAT"/>
            </aliases></book>"#,
        );
        let newcomer = seed(
            &mut catalog,
            r#"<book id="789"><title>B</title><aliases>
                <alias scheme="THIS" value="THAT"/>
            </aliases></book>"#,
        );

        let found = detect_conflicts(&catalog, newcomer).unwrap();
        assert_eq!(record_conflicts(&mut catalog, newcomer, &found).unwrap(), 1);
        assert_eq!(catalog.count_conflicts().unwrap(), 1);

        // Unchanged data: repeated detection reports zero new conflicts.
        let again = detect_conflicts(&catalog, newcomer).unwrap();
        assert_eq!(record_conflicts(&mut catalog, newcomer, &again).unwrap(), 0);
        assert_eq!(catalog.count_conflicts().unwrap(), 1);
    }

    #[test]
    fn test_recording_the_same_alias_twice_creates_one_conflict() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        seed(
            &mut catalog,
            r#"<book id="123"><title>A</title></book>"#,
        );
        let newcomer = seed(
            &mut catalog,
            r#"<book id="456"><title>B</title><aliases>
                <alias scheme="PUB_ID" value="123"/>
            </aliases></book>"#,
        );

        let found = detect_conflicts(&catalog, newcomer).unwrap();
        assert_eq!(found.len(), 1);

        // A list containing duplicates still creates a single row.
        let doubled = [found.clone(), found].concat();
        assert_eq!(record_conflicts(&mut catalog, newcomer, &doubled).unwrap(), 1);
        assert_eq!(catalog.count_conflicts().unwrap(), 1);
    }
}
