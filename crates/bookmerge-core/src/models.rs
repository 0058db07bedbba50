use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scheme under which a publisher's own record identifier is stored.
pub const PUB_ID_SCHEME: &str = "PUB_ID";

/// Storage length bounds, enforced by the persistence layer.
pub const TITLE_MAX_LEN: usize = 128;
pub const DESCRIPTION_MAX_LEN: usize = 1024;
pub const SCHEME_MAX_LEN: usize = 40;
pub const VALUE_MAX_LEN: usize = 255;
pub const FILENAME_MAX_LEN: usize = 255;
pub const CONFLICT_DESCRIPTION_MAX_LEN: usize = 40;

/// Whether resolving an incoming record created a new book or updated an
/// existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Created => write!(f, "created"),
            ChangeKind::Updated => write!(f, "updated"),
        }
    }
}

/// A catalog entry. Title and description are overwritten in full on
/// re-import; books are never deleted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Book \"{}\"", self.title)
    }
}

/// An identifier known for a book, e.g. an ISBN-10, ISBN-13 or the
/// publisher's own id under [`PUB_ID_SCHEME`].
///
/// Scheme and value are optional because malformed source aliases carry
/// their missing attributes forward as NULL; such aliases never match
/// anything in conflict detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alias {
    pub id: i64,
    pub book_id: i64,
    pub scheme: Option<String>,
    pub value: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.scheme.as_deref().unwrap_or("-"),
            self.value.as_deref().unwrap_or("-")
        )
    }
}

/// Record that one of `book_id`'s aliases collides with `alias_id`, an
/// alias owned by a different book. Pure association record: resolution is
/// left to external curation tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: i64,
    pub book_id: i64,
    pub alias_id: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Ledger entry marking a source file's content hash as already processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub id: i64,
    pub filename: String,
    pub sha1: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for ImportRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_display() {
        let book = Book {
            id: 42,
            title: "El Título".to_string(),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(book.to_string(), "Book \"El Título\"");
    }

    #[test]
    fn test_alias_display_handles_missing_attrs() {
        let alias = Alias {
            id: 1,
            book_id: 42,
            scheme: Some("FØØ-12".to_string()),
            value: None,
            created_at: Utc::now(),
        };
        assert_eq!(alias.to_string(), "FØØ-12/-");
    }

    #[test]
    fn test_change_kind_display() {
        assert_eq!(ChangeKind::Created.to_string(), "created");
        assert_eq!(ChangeKind::Updated.to_string(), "updated");
    }
}
