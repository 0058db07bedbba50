use thiserror::Error;

/// All errors that can occur in bookmerge-core.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Malformed XML: {0}")]
    MalformedXml(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Import hash already recorded: {0}")]
    DuplicateHash(String),

    #[error("Book not found: {0}")]
    BookNotFound(i64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl CatalogError {
    /// True for errors caused by one bad input file. Batch drivers report
    /// these as a skipped file and continue; everything else is fatal.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CatalogError::MissingField(_) | CatalogError::MalformedXml(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
