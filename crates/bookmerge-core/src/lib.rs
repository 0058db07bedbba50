pub mod config;
pub mod conflicts;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod import;
pub mod models;
pub mod resolve;
pub mod storage;

pub use config::AppConfig;
pub use conflicts::{detect_conflicts, record_conflicts};
pub use error::{CatalogError, Result};
pub use extract::{extract_record, AliasRef, BookRecord};
pub use fingerprint::fingerprint;
pub use import::{import_bytes, import_path, ImportOutcome};
pub use models::*;
pub use resolve::resolve_and_persist;
pub use storage::{Catalog, ConflictDetail};
