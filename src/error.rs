
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RulegraphError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Format error: {message}, offending fragment: {fragment}")]
    Format { message: String, fragment: String },
    #[error(
        "Cardinality violation: {kind} '{name}' carries {count} references on the one-to-many field {field}"
    )]
    Cardinality {
        kind: &'static str,
        name: String,
        field: &'static str,
        count: usize,
    },
    #[error(
        "Unresolved reference: {kind} '{name}' references the missing {target_kind} '{reference}' on field {field}"
    )]
    UnresolvedReference {
        kind: &'static str,
        name: String,
        field: &'static str,
        target_kind: &'static str,
        reference: String,
    },
    #[error("There is no relationship on the field {field} in which '{name}' is a target")]
    NoRelationshipFound { name: String, field: String },
    #[error("Schema creation failed: {0}")]
    SchemaCreation(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, RulegraphError>;

// Helper conversions
impl From<rusqlite::Error> for RulegraphError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}
