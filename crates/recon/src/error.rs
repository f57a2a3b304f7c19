use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty column list, bad amount combinator, etc.).
    ConfigValidation(String),
    /// Missing required column in input data.
    MissingColumn { adapter: String, column: String },
    /// Query filter rejected before hitting the backend.
    InvalidFilter(String),
    /// Backend query failed (connection, credentials, SQL).
    Query(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { adapter, column } => {
                write!(f, "adapter '{adapter}': missing column '{column}'")
            }
            Self::InvalidFilter(msg) => write!(f, "invalid query filter: {msg}"),
            Self::Query(msg) => write!(f, "system query failed: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
