use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    /// Catalog file could not be read.
    Io { path: PathBuf, message: String },
    /// TOML parse / deserialization error.
    Parse { source: String, message: String },
    /// Broken cross reference or invalid entry.
    Validation(String),
    UnknownStore(u32),
    UnknownPartner(u32),
    UnknownAdapter(String),
    /// Partner exists but is not enabled for the store.
    PartnerNotAllowed { store: u32, partner: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "cannot read {}: {message}", path.display()),
            Self::Parse { source, message } => write!(f, "{source}: {message}"),
            Self::Validation(msg) => write!(f, "catalog validation error: {msg}"),
            Self::UnknownStore(id) => write!(f, "unknown store {id}"),
            Self::UnknownPartner(id) => write!(f, "unknown delivery partner {id}"),
            Self::UnknownAdapter(name) => write!(f, "unknown adapter '{name}'"),
            Self::PartnerNotAllowed { store, partner } => {
                write!(f, "partner {partner} is not enabled for store {store}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
