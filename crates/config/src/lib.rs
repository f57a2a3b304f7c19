// Configuration loading

pub mod catalog;
pub mod error;

pub use catalog::{Catalog, Partner, Store};
pub use error::ConfigError;
