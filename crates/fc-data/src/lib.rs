//! Loading for the FloatChat engine: catalogs from JSON, config from TOML.

pub mod catalog;
pub mod config;
pub mod error;

pub use catalog::{load_catalog, parse_catalog, reference_catalog};
pub use config::{load_config, parse_config};
pub use error::{DataError, Result};
