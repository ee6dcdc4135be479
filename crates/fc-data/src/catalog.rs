use std::fs;
use std::path::Path;

use fc_core::{Catalog, FloatRecord, ProfileSeries};
use serde::Deserialize;

use crate::error::{DataError, Result};

/// The five-float catalog bundled with the engine.
const REFERENCE_CATALOG: &str = include_str!("../data/catalog.json");

/// On-disk catalog layout: `{ "floats": [...], "profiles": [...] }`.
#[derive(Deserialize)]
struct CatalogFile {
    floats: Vec<FloatRecord>,
    #[serde(default)]
    profiles: Vec<ProfileSeries>,
}

/// Parse a catalog from a JSON string and validate it.
pub fn parse_catalog(json: &str) -> Result<Catalog> {
    let file: CatalogFile = serde_json::from_str(json)?;

    for f in &file.floats {
        if !(-90.0..=90.0).contains(&f.lat) || !(-180.0..=180.0).contains(&f.lon) {
            return Err(DataError::InvalidData(format!(
                "float {} has out-of-range position ({}, {})",
                f.id, f.lat, f.lon
            )));
        }
    }
    for p in &file.profiles {
        if !file.floats.iter().any(|f| f.id == p.float_id) {
            tracing::warn!(float_id = %p.float_id, "profile for unknown float");
        }
    }

    let catalog = Catalog::new(file.floats, file.profiles);
    let dups = catalog.duplicate_ids();
    if !dups.is_empty() {
        return Err(DataError::InvalidData(format!(
            "duplicate float ids: {}",
            dups.join(", ")
        )));
    }
    Ok(catalog)
}

/// Load and validate a catalog file.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let json = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let catalog = parse_catalog(&json)?;
    tracing::info!(path = %path.display(), floats = catalog.len(), "catalog loaded");
    Ok(catalog)
}

/// The bundled reference catalog.
pub fn reference_catalog() -> Result<Catalog> {
    parse_catalog(REFERENCE_CATALOG)
}
