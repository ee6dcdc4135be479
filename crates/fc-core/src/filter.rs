//! Faceted filtering over the float catalog.
//!
//! Three independent facets (region, status, free-text search) combined with
//! logical AND. Filtering never reorders: output preserves input order.

use serde::{Deserialize, Serialize};

use crate::catalog::{FloatRecord, FloatStatus};

/// Region facet: everything, or one exact region name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionFacet {
    #[default]
    All,
    Named(String),
}

impl RegionFacet {
    /// `"all"` selects every region; anything else is an exact region name.
    pub fn parse(s: &str) -> Self {
        if s == "all" {
            RegionFacet::All
        } else {
            RegionFacet::Named(s.to_string())
        }
    }

    fn matches(&self, region: &str) -> bool {
        match self {
            RegionFacet::All => true,
            RegionFacet::Named(name) => name == region,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusFacet {
    #[default]
    All,
    Only(FloatStatus),
}

impl StatusFacet {
    pub fn parse(s: &str) -> Result<Self, String> {
        if s == "all" {
            Ok(StatusFacet::All)
        } else {
            s.parse().map(StatusFacet::Only)
        }
    }

    fn matches(&self, status: FloatStatus) -> bool {
        match self {
            StatusFacet::All => true,
            StatusFacet::Only(s) => *s == status,
        }
    }
}

/// Filter settings for one invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub region: RegionFacet,
    pub status: StatusFacet,
    pub search_text: String,
}

impl FilterCriteria {
    /// True when `float` passes every facet.
    pub fn matches(&self, float: &FloatRecord) -> bool {
        let region_ok = self.region.matches(&float.region);
        let status_ok = self.status.matches(float.status);
        let search_ok = search_matches(&self.search_text, float);
        region_ok && status_ok && search_ok
    }
}

/// Case-insensitive substring match on id or region. Empty text matches all.
fn search_matches(text: &str, float: &FloatRecord) -> bool {
    if text.is_empty() {
        return true;
    }
    let needle = text.to_lowercase();
    float.id.to_lowercase().contains(&needle) || float.region.to_lowercase().contains(&needle)
}

/// Floats passing `criteria`, in input order.
pub fn apply_filters<'a>(
    floats: impl IntoIterator<Item = &'a FloatRecord>,
    criteria: &FilterCriteria,
) -> Vec<&'a FloatRecord> {
    floats.into_iter().filter(|f| criteria.matches(f)).collect()
}
