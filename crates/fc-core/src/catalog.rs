use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::time::Date;

/// Deployment state of a float.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FloatStatus {
    Active,
    Inactive,
}

impl FloatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FloatStatus::Active => "active",
            FloatStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for FloatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FloatStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(FloatStatus::Active),
            "inactive" => Ok(FloatStatus::Inactive),
            other => Err(format!("unknown float status '{other}'")),
        }
    }
}

/// One autonomous profiling float as listed in the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloatRecord {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub status: FloatStatus,
    pub region: String,
    pub last_update: Date,
}

impl FloatRecord {
    pub fn is_active(&self) -> bool {
        self.status == FloatStatus::Active
    }
}

/// Readings at a single depth. Parameters are keyed by name (`temperature`,
/// `salinity`, ...) and serialize flat beside `depth`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfilePoint {
    pub depth: f64,
    #[serde(flatten)]
    pub parameters: BTreeMap<String, f64>,
}

impl ProfilePoint {
    pub fn new(depth: f64) -> Self {
        Self {
            depth,
            parameters: BTreeMap::new(),
        }
    }

    pub fn with(mut self, parameter: &str, value: f64) -> Self {
        self.parameters.insert(parameter.to_string(), value);
        self
    }

    pub fn value(&self, parameter: &str) -> Option<f64> {
        self.parameters.get(parameter).copied()
    }
}

/// Depth-ordered readings for one float.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSeries {
    pub float_id: String,
    pub points: Vec<ProfilePoint>,
}

impl ProfileSeries {
    /// Build a series, sorting points by ascending depth. `-0.0` is stored as `0.0`.
    pub fn new(float_id: &str, mut points: Vec<ProfilePoint>) -> Self {
        for p in &mut points {
            p.depth += 0.0;
        }
        points.sort_by(|a, b| a.depth.total_cmp(&b.depth));
        Self {
            float_id: float_id.to_string(),
            points,
        }
    }

    /// Value of `parameter` at exactly `depth`, if recorded.
    pub fn value_at(&self, depth: f64, parameter: &str) -> Option<f64> {
        self.points
            .iter()
            .find(|p| p.depth == depth)
            .and_then(|p| p.value(parameter))
    }

    pub fn max_depth(&self) -> Option<f64> {
        self.points.last().map(|p| p.depth)
    }
}

/// Lookup of profile data by float id.
pub trait ProfileSource {
    fn profile(&self, float_id: &str) -> Option<&ProfileSeries>;
}

impl ProfileSource for HashMap<String, ProfileSeries> {
    fn profile(&self, float_id: &str) -> Option<&ProfileSeries> {
        self.get(float_id)
    }
}

/// Immutable snapshot of floats and their profiles, supplied by the data layer.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    floats: Vec<FloatRecord>,
    profiles: HashMap<String, ProfileSeries>,
}

impl Catalog {
    pub fn new(floats: Vec<FloatRecord>, profiles: Vec<ProfileSeries>) -> Self {
        let profiles = profiles
            .into_iter()
            .map(|s| {
                let series = ProfileSeries::new(&s.float_id, s.points);
                (series.float_id.clone(), series)
            })
            .collect();
        Self { floats, profiles }
    }

    pub fn floats(&self) -> &[FloatRecord] {
        &self.floats
    }

    pub fn len(&self) -> usize {
        self.floats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.floats.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&FloatRecord> {
        self.floats.iter().find(|f| f.id == id)
    }

    /// Distinct regions in first-seen catalog order.
    pub fn regions(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.floats
            .iter()
            .map(|f| f.region.as_str())
            .filter(|r| seen.insert(*r))
            .collect()
    }

    /// Float ids that appear more than once, in catalog order.
    pub fn duplicate_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.floats
            .iter()
            .map(|f| f.id.as_str())
            .filter(|id| !seen.insert(*id))
            .collect()
    }
}

impl ProfileSource for Catalog {
    fn profile(&self, float_id: &str) -> Option<&ProfileSeries> {
        self.profiles.get(float_id)
    }
}

/// Summary counts over a filtered view of the catalog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ViewStats {
    pub total: usize,
    pub active: usize,
    pub regions: usize,
}

impl ViewStats {
    pub fn of<'a>(floats: impl IntoIterator<Item = &'a FloatRecord>) -> Self {
        let mut stats = ViewStats::default();
        let mut regions = HashSet::new();
        for f in floats {
            stats.total += 1;
            if f.is_active() {
                stats.active += 1;
            }
            regions.insert(f.region.as_str());
        }
        stats.regions = regions.len();
        stats
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn float(id: &str, region: &str, status: FloatStatus) -> FloatRecord {
        FloatRecord {
            id: id.to_string(),
            lat: 0.0,
            lon: 0.0,
            status,
            region: region.to_string(),
            last_update: Date::parse("2024-01-15").unwrap(),
        }
    }

    #[test]
    fn test_profile_series_sorted_on_construction() {
        let s = ProfileSeries::new(
            "x",
            vec![ProfilePoint::new(25.0), ProfilePoint::new(0.0), ProfilePoint::new(10.0)],
        );
        let depths: Vec<f64> = s.points.iter().map(|p| p.depth).collect();
        assert_eq!(depths, vec![0.0, 10.0, 25.0]);
        assert_eq!(s.max_depth(), Some(25.0));
    }

    #[test]
    fn test_negative_zero_depth_normalized() {
        let s = ProfileSeries::new(
            "x",
            vec![ProfilePoint::new(10.0), ProfilePoint::new(-0.0).with("temperature", 18.0)],
        );
        assert!(s.points[0].depth.is_sign_positive());
        assert_eq!(s.points[0].depth.total_cmp(&0.0), std::cmp::Ordering::Equal);
        assert_eq!(s.value_at(0.0, "temperature"), Some(18.0));
    }

    #[test]
    fn test_catalog_sorts_profiles() {
        let cat = Catalog::new(
            vec![float("a", "North", FloatStatus::Active)],
            vec![ProfileSeries {
                float_id: "a".into(),
                points: vec![
                    ProfilePoint::new(100.0).with("temperature", 13.5),
                    ProfilePoint::new(0.0).with("temperature", 18.5),
                ],
            }],
        );
        let series = cat.profile("a").unwrap();
        assert_eq!(series.points[0].depth, 0.0);
        assert_eq!(series.value_at(100.0, "temperature"), Some(13.5));
        assert_eq!(series.value_at(100.0, "salinity"), None);
        assert!(cat.profile("missing").is_none());
    }

    #[test]
    fn test_regions_first_seen_order() {
        let cat = Catalog::new(
            vec![
                float("a", "North Atlantic", FloatStatus::Active),
                float("b", "South Atlantic", FloatStatus::Inactive),
                float("c", "North Atlantic", FloatStatus::Active),
            ],
            vec![],
        );
        assert_eq!(cat.regions(), vec!["North Atlantic", "South Atlantic"]);
    }

    #[test]
    fn test_duplicate_ids() {
        let cat = Catalog::new(
            vec![
                float("a", "N", FloatStatus::Active),
                float("a", "S", FloatStatus::Active),
            ],
            vec![],
        );
        assert_eq!(cat.duplicate_ids(), vec!["a"]);
    }

    #[test]
    fn test_view_stats() {
        let floats = [
            float("a", "North", FloatStatus::Active),
            float("b", "South", FloatStatus::Inactive),
            float("c", "North", FloatStatus::Active),
        ];
        let stats = ViewStats::of(&floats);
        assert_eq!(stats, ViewStats { total: 3, active: 2, regions: 2 });
        assert_eq!(ViewStats::of(std::iter::empty::<&FloatRecord>()), ViewStats::default());
    }

    #[test]
    fn test_profile_point_wire_format_is_flat() {
        let p: ProfilePoint =
            serde_json::from_str(r#"{"depth": 10, "temperature": 18.2, "salinity": 35.3}"#)
                .unwrap();
        assert_eq!(p.depth, 10.0);
        assert_eq!(p.value("salinity"), Some(35.3));
    }

    #[test]
    fn test_float_record_wire_format() {
        let f: FloatRecord = serde_json::from_str(
            r#"{"id":"5904471","lat":45.2,"lon":-30.1,"status":"active",
                "region":"North Atlantic","lastUpdate":"2024-01-15"}"#,
        )
        .unwrap();
        assert!(f.is_active());
        assert_eq!(f.last_update.to_string(), "2024-01-15");
    }
}
