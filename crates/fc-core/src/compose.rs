//! Comparison series composition.
//!
//! Aligns the selected floats' profiles for one parameter onto a shared,
//! ascending depth axis. Each row carries one slot per selected float; a
//! float without a reading at that depth leaves its slot empty. Empty slots
//! are never filled with zero or interpolated, so charts can break the line
//! instead of drawing a false value.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::catalog::{ProfileSeries, ProfileSource};
use crate::selection::{SelectionSet, palette_color};

/// One plotted line: which float occupies which slot.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeriesSlot {
    /// 1-based slot number.
    pub slot: usize,
    pub float_id: String,
    pub color: &'static str,
}

impl SeriesSlot {
    /// Column key used in chart rows (`float1`, `float2`, ...).
    pub fn key(&self) -> String {
        slot_key(self.slot)
    }
}

fn slot_key(slot: usize) -> String {
    format!("float{slot}")
}

/// Values at one depth; `values[i]` belongs to `slots[i]` of the parent series.
#[derive(Clone, Debug, PartialEq)]
pub struct ComparisonRow {
    pub depth: f64,
    pub values: Vec<Option<f64>>,
}

impl ComparisonRow {
    /// Value for a 1-based slot.
    pub fn value(&self, slot: usize) -> Option<f64> {
        slot.checked_sub(1)
            .and_then(|i| self.values.get(i))
            .copied()
            .flatten()
    }

    fn present(&self) -> Vec<f64> {
        self.values.iter().flatten().copied().collect()
    }
}

/// Serializes as `{"depth": 10, "float1": 18.2, "float3": 18.8}`, omitting empty slots.
impl Serialize for ComparisonRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let present = self.values.iter().filter(|v| v.is_some()).count();
        let mut map = serializer.serialize_map(Some(1 + present))?;
        map.serialize_entry("depth", &self.depth)?;
        for (i, v) in self.values.iter().enumerate() {
            if let Some(v) = v {
                map.serialize_entry(&slot_key(i + 1), v)?;
            }
        }
        map.end()
    }
}

/// Depth-aligned comparison of one parameter across the selection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparisonSeries {
    pub parameter: String,
    pub slots: Vec<SeriesSlot>,
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonSeries {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every slot re-expressed relative to slot 1 (`value_k - value_1`).
    /// Slot 1 becomes 0 wherever it has a value; rows lacking a baseline are all empty.
    pub fn differences(&self) -> ComparisonSeries {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let baseline = row.values.first().copied().flatten();
                let values = row
                    .values
                    .iter()
                    .map(|v| match (v, baseline) {
                        (Some(v), Some(b)) => Some(v - b),
                        _ => None,
                    })
                    .collect();
                ComparisonRow {
                    depth: row.depth,
                    values,
                }
            })
            .collect();
        ComparisonSeries {
            parameter: self.parameter.clone(),
            slots: self.slots.clone(),
            rows,
        }
    }
}

/// Build the comparison for `parameter` over the selection, in selection order.
pub fn compose(
    selection: &SelectionSet,
    parameter: &str,
    source: &impl ProfileSource,
) -> ComparisonSeries {
    let slots: Vec<SeriesSlot> = selection
        .ids()
        .iter()
        .enumerate()
        .map(|(i, id)| SeriesSlot {
            slot: i + 1,
            float_id: id.clone(),
            color: palette_color(i),
        })
        .collect();

    let series: Vec<Option<&ProfileSeries>> =
        slots.iter().map(|s| source.profile(&s.float_id)).collect();

    let mut depths: Vec<f64> = series
        .iter()
        .flatten()
        .flat_map(|s| s.points.iter().map(|p| depth_key(p.depth)))
        .collect();
    depths.sort_by(f64::total_cmp);
    depths.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);

    // One cursor per series; profiles are depth-sorted so each advances monotonically.
    let mut cursors = vec![0usize; series.len()];
    let mut rows = Vec::with_capacity(depths.len());
    for depth in depths {
        let values = series
            .iter()
            .zip(cursors.iter_mut())
            .map(|(s, cursor)| {
                let points = &(*s)?.points;
                while *cursor < points.len()
                    && depth_key(points[*cursor].depth).total_cmp(&depth) == Ordering::Less
                {
                    *cursor += 1;
                }
                let point = points.get(*cursor)?;
                if depth_key(point.depth).total_cmp(&depth) == Ordering::Equal {
                    point.value(parameter)
                } else {
                    None
                }
            })
            .collect();
        rows.push(ComparisonRow { depth, values });
    }

    ComparisonSeries {
        parameter: parameter.to_string(),
        slots,
        rows,
    }
}

/// `-0.0` and `0.0` are the same depth.
fn depth_key(depth: f64) -> f64 {
    depth + 0.0
}

/// How the comparison is presented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMode {
    #[default]
    Overlay,
    Difference,
    Statistics,
}

impl FromStr for ComparisonMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overlay" => Ok(ComparisonMode::Overlay),
            "difference" => Ok(ComparisonMode::Difference),
            "statistics" => Ok(ComparisonMode::Statistics),
            other => Err(format!("unknown comparison mode '{other}'")),
        }
    }
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComparisonMode::Overlay => "overlay",
            ComparisonMode::Difference => "difference",
            ComparisonMode::Statistics => "statistics",
        };
        f.write_str(s)
    }
}

/// Summary figures for a multi-float comparison.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ComparisonStats {
    /// Mean over rows of the mean absolute pairwise difference between present slots.
    pub mean_abs_difference: Option<f64>,
    /// Pearson correlation of slot 1 and slot 2 over depths where both are present.
    pub correlation: Option<f64>,
    pub max_depth: Option<f64>,
}

impl ComparisonStats {
    /// `None` unless at least two floats are being compared.
    pub fn of(series: &ComparisonSeries) -> Option<Self> {
        if series.slots.len() < 2 {
            return None;
        }

        let row_means: Vec<f64> = series
            .rows
            .iter()
            .filter_map(|row| mean_pairwise_abs_diff(&row.present()))
            .collect();
        let mean_abs_difference = mean(&row_means);

        let pairs: Vec<(f64, f64)> = series
            .rows
            .iter()
            .filter_map(|row| Some((row.value(1)?, row.value(2)?)))
            .collect();

        Some(Self {
            mean_abs_difference,
            correlation: pearson(&pairs),
            max_depth: series.rows.last().map(|r| r.depth),
        })
    }
}

fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

fn mean_pairwise_abs_diff(values: &[f64]) -> Option<f64> {
    let mut diffs = Vec::new();
    for (i, a) in values.iter().enumerate() {
        for b in &values[i + 1..] {
            diffs.push((a - b).abs());
        }
    }
    mean(&diffs)
}

fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx) * (x - mx);
        syy += (y - my) * (y - my);
    }
    let denom = (sxx * syy).sqrt();
    if denom == 0.0 {
        return None;
    }
    Some(sxy / denom)
}

/// Comparison ready for presentation in a given mode.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparisonView {
    pub mode: ComparisonMode,
    pub series: ComparisonSeries,
    /// Populated whenever two or more floats are compared, in every mode.
    pub stats: Option<ComparisonStats>,
}

pub fn compose_view(
    selection: &SelectionSet,
    parameter: &str,
    source: &impl ProfileSource,
    mode: ComparisonMode,
) -> ComparisonView {
    let series = compose(selection, parameter, source);
    let stats = ComparisonStats::of(&series);
    let series = match mode {
        ComparisonMode::Difference => series.differences(),
        ComparisonMode::Overlay | ComparisonMode::Statistics => series,
    };
    ComparisonView {
        mode,
        series,
        stats,
    }
}

/// Single-float profile: `(depth, value)` pairs where `parameter` was recorded.
pub fn profile_of(source: &impl ProfileSource, float_id: &str, parameter: &str) -> Vec<(f64, f64)> {
    source
        .profile(float_id)
        .map(|s| {
            s.points
                .iter()
                .filter_map(|p| Some((p.depth, p.value(parameter)?)))
                .collect()
        })
        .unwrap_or_default()
}

/// Headline figures for one float's profile of a parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ProfileSummary {
    /// Shallowest recorded value.
    pub surface_value: Option<f64>,
    /// Deepest recorded value.
    pub deep_value: Option<f64>,
    /// Deepest point in the profile, whether or not it records `parameter`.
    pub max_depth: Option<f64>,
}

impl ProfileSummary {
    /// All fields `None` when the float has no profile.
    pub fn of(source: &impl ProfileSource, float_id: &str, parameter: &str) -> Self {
        let Some(series) = source.profile(float_id) else {
            return Self::default();
        };
        let mut values = series.points.iter().filter_map(|p| p.value(parameter));
        Self {
            surface_value: values.next(),
            deep_value: series.points.iter().rev().find_map(|p| p.value(parameter)),
            max_depth: series.max_depth(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProfilePoint;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    fn source(series: &[(&str, &[(f64, Option<f64>)])]) -> HashMap<String, ProfileSeries> {
        series
            .iter()
            .map(|(id, pts)| {
                let points = pts
                    .iter()
                    .map(|(d, v)| match v {
                        Some(v) => ProfilePoint::new(*d).with("temperature", *v),
                        None => ProfilePoint::new(*d).with("salinity", 35.0),
                    })
                    .collect();
                (id.to_string(), ProfileSeries::new(id, points))
            })
            .collect()
    }

    #[test]
    fn test_union_of_depths_with_absent_slots() {
        let src = source(&[
            ("X", &[(0.0, Some(18.5)), (10.0, Some(18.2))]),
            ("Y", &[(0.0, Some(17.8)), (25.0, Some(17.1))]),
        ]);
        let sel = SelectionSet::from_ids(5, ["X", "Y"]);
        let out = compose(&sel, "temperature", &src);

        let depths: Vec<f64> = out.rows.iter().map(|r| r.depth).collect();
        assert_eq!(depths, vec![0.0, 10.0, 25.0]);
        assert_eq!(out.rows[0].values, vec![Some(18.5), Some(17.8)]);
        assert_eq!(out.rows[1].value(1), Some(18.2));
        assert_eq!(out.rows[1].value(2), None);
        assert_eq!(out.rows[2].value(1), None);
        assert_eq!(out.rows[2].value(2), Some(17.1));
    }

    #[test]
    fn test_empty_selection_yields_empty_series() {
        let src = source(&[("X", &[(0.0, Some(1.0))])]);
        let out = compose(&SelectionSet::default(), "temperature", &src);
        assert!(out.is_empty());
        assert!(out.slots.is_empty());
    }

    #[test]
    fn test_missing_parameter_and_missing_profile_are_absent() {
        let src = source(&[("X", &[(0.0, None), (10.0, Some(4.0))])]);
        let sel = SelectionSet::from_ids(5, ["X", "ghost"]);
        let out = compose(&sel, "temperature", &src);
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0].values, vec![None, None]);
        assert_eq!(out.rows[1].values, vec![Some(4.0), None]);
        assert_eq!(out.slots[1].float_id, "ghost");
    }

    #[test]
    fn test_slots_follow_selection_order() {
        let src = source(&[("X", &[(0.0, Some(1.0))]), ("Y", &[(0.0, Some(2.0))])]);
        let sel = SelectionSet::from_ids(5, ["Y", "X"]);
        let out = compose(&sel, "temperature", &src);
        assert_eq!(out.slots[0].float_id, "Y");
        assert_eq!(out.slots[0].key(), "float1");
        assert_eq!(out.slots[1].color, "#3b82f6");
        assert_eq!(out.rows[0].values, vec![Some(2.0), Some(1.0)]);
        assert_eq!(compose(&sel, "temperature", &src), out);
    }

    #[test]
    fn test_row_serializes_without_absent_slots() {
        let row = ComparisonRow {
            depth: 10.0,
            values: vec![Some(18.2), None, Some(18.8)],
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"depth": 10.0, "float1": 18.2, "float3": 18.8})
        );
    }

    #[test]
    fn test_differences_relative_to_first_slot() {
        let src = source(&[
            ("X", &[(0.0, Some(18.5)), (10.0, Some(18.2))]),
            ("Y", &[(0.0, Some(17.5)), (25.0, Some(17.1))]),
        ]);
        let sel = SelectionSet::from_ids(5, ["X", "Y"]);
        let diff = compose(&sel, "temperature", &src).differences();
        assert_eq!(diff.rows[0].values, vec![Some(0.0), Some(-1.0)]);
        assert_eq!(diff.rows[1].values, vec![Some(0.0), None]);
        assert_eq!(diff.rows[2].values, vec![None, None]);
    }

    #[test]
    fn test_stats_need_two_floats() {
        let src = source(&[("X", &[(0.0, Some(1.0))])]);
        let sel = SelectionSet::from_ids(5, ["X"]);
        assert!(ComparisonStats::of(&compose(&sel, "temperature", &src)).is_none());
    }

    #[test]
    fn test_stats_values() {
        let src = source(&[
            ("X", &[(0.0, Some(18.0)), (10.0, Some(16.0)), (50.0, Some(12.0))]),
            ("Y", &[(0.0, Some(17.0)), (10.0, Some(15.0)), (50.0, Some(11.0))]),
        ]);
        let sel = SelectionSet::from_ids(5, ["X", "Y"]);
        let stats = ComparisonStats::of(&compose(&sel, "temperature", &src)).unwrap();
        assert_relative_eq!(stats.mean_abs_difference.unwrap(), 1.0);
        assert_relative_eq!(stats.correlation.unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(stats.max_depth, Some(50.0));
    }

    #[test]
    fn test_view_modes() {
        let src = source(&[
            ("X", &[(0.0, Some(18.0)), (10.0, Some(16.0))]),
            ("Y", &[(0.0, Some(17.0)), (10.0, Some(14.0))]),
        ]);
        let sel = SelectionSet::from_ids(5, ["X", "Y"]);
        let overlay = compose_view(&sel, "temperature", &src, ComparisonMode::Overlay);
        assert_relative_eq!(overlay.stats.unwrap().mean_abs_difference.unwrap(), 1.5);
        assert_eq!(overlay.series.rows[1].value(2), Some(14.0));

        let diff = compose_view(&sel, "temperature", &src, ComparisonMode::Difference);
        assert_eq!(diff.series.rows[1].value(2), Some(-2.0));
        // Stats describe the raw values, not the differences
        assert_eq!(diff.stats, overlay.stats);

        let single = SelectionSet::from_ids(5, ["X"]);
        assert!(compose_view(&single, "temperature", &src, ComparisonMode::Overlay).stats.is_none());

        let stats = compose_view(&sel, "temperature", &src, ComparisonMode::Statistics);
        assert_relative_eq!(stats.stats.unwrap().mean_abs_difference.unwrap(), 1.5);
        assert_eq!("difference".parse::<ComparisonMode>(), Ok(ComparisonMode::Difference));
    }

    #[test]
    fn test_profile_of_skips_missing_readings() {
        let src = source(&[("X", &[(0.0, Some(18.5)), (10.0, None), (25.0, Some(17.8))])]);
        assert_eq!(profile_of(&src, "X", "temperature"), vec![(0.0, 18.5), (25.0, 17.8)]);
        assert!(profile_of(&src, "nope", "temperature").is_empty());
    }

    #[test]
    fn test_negative_zero_shares_a_row_with_zero() {
        let src = source(&[
            ("X", &[(-0.0, Some(18.0)), (10.0, Some(16.0))]),
            ("Y", &[(0.0, Some(17.0)), (10.0, Some(15.0))]),
        ]);
        let sel = SelectionSet::from_ids(5, ["X", "Y"]);
        let out = compose(&sel, "temperature", &src);
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0].values, vec![Some(18.0), Some(17.0)]);
        assert!(out.rows[0].depth.is_sign_positive());
    }

    #[test]
    fn test_negative_zero_in_hand_built_series() {
        let mut src = HashMap::new();
        src.insert(
            "X".to_string(),
            ProfileSeries {
                float_id: "X".into(),
                points: vec![ProfilePoint::new(-0.0).with("temperature", 18.0)],
            },
        );
        src.insert(
            "Y".to_string(),
            ProfileSeries {
                float_id: "Y".into(),
                points: vec![ProfilePoint::new(0.0).with("temperature", 17.0)],
            },
        );
        let sel = SelectionSet::from_ids(5, ["X", "Y"]);
        let out = compose(&sel, "temperature", &src);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].values, vec![Some(18.0), Some(17.0)]);
    }

    #[test]
    fn test_profile_summary() {
        let src = source(&[(
            "X",
            &[(0.0, None), (10.0, Some(18.2)), (500.0, Some(5.2)), (2000.0, None)],
        )]);
        let summary = ProfileSummary::of(&src, "X", "temperature");
        assert_eq!(summary.surface_value, Some(18.2));
        assert_eq!(summary.deep_value, Some(5.2));
        assert_eq!(summary.max_depth, Some(2000.0));

        let none = ProfileSummary::of(&src, "X", "oxygen");
        assert_eq!(none.surface_value, None);
        assert_eq!(none.deep_value, None);
        assert_eq!(none.max_depth, Some(2000.0));

        assert_eq!(ProfileSummary::of(&src, "ghost", "temperature"), ProfileSummary::default());
    }
}
