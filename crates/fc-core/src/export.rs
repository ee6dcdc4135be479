//! Export configuration, validation, size estimation and intent emission.
//!
//! The engine never writes files. A valid configuration becomes an
//! [`ExportIntent`] that an external collaborator materializes; an invalid one
//! cannot produce an intent at all.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, ProfileSource};
use crate::config::EstimatorConfig;
use crate::constants::EXPORT_FILENAME_PREFIX;
use crate::time::Date;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    NetCdf,
    Json,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Csv, ExportFormat::NetCdf, ExportFormat::Json];

    /// Filename extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::NetCdf => "netcdf",
            ExportFormat::Json => "json",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::NetCdf => "NetCDF",
            ExportFormat::Json => "JSON",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "Comma-separated values",
            ExportFormat::NetCdf => "Network Common Data Form",
            ExportFormat::Json => "JavaScript Object Notation",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "netcdf" | "nc" => Ok(ExportFormat::NetCdf),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unknown export format '{other}'")),
        }
    }
}

/// Inclusive calendar range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Date,
    pub to: Date,
}

impl DateRange {
    pub fn new(from: Date, to: Date) -> Self {
        Self { from, to }
    }

    pub fn is_ordered(&self) -> bool {
        self.from <= self.to
    }

    /// Days from `from` to `to`; negative when inverted.
    pub fn span_days(&self) -> i64 {
        self.from.days_until(&self.to)
    }
}

/// User's export choices. Float and parameter sets are unbounded here,
/// unlike the comparison selection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfig {
    pub format: ExportFormat,
    pub floats: BTreeSet<String>,
    pub parameters: BTreeSet<String>,
    pub date_range: DateRange,
    pub include_metadata: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExportAction {
    SetFormat(ExportFormat),
    ToggleFloat(String),
    ToggleParameter(String),
    SetDateRange(DateRange),
    SetIncludeMetadata(bool),
}

impl ExportConfig {
    /// CSV, nothing selected, metadata included.
    pub fn new(date_range: DateRange) -> Self {
        Self {
            format: ExportFormat::default(),
            floats: BTreeSet::new(),
            parameters: BTreeSet::new(),
            date_range,
            include_metadata: true,
        }
    }

    pub fn toggle_float(&mut self, id: &str) {
        if !self.floats.remove(id) {
            self.floats.insert(id.to_string());
        }
    }

    pub fn toggle_parameter(&mut self, name: &str) {
        if !self.parameters.remove(name) {
            self.parameters.insert(name.to_string());
        }
    }

    /// Pure transition: the configuration after `action`.
    pub fn apply(&self, action: &ExportAction) -> Self {
        let mut next = self.clone();
        match action {
            ExportAction::SetFormat(f) => next.format = *f,
            ExportAction::ToggleFloat(id) => next.toggle_float(id),
            ExportAction::ToggleParameter(p) => next.toggle_parameter(p),
            ExportAction::SetDateRange(r) => next.date_range = *r,
            ExportAction::SetIncludeMetadata(b) => next.include_metadata = *b,
        }
        next
    }
}

/// Reason the export action is disabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportIssue {
    NoFloats,
    NoParameters,
    InvertedDateRange,
}

impl fmt::Display for ExportIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportIssue::NoFloats => write!(f, "no floats selected"),
            ExportIssue::NoParameters => write!(f, "no parameters selected"),
            ExportIssue::InvertedDateRange => write!(f, "date range ends before it starts"),
        }
    }
}

pub fn validation_issues(config: &ExportConfig) -> Vec<ExportIssue> {
    let mut issues = Vec::new();
    if config.floats.is_empty() {
        issues.push(ExportIssue::NoFloats);
    }
    if config.parameters.is_empty() {
        issues.push(ExportIssue::NoParameters);
    }
    if !config.date_range.is_ordered() {
        issues.push(ExportIssue::InvertedDateRange);
    }
    issues
}

/// True iff the export action may be invoked.
pub fn validate(config: &ExportConfig) -> bool {
    validation_issues(config).is_empty()
}

pub fn estimate_records(config: &ExportConfig, estimator: &EstimatorConfig) -> u64 {
    config.floats.len() as u64 * estimator.records_per_float
}

pub fn estimate_size_kb(config: &ExportConfig, estimator: &EstimatorConfig) -> u64 {
    let records = estimate_records(config, estimator);
    (records as f64 * estimator.bytes_per_record_factor).round() as u64
}

/// Everything the export summary panel shows.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExportSummary {
    pub format: ExportFormat,
    pub floats: usize,
    pub parameters: usize,
    pub span_days: i64,
    pub records: u64,
    pub size_kb: u64,
    pub issues: Vec<ExportIssue>,
}

impl ExportSummary {
    pub fn of(config: &ExportConfig, estimator: &EstimatorConfig) -> Self {
        Self {
            format: config.format,
            floats: config.floats.len(),
            parameters: config.parameters.len(),
            span_days: config.date_range.span_days(),
            records: estimate_records(config, estimator),
            size_kb: estimate_size_kb(config, estimator),
            issues: validation_issues(config),
        }
    }

    pub fn enabled(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Validated export request, handed to whatever actually writes the file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportIntent {
    pub filename: String,
    pub format: ExportFormat,
    pub floats: Vec<String>,
    pub parameters: Vec<String>,
    pub date_range: DateRange,
    pub include_metadata: bool,
}

/// The configuration failed validation; no intent was produced.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportRejected(pub Vec<ExportIssue>);

impl fmt::Display for ExportRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reasons: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "export disabled: {}", reasons.join(", "))
    }
}

impl std::error::Error for ExportRejected {}

/// `argo_export_2024-01-31.csv`
pub fn export_filename(format: ExportFormat, requested_on: Date) -> String {
    format!("{EXPORT_FILENAME_PREFIX}{requested_on}.{}", format.extension())
}

pub fn build_export_intent(
    config: &ExportConfig,
    requested_on: Date,
) -> Result<ExportIntent, ExportRejected> {
    let issues = validation_issues(config);
    if !issues.is_empty() {
        return Err(ExportRejected(issues));
    }
    Ok(ExportIntent {
        filename: export_filename(config.format, requested_on),
        format: config.format,
        floats: config.floats.iter().cloned().collect(),
        parameters: config.parameters.iter().cloned().collect(),
        date_range: config.date_range,
        include_metadata: config.include_metadata,
    })
}

/// One line of the export preview table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PreviewRow {
    pub float_id: String,
    pub date: Date,
    pub depth: f64,
    pub values: BTreeMap<String, Option<f64>>,
}

/// First `limit` rows the export would contain, float by float then by depth.
/// Floats unknown to the catalog or without profiles contribute nothing.
pub fn preview_rows(config: &ExportConfig, catalog: &Catalog, limit: usize) -> Vec<PreviewRow> {
    config
        .floats
        .iter()
        .filter_map(|id| Some((catalog.get(id)?, catalog.profile(id)?)))
        .flat_map(|(record, series)| {
            series.points.iter().map(move |p| PreviewRow {
                float_id: record.id.clone(),
                date: record.last_update,
                depth: p.depth,
                values: config
                    .parameters
                    .iter()
                    .map(|name| (name.clone(), p.value(name)))
                    .collect(),
            })
        })
        .take(limit)
        .collect()
}
