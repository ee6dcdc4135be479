//! FloatChat exploration engine.
//!
//! Client-side state for exploring a catalog of ARGO profiling floats:
//! faceted filtering, a bounded comparison selection, depth-aligned
//! comparison series, export configuration with size estimates, and a chat
//! session whose replies arrive after a fixed delay.
//!
//! Zero I/O. The catalog, the reply backend and export execution are all
//! supplied or consumed by the caller.

pub mod catalog;
pub mod compose;
pub mod config;
pub mod constants;
pub mod conversation;
pub mod export;
pub mod filter;
pub mod parameter;
pub mod responder;
pub mod selection;
pub mod time;

pub use catalog::{
    Catalog, FloatRecord, FloatStatus, ProfilePoint, ProfileSeries, ProfileSource, ViewStats,
};
pub use compose::{
    ComparisonMode, ComparisonRow, ComparisonSeries, ComparisonStats, ComparisonView,
    ProfileSummary, SeriesSlot, compose, compose_view, profile_of,
};
pub use config::{ConversationConfig, EngineConfig, EstimatorConfig};
pub use constants::{COMPARISON_CAPACITY, COMPARISON_PALETTE, GREETING, QUICK_PROMPTS};
pub use conversation::{
    Attachment, AttachmentKind, ConversationSession, Message, MessageId, Role, SessionState,
};
pub use export::{
    DateRange, ExportAction, ExportConfig, ExportFormat, ExportIntent, ExportIssue,
    ExportRejected, ExportSummary, PreviewRow, build_export_intent, estimate_records,
    estimate_size_kb, export_filename, preview_rows, validate, validation_issues,
};
pub use filter::{FilterCriteria, RegionFacet, StatusFacet, apply_filters};
pub use parameter::{PARAMETERS, Parameter, parameter};
pub use responder::{RandomResponder, Reply, Responder, ScriptedResponder, reference_replies};
pub use selection::{SelectionAction, SelectionSet, ToggleOutcome};
pub use time::{Date, DateParseError};
