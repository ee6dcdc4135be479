/// Maximum floats that may be selected for side-by-side comparison.
pub const COMPARISON_CAPACITY: usize = 5;

/// Colour per comparison slot. Indexed by selection position, not float id.
pub const COMPARISON_PALETTE: [&str; COMPARISON_CAPACITY] =
    ["#ef4444", "#3b82f6", "#10b981", "#f59e0b", "#8b5cf6"];

/// Estimator: profile rows assumed per exported float.
/// Stand-in for a real row count from the data backend.
pub const RECORDS_PER_FLOAT: u64 = 50;

/// Estimator: kilobytes per exported record.
pub const BYTES_PER_RECORD_FACTOR: f64 = 0.1;

/// Delay before a scheduled assistant reply is appended (milliseconds).
pub const RESPONSE_LATENCY_MS: u64 = 1000;

/// Rows shown in the export preview table.
pub const EXPORT_PREVIEW_ROWS: usize = 5;

/// Filename prefix for export intents.
pub const EXPORT_FILENAME_PREFIX: &str = "argo_export_";

/// Opening assistant message for a freshly seeded conversation.
pub const GREETING: &str = "Hello! I'm your AI assistant for exploring ARGO ocean data. \
I can help you find information about ocean temperature, salinity, float locations, \
and much more. What would you like to know?";

/// Canned prompts offered beside the chat input.
pub const QUICK_PROMPTS: [&str; 3] = [
    "Show me global temperature anomalies",
    "Find floats near the Gulf Stream",
    "Compare salinity in Pacific vs Atlantic",
];
