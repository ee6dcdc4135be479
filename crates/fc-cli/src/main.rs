use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fc_core::{
    Catalog, ComparisonMode, ComparisonView, ConversationSession, Date, DateRange, EngineConfig,
    ExportConfig, ExportFormat, ExportSummary, FilterCriteria, Message, PARAMETERS,
    ProfileSummary, QUICK_PROMPTS, RandomResponder, RegionFacet, Responder, Role,
    ScriptedResponder, SelectionSet, StatusFacet, ToggleOutcome, ViewStats, apply_filters,
    build_export_intent, compose_view, parameter, preview_rows, profile_of,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser)]
#[command(name = "fc", about = "Explore ARGO float data from the command line")]
struct Cli {
    /// Catalog JSON file (defaults to the bundled reference catalog)
    #[arg(long, global = true, env = "FC_CATALOG")]
    catalog: Option<PathBuf>,

    /// Engine config TOML file
    #[arg(long, global = true, env = "FC_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List floats matching the region, status and search facets
    Floats {
        /// Region name, or "all"
        #[arg(long, default_value = "all")]
        region: String,

        /// "active", "inactive" or "all"
        #[arg(long, default_value = "all")]
        status: String,

        /// Matches float ids and region names, case-insensitive
        #[arg(long, default_value = "")]
        search: String,
    },

    /// Print one float's depth profile
    Profile {
        id: String,

        #[arg(long, default_value = "temperature")]
        parameter: String,
    },

    /// Compare up to five floats on one parameter
    Compare {
        /// Float ids, in slot order
        #[arg(required = true)]
        ids: Vec<String>,

        #[arg(long, default_value = "temperature")]
        parameter: String,

        /// overlay, difference or statistics
        #[arg(long, default_value = "overlay")]
        mode: ComparisonMode,

        /// Emit the comparison view as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configure an export and print its intent
    Export {
        /// csv, netcdf or json
        #[arg(long, default_value = "csv")]
        format: ExportFormat,

        /// Float to include (repeatable)
        #[arg(long = "float")]
        floats: Vec<String>,

        /// Parameter to include (repeatable)
        #[arg(long = "param")]
        params: Vec<String>,

        #[arg(long, default_value = "2024-01-01")]
        from: Date,

        #[arg(long, default_value = "2024-01-31")]
        to: Date,

        /// Leave float metadata out of the export
        #[arg(long)]
        no_metadata: bool,

        /// Print the first N rows the export would contain
        #[arg(long, default_value_t = 0)]
        preview: usize,

        /// Request date used in the filename (defaults to today, UTC)
        #[arg(long)]
        on: Option<Date>,
    },

    /// Chat with the data assistant (reads lines from stdin)
    Chat {
        /// Seed for the reply picker
        #[arg(long)]
        seed: Option<u64>,

        /// Echo the user's messages back instead of canned replies
        #[arg(long)]
        echo: bool,

        /// On end of input, wait for pending replies instead of cancelling them
        #[arg(long)]
        drain: bool,
    },

    /// List known measurement parameters
    Params,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn open_catalog(cli: &Cli) -> Result<Catalog> {
    match &cli.catalog {
        Some(path) => fc_data::load_catalog(path)
            .with_context(|| format!("failed to load catalog {}", path.display())),
        None => fc_data::reference_catalog().context("failed to load reference catalog"),
    }
}

fn open_config(cli: &Cli) -> Result<EngineConfig> {
    match &cli.config {
        Some(path) => fc_data::load_config(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Floats {
            region,
            status,
            search,
        } => cmd_floats(&cli, region, status, search),
        Commands::Profile { id, parameter } => cmd_profile(&cli, id, parameter),
        Commands::Compare {
            ids,
            parameter,
            mode,
            json,
        } => cmd_compare(&cli, ids, parameter, *mode, *json),
        Commands::Export {
            format,
            floats,
            params,
            from,
            to,
            no_metadata,
            preview,
            on,
        } => {
            let mut config = ExportConfig::new(DateRange::new(*from, *to));
            config.format = *format;
            config.include_metadata = !no_metadata;
            for id in floats {
                config.toggle_float(id);
            }
            for p in params {
                config.toggle_parameter(p);
            }
            cmd_export(&cli, &config, *preview, on.unwrap_or_else(Date::today))
        }
        Commands::Chat { seed, echo, drain } => {
            let config = open_config(&cli)?;
            if *echo {
                run_chat(ScriptedResponder::echo(), &config, *drain).await
            } else {
                let responder = match seed {
                    Some(seed) => RandomResponder::seeded(*seed),
                    None => RandomResponder::reference(),
                };
                run_chat(responder, &config, *drain).await
            }
        }
        Commands::Params => {
            for p in &PARAMETERS {
                println!("{:<14} {:<18} {}", p.id, p.label, p.unit);
            }
            Ok(())
        }
    }
}

fn cmd_floats(cli: &Cli, region: &str, status: &str, search: &str) -> Result<()> {
    let catalog = open_catalog(cli)?;
    let criteria = FilterCriteria {
        region: RegionFacet::parse(region),
        status: StatusFacet::parse(status).map_err(anyhow::Error::msg)?,
        search_text: search.to_string(),
    };

    let visible = apply_filters(catalog.floats(), &criteria);
    for f in &visible {
        println!(
            "{:<8} {:<16} {:<8} {:>7.1} {:>7.1}  {}",
            f.id,
            f.region,
            f.status.as_str(),
            f.lat,
            f.lon,
            f.last_update
        );
    }
    let stats = ViewStats::of(visible.iter().copied());
    println!(
        "total: {}  active: {}  regions: {}",
        stats.total, stats.active, stats.regions
    );
    Ok(())
}

fn axis_label(name: &str) -> String {
    parameter(name)
        .map(|p| p.axis_label())
        .unwrap_or_else(|| name.to_string())
}

fn cmd_profile(cli: &Cli, id: &str, name: &str) -> Result<()> {
    let catalog = open_catalog(cli)?;
    let record = catalog
        .get(id)
        .with_context(|| format!("unknown float {id}"))?;

    println!("float {} ({}, {})", record.id, record.region, record.status);
    println!("{:>8}  {}", "depth", axis_label(name));
    let points = profile_of(&catalog, id, name);
    if points.is_empty() {
        println!("(no {name} readings)");
    }
    for (depth, value) in points {
        println!("{depth:>8.1}  {value:.2}");
    }

    let summary = ProfileSummary::of(&catalog, id, name);
    let unit = parameter(name).map(|p| p.unit).unwrap_or("");
    let fmt = |v: Option<f64>, unit: &str| {
        v.map_or_else(|| "-".to_string(), |v| format!("{v:.2} {unit}").trim_end().to_string())
    };
    println!("surface value: {}", fmt(summary.surface_value, unit));
    println!("max depth:     {}", fmt(summary.max_depth, "m"));
    println!("deep value:    {}", fmt(summary.deep_value, unit));
    Ok(())
}

fn cmd_compare(
    cli: &Cli,
    ids: &[String],
    name: &str,
    mode: ComparisonMode,
    json: bool,
) -> Result<()> {
    let catalog = open_catalog(cli)?;
    let config = open_config(cli)?;

    let mut selection = SelectionSet::new(config.selection_capacity);
    for id in ids {
        if catalog.get(id).is_none() {
            eprintln!("warning: {id} is not in the catalog");
        }
        match selection.toggle(id) {
            ToggleOutcome::Added => {}
            ToggleOutcome::Removed => eprintln!("{id} listed twice, deselected"),
            ToggleOutcome::Ignored => {
                eprintln!("ignored {id}: selection full ({})", selection.capacity())
            }
        }
    }

    let view = compose_view(&selection, name, &catalog, mode);
    if json {
        let out = serde_json::to_string_pretty(&view).context("failed to serialize comparison")?;
        println!("{out}");
    } else {
        print_comparison(&view, name);
    }
    Ok(())
}

fn print_comparison(view: &ComparisonView, name: &str) {
    println!("{} ({})", axis_label(name), view.mode);
    let mut header = format!("{:>8}", "depth");
    for slot in &view.series.slots {
        header.push_str(&format!("  {:>10}", slot.float_id));
    }
    println!("{header}");

    for row in &view.series.rows {
        let mut line = format!("{:>8.1}", row.depth);
        for value in &row.values {
            match value {
                Some(v) => line.push_str(&format!("  {v:>10.2}")),
                None => line.push_str(&format!("  {:>10}", "-")),
            }
        }
        println!("{line}");
    }

    if let Some(stats) = &view.stats {
        let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"));
        println!("mean |diff|:  {}", fmt(stats.mean_abs_difference));
        println!("correlation:  {}", fmt(stats.correlation));
        println!("max depth:    {}", fmt(stats.max_depth));
    }
}

fn cmd_export(cli: &Cli, config: &ExportConfig, preview: usize, on: Date) -> Result<()> {
    let catalog = open_catalog(cli)?;
    let engine = open_config(cli)?;

    for id in &config.floats {
        if catalog.get(id).is_none() {
            eprintln!("warning: {id} is not in the catalog");
        }
    }

    let summary = ExportSummary::of(config, &engine.estimator);
    println!(
        "format:      {} ({})",
        summary.format.label(),
        summary.format.description()
    );
    println!("floats:      {}", summary.floats);
    println!("parameters:  {}", summary.parameters);
    println!(
        "date range:  {} .. {} ({} days)",
        config.date_range.from, config.date_range.to, summary.span_days
    );
    println!("records:     ~{}", summary.records);
    println!("size:        ~{} KB", summary.size_kb);

    let intent = build_export_intent(config, on)?;
    let out = serde_json::to_string_pretty(&intent).context("failed to serialize export intent")?;
    println!("{out}");

    if preview > 0 {
        let names: Vec<&str> = config.parameters.iter().map(String::as_str).collect();
        println!("{:<8} {:<10} {:>8}  {}", "float", "date", "depth", names.join("  "));
        for row in preview_rows(config, &catalog, preview) {
            let values: Vec<String> = row
                .values
                .values()
                .map(|v| v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}")))
                .collect();
            println!(
                "{:<8} {:<10} {:>8.1}  {}",
                row.float_id,
                row.date,
                row.depth,
                values.join("  ")
            );
        }
    }
    Ok(())
}

fn print_reply(message: &Message) {
    println!("assistant> {}", message.content);
    for a in &message.attachments {
        println!("  [{:?}] {}: {}", a.kind, a.title, a.description);
    }
}

async fn run_chat<R: Responder>(responder: R, config: &EngineConfig, drain: bool) -> Result<()> {
    let session = ConversationSession::new(responder, &config.conversation);
    for m in session.messages() {
        print_reply(&m);
    }

    let mut events = session.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(message) if message.role == Role::System => print_reply(&message),
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => tracing::warn!(skipped = n, "reply printer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        let text = line.trim();

        match text {
            "/prompts" => {
                for (i, p) in QUICK_PROMPTS.iter().enumerate() {
                    println!("/{}  {p}", i + 1);
                }
            }
            _ => {
                let text = quick_prompt(text).unwrap_or(text);
                if session.send(text).is_none() {
                    tracing::debug!("blank input ignored");
                }
            }
        }
    }

    if drain {
        session.drain().await;
    }
    let transcript = session.close().await;
    printer.await.context("reply printer failed")?;
    tracing::info!(messages = transcript.len(), "chat closed");
    Ok(())
}

/// `/1`, `/2`, ... select a quick-action prompt.
fn quick_prompt(text: &str) -> Option<&'static str> {
    let n: usize = text.strip_prefix('/')?.parse().ok()?;
    QUICK_PROMPTS.get(n.checked_sub(1)?).copied()
}
