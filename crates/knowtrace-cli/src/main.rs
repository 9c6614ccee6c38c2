//! Knowtrace CLI - knowledge graph interaction telemetry

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use knowtrace_core::analytics;
use knowtrace_core::backend::{CypherBackend, GraphBackend};
use knowtrace_core::config::Config;
use knowtrace_core::graph::{GraphDocument, GraphStore};
use knowtrace_core::lifecycle::LifecycleManager;
use knowtrace_core::telemetry::{
    InteractionLog, InteractionReader, InteractionRecorder, Session,
};
use tracing::warn;

#[derive(Parser)]
#[command(name = "knowtrace")]
#[command(author, version, about = "Knowledge graph interaction telemetry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Skip the remote backend and run local-only
    #[arg(long, global = true)]
    offline: bool,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run health check
    Doctor,

    /// Show usage analytics across all learners
    Stats,

    /// Show one learner's activity and visit path
    Student {
        /// Learner id
        id: String,
    },

    /// Record a node view event
    Record {
        /// Learner id
        student: String,
        /// Node id (must exist in the graph)
        node: String,
        /// View duration in seconds
        #[arg(short, long, default_value_t = 0)]
        duration: u32,
    },

    /// Export CSV tables (events, per-learner summary, node heat)
    Export {
        /// Output directory (defaults to the current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Import the graph file into the remote backend
    Import,

    /// Scaffold an empty graph file
    Init {
        /// Graph title
        #[arg(long, default_value = "知识图谱")]
        title: String,
        /// Graph description
        #[arg(long, default_value = "")]
        description: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Clear interaction data (and the remote graph with --all)
    Clear {
        /// Also clear the remote graph
        #[arg(long)]
        all: bool,
        /// Confirm the irreversible deletion
        #[arg(long)]
        yes: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr so piped stdout stays machine-readable
    let default_directive = if cli.quiet { "knowtrace=error" } else { "knowtrace=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_directive.parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Config { action } => cmd_config(action, cli.quiet),
        Commands::Init {
            title,
            description,
            force,
        } => cmd_init(&title, &description, force, cli.quiet),
        Commands::Doctor => cmd_doctor(cli.quiet, cli.offline).await,
        command => run_session(command, cli.format, cli.quiet, cli.offline).await,
    }
}

/// Commands that operate on the loaded graph and a backend connection
async fn run_session(
    command: Commands,
    format: OutputFormat,
    quiet: bool,
    offline: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;

    // A missing or malformed graph file is fatal, unlike the remote backend
    let graph_file = config.graph.resolved_file()?;
    let store = GraphStore::load(&graph_file).map_err(with_suggestion)?;

    let log = InteractionLog::new(config.telemetry.resolved_log_file()?);
    let backend = Arc::new(connect_backend(&config, offline).await);

    let result = dispatch(command, &store, backend.clone(), log, format, quiet).await;

    // Release the connection on every termination path
    backend.close().await;
    result
}

async fn dispatch(
    command: Commands,
    store: &GraphStore,
    backend: Arc<CypherBackend>,
    log: InteractionLog,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let live = backend.is_live();
    match command {
        Commands::Stats => {
            cmd_stats(store, &InteractionReader::new(backend, log), live, format, quiet).await
        }
        Commands::Student { id } => {
            cmd_student(&InteractionReader::new(backend, log), &id, format, quiet).await
        }
        Commands::Record {
            student,
            node,
            duration,
        } => {
            cmd_record(
                store,
                &InteractionRecorder::new(backend, log),
                &student,
                &node,
                duration,
                format,
                quiet,
            )
            .await
        }
        Commands::Export { out } => {
            cmd_export(&InteractionReader::new(backend, log), out, quiet).await
        }
        Commands::Import => {
            cmd_import(store, &LifecycleManager::new(backend, log), format, quiet).await
        }
        Commands::Clear { all, yes } => {
            cmd_clear(&LifecycleManager::new(backend, log), all, yes, quiet).await
        }
        Commands::Doctor | Commands::Init { .. } | Commands::Config { .. } => {
            unreachable!("routed in main")
        }
    }
}

async fn connect_backend(config: &Config, offline: bool) -> CypherBackend {
    if offline {
        return CypherBackend::offline(config.graph.dataset_label.clone());
    }

    let password = match config.backend.resolved_password() {
        Ok(password) => password.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "backend password unavailable, connecting without one");
            String::new()
        }
    };

    CypherBackend::builder()
        .config(config.backend.clone())
        .password(password)
        .dataset_label(config.graph.dataset_label.clone())
        .connect()
        .await
}

fn with_suggestion(e: knowtrace_core::Error) -> anyhow::Error {
    match e.suggestion() {
        Some(suggestion) => anyhow::anyhow!("{}\n  Try: {}", e, suggestion),
        None => anyhow::Error::new(e),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_stats<B: GraphBackend>(
    store: &GraphStore,
    reader: &InteractionReader<B>,
    live: bool,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let events = reader.get_all().await?;
    let totals = analytics::totals(&events);
    let heat = analytics::node_heat(&events);
    let activity = analytics::student_activity(&events);
    let categories = analytics::category_distribution(&events, store);

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "remote_backend_live": live,
            "totals": totals,
            "node_heat": heat,
            "student_activity": activity,
            "category_distribution": categories,
        })),
        OutputFormat::Text => {
            if quiet {
                return Ok(());
            }
            if !live {
                println!("(remote backend not connected; reading the local log)");
                println!();
            }

            println!("Usage Totals:");
            println!("  Events: {}", totals.total_events);
            println!("  Students: {}", totals.distinct_students);
            println!("  Nodes visited: {}", totals.distinct_nodes);
            match totals.mean_duration_secs {
                Some(mean) => println!("  Mean duration: {:.1}s", mean),
                None => println!("  Mean duration: N/A"),
            }

            println!();
            println!("Node Heat:");
            if heat.is_empty() {
                println!("  (no visits recorded)");
            }
            for entry in &heat {
                println!("  {} - {} ({} visits)", entry.node_id, entry.node_label, entry.visits);
            }

            println!();
            println!("Student Activity:");
            if activity.is_empty() {
                println!("  (no students recorded)");
            }
            for entry in &activity {
                println!("  {} - {} events", entry.student_id, entry.events);
            }

            println!();
            println!("Category Distribution:");
            for slice in &categories {
                let name = match slice.category {
                    Some(category) => category.as_str(),
                    None => "(node removed)",
                };
                println!("  {}: {}", name, slice.events);
            }
            Ok(())
        }
    }
}

async fn cmd_student<B: GraphBackend>(
    reader: &InteractionReader<B>,
    id: &str,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    // Filter the fallback sequence client-side so the answer matches what
    // `stats` sees even without a remote backend
    let events = reader.get_all().await?;
    let detail = analytics::student_detail(&events, id);

    match format {
        OutputFormat::Json => print_json(&detail),
        OutputFormat::Text => {
            match detail {
                Some(detail) => {
                    println!("Student: {}", detail.student_id);
                    println!("  Distinct nodes: {}", detail.distinct_nodes);
                    println!("  Total events: {}", detail.total_events);
                    println!("  Total duration: {}s", detail.total_duration_secs);
                    println!("  Path: {}", detail.display_path());
                }
                None => {
                    if !quiet {
                        println!("No interactions recorded for student '{}'.", id);
                    }
                }
            }
            Ok(())
        }
    }
}

async fn cmd_record<B: GraphBackend>(
    store: &GraphStore,
    recorder: &InteractionRecorder<B>,
    student: &str,
    node_id: &str,
    duration: u32,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    // The event denormalizes the node label, so the node must exist
    let node = store
        .node(node_id)
        .ok_or_else(|| knowtrace_core::Error::NodeNotFound(node_id.to_string()))
        .map_err(with_suggestion)?;

    let session = Session::new(student);
    let event = recorder.record_view(&session, node, duration).await;

    match format {
        OutputFormat::Json => print_json(&event),
        OutputFormat::Text => {
            if !quiet {
                println!(
                    "Recorded view of '{}' ({}) for student {} ({}s).",
                    event.node_label, event.node_id, event.student_id, event.duration
                );
            }
            Ok(())
        }
    }
}

async fn cmd_export<B: GraphBackend>(
    reader: &InteractionReader<B>,
    out: Option<PathBuf>,
    quiet: bool,
) -> anyhow::Result<()> {
    let events = reader.get_all().await?;
    let summaries = analytics::student_summaries(&events);
    let heat = analytics::node_heat(&events);

    let dir = out.unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir)?;

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let tables = [
        (format!("interactions_{}.csv", stamp), analytics::events_csv(&events)),
        (
            format!("student_summary_{}.csv", stamp),
            analytics::student_summary_csv(&summaries),
        ),
        (format!("node_heat_{}.csv", stamp), analytics::node_heat_csv(&heat)),
    ];

    for (name, content) in tables {
        let path = dir.join(name);
        std::fs::write(&path, content)?;
        if !quiet {
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}

async fn cmd_import<B: GraphBackend>(
    store: &GraphStore,
    lifecycle: &LifecycleManager<B>,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let report = lifecycle
        .bulk_import(store.document())
        .await
        .map_err(with_suggestion)?;

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            if !quiet {
                println!(
                    "Imported {} nodes and {} relationships.",
                    report.nodes, report.relationships
                );
            }
            Ok(())
        }
    }
}

async fn cmd_clear<B: GraphBackend>(
    lifecycle: &LifecycleManager<B>,
    all: bool,
    yes: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    if !yes {
        if !quiet {
            if all {
                println!("Warning: This permanently deletes all interaction data and the remote graph.");
            } else {
                println!("Warning: This permanently deletes all interaction data.");
            }
            println!("Re-run with --yes to confirm.");
        }
        return Ok(());
    }

    let cleared = if all {
        lifecycle.clear_all().await
    } else {
        lifecycle.clear_interactions().await
    };

    if cleared {
        if !quiet {
            println!("Cleared.");
        }
        Ok(())
    } else {
        Err(anyhow::anyhow!("Clear failed on every store; nothing was removed."))
    }
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            for (key, value) in config.list()? {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn cmd_init(title: &str, description: &str, force: bool, quiet: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let path = config.graph.resolved_file()?;

    if path.exists() && !force {
        return Err(anyhow::anyhow!(
            "Graph file {} already exists. Use --force to overwrite.",
            path.display()
        ));
    }

    let document = GraphDocument::new_empty(title, description);
    document.save(&path)?;

    if !quiet {
        println!("Created empty graph at {}", path.display());
        println!("\nNext steps:");
        println!("  1. Edit the file to add nodes and relationships");
        println!("  2. Run `knowtrace import` to load it into the remote backend");
        println!("  3. Run `knowtrace record <student> <node>` to capture views");
    }

    Ok(())
}

async fn cmd_doctor(quiet: bool, offline: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("Knowtrace Health Check");
        println!("======================");
        println!();
    }

    let mut all_ok = true;

    let config = match Config::load() {
        Ok(config) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
            }
            Some(config)
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Configuration: Error - {}", e);
            }
            None
        }
    };

    if !quiet {
        match Config::config_path() {
            Ok(path) => {
                if path.exists() {
                    println!("[OK] Config file: {}", path.display());
                } else {
                    println!("[--] Config file: {} (using defaults)", path.display());
                }
            }
            Err(e) => println!("[!!] Config file: Error - {}", e),
        }
    }

    if let Some(config) = config {
        match config.graph.resolved_file() {
            Ok(path) => match GraphStore::load(&path) {
                Ok(store) => {
                    if !quiet {
                        println!(
                            "[OK] Graph file: {} ({} nodes, {} relationships)",
                            path.display(),
                            store.node_count(),
                            store.relationship_count()
                        );
                    }
                }
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] Graph file: {}", e);
                        if let Some(suggestion) = e.suggestion() {
                            println!("     Try: {}", suggestion);
                        }
                    }
                }
            },
            Err(e) => {
                all_ok = false;
                if !quiet {
                    println!("[!!] Graph file: Error - {}", e);
                }
            }
        }

        match config.telemetry.resolved_log_file() {
            Ok(path) => {
                let log = InteractionLog::new(&path);
                if !log.exists() {
                    if !quiet {
                        println!("[--] Interaction log: {} (not created yet)", path.display());
                    }
                } else {
                    match log.read_all() {
                        Ok(events) => {
                            if !quiet {
                                println!(
                                    "[OK] Interaction log: {} ({} events)",
                                    path.display(),
                                    events.len()
                                );
                            }
                        }
                        Err(e) => {
                            all_ok = false;
                            if !quiet {
                                println!("[!!] Interaction log: {}", e);
                            }
                        }
                    }
                }
            }
            Err(e) => {
                all_ok = false;
                if !quiet {
                    println!("[!!] Interaction log: Error - {}", e);
                }
            }
        }

        match config.backend.redacted_password() {
            Ok(Some(redacted)) => {
                if !quiet {
                    println!("[OK] Backend password: Configured ({})", redacted);
                }
            }
            Ok(None) => {
                if !quiet {
                    println!("[--] Backend password: Not set (KNOWTRACE_BACKEND_PASSWORD)");
                }
            }
            Err(e) => {
                all_ok = false;
                if !quiet {
                    println!("[!!] Backend password: {}", e);
                }
            }
        }

        // Degraded mode is a normal state, not a failed check
        if offline {
            if !quiet {
                println!("[--] Remote backend: Skipped (--offline)");
            }
        } else {
            let backend = connect_backend(&config, false).await;
            if !quiet {
                if backend.is_live() {
                    println!("[OK] Remote backend: Connected ({})", config.backend.uri);
                } else {
                    println!(
                        "[--] Remote backend: Not connected ({}) - local-only mode",
                        config.backend.uri
                    );
                }
            }
            backend.close().await;
        }
    }

    if !quiet {
        println!();
        if all_ok {
            println!("All checks passed!");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }

    Ok(())
}
