use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::{parser, Recommendation};
use orchestrator::{
    Dataset, DatasetLocations, PipelineConfig, PipelineConfigBuilder, PipelineOrchestrator, Stage,
    StageReport,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scoring::{logistic_scale, value_event, EventType};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// gh-recs - Repository Recommendation Pipeline
#[derive(Parser)]
#[command(name = "gh-recs")]
#[command(about = "Batch recommender for repository activity logs", long_about = None)]
struct Cli {
    /// JSON config file; flags and environment override its values
    #[arg(short, long, env = "GHREC_CONFIG")]
    config: Option<PathBuf>,

    /// Root directory all datasets are read from and written to
    #[arg(short, long, env = "GHREC_ROOT")]
    root: Option<PathBuf>,

    /// Event-log pattern relative to the root, e.g. raw_events/*/*/*/*
    #[arg(short, long, env = "GHREC_EVENTS")]
    events: Option<String>,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(short, long, env = "GHREC_PARALLELISM")]
    parallelism: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run extract_events, gen_item_recs and gen_user_recs in order
    Run,

    /// Run a single stage whose inputs already exist
    Stage {
        /// extract_events, gen_item_recs or gen_user_recs
        name: Stage,
    },

    /// Show the weight vector of an event type
    Value {
        /// e.g. PushEvent
        event_type: String,
    },

    /// Show the logistic scaling of a summed weight
    Scale {
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },

    /// Show a user's affinities and recommendations from the last run
    User {
        user_id: String,
    },

    /// Show an item's metadata and recommendations from the last run
    Item {
        /// owner/name
        item_id: String,
    },

    /// Write a synthetic event log for demos and benchmarks
    Synth {
        /// Output file
        #[arg(long)]
        output: PathBuf,

        /// Number of events to generate
        #[arg(long, default_value = "10000")]
        events: usize,

        #[arg(long, default_value = "500")]
        users: usize,

        #[arg(long, default_value = "200")]
        repos: usize,

        /// Seed for reproducible logs
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Dispatch to appropriate command handler
    match &cli.command {
        Commands::Run => handle_run(load_config(&cli)?).await?,
        Commands::Stage { name } => handle_stage(load_config(&cli)?, *name).await?,
        Commands::Value { event_type } => handle_value(event_type)?,
        Commands::Scale { value } => handle_scale(*value),
        Commands::User { user_id } => handle_user(load_locations(&cli)?, user_id)?,
        Commands::Item { item_id } => handle_item(load_locations(&cli)?, item_id)?,
        Commands::Synth {
            output,
            events,
            users,
            repos,
            seed,
        } => handle_synth(output, *events, *users, *repos, *seed)?,
    }

    Ok(())
}

/// Merge the config file with flags and environment
fn load_builder(cli: &Cli) -> Result<PipelineConfigBuilder> {
    let mut builder = match &cli.config {
        Some(path) => PipelineConfigBuilder::from_file(path)?,
        None => PipelineConfig::builder(),
    };
    if let Some(root) = &cli.root {
        builder = builder.root(root);
    }
    if let Some(events) = &cli.events {
        builder = builder.events(events);
    }
    if let Some(parallelism) = cli.parallelism {
        builder = builder.parallelism(parallelism);
    }
    Ok(builder)
}

/// Full settings for commands that run stages
fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    load_builder(cli)?
        .build()
        .context("Invalid pipeline configuration")
}

/// Dataset locations for commands that only read earlier outputs
fn load_locations(cli: &Cli) -> Result<DatasetLocations> {
    load_builder(cli)?
        .build_locations()
        .context("Invalid pipeline configuration")
}

/// Handle the 'run' command
async fn handle_run(config: PipelineConfig) -> Result<()> {
    println!("Running pipeline under {}...", config.root.display());
    info!(
        "Starting run: events {}, {} worker threads",
        config.events, config.parallelism
    );
    let orchestrator = PipelineOrchestrator::new(config)?;

    let report = orchestrator.run().await?;
    info!("Run finished in {:.2?}", report.elapsed());
    for stage in &report.stages {
        print_stage_report(stage);
    }
    println!(
        "{} Pipeline finished in {:.2?}",
        "✓".green(),
        report.elapsed()
    );
    Ok(())
}

/// Handle the 'stage' command
async fn handle_stage(config: PipelineConfig, stage: Stage) -> Result<()> {
    info!("Starting stage {}", stage);
    let orchestrator = PipelineOrchestrator::new(config)?;
    let report = orchestrator.run_stage(stage).await?;
    print_stage_report(&report);
    Ok(())
}

/// Handle the 'value' command
fn handle_value(event_type: &str) -> Result<()> {
    let weights = value_event(event_type)?;
    println!("{}", event_type.bold().blue());
    println!("{}specific interest: {:.2}", "• ".green(), weights.specific_interest);
    println!("{}general interest:  {:.2}", "• ".green(), weights.general_interest);
    println!("{}graph score:       {:.2}", "• ".green(), weights.graph_score);
    Ok(())
}

/// Handle the 'scale' command
fn handle_scale(value: f64) {
    println!("scale({}) = {}", value, logistic_scale(value).to_string().green());
}

/// Handle the 'user' command
fn handle_user(config: DatasetLocations, user_id: &str) -> Result<()> {
    let affinities = parser::parse_affinities(&config.dataset_path(Dataset::UserItemAffinities))
        .context("Failed to read affinities; run extract_events first")?;
    let mut history: Vec<_> = affinities
        .into_iter()
        .filter(|a| a.user_id == user_id)
        .collect();
    if history.is_empty() {
        return Err(anyhow!("User {} not found", user_id));
    }

    println!("{}", format!("User: {}", user_id).bold().blue());
    let gravatar_path = config.dataset_path(Dataset::UserGravatarIds);
    if gravatar_path.is_file() {
        if let Some((_, gravatar_id)) = parser::parse_gravatar_ids(&gravatar_path)?
            .into_iter()
            .find(|(user, _)| user == user_id)
        {
            println!("{}Gravatar: {}", "• ".cyan(), gravatar_id);
        }
    }

    history.sort_by(|a, b| b.graph_score.total_cmp(&a.graph_score));
    println!("Affinities ({}):", history.len());
    for a in history.iter().take(10) {
        println!(
            "  - {} (specific {:.3}, general {:.3}, graph {:.3})",
            a.item_id, a.specific_interest, a.general_interest, a.graph_score
        );
    }

    for (label, dataset) in [
        ("Specific recommendations", Dataset::UserSpecificRecs),
        ("General recommendations", Dataset::UserGeneralRecs),
    ] {
        let recs = read_recommendations(&config, dataset)?;
        print_recommendations(label, find_subject(&recs, user_id));
    }
    Ok(())
}

/// Handle the 'item' command
fn handle_item(config: DatasetLocations, item_id: &str) -> Result<()> {
    let metadata = parser::parse_metadata(&config.dataset_path(Dataset::ItemMetadata))
        .context("Failed to read item metadata; run extract_events first")?;
    let item = metadata
        .into_iter()
        .find(|m| m.item_id == item_id)
        .ok_or_else(|| anyhow!("Item {} not found", item_id))?;

    println!("{}", format!("Repository: {}", item.item_id).bold().blue());
    if let Some(description) = &item.description {
        println!("{}{}", "• ".green(), description);
    }
    println!(
        "{}Language: {}",
        "• ".green(),
        item.language.as_deref().unwrap_or("unknown")
    );
    println!("{}Watchers: {}, forks: {}", "• ".cyan(), item.watchers, item.forks);

    let recs = read_recommendations(&config, Dataset::ItemRecs)?;
    print_recommendations("Similar repositories", find_subject(&recs, item_id));
    Ok(())
}

/// Handle the 'synth' command
fn handle_synth(output: &Path, events: usize, users: usize, repos: usize, seed: u64) -> Result<()> {
    if users == 0 || repos == 0 {
        return Err(anyhow!("--users and --repos must be at least 1"));
    }
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    let start = Instant::now();
    let mut rng = StdRng::seed_from_u64(seed);
    let base = DateTime::parse_from_rfc3339("2012-03-11T00:00:00-07:00")?;
    let file = fs::File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);

    for i in 0..events {
        // Squaring skews activity towards a few popular repositories
        let skew: f64 = rng.random::<f64>();
        let repo = ((skew * skew) * repos as f64) as usize % repos;
        let user = rng.random_range(0..users);
        let event_type = EventType::ALL[rng.random_range(0..EventType::ALL.len())];
        let created_at = base + Duration::seconds(i as i64 * 7);

        let line = serde_json::json!({
            "type": event_type.as_str(),
            "actor": format!("user{}", user),
            "created_at": created_at.to_rfc3339(),
            "repository": {
                "owner": format!("owner{}", repo % 37),
                "name": format!("repo{}", repo),
                "language": (["Rust", "Ruby", "Python", "JavaScript"][repo % 4]),
                "description": format!("Synthetic repository {}", repo),
                "watchers": repos - repo,
                "forks": (repos - repo) / 4,
            },
            "actor_attributes": { "gravatar_id": format!("{:032x}", user) },
        });
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;

    println!(
        "{} Wrote {} events to {} in {:?}",
        "✓".green(),
        events,
        output.display(),
        start.elapsed()
    );
    Ok(())
}

fn read_recommendations(config: &DatasetLocations, dataset: Dataset) -> Result<Vec<Recommendation>> {
    let path = config.dataset_path(dataset);
    parser::parse_recommendations(&path)
        .with_context(|| format!("Failed to read {} from {}", dataset, path.display()))
}

fn find_subject<'a>(recs: &'a [Recommendation], subject_id: &str) -> Option<&'a Recommendation> {
    recs.iter().find(|r| r.subject_id == subject_id)
}

fn print_stage_report(report: &StageReport) {
    println!(
        "{} {} ({:.2?})",
        "✓".green(),
        report.stage.to_string().bold(),
        report.elapsed
    );
    for (dataset, rows) in &report.rows {
        println!("  {} {}: {} rows", "•".cyan(), dataset, rows);
    }
}

/// Helper function to format and print a recommendation list
fn print_recommendations(title: &str, rec: Option<&Recommendation>) {
    println!("{}", format!("{}:", title).bold().blue());
    match rec {
        Some(rec) if !rec.is_empty() => {
            for (i, item) in rec.items.iter().enumerate() {
                println!(
                    "{}. {} - Score: {:.4}",
                    (i + 1).to_string().green(),
                    item.item_id,
                    item.score
                );
            }
        }
        _ => println!("  (none)"),
    }
}
