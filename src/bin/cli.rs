//! Fixture Sim CLI - build simulation groups, refresh results, compare strategies

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use fixture_sim::backtesting::calculate_metrics;
use fixture_sim::config::EngineConfig;
use fixture_sim::core::staking::{simulate, StakingAlgorithm};
use fixture_sim::data::{PredictionStore, SqliteStore};
use fixture_sim::error::{validate_bets, validate_stake};
use fixture_sim::models::{
    Bet, BookmakerQuote, Fixture, FixtureId, GroupId, MatchStatistics, TeamId,
};
use fixture_sim::source::{ApiFootballClient, ExternalDataSource, OfflineSource};
use fixture_sim::{Engine, SourceError};

const DEFAULT_DB: &str = "data/fixture_sim.db";
const DEFAULT_CONFIG: &str = "fixture_sim.toml";

#[derive(Parser)]
#[command(name = "fixture-sim")]
#[command(author, version, about = "Football fixture simulation CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the SQLite database
    #[arg(long, env = "FIXTURE_SIM_DB", default_value = DEFAULT_DB)]
    db: PathBuf,

    /// Path to the TOML config file (defaults apply when missing)
    #[arg(long, env = "FIXTURE_SIM_CONFIG", default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Use stored data only, never call the fixture feed
    #[arg(long)]
    offline: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate fixtures and create a simulation group with predictions
    Simulate {
        /// Group name
        #[arg(short, long)]
        name: String,

        /// Fixture ids to include
        #[arg(required = true)]
        fixtures: Vec<FixtureId>,
    },

    /// Fetch final scores and resolve predictions for a group
    Refresh {
        #[arg(short, long)]
        group: GroupId,
    },

    /// Replay configured strategies over a group and show profit per model
    Profit {
        #[arg(short, long)]
        group: GroupId,
    },

    /// Show prediction accuracy per model for a group
    Accuracy {
        #[arg(short, long)]
        group: GroupId,
    },

    /// Run a stake-sizing algorithm over bets from a JSON file
    Stake {
        /// flat, martingale, fibonacci, value or kelly
        #[arg(short, long)]
        algorithm: String,

        /// Flat stake, base stake, or Kelly reference bankroll without --bankroll
        #[arg(short, long)]
        stake: f64,

        /// Starting bankroll (enables bankroll tracking)
        #[arg(long)]
        bankroll: Option<f64>,

        /// Kelly multiplier (0.5 = half Kelly)
        #[arg(long, default_value = "1.0")]
        kelly: f64,

        /// Minimum Kelly stake
        #[arg(long, default_value = "0.0")]
        min_stake: f64,

        /// JSON array of {won, odds, model_probability}
        #[arg(long)]
        bets: PathBuf,
    },

    /// List simulation groups
    Groups,
}

/// Feed selected at startup
enum FeedSource {
    Offline(OfflineSource),
    Api(ApiFootballClient),
}

impl ExternalDataSource for FeedSource {
    fn fetch_recent(&self, team: TeamId, limit: usize) -> Result<Vec<Fixture>, SourceError> {
        match self {
            FeedSource::Offline(s) => s.fetch_recent(team, limit),
            FeedSource::Api(s) => s.fetch_recent(team, limit),
        }
    }

    fn fetch_statistics(&self, fixture_id: FixtureId) -> Result<Vec<MatchStatistics>, SourceError> {
        match self {
            FeedSource::Offline(s) => s.fetch_statistics(fixture_id),
            FeedSource::Api(s) => s.fetch_statistics(fixture_id),
        }
    }

    fn fetch_head_to_head(
        &self,
        team_a: TeamId,
        team_b: TeamId,
        limit: usize,
    ) -> Result<Vec<Fixture>, SourceError> {
        match self {
            FeedSource::Offline(s) => s.fetch_head_to_head(team_a, team_b, limit),
            FeedSource::Api(s) => s.fetch_head_to_head(team_a, team_b, limit),
        }
    }

    fn fetch_market(&self, fixture_id: FixtureId) -> Result<Vec<BookmakerQuote>, SourceError> {
        match self {
            FeedSource::Offline(s) => s.fetch_market(fixture_id),
            FeedSource::Api(s) => s.fetch_market(fixture_id),
        }
    }

    fn fetch_fixture(&self, fixture_id: FixtureId) -> Result<Option<Fixture>, SourceError> {
        match self {
            FeedSource::Offline(s) => s.fetch_fixture(fixture_id),
            FeedSource::Api(s) => s.fetch_fixture(fixture_id),
        }
    }
}

type CliEngine = Engine<SqliteStore, FeedSource>;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    println!("{}", "Fixture Sim CLI v0.3.0".cyan().bold());
    println!();

    match &cli.command {
        Commands::Simulate { name, fixtures } => {
            run_simulate(&open_engine(&cli)?, name, fixtures)?;
        }
        Commands::Refresh { group } => {
            run_refresh(&open_engine(&cli)?, *group)?;
        }
        Commands::Profit { group } => {
            run_profit(&open_engine(&cli)?, *group)?;
        }
        Commands::Accuracy { group } => {
            run_accuracy(&open_engine(&cli)?, *group)?;
        }
        Commands::Stake {
            algorithm,
            stake,
            bankroll,
            kelly,
            min_stake,
            bets,
        } => {
            run_stake(algorithm, *stake, *bankroll, *kelly, *min_stake, bets)?;
        }
        Commands::Groups => {
            list_groups(&open_engine(&cli)?)?;
        }
    }

    Ok(())
}

fn open_engine(cli: &Cli) -> Result<CliEngine> {
    let config = EngineConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

    if let Some(dir) = cli.db.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create database directory {:?}", dir))?;
    }
    let store = SqliteStore::open(&cli.db)
        .with_context(|| format!("Failed to open database {:?}", cli.db))?;

    let source = if cli.offline {
        FeedSource::Offline(OfflineSource)
    } else if config.api.api_key.is_none() {
        warn!("No API key configured, running offline");
        FeedSource::Offline(OfflineSource)
    } else {
        let client = ApiFootballClient::new(config.api.clone())
            .context("Failed to build fixture feed client")?;
        FeedSource::Api(client)
    };

    Ok(Engine::new(store, source, config))
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb
}

fn run_simulate(engine: &CliEngine, name: &str, ids: &[FixtureId]) -> Result<()> {
    println!("{}: {}", "Creating simulation".green(), name);
    println!();

    let pb = spinner("Looking up fixtures...");
    let fixtures = engine
        .lookup_fixtures(ids)
        .context("Failed to look up fixtures")?;
    pb.set_message("Checking data availability and predicting...");
    let group = engine.create_simulation(name, &fixtures);
    pb.finish_and_clear();

    let group = group.with_context(|| format!("Failed to create simulation '{}'", name))?;

    println!(
        "Group {} '{}': {} of {} fixtures accepted",
        group.id.to_string().bold(),
        group.name,
        group.fixture_ids.len(),
        ids.len()
    );
    println!();

    let mut predictions = engine.store().group_predictions(group.id)?;
    predictions.sort_by(|a, b| a.fixture_id.cmp(&b.fixture_id).then(a.model_id.cmp(&b.model_id)));

    println!("{}", "Predictions:".yellow().bold());
    println!("{:>10} {:<14} {:>8} {:>8}", "Fixture", "Model", "Pick", "Prob");
    println!("{}", "-".repeat(44));
    for p in &predictions {
        println!(
            "{:>10} {:<14} {:>8} {:>7.1}%",
            p.fixture_id, p.model_id, p.outcome, p.probability
        );
    }

    Ok(())
}

fn run_refresh(engine: &CliEngine, group: GroupId) -> Result<()> {
    let pb = spinner("Fetching results...");
    let resolved = engine.refresh_results(group);
    pb.finish_and_clear();

    let resolved = resolved.with_context(|| format!("Failed to refresh group {}", group))?;
    println!(
        "{}: {} fixtures resolved in group {}",
        "Complete".green(),
        resolved,
        group
    );
    Ok(())
}

fn run_profit(engine: &CliEngine, group: GroupId) -> Result<()> {
    let pb = spinner("Replaying strategies...");
    let profits = engine.aggregate_profit(group);
    pb.finish_and_clear();

    let profits =
        profits.with_context(|| format!("Failed to aggregate profit for group {}", group))?;
    if profits.is_empty() {
        println!("{}", "No resolved predictions in this group yet.".yellow());
        return Ok(());
    }

    println!("{}", format!("Strategy profit (group {}):", group).yellow().bold());
    println!(
        "{:<14} {:<14} {:>6} {:>6} {:>10} {:>10} {:>10}",
        "Strategy", "Model", "Bets", "Wins", "Staked", "Profit", "Bankroll"
    );
    println!("{}", "-".repeat(76));
    for p in &profits {
        let profit = format!("{:+.2}", p.profit);
        let profit = if p.profit > 0.0 {
            profit.green()
        } else if p.profit < 0.0 {
            profit.red()
        } else {
            profit.normal()
        };
        let bankroll = p
            .final_bankroll
            .map(|b| format!("{:.2}", b))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<14} {:<14} {:>6} {:>6} {:>10.2} {:>10} {:>10}",
            p.strategy, p.model_id, p.bets_placed, p.bets_won, p.total_staked, profit, bankroll
        );
    }

    Ok(())
}

fn run_accuracy(engine: &CliEngine, group: GroupId) -> Result<()> {
    let accuracy = engine
        .model_accuracy(group)
        .with_context(|| format!("Failed to compute accuracy for group {}", group))?;

    println!("{}", format!("Model accuracy (group {}):", group).yellow().bold());
    println!(
        "{:<14} {:>12} {:>10} {:>8} {:>10}",
        "Model", "Predictions", "Resolved", "Correct", "Accuracy"
    );
    println!("{}", "-".repeat(58));
    for a in &accuracy {
        println!(
            "{:<14} {:>12} {:>10} {:>8} {:>9.1}%",
            a.model_id,
            a.predictions,
            a.resolved,
            a.correct,
            a.accuracy * 100.0
        );
    }

    Ok(())
}

fn run_stake(
    algorithm: &str,
    stake: f64,
    bankroll: Option<f64>,
    kelly: f64,
    min_stake: f64,
    bets_path: &Path,
) -> Result<()> {
    let algorithm = match StakingAlgorithm::from_name(algorithm) {
        Some(StakingAlgorithm::Kelly { .. }) => StakingAlgorithm::Kelly {
            multiplier: kelly,
            min_stake,
        },
        Some(algorithm) => algorithm,
        None => bail!("Unknown staking algorithm '{}'", algorithm),
    };
    validate_stake(stake)?;
    if let Some(b) = bankroll {
        validate_stake(b)?;
    }

    let raw = fs::read_to_string(bets_path)
        .with_context(|| format!("Failed to read bets from {:?}", bets_path))?;
    let bets: Vec<Bet> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse bets in {:?}", bets_path))?;
    validate_bets(&bets)?;

    let result = simulate(&bets, algorithm, stake, bankroll);
    let metrics = calculate_metrics(&result, &bets);

    println!("{}: {}", "Algorithm".green(), algorithm.name());
    println!();
    println!(
        "{:>4} {:>6} {:>6} {:>10} {:>10} {:>12}",
        "#", "Odds", "Won", "Stake", "Profit", "Bankroll"
    );
    println!("{}", "-".repeat(53));
    for (i, bet) in bets.iter().enumerate() {
        println!(
            "{:>4} {:>6.2} {:>6} {:>10.2} {:>+10.2} {:>12.2}",
            i + 1,
            bet.odds,
            if bet.won { "yes" } else { "no" },
            result.stakes[i],
            result.profits[i],
            result.bankroll[i + 1]
        );
    }

    println!();
    println!("{}", "Summary:".yellow().bold());
    println!("  Bets placed:   {} ({} won)", metrics.bets_placed, metrics.bets_won);
    println!("  Hit rate:      {:.1}%", metrics.hit_rate * 100.0);
    println!("  Total staked:  {:.2}", metrics.total_staked);
    println!("  Net profit:    {:+.2}", result.total_profit());
    println!("  ROI:           {:.1}%", metrics.roi * 100.0);
    println!("  Max drawdown:  {:.2}", metrics.max_drawdown);
    if metrics.profit_factor.is_finite() {
        println!("  Profit factor: {:.2}", metrics.profit_factor);
    } else {
        println!("  Profit factor: inf");
    }

    Ok(())
}

fn list_groups(engine: &CliEngine) -> Result<()> {
    let groups = engine.store().groups()?;
    if groups.is_empty() {
        println!("{}", "No simulation groups yet.".yellow());
        return Ok(());
    }

    println!("{:>6} {:<24} {:>9} {:<20}", "Id", "Name", "Fixtures", "Created");
    println!("{}", "-".repeat(62));
    for g in &groups {
        println!(
            "{:>6} {:<24} {:>9} {:<20}",
            g.id,
            g.name,
            g.fixture_ids.len(),
            g.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
