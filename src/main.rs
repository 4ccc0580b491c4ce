mod cli;
mod config;
mod datasources;
mod db;
mod error;
mod logic;
mod models;

use anyhow::{bail, Context};
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use datasources::{load_profiles_dir, OpenWeatherMapClient, WeatherClient};
use db::{Database, PlanStore};
use logic::{Orchestrator, SimOutput};
use models::{Greenhouse, Location};
use std::future::Future;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

type Engine = Orchestrator<Database, OpenWeatherMapClient>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging
    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Load configuration
    let config = Config::load(cli.config.clone()).context("loading configuration")?;

    // Initialize database
    let db_path = Config::db_path(cli.data_dir.as_ref())?;
    let db = Database::open(&db_path)
        .with_context(|| format!("opening database at {}", db_path.display()))?;
    tracing::debug!(path = %db.path().display(), "Database ready");

    seed_greenhouses(&db, &config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let engine = build_engine(&db, &config)?;
            run_scheduler(engine, &config, ctrl_c()).await?;
        }
        Commands::Tick { code } => {
            let engine = build_engine(&db, &config)?;
            match code {
                Some(code) => {
                    let report = engine.evaluate_tick(&code).await?;
                    if report.skipped() {
                        println!("{}: inactive, skipped", report.greenhouse_code);
                    }
                    if let Some(readings) = report.readings {
                        print_readings(&report.greenhouse_code, &readings);
                    }
                    for action in &report.actions {
                        println!("  {} ({})", action.action, action.reason);
                    }
                }
                None => {
                    let summary = engine.evaluate_all().await?;
                    println!(
                        "processed {}, skipped {}, failed {}",
                        summary.processed, summary.skipped, summary.failed
                    );
                }
            }
        }
        Commands::Plan { code } => {
            let engine = build_engine(&db, &config)?;
            match code {
                Some(code) => match engine.generate_plan(&code).await? {
                    Some(plan) => {
                        println!(
                            "Plan {} for {}: {} events until {}",
                            plan.id.unwrap_or_default(),
                            code,
                            plan.events.len(),
                            plan.valid_to.format("%Y-%m-%d %H:%M")
                        );
                        for event in &plan.events {
                            let actions: Vec<String> =
                                event.suggested_actions.iter().map(|a| a.token()).collect();
                            println!(
                                "  {}  {}",
                                event.at.format("%Y-%m-%d %H:%M"),
                                actions.join(", ")
                            );
                        }
                    }
                    None => println!("{}: no forecast, no plan generated", code),
                },
                None => {
                    let summary = engine.generate_all_plans().await?;
                    println!(
                        "processed {}, skipped {}, failed {}",
                        summary.processed, summary.skipped, summary.failed
                    );
                }
            }
        }
        Commands::Manual { code, action } => {
            let engine = build_engine(&db, &config)?;
            let entry = engine.manual_action(&code, &action).await?;
            println!(
                "{}: {} at {}",
                entry.greenhouse_code,
                entry.action,
                entry.timestamp.format("%Y-%m-%d %H:%M:%S")
            );
        }
        Commands::Simulate { code } => {
            let engine = build_engine(&db, &config)?;
            let readings = engine.simulate_now(&code).await?;
            print_readings(&code, &readings);
        }
        Commands::Logs { code, limit } => {
            for entry in db.list_action_logs(&code, limit)? {
                println!(
                    "{}  {:<16} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.action,
                    entry.reason
                );
            }
            println!(
                "Weather snapshots recorded: {}",
                db.count_weather_snapshots(&code)?
            );
            let now = chrono::Utc::now();
            if let Some(plan) = db.latest_active_plan(&code)?.filter(|p| p.is_valid_at(now)) {
                println!(
                    "Active plan {}: {} upcoming events, valid until {}",
                    plan.id.unwrap_or_default(),
                    plan.upcoming(now).count(),
                    plan.valid_to.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Commands::ImportProfiles { dir } => {
            let Some(dir) = dir.or_else(|| config.profiles_dir.clone()) else {
                bail!("No profile directory given and `profiles_dir` is not configured");
            };
            let profiles = load_profiles_dir(&dir)?;
            for profile in &profiles {
                db.upsert_profile(profile)?;
            }
            println!("Imported {} plant profiles from {}", profiles.len(), dir.display());
        }
        Commands::Check => {
            println!("Config: OK");
            println!("Database: {}", db.path().display());
            match &config.openweathermap {
                Some(owm) => {
                    let client = OpenWeatherMapClient::new(owm.clone());
                    let location = config
                        .greenhouses
                        .first()
                        .map(|g| g.location.clone())
                        .unwrap_or_else(|| Location::city("London"));
                    let ok = client.test_connection(&location).await?;
                    println!("OpenWeatherMap: {}", if ok { "OK" } else { "FAILED" });
                }
                None => println!("OpenWeatherMap: not configured"),
            }
        }
    }

    Ok(())
}

fn print_readings(code: &str, readings: &SimOutput) {
    println!("{}", code);
    for sensor in readings.sensors(chrono::Utc::now()) {
        println!(
            "  {:<14} {:>7.2} {}",
            sensor.code,
            sensor.last_value.unwrap_or_default(),
            sensor.unit.symbol()
        );
    }
}

fn build_engine(db: &Database, config: &Config) -> anyhow::Result<Arc<Engine>> {
    let Some(owm) = config.openweathermap.clone() else {
        bail!("The `openweathermap` section is required for control and planning");
    };
    let client = OpenWeatherMapClient::new(owm);
    Ok(Arc::new(Orchestrator::new(db.clone(), client, config)))
}

/// Register configured greenhouses that are not stored yet. Stored state wins.
fn seed_greenhouses(db: &Database, config: &Config) -> anyhow::Result<()> {
    for gh in &config.greenhouses {
        let mut greenhouse = Greenhouse::new(gh.code.clone(), gh.location.clone());
        greenhouse.name = gh.name.clone();
        greenhouse.active = gh.active;
        if let Some(profile_id) = &gh.plant_profile_id {
            greenhouse = greenhouse.with_profile(profile_id.clone());
        }
        if db.insert_greenhouse_if_absent(&greenhouse)? {
            tracing::info!(greenhouse = %gh.code, "Registered greenhouse from config");
        }
    }
    Ok(())
}

/// Which periodic pass is due.
#[derive(Debug, Clone, Copy)]
enum Due {
    Control,
    Plans,
}

/// Run control and plan passes until `shutdown` resolves. A pass still in
/// flight at shutdown is abandoned; each greenhouse is saved whole or not at all.
async fn run_scheduler<W>(
    engine: Arc<Orchestrator<Database, W>>,
    config: &Config,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()>
where
    W: WeatherClient + 'static,
{
    let mut ticks = tokio::time::interval(config.scheduler.tick_interval());
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut plans = tokio::time::interval(config.scheduler.plan_interval());
    plans.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    tracing::info!(
        tick_secs = config.scheduler.tick_interval().as_secs(),
        plan_secs = config.scheduler.plan_interval().as_secs(),
        workers = config.scheduler.workers,
        "Scheduler started"
    );

    loop {
        let due = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticks.tick() => Due::Control,
            _ = plans.tick() => Due::Plans,
        };

        let pass = async {
            match due {
                Due::Control => engine.evaluate_all().await,
                Due::Plans => {
                    // pick up profiles imported since the last pass
                    engine.invalidate_profiles();
                    engine.generate_all_plans().await
                }
            }
        };
        let outcome = tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!(pass = ?due, "Shutdown requested, abandoning pass");
                break;
            }
            outcome = pass => outcome,
        };
        if let Err(e) = outcome {
            tracing::error!(pass = ?due, "Pass failed: {}", e);
        }
    }

    tracing::info!("Shutting down");
    Ok(())
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
