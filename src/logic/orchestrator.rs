//! Per-greenhouse control passes.
//!
//! Every operation that mutates a greenhouse runs under that greenhouse's
//! lock, so ticks, manual commands and plan generation for one code never
//! interleave. Different greenhouses proceed in parallel up to the
//! configured worker count.

use super::controller::ActuatorController;
use super::planner::PlanGenerator;
use super::profile_cache::ProfileCache;
use super::rules::RulesEngine;
use super::simulator::{EnvironmentSimulator, SimOutput};
use crate::config::{Config, ControlConfig};
use crate::datasources::WeatherClient;
use crate::db::Store;
use crate::error::{GreenhouseError, Result};
use crate::models::{
    ActionLog, Command, Greenhouse, Location, Plan, PlantProfile, Trigger, WeatherForecast,
    WeatherReading,
};
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedMutexGuard, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

type LockMap = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Per-code async locks. Entries live only while someone holds or waits on
/// them.
#[derive(Default)]
struct GreenhouseLocks {
    locks: LockMap,
}

impl GreenhouseLocks {
    fn handle(&self, code: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(code.to_string()).or_default())
    }

    async fn acquire(&self, code: &str) -> GreenhouseGuard<'_> {
        let guard = self.handle(code).lock_owned().await;
        GreenhouseGuard {
            locks: &self.locks,
            code: code.to_string(),
            guard: Some(guard),
        }
    }
}

struct GreenhouseGuard<'a> {
    locks: &'a LockMap,
    code: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for GreenhouseGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // only the map's own handle left: nobody holds or waits on it
        if locks
            .get(&self.code)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.code);
        }
    }
}

/// Result of one control tick for one greenhouse.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub greenhouse_code: String,
    /// `None` when the greenhouse is inactive and was left untouched.
    pub readings: Option<SimOutput>,
    pub actions: Vec<ActionLog>,
}

impl TickReport {
    fn inactive(code: &str) -> Self {
        Self {
            greenhouse_code: code.to_string(),
            readings: None,
            actions: Vec::new(),
        }
    }

    pub fn skipped(&self) -> bool {
        self.readings.is_none()
    }
}

/// Counts for one batch pass over all greenhouses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy)]
enum Pass {
    Tick,
    Plan,
}

pub struct Orchestrator<S, W> {
    store: S,
    weather: W,
    simulator: EnvironmentSimulator,
    controller: ActuatorController,
    rules: RulesEngine,
    planner: PlanGenerator,
    profiles: ProfileCache,
    locks: GreenhouseLocks,
    control: ControlConfig,
    workers: usize,
    weather_timeout: Duration,
}

impl<S, W> Orchestrator<S, W>
where
    S: Store + 'static,
    W: WeatherClient + 'static,
{
    pub fn new(store: S, weather: W, config: &Config) -> Self {
        Self {
            store,
            weather,
            simulator: EnvironmentSimulator::new(config.simulation.clone()),
            controller: ActuatorController::new(config.control.clone()),
            rules: RulesEngine::new(),
            planner: PlanGenerator::new(),
            profiles: ProfileCache::new(),
            locks: GreenhouseLocks::default(),
            control: config.control.clone(),
            workers: config.scheduler.workers.max(1),
            weather_timeout: config.scheduler.weather_timeout(),
        }
    }

    #[cfg(test)]
    pub fn with_weather_timeout(mut self, timeout: Duration) -> Self {
        self.weather_timeout = timeout;
        self
    }

    /// Forget cached plant profiles, e.g. after an import.
    pub fn invalidate_profiles(&self) {
        self.profiles.invalidate();
    }

    fn load(&self, code: &str) -> Result<Greenhouse> {
        self.store
            .load_by_code(code)?
            .ok_or_else(|| GreenhouseError::NotFound(format!("greenhouse {}", code)))
    }

    fn resolve_profile(&self, greenhouse: &Greenhouse) -> Result<Arc<PlantProfile>> {
        let id = greenhouse.plant_profile_id.as_deref().ok_or_else(|| {
            GreenhouseError::NotFound(format!("greenhouse {} has no plant profile", greenhouse.code))
        })?;
        self.profiles
            .get(&self.store, id)?
            .ok_or_else(|| GreenhouseError::NotFound(format!("plant profile {}", id)))
    }

    async fn bounded<T>(&self, what: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.weather_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(GreenhouseError::UpstreamUnavailable(format!(
                "{} timed out after {:?}",
                what, self.weather_timeout
            ))),
        }
    }

    async fn current_weather(&self, location: &Location) -> Result<WeatherReading> {
        self.bounded("weather fetch", self.weather.current(location)).await
    }

    async fn forecast(&self, location: &Location) -> Result<WeatherForecast> {
        self.bounded("forecast fetch", self.weather.forecast(location)).await
    }

    fn persist(&self, greenhouse: &Greenhouse, actions: &[ActionLog]) -> Result<()> {
        // single save keeps device state and transition timestamps together
        self.store.save(greenhouse)?;
        for entry in actions {
            if let Err(e) = self.store.append(entry) {
                warn!(greenhouse = %greenhouse.code, action = %entry.action, "Failed to write action log: {}", e);
            }
        }
        Ok(())
    }

    /// One control tick: fetch weather, simulate, regulate, apply rules, save.
    pub async fn evaluate_tick(&self, code: &str) -> Result<TickReport> {
        let _guard = self.locks.acquire(code).await;

        let mut greenhouse = self.load(code)?;
        if !greenhouse.active {
            debug!(greenhouse = %code, "Inactive, skipping tick");
            return Ok(TickReport::inactive(code));
        }
        let profile = self.resolve_profile(&greenhouse)?;

        let weather = self.current_weather(&greenhouse.location).await?;
        if let Err(e) = self.store.record_weather(code, &weather) {
            warn!(greenhouse = %code, "Failed to record weather snapshot: {}", e);
        }

        let now = Utc::now();
        let live = greenhouse.live_snapshot();
        let readings = self
            .simulator
            .step(&mut greenhouse, Some(profile.as_ref()), &weather, now);
        let fresh = readings.snapshot();

        let mut actions = self
            .controller
            .regulate(&mut greenhouse, &profile, &fresh, now);

        let mut passes = vec![
            (fresh, Trigger::ProfileRules),
            (live, Trigger::RuleEngine),
        ];
        if self.control.weather_rules {
            passes.push((weather.snapshot(), Trigger::WeatherCheck));
        }
        for (snapshot, trigger) in passes {
            let commands = self.rules.triggered(&profile, &snapshot);
            if commands.is_empty() {
                continue;
            }
            actions.extend(self.controller.apply_rule_actions(
                &mut greenhouse,
                &profile,
                &commands,
                &snapshot,
                trigger,
                now,
            ));
        }

        self.persist(&greenhouse, &actions)?;

        info!(
            greenhouse = %code,
            actions = actions.len(),
            devices = %greenhouse.devices,
            "Tick complete"
        );
        Ok(TickReport {
            greenhouse_code: code.to_string(),
            readings: Some(readings),
            actions,
        })
    }

    /// Operator command. The token is validated before anything is loaded,
    /// so a bad token changes nothing and logs nothing.
    pub async fn manual_action(&self, code: &str, token: &str) -> Result<ActionLog> {
        let command: Command = token.parse()?;

        let _guard = self.locks.acquire(code).await;
        let mut greenhouse = self.load(code)?;

        let entry = self.controller.manual(&mut greenhouse, command, Utc::now());
        self.persist(&greenhouse, std::slice::from_ref(&entry))?;

        // refresh the virtual readings so callers see the new device state
        if let Err(e) = self.resimulate(&mut greenhouse).await {
            debug!(greenhouse = %code, "Post-command simulation skipped: {}", e);
        }
        Ok(entry)
    }

    async fn resimulate(&self, greenhouse: &mut Greenhouse) -> Result<SimOutput> {
        let profile = match greenhouse.plant_profile_id.as_deref() {
            Some(id) => self.profiles.get(&self.store, id)?,
            None => None,
        };
        let weather = self.current_weather(&greenhouse.location).await?;
        let output = self
            .simulator
            .step(greenhouse, profile.as_deref(), &weather, Utc::now());
        self.store.save(greenhouse)?;
        Ok(output)
    }

    /// Simulate and write back readings without any actuator control.
    pub async fn simulate_now(&self, code: &str) -> Result<SimOutput> {
        let _guard = self.locks.acquire(code).await;
        let mut greenhouse = self.load(code)?;
        self.resimulate(&mut greenhouse).await
    }

    /// Build and store a plan from the forecast. `Ok(None)` when the
    /// greenhouse is inactive or no forecast is available.
    pub async fn generate_plan(&self, code: &str) -> Result<Option<Plan>> {
        let _guard = self.locks.acquire(code).await;

        let mut greenhouse = self.load(code)?;
        if !greenhouse.active {
            debug!(greenhouse = %code, "Inactive, skipping plan");
            return Ok(None);
        }
        let profile = self.resolve_profile(&greenhouse)?;

        let forecast = match self.forecast(&greenhouse.location).await {
            Ok(forecast) => forecast,
            Err(e) => {
                warn!(greenhouse = %code, "No forecast, plan not generated: {}", e);
                return Ok(None);
            }
        };

        debug!(
            greenhouse = %code,
            city = %forecast.city,
            fetched_at = %forecast.fetched_at,
            samples = forecast.samples.len(),
            "Forecast fetched"
        );
        let Some(mut plan) = self.planner.generate(code, &profile, &forecast, Utc::now()) else {
            warn!(greenhouse = %code, "Empty forecast, plan not generated");
            return Ok(None);
        };

        let id = self.store.insert_plan(&plan)?;
        plan.id = Some(id);
        greenhouse.plan_id = Some(id);
        self.store.save(&greenhouse)?;

        info!(greenhouse = %code, plan = id, events = plan.events.len(), "Plan generated");
        Ok(Some(plan))
    }

    /// Tick every stored greenhouse. One greenhouse's failure never stops the others.
    pub async fn evaluate_all(self: &Arc<Self>) -> Result<PassSummary> {
        self.run_pass(Pass::Tick).await
    }

    pub async fn generate_all_plans(self: &Arc<Self>) -> Result<PassSummary> {
        self.run_pass(Pass::Plan).await
    }

    async fn run_pass(self: &Arc<Self>, pass: Pass) -> Result<PassSummary> {
        let codes = self.store.list_codes()?;
        let permits = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for code in codes {
            let this = Arc::clone(self);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let outcome = match pass {
                    Pass::Tick => this.evaluate_tick(&code).await.map(|r| !r.skipped()),
                    Pass::Plan => this.generate_plan(&code).await.map(|p| p.is_some()),
                };
                (code, outcome)
            });
        }

        let mut summary = PassSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(true))) => summary.processed += 1,
                Ok((_, Ok(false))) => summary.skipped += 1,
                Ok((code, Err(e @ GreenhouseError::NotFound(_))))
                | Ok((code, Err(e @ GreenhouseError::UpstreamUnavailable(_)))) => {
                    warn!(greenhouse = %code, ?pass, "Skipped: {}", e);
                    summary.skipped += 1;
                }
                Ok((code, Err(e))) => {
                    error!(greenhouse = %code, ?pass, "Failed: {}", e);
                    summary.failed += 1;
                }
                Err(e) => {
                    error!(?pass, "Worker task failed: {}", e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            ?pass,
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Pass complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::GreenhouseStore;
    use crate::db::{Database, PlanStore};
    use crate::models::{ActuatorGroup, Metric, SensorRef, Unit, SOIL_MOIST};
    use chrono::Duration as ChronoDuration;

    /// Weather keyed by city; `slow` cities hang, unknown cities fail.
    #[derive(Default)]
    struct FakeWeather {
        readings: HashMap<String, WeatherReading>,
        forecasts: HashMap<String, Vec<WeatherReading>>,
        slow: Vec<String>,
    }

    impl FakeWeather {
        fn with(mut self, city: &str, temperature: f64, humidity: f64) -> Self {
            self.readings.insert(
                city.to_string(),
                WeatherReading {
                    temperature: Some(temperature),
                    humidity: Some(humidity),
                    wind_speed: Some(1.0),
                    precipitation_mm: Some(0.0),
                    ..Default::default()
                },
            );
            self
        }
    }

    impl WeatherClient for FakeWeather {
        async fn current(&self, location: &Location) -> Result<WeatherReading> {
            if self.slow.contains(&location.city) {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            self.readings
                .get(&location.city)
                .cloned()
                .ok_or_else(|| GreenhouseError::UpstreamUnavailable(location.city.clone()))
        }

        async fn forecast(&self, location: &Location) -> Result<WeatherForecast> {
            let samples = self
                .forecasts
                .get(&location.city)
                .cloned()
                .ok_or_else(|| GreenhouseError::UpstreamUnavailable(location.city.clone()))?;
            Ok(WeatherForecast {
                fetched_at: Utc::now(),
                city: location.city.clone(),
                samples,
            })
        }
    }

    fn setup(weather: FakeWeather) -> Arc<Orchestrator<Database, FakeWeather>> {
        let db = Database::open_in_memory().unwrap();
        let profile = PlantProfile::new("tomato")
            .with_temperature(15.0, 30.0)
            .with_humidity(40.0, 80.0)
            .with_soil_moisture(30.0, 50.0)
            .with_rule(
                Metric::Temperature,
                15.0,
                30.0,
                Command::new(ActuatorGroup::Shade, true),
            );
        db.upsert_profile(&profile).unwrap();
        Arc::new(
            Orchestrator::new(db, weather, &Config::default())
                .with_weather_timeout(Duration::from_millis(50)),
        )
    }

    fn add_greenhouse(orch: &Orchestrator<Database, FakeWeather>, code: &str, city: &str) {
        let gh = Greenhouse::new(code, Location::city(city)).with_profile("tomato");
        orch.store.save(&gh).unwrap();
    }

    #[tokio::test]
    async fn test_hot_day_turns_shade_on() {
        let orch = setup(FakeWeather::default().with("Szeged", 34.0, 60.0));
        add_greenhouse(&orch, "G1", "Szeged");

        let report = orch.evaluate_tick("G1").await.unwrap();
        let readings = report.readings.unwrap();
        assert!((readings.temperature - 34.0).abs() < 1e-9);

        let shade = report
            .actions
            .iter()
            .find(|a| a.action == "SHADE_ON")
            .unwrap();
        assert_eq!(shade.reason, "profile-rules");

        let stored = orch.store.load_by_code("G1").unwrap().unwrap();
        assert!(stored.devices.shade_on);
        assert_eq!(stored.sensors.len(), 4);

        let logs = orch.store.list_action_logs("G1", 50).unwrap();
        assert!(logs
            .iter()
            .any(|l| l.action == "SHADE_ON" && l.reason == "profile-rules"));
        assert_eq!(orch.store.count_weather_snapshots("G1").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_second_tick_within_cooldown_is_quiet() {
        let orch = setup(FakeWeather::default().with("Szeged", 34.0, 60.0));
        add_greenhouse(&orch, "G1", "Szeged");

        let first = orch.evaluate_tick("G1").await.unwrap();
        assert!(first.actions.iter().any(|a| a.action == "VENT_OPEN"));

        let second = orch.evaluate_tick("G1").await.unwrap();
        assert!(!second
            .actions
            .iter()
            .any(|a| a.action.starts_with("VENT_") || a.action.starts_with("SHADE_")));
    }

    #[tokio::test]
    async fn test_unknown_manual_token_changes_nothing() {
        let orch = setup(FakeWeather::default().with("Szeged", 20.0, 60.0));
        add_greenhouse(&orch, "G1", "Szeged");
        let before = orch.store.load_by_code("G1").unwrap().unwrap();

        let err = orch.manual_action("G1", "FOO_BAR").await.unwrap_err();
        assert!(matches!(err, GreenhouseError::InvalidCommand(_)));

        let after = orch.store.load_by_code("G1").unwrap().unwrap();
        assert_eq!(before.devices, after.devices);
        assert!(orch.store.list_action_logs("G1", 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_manual_action_unknown_greenhouse() {
        let orch = setup(FakeWeather::default());
        let err = orch.manual_action("NOPE", "LIGHT_ON").await.unwrap_err();
        assert!(matches!(err, GreenhouseError::NotFound(_)));
    }

    fn lock_entries(orch: &Orchestrator<Database, FakeWeather>) -> usize {
        orch.locks.locks.lock().unwrap().len()
    }

    #[tokio::test]
    async fn test_locks_released_after_use() {
        let orch = setup(FakeWeather::default().with("Szeged", 20.0, 60.0));
        add_greenhouse(&orch, "G1", "Szeged");

        for code in ["NOPE", "ALSO_NOPE", "G1"] {
            let _ = orch.manual_action(code, "LIGHT_ON").await;
        }
        orch.evaluate_tick("G1").await.unwrap();
        assert_eq!(lock_entries(&orch), 0);

        // a waiter keeps the entry alive until it is done
        let held = orch.locks.acquire("G1").await;
        let waiter = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.evaluate_tick("G1").await })
        };
        tokio::task::yield_now().await;
        drop(held);
        assert!(waiter.await.unwrap().is_ok());
        assert_eq!(lock_entries(&orch), 0);
    }

    #[tokio::test]
    async fn test_manual_override_survives_tick() {
        let orch = setup(FakeWeather::default().with("Szeged", 20.0, 60.0));
        let mut gh = Greenhouse::new("G1", Location::city("Szeged")).with_profile("tomato");
        gh.upsert_sensor(SensorRef::reading(
            SOIL_MOIST,
            Metric::SoilMoisturePct,
            Unit::Percent,
            55.0,
            Utc::now(),
        ));
        orch.store.save(&gh).unwrap();

        let entry = orch.manual_action("G1", "irrigation_on").await.unwrap();
        assert_eq!(entry.action, "IRRIGATION_ON");
        assert_eq!(entry.reason, "manual");

        // soil sits at the top of the range, which would normally stop irrigation
        let report = orch.evaluate_tick("G1").await.unwrap();
        assert!(!report.actions.iter().any(|a| a.action == "IRRIGATION_OFF"));

        let stored = orch.store.load_by_code("G1").unwrap().unwrap();
        assert!(stored.devices.irrigation_on);
        assert!(stored
            .devices
            .last_manual_action_at
            .contains_key(&ActuatorGroup::Irrigation));

        let logs = orch.store.list_action_logs("G1", 10).unwrap();
        assert!(logs.iter().any(|l| l.reason == "manual"));
    }

    #[tokio::test]
    async fn test_manual_action_tolerates_weather_outage() {
        let orch = setup(FakeWeather::default());
        add_greenhouse(&orch, "G1", "Nowhere");

        let entry = orch.manual_action("G1", "LIGHT_ON").await.unwrap();
        assert_eq!(entry.action, "LIGHT_ON");
        let stored = orch.store.load_by_code("G1").unwrap().unwrap();
        assert!(stored.devices.light_on);
        assert!(stored.sensors.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_does_not_block_other_greenhouses() {
        let mut weather = FakeWeather::default()
            .with("Slowtown", 20.0, 60.0)
            .with("Szeged", 34.0, 60.0);
        weather.slow.push("Slowtown".into());
        let orch = setup(weather);
        add_greenhouse(&orch, "G1", "Slowtown");
        add_greenhouse(&orch, "G2", "Szeged");

        let summary = orch.evaluate_all().await.unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 0);

        let g1 = orch.store.load_by_code("G1").unwrap().unwrap();
        let g2 = orch.store.load_by_code("G2").unwrap().unwrap();
        assert!(g1.sensors.is_empty());
        assert_eq!(g2.sensors.len(), 4);
        assert!(g2.devices.shade_on);
    }

    #[tokio::test]
    async fn test_missing_profile_and_inactive_are_skipped() {
        let orch = setup(FakeWeather::default().with("Szeged", 22.0, 60.0));
        let orphan = Greenhouse::new("G1", Location::city("Szeged")).with_profile("basil");
        orch.store.save(&orphan).unwrap();
        let mut idle = Greenhouse::new("G2", Location::city("Szeged")).with_profile("tomato");
        idle.active = false;
        orch.store.save(&idle).unwrap();
        add_greenhouse(&orch, "G3", "Szeged");

        let err = orch.evaluate_tick("G1").await.unwrap_err();
        assert!(matches!(err, GreenhouseError::NotFound(_)));
        assert!(orch.evaluate_tick("G2").await.unwrap().skipped());

        let summary = orch.evaluate_all().await.unwrap();
        assert_eq!(
            summary,
            PassSummary {
                processed: 1,
                skipped: 2,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_generate_plan_points_greenhouse_at_it() {
        let now = Utc::now();
        let sample = |hours: i64, temperature: f64| WeatherReading {
            timestamp: Some(now + ChronoDuration::hours(hours)),
            temperature: Some(temperature),
            ..Default::default()
        };
        let mut weather = FakeWeather::default();
        weather
            .forecasts
            .insert("Szeged".into(), vec![sample(3, 20.0), sample(6, 33.0)]);
        weather.forecasts.insert("Empty".into(), Vec::new());
        let orch = setup(weather);
        add_greenhouse(&orch, "G1", "Szeged");
        add_greenhouse(&orch, "G2", "Empty");
        add_greenhouse(&orch, "G3", "Offline");

        let plan = orch.generate_plan("G1").await.unwrap().unwrap();
        assert_eq!(plan.events.len(), 1);
        assert_eq!(plan.events[0].expected_temperature, Some(33.0));

        let stored = orch.store.load_by_code("G1").unwrap().unwrap();
        assert_eq!(stored.plan_id, plan.id);
        let active = orch.store.latest_active_plan("G1").unwrap().unwrap();
        assert_eq!(active.id, plan.id);

        assert!(orch.generate_plan("G2").await.unwrap().is_none());
        assert!(orch.generate_plan("G3").await.unwrap().is_none());
        assert!(orch.store.latest_active_plan("G2").unwrap().is_none());

        let summary = orch.generate_all_plans().await.unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 2);
    }

    #[tokio::test]
    async fn test_simulate_now_writes_readings_only() {
        let orch = setup(FakeWeather::default().with("Szeged", 34.0, 60.0));
        add_greenhouse(&orch, "G1", "Szeged");

        let out = orch.simulate_now("G1").await.unwrap();
        assert!((out.temperature - 34.0).abs() < 1e-9);
        let stored = orch.store.load_by_code("G1").unwrap().unwrap();
        assert_eq!(stored.sensors.len(), 4);
        assert!(!stored.devices.shade_on);
        assert!(orch.store.list_action_logs("G1", 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_ticks_for_one_greenhouse_serialize() {
        let orch = setup(FakeWeather::default().with("Szeged", 34.0, 60.0));
        add_greenhouse(&orch, "G1", "Szeged");
        assert!(Arc::ptr_eq(&orch.locks.handle("G1"), &orch.locks.handle("G1")));

        let (a, b) = tokio::join!(orch.evaluate_tick("G1"), orch.evaluate_tick("G1"));
        let applied = a.unwrap().actions.len() + b.unwrap().actions.len();

        // the second tick sees the first tick's state, so nothing is applied twice
        let logs = orch.store.list_action_logs("G1", 50).unwrap();
        assert_eq!(logs.len(), applied);
        assert_eq!(
            logs.iter().filter(|l| l.action == "SHADE_ON").count(),
            1
        );
    }
}
