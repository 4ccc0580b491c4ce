use crate::error::{GreenhouseError, Result};
use crate::models::Location;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Longest accepted manual override window and automatic cooldown.
const MAX_COOLDOWN_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub openweathermap: Option<OpenWeatherMapConfig>,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Directory of plant profile YAML files imported by `import-profiles`.
    #[serde(default)]
    pub profiles_dir: Option<PathBuf>,
    /// Greenhouses registered on startup when not yet stored.
    #[serde(default)]
    pub greenhouses: Vec<GreenhouseConfig>,
}

#[derive(Clone, Deserialize, Serialize)]
pub struct OpenWeatherMapConfig {
    pub api_key: String,
    #[serde(default = "default_units")]
    pub units: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_units() -> String {
    "metric".into()
}

fn default_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".into()
}

impl std::fmt::Debug for OpenWeatherMapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherMapConfig")
            .field("api_key", &"[REDACTED]")
            .field("units", &self.units)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick_interval_secs: u64,
    pub plan_interval_secs: u64,
    /// Upper bound on greenhouses processed concurrently within one pass.
    pub workers: usize,
    pub weather_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            plan_interval_secs: 12 * 3600,
            workers: 4,
            weather_timeout_secs: 10,
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }

    pub fn plan_interval(&self) -> Duration {
        Duration::from_secs(self.plan_interval_secs.max(1))
    }

    pub fn weather_timeout(&self) -> Duration {
        Duration::from_secs(self.weather_timeout_secs.max(1))
    }
}

/// Actuator control tuning, loaded once and shared immutably.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Manual override window and automatic cooldown, in seconds.
    pub cooldown_secs: i64,
    /// Hysteresis margin as a fraction of the range width.
    pub margin_fraction: f64,
    pub min_margin: f64,
    /// Shade turns on at or above `temperature.max + shade_offset`.
    pub shade_offset: f64,
    /// Also evaluate profile rules against raw outside weather each tick.
    pub weather_rules: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 300,
            margin_fraction: 0.05,
            min_margin: 1.0,
            shade_offset: 0.5,
            weather_rules: true,
        }
    }
}

impl ControlConfig {
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cooldown_secs)
    }
}

/// Constants of the heuristic climate model.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub light_temp_delta: f64,
    pub vent_temp_delta: f64,
    pub shade_temp_delta: f64,
    pub humidifier_humidity_delta: f64,
    pub vent_humidity_delta: f64,
    pub vent_wind_delta: f64,
    pub max_wind: f64,
    pub irrigation_soil_delta: f64,
    pub irrigation_humidity_delta: f64,
    pub temperature_alpha: f64,
    pub humidity_alpha: f64,
    pub wind_alpha: f64,
    pub fallback_temperature: f64,
    pub fallback_wind: f64,
    pub fallback_soil_moisture: f64,
    pub fallback_humidity: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            light_temp_delta: 1.5,
            vent_temp_delta: 1.0,
            shade_temp_delta: 0.5,
            humidifier_humidity_delta: 5.0,
            vent_humidity_delta: 3.0,
            vent_wind_delta: 0.5,
            max_wind: 20.0,
            irrigation_soil_delta: 1.5,
            irrigation_humidity_delta: 0.2,
            temperature_alpha: 0.2,
            humidity_alpha: 0.15,
            wind_alpha: 0.2,
            fallback_temperature: 20.0,
            fallback_wind: 0.0,
            fallback_soil_moisture: 30.0,
            fallback_humidity: 60.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GreenhouseConfig {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub location: Location,
    #[serde(default)]
    pub plant_profile_id: Option<String>,
}

fn default_active() -> bool {
    true
}

impl Config {
    pub fn load(config_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_override {
            Some(p) => p,
            None => Self::find_config_path()?,
        };

        if !config_path.exists() {
            return Err(GreenhouseError::Config(format!(
                "Config file not found at {:?}. Copy config/config.yaml.example to get started.",
                config_path
            )));
        }

        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| GreenhouseError::Config(format!("Failed to read config: {}", e)))?;

        Self::parse(&config_str)
    }

    pub fn parse(content: &str) -> Result<Self> {
        // Substitute environment variables
        let content = Self::substitute_env_vars(content);

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| GreenhouseError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.scheduler.workers == 0 {
            return Err(GreenhouseError::Config(
                "scheduler.workers must be at least 1".into(),
            ));
        }
        if self.control.cooldown_secs < 0 {
            return Err(GreenhouseError::Config(
                "control.cooldown_secs must not be negative".into(),
            ));
        }
        if self.control.cooldown_secs > MAX_COOLDOWN_SECS {
            return Err(GreenhouseError::Config(format!(
                "control.cooldown_secs must not exceed {} (one week)",
                MAX_COOLDOWN_SECS
            )));
        }
        let alphas = [
            self.simulation.temperature_alpha,
            self.simulation.humidity_alpha,
            self.simulation.wind_alpha,
        ];
        if alphas.iter().any(|a| !(0.0..=1.0).contains(a)) {
            return Err(GreenhouseError::Config(
                "simulation smoothing factors must lie in [0, 1]".into(),
            ));
        }
        Ok(())
    }

    /// Search for config.yaml in standard locations.
    /// Returns the path of the first found config, or the XDG default path if none found.
    fn find_config_path() -> Result<PathBuf> {
        let local_config = PathBuf::from("config/config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let default_path = dirs::config_dir()
            .ok_or_else(|| GreenhouseError::Config("Cannot determine config directory".into()))?
            .join("greenhouse-control")
            .join("config.yaml");
        Ok(default_path)
    }

    fn substitute_env_vars(content: &str) -> String {
        let mut result = content.to_string();

        // Find all ${VAR_NAME} patterns and substitute
        let re = match regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}") {
            Ok(re) => re,
            Err(_) => return result,
        };

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];
            if let Ok(value) = std::env::var(var_name) {
                result = result.replace(placeholder, &value);
            }
        }

        result
    }

    pub fn data_dir(data_dir_override: Option<&PathBuf>) -> Result<PathBuf> {
        // CLI override takes priority
        if let Some(dir) = data_dir_override {
            std::fs::create_dir_all(dir)?;
            return Ok(dir.clone());
        }

        if let Ok(dir) = std::env::var("GREENHOUSE_DATA_DIR") {
            let p = PathBuf::from(dir);
            std::fs::create_dir_all(&p)?;
            return Ok(p);
        }

        let data_dir = dirs::data_dir()
            .ok_or_else(|| GreenhouseError::Config("Cannot determine data directory".into()))?
            .join("greenhouse-control");

        std::fs::create_dir_all(&data_dir)?;
        Ok(data_dir)
    }

    pub fn db_path(data_dir_override: Option<&PathBuf>) -> Result<PathBuf> {
        Ok(Self::data_dir(data_dir_override)?.join("greenhouse.db"))
    }
}
