//! Collaborator seams the control engine depends on. `Database` implements
//! all of them; tests use an in-memory database.

use crate::error::Result;
use crate::models::{ActionLog, Greenhouse, Plan, PlantProfile, WeatherReading};

/// Full-aggregate read/write; no partial-field updates.
pub trait GreenhouseStore: Send + Sync {
    fn load_by_code(&self, code: &str) -> Result<Option<Greenhouse>>;
    fn save(&self, greenhouse: &Greenhouse) -> Result<()>;
    fn list_codes(&self) -> Result<Vec<String>>;
}

pub trait ProfileStore: Send + Sync {
    /// Looks up by profile id, falling back to plant code.
    fn get_profile(&self, id: &str) -> Result<Option<PlantProfile>>;
}

pub trait PlanStore: Send + Sync {
    fn insert_plan(&self, plan: &Plan) -> Result<i64>;
    fn latest_active_plan(&self, greenhouse_code: &str) -> Result<Option<Plan>>;
}

/// Append-only; duplicates are tolerable, lost entries are not fatal.
pub trait AuditLog: Send + Sync {
    fn append(&self, entry: &ActionLog) -> Result<()>;
}

pub trait WeatherHistory: Send + Sync {
    fn record_weather(&self, greenhouse_code: &str, reading: &WeatherReading) -> Result<()>;
}

/// Everything the orchestrator needs from persistence.
pub trait Store: GreenhouseStore + ProfileStore + PlanStore + AuditLog + WeatherHistory {}

impl<T> Store for T where T: GreenhouseStore + ProfileStore + PlanStore + AuditLog + WeatherHistory {}
