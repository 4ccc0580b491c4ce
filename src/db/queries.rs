use crate::db::store::{AuditLog, GreenhouseStore, PlanStore, ProfileStore, WeatherHistory};
use crate::db::Database;
use crate::error::{GreenhouseError, Result};
use crate::models::{ActionLog, Greenhouse, Plan, PlannedEvent, PlantProfile, WeatherReading};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use tracing::warn;

// Greenhouse Queries

impl Database {
    /// Seeds a greenhouse from configuration without clobbering a stored one.
    /// Returns true when a row was written.
    pub fn insert_greenhouse_if_absent(&self, greenhouse: &Greenhouse) -> Result<bool> {
        let document = serde_json::to_string(greenhouse)?;
        self.with_conn(|conn| {
            let inserted = conn.execute(
                r#"
                INSERT OR IGNORE INTO greenhouses (code, active, document, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    greenhouse.code,
                    greenhouse.active,
                    document,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(inserted > 0)
        })
    }
}

impl GreenhouseStore for Database {
    fn load_by_code(&self, code: &str) -> Result<Option<Greenhouse>> {
        let document: Option<String> = self.with_conn(|conn| {
            conn.query_row(
                "SELECT document FROM greenhouses WHERE code = ?1",
                [code],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
        })?;

        document
            .map(|doc| serde_json::from_str(&doc).map_err(GreenhouseError::from))
            .transpose()
    }

    fn save(&self, greenhouse: &Greenhouse) -> Result<()> {
        let document = serde_json::to_string(greenhouse)?;
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO greenhouses (code, active, document, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(code) DO UPDATE SET
                    active = excluded.active,
                    document = excluded.document,
                    updated_at = excluded.updated_at
                "#,
                params![
                    greenhouse.code,
                    greenhouse.active,
                    document,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    fn list_codes(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT code FROM greenhouses ORDER BY code")?;
            let codes = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(codes)
        })
    }
}

// Plant Profile Queries

impl Database {
    pub fn upsert_profile(&self, profile: &PlantProfile) -> Result<()> {
        let document = serde_json::to_string(profile)?;
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO plant_profiles (id, plant_code, plant_type, document, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    plant_code = excluded.plant_code,
                    plant_type = excluded.plant_type,
                    document = excluded.document,
                    updated_at = excluded.updated_at
                "#,
                params![
                    profile.id,
                    profile.plant_code,
                    profile.plant_type,
                    document,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }
}

impl ProfileStore for Database {
    fn get_profile(&self, id: &str) -> Result<Option<PlantProfile>> {
        let document: Option<String> = self.with_conn(|conn| {
            conn.query_row(
                r#"
                SELECT document FROM plant_profiles
                WHERE id = ?1 OR plant_code = ?1
                ORDER BY CASE WHEN id = ?1 THEN 0 ELSE 1 END
                LIMIT 1
                "#,
                [id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
        })?;

        document
            .map(|doc| serde_json::from_str(&doc).map_err(GreenhouseError::from))
            .transpose()
    }
}

// Action Log Queries

impl AuditLog for Database {
    fn append(&self, entry: &ActionLog) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO action_logs (greenhouse_code, timestamp, action, reason)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    entry.greenhouse_code,
                    entry.timestamp.to_rfc3339(),
                    entry.action,
                    entry.reason,
                ],
            )?;
            Ok(())
        })
    }
}

impl Database {
    /// Newest first.
    pub fn list_action_logs(&self, greenhouse_code: &str, limit: usize) -> Result<Vec<ActionLog>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT * FROM action_logs
                WHERE greenhouse_code = ?1
                ORDER BY id DESC
                LIMIT ?2
                "#,
            )?;
            let logs = stmt
                .query_map(params![greenhouse_code, limit as i64], row_to_action_log)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(logs)
        })
    }
}

fn row_to_action_log(row: &Row) -> rusqlite::Result<ActionLog> {
    let timestamp_str: String = row.get("timestamp")?;

    Ok(ActionLog {
        id: Some(row.get("id")?),
        greenhouse_code: row.get("greenhouse_code")?,
        timestamp: parse_timestamp(&timestamp_str),
        action: row.get("action")?,
        reason: row.get("reason")?,
    })
}

// Plan Queries

struct PlanRow {
    id: i64,
    greenhouse_code: String,
    valid_from: String,
    valid_to: String,
    active: bool,
    events: String,
}

impl PlanRow {
    fn into_plan(self) -> Result<Plan> {
        let events: Vec<PlannedEvent> = serde_json::from_str(&self.events)?;
        Ok(Plan {
            id: Some(self.id),
            greenhouse_code: self.greenhouse_code,
            valid_from: parse_timestamp(&self.valid_from),
            valid_to: parse_timestamp(&self.valid_to),
            active: self.active,
            events,
        })
    }
}

fn row_to_plan_row(row: &Row) -> rusqlite::Result<PlanRow> {
    Ok(PlanRow {
        id: row.get("id")?,
        greenhouse_code: row.get("greenhouse_code")?,
        valid_from: row.get("valid_from")?,
        valid_to: row.get("valid_to")?,
        active: row.get("active")?,
        events: row.get("events")?,
    })
}

impl PlanStore for Database {
    fn insert_plan(&self, plan: &Plan) -> Result<i64> {
        let events = serde_json::to_string(&plan.events)?;
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO plans (greenhouse_code, valid_from, valid_to, active, events)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    plan.greenhouse_code,
                    plan.valid_from.to_rfc3339(),
                    plan.valid_to.to_rfc3339(),
                    plan.active,
                    events,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn latest_active_plan(&self, greenhouse_code: &str) -> Result<Option<Plan>> {
        let row = self.with_conn(|conn| {
            conn.query_row(
                r#"
                SELECT * FROM plans
                WHERE greenhouse_code = ?1 AND active = 1
                ORDER BY id DESC
                LIMIT 1
                "#,
                [greenhouse_code],
                row_to_plan_row,
            )
            .optional()
            .map_err(Into::into)
        })?;

        row.map(PlanRow::into_plan).transpose()
    }
}

// Weather Snapshot Queries

impl WeatherHistory for Database {
    fn record_weather(&self, greenhouse_code: &str, reading: &WeatherReading) -> Result<()> {
        let timestamp = reading.timestamp.unwrap_or_else(Utc::now);
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO weather_snapshots
                    (greenhouse_code, timestamp, city, temperature, humidity,
                     wind_speed, precipitation_mm, soil_moisture_pct)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    greenhouse_code,
                    timestamp.to_rfc3339(),
                    reading.city,
                    reading.temperature,
                    reading.humidity,
                    reading.wind_speed,
                    reading.precipitation_mm,
                    reading.soil_moisture_pct,
                ],
            )?;
            Ok(())
        })
    }
}

impl Database {
    pub fn count_weather_snapshots(&self, greenhouse_code: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM weather_snapshots WHERE greenhouse_code = ?1",
                [greenhouse_code],
                |row| row.get(0),
            )?)
        })
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| {
            warn!(timestamp = %value, "Unparseable timestamp in database, using now");
            Utc::now()
        })
}

// Helper trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> rusqlite::Result<Option<T>>;
}

impl<T> OptionalExt<T> for rusqlite::Result<T> {
    fn optional(self) -> rusqlite::Result<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
