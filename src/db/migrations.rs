use crate::db::Database;
use crate::error::Result;

const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    CREATE TABLE IF NOT EXISTS greenhouses (
        code TEXT PRIMARY KEY,
        active INTEGER NOT NULL DEFAULT 1,
        document TEXT NOT NULL,
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS plant_profiles (
        id TEXT PRIMARY KEY,
        plant_code TEXT NOT NULL UNIQUE,
        plant_type TEXT UNIQUE,
        document TEXT NOT NULL,
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS action_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        greenhouse_code TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        action TEXT NOT NULL,
        reason TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS plans (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        greenhouse_code TEXT NOT NULL,
        valid_from TEXT NOT NULL,
        valid_to TEXT NOT NULL,
        active INTEGER NOT NULL DEFAULT 1,
        events TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS weather_snapshots (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        greenhouse_code TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        city TEXT,
        temperature REAL,
        humidity REAL,
        wind_speed REAL,
        precipitation_mm REAL,
        soil_moisture_pct REAL
    );

    CREATE TABLE IF NOT EXISTS schema_migrations (
        version INTEGER PRIMARY KEY,
        applied_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    "#,
    // Migration 2: Add indexes
    r#"
    CREATE INDEX IF NOT EXISTS idx_action_logs_greenhouse
        ON action_logs(greenhouse_code);
    CREATE INDEX IF NOT EXISTS idx_plans_greenhouse
        ON plans(greenhouse_code, active);
    CREATE INDEX IF NOT EXISTS idx_weather_snapshots_greenhouse
        ON weather_snapshots(greenhouse_code);
    "#,
];

pub fn run(db: &Database) -> Result<()> {
    db.with_conn_mut(|conn| {
        // Ensure schema_migrations table exists
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;

        // Get current version
        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        // Apply pending migrations
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                tracing::info!("Applying migration {}", version);
                let tx = conn.transaction()?;
                tx.execute_batch(migration)?;
                tx.execute(
                    "INSERT INTO schema_migrations (version) VALUES (?1)",
                    [version],
                )?;
                tx.commit()?;
            }
        }

        Ok(())
    })
}
