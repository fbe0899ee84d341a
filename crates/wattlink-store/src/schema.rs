/// SQL DDL for the wattlink readings database.
/// WAL mode enabled at connection time.
pub const SCHEMA_VERSION: u32 = 1;

pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA busy_timeout = 5000;
"#;

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS readings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    esp_mac TEXT NOT NULL,
    temperature REAL,
    humidity REAL,
    voltage REAL,
    energy_usage REAL,
    recorded_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_readings_mac_time ON readings(esp_mac, recorded_at);
"#;
