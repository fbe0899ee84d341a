use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::instrument;

use wattlink_core::{DeviceId, NewReading, Reading};

use crate::database::Database;
use crate::error::StoreError;

const SELECT_COLUMNS: &str =
    "id, esp_mac, temperature, humidity, voltage, energy_usage, recorded_at";

/// Historical sensor readings, keyed by device.
#[derive(Clone)]
pub struct ReadingRepo {
    db: Database,
}

impl ReadingRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persist a reading stamped with the current time.
    #[instrument(skip(self, reading), fields(esp_mac = %reading.esp_mac))]
    pub fn save(&self, reading: &NewReading) -> Result<Reading, StoreError> {
        self.save_at(reading, Utc::now())
    }

    pub fn save_at(
        &self,
        reading: &NewReading,
        recorded_at: DateTime<Utc>,
    ) -> Result<Reading, StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO readings (esp_mac, temperature, humidity, voltage, energy_usage, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    reading.esp_mac.as_str(),
                    reading.temperature,
                    reading.humidity,
                    reading.voltage,
                    reading.energy_usage,
                    recorded_at.timestamp_millis(),
                ],
            )?;

            Ok(Reading {
                id: conn.last_insert_rowid(),
                esp_mac: reading.esp_mac.clone(),
                temperature: reading.temperature,
                humidity: reading.humidity,
                voltage: reading.voltage,
                energy_usage: reading.energy_usage,
                timestamp: truncate_to_millis(recorded_at),
            })
        })
    }

    /// Most recent reading for a device, if any.
    #[instrument(skip(self), fields(esp_mac = %esp_mac))]
    pub fn latest_for_device(&self, esp_mac: &DeviceId) -> Result<Option<Reading>, StoreError> {
        self.db.with_conn(|conn| {
            let reading = conn
                .query_row(
                    &format!(
                        "SELECT {SELECT_COLUMNS} FROM readings WHERE esp_mac = ?1
                         ORDER BY recorded_at DESC, id DESC LIMIT 1"
                    ),
                    [esp_mac.as_str()],
                    row_to_reading,
                )
                .optional()?;
            Ok(reading)
        })
    }

    #[cfg(test)]
    pub fn count_for_device(&self, esp_mac: &DeviceId) -> Result<u64, StoreError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM readings WHERE esp_mac = ?1",
                [esp_mac.as_str()],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
    }
}

fn row_to_reading(row: &Row<'_>) -> rusqlite::Result<Reading> {
    let millis: i64 = row.get(6)?;
    Ok(Reading {
        id: row.get(0)?,
        esp_mac: DeviceId::new(&row.get::<_, String>(1)?),
        temperature: row.get(2)?,
        humidity: row.get(3)?,
        voltage: row.get(4)?,
        energy_usage: row.get(5)?,
        timestamp: DateTime::from_timestamp_millis(millis).unwrap_or_default(),
    })
}

fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}
