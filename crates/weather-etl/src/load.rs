//! SQLite writer for the `weather_data` table.
//!
//! Every write opens its own connection, runs create-if-absent plus one
//! insert inside a single transaction, commits, and drops the connection.
//! A failure anywhere before the commit rolls the transaction back, so a
//! failed write never leaves a partial row.

use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;

use crate::transform::WeatherRecord;

/// Destination table.
pub const TABLE: &str = "weather_data";

/// Idempotent table creation. Safe to run against an existing table.
pub const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS weather_data (
        latitude        FLOAT,
        longitude       FLOAT,
        temperature     FLOAT,
        windspeed       FLOAT,
        winddirection   FLOAT,
        weathercode     INT,
        timestamp       TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );";

/// Positional insert, bound in the fixed column order.
pub const INSERT_SQL: &str = "INSERT INTO weather_data \
     (latitude, longitude, temperature, windspeed, winddirection, weathercode) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

/// Errors from the load step.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to open database {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("commit failed: {0}")]
    Commit(#[source] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WriteError>;

/// A row read back from `weather_data`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObservation {
    pub record: WeatherRecord,
    /// Server-assigned insert time, `YYYY-MM-DD HH:MM:SS` (UTC)
    pub timestamp: String,
}

/// Append `record` to the table at `path`, creating the file and table
/// if needed.
pub fn write(path: &Path, record: &WeatherRecord) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut conn = Connection::open(path).map_err(|source| WriteError::Open {
        path: path.display().to_string(),
        source,
    })?;

    let tx = conn.transaction()?;
    tx.execute_batch(CREATE_TABLE_SQL)?;
    insert(&tx, record)?;
    tx.commit().map_err(WriteError::Commit)?;

    log::info!("[Load] inserted 1 row into {} ({})", TABLE, path.display());
    Ok(())
}

/// Bind and execute the insert on an open connection or transaction.
///
/// Does not commit; callers own the transaction boundary.
pub fn insert(conn: &Connection, record: &WeatherRecord) -> Result<()> {
    conn.execute(
        INSERT_SQL,
        params![
            record.latitude,
            record.longitude,
            record.temperature,
            record.windspeed,
            record.winddirection,
            record.weathercode,
        ],
    )?;
    Ok(())
}

/// Most recent rows (newest first). A missing file or table yields no rows.
pub fn recent(path: &Path, limit: usize) -> Result<Vec<StoredObservation>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(
        |source| WriteError::Open {
            path: path.display().to_string(),
            source,
        },
    )?;

    let tables: i64 = conn.query_row(
        "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![TABLE],
        |row| row.get(0),
    )?;
    if tables == 0 {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(
        "SELECT latitude, longitude, temperature, windspeed, winddirection, weathercode, timestamp \
         FROM weather_data ORDER BY timestamp DESC, rowid DESC LIMIT ?1",
    )?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt.query_map(params![limit], |row| {
        Ok(StoredObservation {
            record: WeatherRecord {
                latitude: row.get(0)?,
                longitude: row.get(1)?,
                temperature: row.get(2)?,
                windspeed: row.get(3)?,
                winddirection: row.get(4)?,
                weathercode: row.get(5)?,
            },
            timestamp: row.get(6)?,
        })
    })?;
    let observations = rows.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn london_record() -> WeatherRecord {
        WeatherRecord {
            latitude: 51.5074,
            longitude: -0.1278,
            temperature: 12.3,
            windspeed: 5.4,
            winddirection: 180.0,
            weathercode: 3,
        }
    }

    fn row_count(path: &Path) -> i64 {
        let conn = Connection::open(path).unwrap();
        conn.query_row("SELECT count(*) FROM weather_data", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn write_inserts_exactly_one_row() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("weather.db");

        write(&db_path, &london_record()).unwrap();

        assert_eq!(row_count(&db_path), 1);
        let rows = recent(&db_path, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record, london_record());
        assert!(!rows[0].timestamp.is_empty());
    }

    #[test]
    fn write_assigns_server_timestamp() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("weather.db");
        write(&db_path, &london_record()).unwrap();

        let rows = recent(&db_path, 1).unwrap();
        // CURRENT_TIMESTAMP format: "YYYY-MM-DD HH:MM:SS"
        let ts = &rows[0].timestamp;
        assert_eq!(ts.len(), 19, "unexpected timestamp {}", ts);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], " ");
    }

    #[test]
    fn repeated_writes_append() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("weather.db");

        // Second and third writes re-run CREATE TABLE IF NOT EXISTS
        write(&db_path, &london_record()).unwrap();
        write(&db_path, &london_record()).unwrap();
        write(&db_path, &london_record()).unwrap();

        assert_eq!(row_count(&db_path), 3);
    }

    #[test]
    fn create_table_is_idempotent() {
        let dir = tempdir().unwrap();
        let conn = Connection::open(dir.path().join("weather.db")).unwrap();
        conn.execute_batch(CREATE_TABLE_SQL).unwrap();
        conn.execute_batch(CREATE_TABLE_SQL).unwrap(); // should not error
    }

    #[test]
    fn write_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("data").join("weather.db");
        write(&db_path, &london_record()).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn failed_insert_leaves_no_rows() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("weather.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute_batch(CREATE_TABLE_SQL).unwrap();
            conn.execute_batch(
                "CREATE TRIGGER reject_insert BEFORE INSERT ON weather_data
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();
        }

        let result = write(&db_path, &london_record());
        assert!(matches!(result, Err(WriteError::Sqlite(_))));
        assert_eq!(row_count(&db_path), 0);
    }

    #[test]
    fn uncommitted_insert_rolls_back() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("weather.db");
        let mut conn = Connection::open(&db_path).unwrap();
        conn.execute_batch(CREATE_TABLE_SQL).unwrap();

        {
            let tx = conn.transaction().unwrap();
            insert(&tx, &london_record()).unwrap();
            // dropped without commit
        }

        assert_eq!(row_count(&db_path), 0);
    }

    #[test]
    fn write_commit_failure_leaves_no_rows() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("weather.db");
        write(&db_path, &london_record()).unwrap();

        // A reader inside an open transaction holds a SHARED lock, so the
        // writer can insert (RESERVED) but cannot commit (EXCLUSIVE).
        let reader = Connection::open(&db_path).unwrap();
        reader.execute_batch("BEGIN").unwrap();
        let before: i64 = reader
            .query_row("SELECT count(*) FROM weather_data", [], |row| row.get(0))
            .unwrap();
        assert_eq!(before, 1);

        let result = write(&db_path, &london_record());
        assert!(
            matches!(result, Err(WriteError::Commit(_))),
            "expected Commit error, got {:?}",
            result
        );

        reader.execute_batch("COMMIT").unwrap();
        assert_eq!(row_count(&db_path), 1);
    }

    #[test]
    fn recent_limit_larger_than_i64() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("weather.db");
        write(&db_path, &london_record()).unwrap();
        write(&db_path, &london_record()).unwrap();

        let rows = recent(&db_path, usize::MAX).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn write_to_directory_fails() {
        let dir = tempdir().unwrap();
        assert!(write(dir.path(), &london_record()).is_err());
    }

    #[test]
    fn recent_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let rows = recent(&dir.path().join("absent.db"), 10).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn recent_missing_table_is_empty() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("other.db");
        Connection::open(&db_path)
            .unwrap()
            .execute_batch("CREATE TABLE unrelated (x INT);")
            .unwrap();
        assert!(recent(&db_path, 10).unwrap().is_empty());
    }

    #[test]
    fn recent_newest_first_with_limit() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("weather.db");
        for code in 0..5 {
            let record = WeatherRecord {
                weathercode: code,
                ..london_record()
            };
            write(&db_path, &record).unwrap();
        }

        let rows = recent(&db_path, 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].record.weathercode, 4);
        assert_eq!(rows[1].record.weathercode, 3);
    }
}
