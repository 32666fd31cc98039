use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use bth_common::{NodeId, StationId};

use crate::conflict::ConflictRecord;
use crate::entry::NodeRegistryEntry;
use crate::error::RegistryResult;

/// SQLite-backed storage for the node registry's live rows and conflict
/// audit trail. Opened either against a file path or, for local testing, an
/// in-memory database.
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Opens (creating if necessary) the database at `path`, or an
    /// in-memory database when `local_testing` is set, and runs schema
    /// migration.
    pub async fn open(path: &str, local_testing: bool) -> RegistryResult<Self> {
        let options = if local_testing {
            SqliteConnectOptions::from_str(":memory:")?
        } else {
            SqliteConnectOptions::from_str(&format!("sqlite://{path}"))?.create_if_missing(true)
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(if local_testing { 1 } else { 5 })
            .connect_with(options)
            .await?;
        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    async fn migrate(&self) -> RegistryResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS nodes (
                node_id INTEGER NOT NULL,
                station_id TEXT NOT NULL,
                last_seen INTEGER NOT NULL,
                is_online INTEGER NOT NULL,
                metadata TEXT NOT NULL,
                ttl INTEGER NOT NULL,
                PRIMARY KEY (node_id, station_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS conflicts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                node_id INTEGER NOT NULL,
                record TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts or replaces the `(node_id, station_id)` row.
    pub async fn upsert(&self, entry: &NodeRegistryEntry) -> RegistryResult<()> {
        sqlx::query(
            "INSERT INTO nodes (node_id, station_id, last_seen, is_online, metadata, ttl)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(node_id, station_id) DO UPDATE SET
                last_seen = excluded.last_seen,
                is_online = excluded.is_online,
                metadata = excluded.metadata,
                ttl = excluded.ttl",
        )
        .bind(entry.node_id.0 as i64)
        .bind(entry.station_id.as_str())
        .bind(entry.last_seen)
        .bind(entry.is_online)
        .bind(entry.metadata.to_string())
        .bind(entry.ttl as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns every row (live or expired) for `(node_id, station_id)`.
    pub async fn get(&self, node_id: NodeId, station_id: &StationId) -> RegistryResult<Option<NodeRegistryEntry>> {
        let row = sqlx::query(
            "SELECT node_id, station_id, last_seen, is_online, metadata, ttl
             FROM nodes WHERE node_id = ?1 AND station_id = ?2",
        )
        .bind(node_id.0 as i64)
        .bind(station_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_entry).transpose()
    }

    /// Finds the live row for `node_id` with the largest `last_seen`,
    /// breaking ties by lexicographically smallest `station_id`.
    pub async fn find_node(&self, node_id: NodeId, now_ms: i64) -> RegistryResult<Option<NodeRegistryEntry>> {
        let rows = sqlx::query(
            "SELECT node_id, station_id, last_seen, is_online, metadata, ttl
             FROM nodes WHERE node_id = ?1 AND last_seen + ttl * 1000 >= ?2
             ORDER BY last_seen DESC, station_id ASC LIMIT 1",
        )
        .bind(node_id.0 as i64)
        .bind(now_ms)
        .fetch_optional(&self.pool)
        .await?;
        rows.map(row_to_entry).transpose()
    }

    /// Returns every live row, optionally filtered to a single owning
    /// station.
    pub async fn get_nodes_by_station(
        &self,
        station_id: Option<&StationId>,
        now_ms: i64,
    ) -> RegistryResult<Vec<NodeRegistryEntry>> {
        let rows = if let Some(station_id) = station_id {
            sqlx::query(
                "SELECT node_id, station_id, last_seen, is_online, metadata, ttl
                 FROM nodes WHERE station_id = ?1 AND last_seen + ttl * 1000 >= ?2
                 ORDER BY node_id ASC",
            )
            .bind(station_id.as_str())
            .bind(now_ms)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT node_id, station_id, last_seen, is_online, metadata, ttl
                 FROM nodes WHERE last_seen + ttl * 1000 >= ?1
                 ORDER BY node_id ASC",
            )
            .bind(now_ms)
            .fetch_all(&self.pool)
            .await?
        };
        rows.into_iter().map(row_to_entry).collect()
    }

    /// Removes `node_id`'s row(s), optionally restricted to one owning
    /// station, returning the number of rows removed.
    pub async fn remove(&self, node_id: NodeId, station_id: Option<&StationId>) -> RegistryResult<u64> {
        let result = if let Some(station_id) = station_id {
            sqlx::query("DELETE FROM nodes WHERE node_id = ?1 AND station_id = ?2")
                .bind(node_id.0 as i64)
                .bind(station_id.as_str())
                .execute(&self.pool)
                .await?
        } else {
            sqlx::query("DELETE FROM nodes WHERE node_id = ?1")
                .bind(node_id.0 as i64)
                .execute(&self.pool)
                .await?
        };
        Ok(result.rows_affected())
    }

    /// Removes every row owned by `station_id`, returning the count.
    pub async fn remove_station(&self, station_id: &StationId) -> RegistryResult<u64> {
        let result = sqlx::query("DELETE FROM nodes WHERE station_id = ?1")
            .bind(station_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Purges rows that have expired as of `now_ms`, returning the count.
    pub async fn cleanup_expired(&self, now_ms: i64) -> RegistryResult<u64> {
        let result = sqlx::query("DELETE FROM nodes WHERE last_seen + ttl * 1000 < ?1")
            .bind(now_ms)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Appends a resolved conflict to the audit trail.
    pub async fn record_conflict(&self, record: &ConflictRecord) -> RegistryResult<()> {
        let body = serde_json::to_string(record)?;
        sqlx::query("INSERT INTO conflicts (node_id, record, timestamp) VALUES (?1, ?2, ?3)")
            .bind(record.node_id.0 as i64)
            .bind(body)
            .bind(record.timestamp)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn row_to_entry(row: sqlx::sqlite::SqliteRow) -> RegistryResult<NodeRegistryEntry> {
    let node_id: i64 = row.try_get("node_id")?;
    let station_id: String = row.try_get("station_id")?;
    let last_seen: i64 = row.try_get("last_seen")?;
    let is_online: bool = row.try_get("is_online")?;
    let metadata: String = row.try_get("metadata")?;
    let ttl: i64 = row.try_get("ttl")?;

    Ok(NodeRegistryEntry {
        node_id: NodeId(node_id as u32),
        station_id: StationId::new(&station_id).unwrap_or_else(|_| {
            StationId::new("unknown-station").expect("fallback station id is valid")
        }),
        last_seen,
        is_online,
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
        ttl: ttl as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(node_id: u32, station: &str, last_seen: i64) -> NodeRegistryEntry {
        NodeRegistryEntry {
            node_id: NodeId(node_id),
            station_id: StationId::new(station).unwrap(),
            last_seen,
            is_online: true,
            metadata: serde_json::Value::Null,
            ttl: 300,
        }
    }

    #[tokio::test]
    async fn upsert_then_find_node_round_trips() {
        let storage = Storage::open(":memory:", true).await.unwrap();
        storage.upsert(&entry(1, "alpha", 1_000)).await.unwrap();
        let found = storage.find_node(NodeId(1), 1_100).await.unwrap().unwrap();
        assert_eq!(found.station_id, StationId::new("alpha").unwrap());
    }

    #[tokio::test]
    async fn find_node_ignores_expired_rows() {
        let storage = Storage::open(":memory:", true).await.unwrap();
        storage.upsert(&entry(1, "alpha", 1_000)).await.unwrap();
        let found = storage.find_node(NodeId(1), 1_000 + 301_000).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn find_node_breaks_ties_by_station_id() {
        let storage = Storage::open(":memory:", true).await.unwrap();
        storage.upsert(&entry(1, "bravo", 1_000)).await.unwrap();
        storage.upsert(&entry(1, "alpha", 1_000)).await.unwrap();
        let found = storage.find_node(NodeId(1), 1_000).await.unwrap().unwrap();
        assert_eq!(found.station_id, StationId::new("alpha").unwrap());
    }

    #[tokio::test]
    async fn cleanup_expired_purges_stale_rows() {
        let storage = Storage::open(":memory:", true).await.unwrap();
        storage.upsert(&entry(1, "alpha", 1_000)).await.unwrap();
        let purged = storage.cleanup_expired(1_000 + 301_000).await.unwrap();
        assert_eq!(purged, 1);
        assert!(storage.get(NodeId(1), &StationId::new("alpha").unwrap()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_station_clears_all_its_rows() {
        let storage = Storage::open(":memory:", true).await.unwrap();
        storage.upsert(&entry(1, "alpha", 1_000)).await.unwrap();
        storage.upsert(&entry(2, "alpha", 1_000)).await.unwrap();
        storage.upsert(&entry(3, "beta", 1_000)).await.unwrap();
        let removed = storage.remove_station(&StationId::new("alpha").unwrap()).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(storage.get_nodes_by_station(None, 1_000).await.unwrap().len(), 1);
    }
}
