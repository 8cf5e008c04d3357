//! SQLite implementation of [`CacheStore`].
//!
//! Insertion order is a single monotonic sequence shared by all partitions;
//! ordering is only ever compared within one partition.

use super::connection::CacheDb;
use super::{CacheEntry, CacheKey, CacheStore, PrecacheRecord};
use crate::Error;
use crate::transport::Response;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Raw column values of one `cache_entries` row.
type EntryRow = (String, i64, String, Vec<u8>, i64, String);

fn decode_entry(row: EntryRow) -> Result<CacheEntry, Error> {
    let (key, status, headers_json, body, inserted_seq, inserted_at) = row;
    let status = u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status {status} for {key}")))?;
    let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
    Ok(CacheEntry {
        key: CacheKey::from_stored(key),
        response: Response::new(status, headers, body),
        inserted_seq,
        inserted_at,
    })
}

#[async_trait::async_trait]
impl CacheStore for CacheDb {
    async fn get(&self, partition: &str, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        let partition = partition.to_string();
        let key = key.as_str().to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, status, headers_json, body, inserted_seq, inserted_at
                     FROM cache_entries WHERE partition = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![partition, key], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
                });

                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(decode_entry).transpose()
    }

    async fn put(&self, partition: &str, key: &CacheKey, response: &Response) -> Result<(), Error> {
        let partition = partition.to_string();
        let key = key.as_str().to_string();
        let status = i64::from(response.status);
        let headers_json = serde_json::to_string(&response.headers)?;
        let body = response.body.to_vec();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (partition, key, status, headers_json, body, inserted_seq, inserted_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, (SELECT COALESCE(MAX(inserted_seq), 0) + 1 FROM cache_entries), ?6)
                    ON CONFLICT(partition, key) DO UPDATE SET
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        inserted_seq = excluded.inserted_seq,
                        inserted_at = excluded.inserted_at",
                    params![partition, key, status, headers_json, body, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, partition: &str, key: &CacheKey) -> Result<bool, Error> {
        let partition = partition.to_string();
        let key = key.as_str().to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE partition = ?1 AND key = ?2",
                    params![partition, key],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn keys_ordered_by_insertion(&self, partition: &str) -> Result<Vec<CacheKey>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<CacheKey>, Error> {
                let mut stmt =
                    conn.prepare("SELECT key FROM cache_entries WHERE partition = ?1 ORDER BY inserted_seq ASC")?;
                let keys = stmt
                    .query_map(params![partition], |row| row.get::<_, String>(0))?
                    .map(|k| k.map(CacheKey::from_stored))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_cache(&self, partition: &str) -> Result<bool, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE partition = ?1", params![partition])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn partitions(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT DISTINCT partition FROM cache_entries ORDER BY partition")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn active_precache(&self, cache_id: &str) -> Result<Option<PrecacheRecord>, Error> {
        let cache_id = cache_id.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<(String, String, String, String)>, Error> {
                let result = conn.query_row(
                    "SELECT partition, version, entries_json, activated_at FROM precache_state WHERE cache_id = ?1",
                    params![cache_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                );

                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        match row {
            Some((partition, version, entries_json, activated_at)) => Ok(Some(PrecacheRecord {
                partition,
                version,
                entries: serde_json::from_str(&entries_json)?,
                activated_at,
            })),
            None => Ok(None),
        }
    }

    async fn set_active_precache(&self, cache_id: &str, record: &PrecacheRecord) -> Result<(), Error> {
        let cache_id = cache_id.to_string();
        let entries_json = serde_json::to_string(&record.entries)?;
        let record = record.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO precache_state (cache_id, partition, version, entries_json, activated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(cache_id) DO UPDATE SET
                        partition = excluded.partition,
                        version = excluded.version,
                        entries_json = excluded.entries_json,
                        activated_at = excluded.activated_at",
                    params![cache_id, record.partition, record.version, entries_json, record.activated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
