//! Blob table operations.
//!
//! Implements [`BlobStore`] on top of the `blobs` table. Values are stored
//! verbatim; the raw/derived distinction lives only in the key.

use super::connection::CacheDb;
use super::store::BlobStore;
use crate::Error;
use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

#[async_trait]
impl BlobStore for CacheDb {
    /// Insert or replace the value stored under `key`.
    async fn put(&self, key: &str, value: Bytes) -> Result<(), Error> {
        let key = key.to_string();
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO blobs (key, value, size, stored_at) VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        size = excluded.size,
                        stored_at = excluded.stored_at",
                    params![key, &value[..], value.len() as i64, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Bytes>, Error> {
                let result = conn.query_row("SELECT value FROM blobs WHERE key = ?1", params![key], |row| {
                    row.get::<_, Vec<u8>>(0)
                });

                match result {
                    Ok(value) => Ok(Some(Bytes::from(value))),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM blobs WHERE key = ?1", params![key])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn list_keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT key FROM blobs ORDER BY key")?;
                let keys = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }
}
