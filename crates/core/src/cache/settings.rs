//! Settings table operations.
//!
//! Persists the single [`CacheMetadata`] record as JSON under a fixed name.

use super::connection::CacheDb;
use super::metadata::CacheMetadata;
use super::store::MetadataStore;
use crate::Error;
use async_trait::async_trait;
use chrono::Utc;
use tokio_rusqlite::params;

const METADATA_RECORD: &str = "cache_metadata";

impl CacheDb {
    /// Read a raw settings value by name.
    pub async fn get_setting(&self, name: &str) -> Result<Option<String>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let mut stmt = conn.prepare("SELECT value FROM settings WHERE name = ?1")?;

                let result = stmt.query_row(params![name], |row| row.get(0));

                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(tokio_rusqlite::rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or update a raw settings value.
    pub async fn put_setting(&self, name: &str, value: &str) -> Result<(), Error> {
        let name = name.to_string();
        let value = value.to_string();
        let updated_at = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO settings (name, value, updated_at)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(name) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at",
                    params![name, value, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl MetadataStore for CacheDb {
    async fn load(&self) -> Result<Option<CacheMetadata>, Error> {
        match self.get_setting(METADATA_RECORD).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, metadata: &CacheMetadata) -> Result<(), Error> {
        let json = serde_json::to_string(metadata)?;
        self.put_setting(METADATA_RECORD, &json).await
    }
}
