//! Entry operations within a generation.
//!
//! Entries are written whole and read whole. `put_entry` replaces any
//! previous value for the same key; there is no partial update.

use super::connection::CacheDb;
use crate::Error;
use crate::request::{RequestKey, StoredResponse};
use bytes::Bytes;
use serde::Serialize;
use tokio_rusqlite::rusqlite;
use tokio_rusqlite::{params, rusqlite::OptionalExtension};

/// Listing row for a stored entry, without the body.
#[derive(Debug, Clone, Serialize)]
pub struct EntryRecord {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub size: usize,
    pub stored_at: String,
}

/// Write one entry using UPSERT semantics.
///
/// Shared by runtime puts and by the install transaction.
pub(crate) fn write_entry(
    conn: &rusqlite::Connection, label: &str, key: &RequestKey, response: &StoredResponse, stored_at: &str,
) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&response.headers).map_err(|e| Error::CorruptEntry(e.to_string()))?;
    conn.execute(
        "INSERT INTO entries (
            generation, key_hash, method, url, status, status_text, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(generation, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            label,
            key.digest(),
            key.method(),
            key.url().as_str(),
            response.status,
            &response.status_text,
            headers_json,
            &response.body[..],
            stored_at,
        ],
    )?;
    Ok(())
}

fn decode_response(
    status: u16, status_text: Option<String>, headers_json: &str, body: Vec<u8>,
) -> Result<StoredResponse, Error> {
    let headers: Vec<(String, String)> =
        serde_json::from_str(headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;
    Ok(StoredResponse { status, status_text, headers, body: Bytes::from(body) })
}

type RawResponse = (u16, Option<String>, String, Vec<u8>);

impl CacheDb {
    /// Look up an entry in a specific generation.
    pub async fn match_entry(&self, label: &str, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        let label = label.to_string();
        let key_hash = key.digest();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let raw: Option<RawResponse> = conn
                    .query_row(
                        "SELECT status, status_text, headers_json, body
                         FROM entries WHERE generation = ?1 AND key_hash = ?2",
                        params![label, key_hash],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                    )
                    .optional()?;

                raw.map(|(status, status_text, headers_json, body)| {
                    decode_response(status, status_text, &headers_json, body)
                })
                .transpose()
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an entry in whichever generation is current.
    ///
    /// Returns None when there is no current generation yet.
    pub async fn match_current(&self, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        let key_hash = key.digest();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let raw: Option<RawResponse> = conn
                    .query_row(
                        "SELECT e.status, e.status_text, e.headers_json, e.body
                         FROM entries e
                         JOIN generations g ON g.label = e.generation
                         WHERE g.state = 'current' AND e.key_hash = ?1",
                        params![key_hash],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                    )
                    .optional()?;

                raw.map(|(status, status_text, headers_json, body)| {
                    decode_response(status, status_text, &headers_json, body)
                })
                .transpose()
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace an entry.
    ///
    /// Fails if the generation does not exist (e.g. it was evicted while a
    /// fetch was in flight).
    pub async fn put_entry(&self, label: &str, key: &RequestKey, response: &StoredResponse) -> Result<(), Error> {
        let label = label.to_string();
        let key = key.clone();
        let response = response.clone();
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> { write_entry(conn, &label, &key, &response, &stored_at) })
            .await
            .map_err(Error::from)
    }

    /// Delete a single entry. Returns whether it existed.
    pub async fn delete_entry(&self, label: &str, key: &RequestKey) -> Result<bool, Error> {
        let label = label.to_string();
        let key_hash = key.digest();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE generation = ?1 AND key_hash = ?2",
                    params![label, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// All request keys stored in a generation, ordered by URL.
    pub async fn keys(&self, label: &str) -> Result<Vec<RequestKey>, Error> {
        Ok(self
            .entries(label)
            .await?
            .into_iter()
            .filter_map(|record| match url::Url::parse(&record.url) {
                Ok(url) => Some(RequestKey::new(&record.method, url)),
                Err(e) => {
                    tracing::warn!(url = %record.url, error = %e, "skipping entry with unparseable url");
                    None
                }
            })
            .collect())
    }

    /// Entry listing for a generation, ordered by URL.
    pub async fn entries(&self, label: &str) -> Result<Vec<EntryRecord>, Error> {
        let label = label.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntryRecord>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, LENGTH(body), stored_at
                     FROM entries WHERE generation = ?1 ORDER BY url, method",
                )?;
                let rows = stmt.query_map(params![label], |row| {
                    Ok(EntryRecord {
                        method: row.get(0)?,
                        url: row.get(1)?,
                        status: row.get(2)?,
                        size: row.get::<_, i64>(3)? as usize,
                        stored_at: row.get(4)?,
                    })
                })?;

                let mut records = Vec::new();
                for row in rows {
                    records.push(row?);
                }
                Ok(records)
            })
            .await
            .map_err(Error::from)
    }
}
