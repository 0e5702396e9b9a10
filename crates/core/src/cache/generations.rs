//! Generation lifecycle operations.
//!
//! A generation is a named snapshot of entries. It is created `installed`
//! by [`CacheDb::install_generation`] and becomes `current` through
//! [`CacheDb::promote`]. Deleting a generation cascades to its entries.

use super::connection::CacheDb;
use super::entries::write_entry;
use crate::Error;
use crate::request::{RequestKey, StoredResponse};
use serde::Serialize;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

/// Persisted state of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationState {
    /// Fully populated, waiting for activation.
    Installed,
    /// The generation fetch handlers read from.
    Current,
}

impl GenerationState {
    fn as_str(self) -> &'static str {
        match self {
            GenerationState::Installed => "installed",
            GenerationState::Current => "current",
        }
    }

    fn parse(value: &str) -> Result<Self, Error> {
        match value {
            "installed" => Ok(GenerationState::Installed),
            "current" => Ok(GenerationState::Current),
            other => Err(Error::CorruptEntry(format!("unknown generation state: {other}"))),
        }
    }
}

/// A stored cache generation.
#[derive(Debug, Clone, Serialize)]
pub struct Generation {
    pub label: String,
    pub state: GenerationState,
    pub created_at: String,
    pub activated_at: Option<String>,
    pub entry_count: u64,
}

impl Generation {
    pub fn is_current(&self) -> bool {
        self.state == GenerationState::Current
    }
}

type RawGeneration = (String, String, String, Option<String>, i64);

fn into_generation((label, state, created_at, activated_at, count): RawGeneration) -> Result<Generation, Error> {
    Ok(Generation {
        label,
        state: GenerationState::parse(&state)?,
        created_at,
        activated_at,
        entry_count: count as u64,
    })
}

const SELECT_GENERATION: &str = "SELECT g.label, g.state, g.created_at, g.activated_at,
        (SELECT COUNT(*) FROM entries e WHERE e.generation = g.label)
     FROM generations g";

impl CacheDb {
    /// All generations, oldest first.
    pub async fn generations(&self) -> Result<Vec<Generation>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<Generation>, Error> {
                let mut stmt = conn.prepare(&format!("{SELECT_GENERATION} ORDER BY g.created_at, g.label"))?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                })?;

                let mut generations = Vec::new();
                for row in rows {
                    generations.push(into_generation(row?)?);
                }
                Ok(generations)
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a generation by label.
    pub async fn generation(&self, label: &str) -> Result<Option<Generation>, Error> {
        let label = label.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Generation>, Error> {
                let raw: Option<RawGeneration> = conn
                    .query_row(&format!("{SELECT_GENERATION} WHERE g.label = ?1"), params![label], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                    })
                    .optional()?;
                raw.map(into_generation).transpose()
            })
            .await
            .map_err(Error::from)
    }

    /// The current generation, if one has been activated.
    pub async fn current_generation(&self) -> Result<Option<Generation>, Error> {
        self.conn
            .call(|conn| -> Result<Option<Generation>, Error> {
                let raw: Option<RawGeneration> = conn
                    .query_row(&format!("{SELECT_GENERATION} WHERE g.state = 'current'"), [], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                    })
                    .optional()?;
                raw.map(into_generation).transpose()
            })
            .await
            .map_err(Error::from)
    }

    /// Open a generation, creating it empty and `installed` if absent.
    pub async fn open_generation(&self, label: &str) -> Result<Generation, Error> {
        let owned = label.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (label, state, created_at) VALUES (?1, ?2, ?3)",
                    params![owned, GenerationState::Installed.as_str(), now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        self.generation(label)
            .await?
            .ok_or_else(|| Error::NotInstalled(label.to_string()))
    }

    /// Write a fully fetched manifest into a generation in one transaction.
    ///
    /// A non-current generation with the same label is emptied first so a
    /// retried install never mixes old and new entries. The current
    /// generation keeps its runtime entries and has the manifest entries
    /// replaced. Returns the number of entries written.
    pub async fn install_generation(
        &self, label: &str, entries: Vec<(RequestKey, StoredResponse)>,
    ) -> Result<usize, Error> {
        let label = label.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;

                let state: Option<String> = tx
                    .query_row("SELECT state FROM generations WHERE label = ?1", params![label], |row| row.get(0))
                    .optional()?;

                match state.as_deref().map(GenerationState::parse).transpose()? {
                    Some(GenerationState::Current) => {}
                    Some(GenerationState::Installed) => {
                        tx.execute("DELETE FROM entries WHERE generation = ?1", params![label])?;
                    }
                    None => {
                        tx.execute(
                            "INSERT INTO generations (label, state, created_at) VALUES (?1, ?2, ?3)",
                            params![label, GenerationState::Installed.as_str(), now],
                        )?;
                    }
                }

                for (key, response) in &entries {
                    write_entry(&tx, &label, key, response, &now)?;
                }

                tx.commit()?;
                Ok(entries.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Make `label` the only current generation.
    ///
    /// Any other current generation is demoted to `installed` in the same
    /// transaction, so the single-current invariant holds even when a stale
    /// generation could not be deleted.
    pub async fn promote(&self, label: &str) -> Result<(), Error> {
        let label = label.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;

                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE label = ?1)",
                    params![label],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(Error::NotInstalled(label));
                }

                tx.execute(
                    "UPDATE generations SET state = 'installed' WHERE state = 'current' AND label <> ?1",
                    params![label],
                )?;
                tx.execute(
                    "UPDATE generations SET state = 'current', activated_at = COALESCE(activated_at, ?2)
                     WHERE label = ?1",
                    params![label, now],
                )?;

                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and all of its entries. Returns whether it existed.
    pub async fn delete_generation(&self, label: &str) -> Result<bool, Error> {
        let label = label.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE label = ?1", params![label])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str, body: &str) -> (RequestKey, StoredResponse) {
        (RequestKey::get(url::Url::parse(url).unwrap()), StoredResponse::new(200, body.to_string()))
    }

    #[tokio::test]
    async fn test_open_generation_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let first = db.open_generation("v1").await.unwrap();
        let second = db.open_generation("v1").await.unwrap();

        assert_eq!(first.label, "v1");
        assert_eq!(first.state, GenerationState::Installed);
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(db.generations().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_install_generation_writes_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let written = db
            .install_generation("v1", vec![entry("https://app.test/", "shell"), entry("https://app.test/a", "a")])
            .await
            .unwrap();

        assert_eq!(written, 2);
        let generation = db.generation("v1").await.unwrap().unwrap();
        assert_eq!(generation.entry_count, 2);
        assert!(!generation.is_current());
    }

    #[tokio::test]
    async fn test_reinstall_installed_generation_replaces_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.install_generation("v1", vec![entry("https://app.test/old", "old")])
            .await
            .unwrap();
        db.install_generation("v1", vec![entry("https://app.test/new", "new")])
            .await
            .unwrap();

        let keys = db.keys("v1").await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].url().path(), "/new");
    }

    #[tokio::test]
    async fn test_reinstall_current_generation_keeps_runtime_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.install_generation("v1", vec![entry("https://app.test/", "shell")])
            .await
            .unwrap();
        db.promote("v1").await.unwrap();
        let (k, r) = entry("https://app.test/runtime.png", "png");
        db.put_entry("v1", &k, &r).await.unwrap();

        db.install_generation("v1", vec![entry("https://app.test/", "shell2")])
            .await
            .unwrap();

        assert_eq!(db.keys("v1").await.unwrap().len(), 2);
        assert!(db.generation("v1").await.unwrap().unwrap().is_current());
    }

    #[tokio::test]
    async fn test_promote_keeps_single_current() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("v1").await.unwrap();
        db.open_generation("v2").await.unwrap();

        db.promote("v1").await.unwrap();
        db.promote("v2").await.unwrap();

        let current: Vec<_> = db
            .generations()
            .await
            .unwrap()
            .into_iter()
            .filter(Generation::is_current)
            .collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].label, "v2");
        assert!(current[0].activated_at.is_some());
        assert_eq!(db.current_generation().await.unwrap().unwrap().label, "v2");
    }

    #[tokio::test]
    async fn test_promote_missing_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let result = db.promote("v9").await;
        assert!(matches!(result, Err(Error::NotInstalled(label)) if label == "v9"));
    }

    #[tokio::test]
    async fn test_delete_generation_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.install_generation("v1", vec![entry("https://app.test/", "shell")])
            .await
            .unwrap();

        assert!(db.delete_generation("v1").await.unwrap());
        assert!(!db.delete_generation("v1").await.unwrap());
        assert!(db.generation("v1").await.unwrap().is_none());
        assert!(db.entries("v1").await.unwrap().is_empty());
    }
}
