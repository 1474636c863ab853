//! Persistent token storage
//!
//! One JSON file mapping external ids to their Epic token triple. All writes
//! use atomic temp-file + rename to prevent corruption on crash, and a tokio
//! Mutex serializes concurrent writers (callback upserts racing `/refresh`
//! updates resolve as last-write-wins, whole records at a time).
//!
//! There is no delete: linking again simply overwrites the record.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// One linked account's token triple.
///
/// `expires_at` is an absolute unix timestamp in seconds, computed at
/// storage time from the provider's `expires_in` delta (or the default
/// lifetime when the provider omits it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Bearer token for provider API calls
    pub access_token: String,
    /// Refresh token for obtaining new access tokens
    pub refresh_token: String,
    /// Expiration as unix timestamp in seconds
    pub expires_at: u64,
}

/// Thread-safe token file manager keyed by external id.
///
/// The Mutex serializes all access. Reads clone the record out, so handlers
/// never hold the lock across a network call.
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
    state: Mutex<HashMap<String, TokenRecord>>,
}

impl TokenStore {
    /// Load the token file from the given path.
    ///
    /// A missing file is a cold start: the store begins empty and the file
    /// is created as `{}` so later loads take the normal path. An unreadable
    /// or unparsable file is a hard error; the caller should refuse to start
    /// rather than silently shadow existing links.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading token file: {e}")))?;
            let records: HashMap<String, TokenRecord> = serde_json::from_str(&contents)
                .map_err(|e| Error::Parse(format!("parsing token file: {e}")))?;
            info!(path = %path.display(), linked = records.len(), "loaded token store");
            records
        } else {
            info!(path = %path.display(), "token file not found, starting empty");
            let records = HashMap::new();
            write_atomic(&path, &records).await?;
            records
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Get a clone of the record for an external id, `None` when not linked.
    pub async fn get(&self, external_id: &str) -> Option<TokenRecord> {
        let state = self.state.lock().await;
        state.get(external_id).cloned()
    }

    /// Insert or replace the record for an external id and persist.
    ///
    /// Linking and re-linking are the same operation; whatever was stored
    /// before is gone afterwards.
    pub async fn upsert(&self, external_id: String, record: TokenRecord) -> Result<()> {
        let mut state = self.state.lock().await;
        state.insert(external_id.clone(), record);
        debug!(external_id, "stored token record");
        write_atomic(&self.path, &state).await
    }

    /// Overwrite all three token fields of an existing record and persist.
    ///
    /// Refresh must never create a link, so an unknown id is an error.
    pub async fn update_tokens(
        &self,
        external_id: &str,
        access_token: String,
        refresh_token: String,
        expires_at: u64,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let record = state
            .get_mut(external_id)
            .ok_or_else(|| Error::NotFound(format!("{external_id} is not linked")))?;
        record.access_token = access_token;
        record.refresh_token = refresh_token;
        record.expires_at = expires_at;
        debug!(external_id, "updated token record");
        write_atomic(&self.path, &state).await
    }

    /// Number of linked accounts.
    pub async fn len(&self) -> usize {
        let state = self.state.lock().await;
        state.len()
    }

    /// Whether any account is linked.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Write the token map to a file atomically.
///
/// Writes a temporary file in the same directory, then renames it over the
/// target, so a crash mid-write never leaves a half-written file. The file
/// holds live OAuth tokens, hence 0600 on unix.
async fn write_atomic(path: &Path, data: &HashMap<String, TokenRecord>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::Parse(format!("serializing token store: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("token store path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".links.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp token file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting token file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp token file: {e}")))?;

    debug!(path = %path.display(), "persisted token store");
    Ok(())
}
