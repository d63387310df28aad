//! Reloadable, read-mostly lookup tables used for authorization and verification.
//!
//! A single [`AuthorityTable`] type backs all four lists the service consults: the IP
//! allow-list, the ban list, the map-hash list and the admin list. Each table is loaded
//! from a flat JSON object (`{"key": value, ...}`). A reload parses the document into a
//! brand new map before taking the write lock, so readers are only blocked for the
//! pointer swap and never observe a half-populated table.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};

use crate::config::AppConfig;
use crate::metrics::Metrics;

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A named key -> value table that can be swapped atomically.
pub struct AuthorityTable<V> {
    name: &'static str,
    entries: RwLock<Arc<HashMap<String, V>>>,
}

impl<V> AuthorityTable<V>
where
    V: DeserializeOwned + Clone,
{
    /// Creates an empty table. Empty means "nothing is known", which keeps allow-lists closed.
    pub fn new(name: &'static str) -> Self {
        Self { name, entries: RwLock::new(Arc::new(HashMap::new())) }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Replaces the table contents with the document at `path`.
    ///
    /// On any read or parse failure the current contents stay in place and the error is
    /// returned to the caller. Returns the number of entries now published.
    pub fn reload(&self, path: impl AsRef<Path>) -> Result<usize, TableError> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|source| TableError::Read { path: path.to_path_buf(), source })?;
        let parsed: HashMap<String, V> =
            serde_json::from_slice(&raw).map_err(|source| TableError::Parse { path: path.to_path_buf(), source })?;
        let count = parsed.len();
        self.replace(parsed);
        Ok(count)
    }

    /// Publishes an already built map.
    ///
    /// The previous map is released after the write guard, so readers only wait for the swap.
    pub fn replace(&self, entries: HashMap<String, V>) {
        let fresh = Arc::new(entries);
        let old = std::mem::replace(&mut *self.entries.write(), fresh);
        drop(old);
    }

    pub fn lookup(&self, key: &str) -> Option<V> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the currently published map. The snapshot never changes underneath the caller.
    pub fn snapshot(&self) -> Arc<HashMap<String, V>> {
        self.entries.read().clone()
    }
}

/// Outcome of reloading one table.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReloadOutcome {
    pub table: &'static str,
    pub loaded: bool,
    pub entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Backing document paths for each table. An empty path means "not configured".
#[derive(Debug, Clone, Default)]
pub struct TablePaths {
    pub ip_list: Option<PathBuf>,
    pub ban_list: Option<PathBuf>,
    pub map_list: Option<PathBuf>,
    pub admin_list: Option<PathBuf>,
}

impl TablePaths {
    /// Only the lists whose enforcement is on are wired up; the admin list is informational
    /// and always loaded when a path is configured.
    pub fn from_config(cfg: &AppConfig) -> Self {
        fn path_if(enabled: bool, raw: &str) -> Option<PathBuf> {
            if enabled && !raw.trim().is_empty() {
                Some(PathBuf::from(raw))
            } else {
                None
            }
        }
        Self {
            ip_list: path_if(cfg.api_auth.enforce_ip, &cfg.api_auth.ip_list_file),
            ban_list: path_if(cfg.verify.enforce_ban, &cfg.verify.ban_list_file),
            map_list: path_if(cfg.verify.enforce_map, &cfg.verify.map_list_file),
            admin_list: path_if(true, &cfg.verify.admin_list_file),
        }
    }
}

/// The four authority tables shared by every request handler.
#[derive(Clone)]
pub struct Authorities {
    pub ip_list: Arc<AuthorityTable<bool>>,
    pub ban_list: Arc<AuthorityTable<bool>>,
    pub map_list: Arc<AuthorityTable<u32>>,
    pub admin_list: Arc<AuthorityTable<bool>>,
    paths: Arc<TablePaths>,
    metrics: Metrics,
}

impl Authorities {
    pub fn new(paths: TablePaths, metrics: Metrics) -> Self {
        Self {
            ip_list: Arc::new(AuthorityTable::new("ip_list")),
            ban_list: Arc::new(AuthorityTable::new("ban_list")),
            map_list: Arc::new(AuthorityTable::new("map_list")),
            admin_list: Arc::new(AuthorityTable::new("admin_list")),
            paths: Arc::new(paths),
            metrics,
        }
    }

    /// Reloads every configured table. Failures are logged and leave the old contents live.
    pub fn reload_all(&self) -> Vec<ReloadOutcome> {
        let mut outcomes = Vec::with_capacity(4);
        if let Some(p) = &self.paths.ip_list {
            outcomes.push(self.reload_one(&self.ip_list, p));
        }
        if let Some(p) = &self.paths.map_list {
            outcomes.push(self.reload_one(&self.map_list, p));
        }
        if let Some(p) = &self.paths.ban_list {
            outcomes.push(self.reload_one(&self.ban_list, p));
        }
        if let Some(p) = &self.paths.admin_list {
            outcomes.push(self.reload_one(&self.admin_list, p));
        }
        outcomes
    }

    fn reload_one<V>(&self, table: &AuthorityTable<V>, path: &Path) -> ReloadOutcome
    where
        V: DeserializeOwned + Clone,
    {
        tracing::info!("Loading {} from {}", table.name(), path.display());
        match table.reload(path) {
            Ok(entries) => {
                self.metrics.inc_table_reloads();
                ReloadOutcome { table: table.name(), loaded: true, entries, error: None }
            }
            Err(e) => {
                self.metrics.inc_table_reload_failures();
                tracing::warn!("Failed to load {}: {}", table.name(), e);
                ReloadOutcome { table: table.name(), loaded: false, entries: table.len(), error: Some(e.to_string()) }
            }
        }
    }

    pub fn is_known_ip(&self, ip: &str) -> bool {
        self.ip_list.contains(ip)
    }

    /// Presence in the ban list means banned; the stored value itself is not consulted.
    pub fn is_banned(&self, steamid: &str) -> bool {
        self.ban_list.contains(steamid)
    }

    pub fn is_admin(&self, steamid: &str) -> bool {
        self.admin_list.contains(steamid)
    }

    /// Unknown map names compare against `0`.
    pub fn map_hash_matches(&self, name: &str, hash: u32) -> bool {
        self.map_list.lookup(name).unwrap_or(0) == hash
    }
}
