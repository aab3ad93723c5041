//! Stable `db_key` allocation per object name.
//!
//! The registry is an explicit value: callers open it over a
//! [`RegistryStore`], pass it to the translator, and decide when to save.
//! `assign` is allocate-or-fetch under one lock, so concurrent first sightings
//! of a name always converge on one key.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::block::Category;

/// Key namespaces are the object categories.
pub type Namespace = Category;

pub type DbKey = u64;

/// How allocation cursors are shared between namespaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeySpace {
    /// Each namespace numbers its keys independently from the floor.
    #[default]
    PerNamespace,
    /// One sequence spans both namespaces; keys are unique across them.
    Shared,
}

/// Persisted name-to-key mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMap {
    #[serde(default)]
    pub network: BTreeMap<String, DbKey>,
    #[serde(default)]
    pub service: BTreeMap<String, DbKey>,
}

impl KeyMap {
    pub fn names(&self, namespace: Namespace) -> &BTreeMap<String, DbKey> {
        match namespace {
            Namespace::Network => &self.network,
            Namespace::Service => &self.service,
        }
    }

    fn names_mut(&mut self, namespace: Namespace) -> &mut BTreeMap<String, DbKey> {
        match namespace {
            Namespace::Network => &mut self.network,
            Namespace::Service => &mut self.service,
        }
    }

    pub fn len(&self) -> usize {
        self.network.len() + self.service.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn scope(&self, namespace: Namespace, key_space: KeySpace) -> Vec<(Namespace, &String, DbKey)> {
        let spaces = match key_space {
            KeySpace::PerNamespace => vec![namespace],
            KeySpace::Shared => vec![Namespace::Network, Namespace::Service],
        };
        spaces
            .into_iter()
            .flat_map(|ns| self.names(ns).iter().map(move |(name, key)| (ns, name, *key)))
            .collect()
    }
}

/// Errors raised by the registry or its persistence backend.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read key registry {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write key registry {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse key registry {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("failed to encode key registry: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("key registry maps both '{first}' and '{second}' to db_key {key}")]
    Conflict {
        key: DbKey,
        first: String,
        second: String,
    },
    #[error("{namespace} db_key space is exhausted")]
    Exhausted { namespace: Namespace },
    #[error("key registry backend failed: {0}")]
    Backend(String),
}

/// Persistence backend for [`IdentifierRegistry`].
pub trait RegistryStore: Send + Sync {
    fn load(&self) -> Result<KeyMap, RegistryError>;
    fn save(&self, keys: &KeyMap) -> Result<(), RegistryError>;
    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Process-local store. Saved snapshots stay readable through [`MemoryStore::snapshot`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    keys: Mutex<KeyMap>,
}

impl MemoryStore {
    pub fn new(keys: KeyMap) -> Self {
        Self {
            keys: Mutex::new(keys),
        }
    }

    pub fn snapshot(&self) -> KeyMap {
        lock(&self.keys).clone()
    }
}

impl RegistryStore for MemoryStore {
    fn load(&self) -> Result<KeyMap, RegistryError> {
        Ok(self.snapshot())
    }

    fn save(&self, keys: &KeyMap) -> Result<(), RegistryError> {
        *lock(&self.keys) = keys.clone();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Pretty-printed JSON file. A missing file loads as an empty registry.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl RegistryStore for JsonFileStore {
    fn load(&self) -> Result<KeyMap, RegistryError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "key registry file not found; starting empty");
            return Ok(KeyMap::default());
        }
        let path = self.path.display().to_string();
        let raw = fs::read_to_string(&self.path).map_err(|source| RegistryError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| RegistryError::Parse { path, source })
    }

    fn save(&self, keys: &KeyMap) -> Result<(), RegistryError> {
        let mut body = serde_json::to_string_pretty(keys)?;
        body.push('\n');
        let staging = self.staging_path();
        let write_err = |source| RegistryError::Write {
            path: self.path.display().to_string(),
            source,
        };
        fs::write(&staging, body).map_err(write_err)?;
        fs::rename(&staging, &self.path).map_err(write_err)
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// One registry row, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    pub namespace: Namespace,
    pub name: String,
    pub db_key: DbKey,
}

struct RegistryState {
    keys: KeyMap,
    /// Highest key held per allocation cursor.
    high_water: BTreeMap<Namespace, DbKey>,
    dirty: bool,
}

impl RegistryState {
    fn new(keys: KeyMap, key_space: KeySpace) -> Self {
        let mut high_water: BTreeMap<Namespace, DbKey> = BTreeMap::new();
        for namespace in [Namespace::Network, Namespace::Service] {
            for key in keys.names(namespace).values() {
                let slot = high_water.entry(cursor(namespace, key_space)).or_insert(*key);
                *slot = (*slot).max(*key);
            }
        }
        Self {
            keys,
            high_water,
            dirty: false,
        }
    }
}

/// Cursor a namespace allocates from. Shared key spaces use one cursor.
fn cursor(namespace: Namespace, key_space: KeySpace) -> Namespace {
    match key_space {
        KeySpace::PerNamespace => namespace,
        KeySpace::Shared => Namespace::Network,
    }
}

/// Allocate-or-fetch key registry over a pluggable store.
pub struct IdentifierRegistry {
    store: Box<dyn RegistryStore>,
    floor: DbKey,
    key_space: KeySpace,
    state: Mutex<RegistryState>,
}

impl std::fmt::Debug for IdentifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifierRegistry")
            .field("store", &self.store.describe())
            .field("floor", &self.floor)
            .field("key_space", &self.key_space)
            .finish_non_exhaustive()
    }
}

impl IdentifierRegistry {
    /// Load existing keys from `store`. Fails if the stored mapping is not
    /// injective within the configured key space.
    pub fn open(
        store: impl RegistryStore + 'static,
        floor: DbKey,
        key_space: KeySpace,
    ) -> Result<Self, RegistryError> {
        let keys = store.load()?;
        check_injective(&keys, key_space)?;
        debug!(
            store = %store.describe(),
            entries = keys.len(),
            floor,
            "opened key registry"
        );
        Ok(Self {
            store: Box::new(store),
            floor,
            key_space,
            state: Mutex::new(RegistryState::new(keys, key_space)),
        })
    }

    /// Empty registry backed by a fresh [`MemoryStore`].
    pub fn in_memory(floor: DbKey, key_space: KeySpace) -> Self {
        Self {
            store: Box::new(MemoryStore::default()),
            floor,
            key_space,
            state: Mutex::new(RegistryState::new(KeyMap::default(), key_space)),
        }
    }

    /// Return the key for `(namespace, name)`, allocating the next free key on
    /// first sight.
    pub fn assign(&self, namespace: Namespace, name: &str) -> Result<DbKey, RegistryError> {
        let mut state = lock(&self.state);
        if let Some(key) = state.keys.names(namespace).get(name) {
            return Ok(*key);
        }

        let key = self.next_key(&state, namespace)?;
        state.keys.names_mut(namespace).insert(name.to_string(), key);
        state.high_water.insert(cursor(namespace, self.key_space), key);
        state.dirty = true;
        info!(%namespace, object = name, db_key = key, "allocated db_key");
        Ok(key)
    }

    /// Return the key for `(namespace, name)` without allocating.
    pub fn lookup(&self, namespace: Namespace, name: &str) -> Option<DbKey> {
        lock(&self.state).keys.names(namespace).get(name).copied()
    }

    /// Whether keys were allocated since the last load or save.
    pub fn is_dirty(&self) -> bool {
        lock(&self.state).dirty
    }

    /// Persist the current mapping. The lock is held for the write so no
    /// allocation can slip between the snapshot and clearing the dirty flag.
    pub fn save(&self) -> Result<(), RegistryError> {
        let mut state = lock(&self.state);
        self.store.save(&state.keys)?;
        state.dirty = false;
        debug!(store = %self.store.describe(), entries = state.keys.len(), "saved key registry");
        Ok(())
    }

    pub fn len(&self) -> usize {
        lock(&self.state).keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every entry ordered by namespace then key.
    pub fn entries(&self) -> Vec<RegistryEntry> {
        let state = lock(&self.state);
        let mut rows: Vec<RegistryEntry> = [Namespace::Network, Namespace::Service]
            .into_iter()
            .flat_map(|namespace| {
                state
                    .keys
                    .names(namespace)
                    .iter()
                    .map(move |(name, key)| RegistryEntry {
                        namespace,
                        name: name.clone(),
                        db_key: *key,
                    })
            })
            .collect();
        rows.sort_by(|a, b| a.namespace.cmp(&b.namespace).then(a.db_key.cmp(&b.db_key)));
        rows
    }

    fn next_key(&self, state: &RegistryState, namespace: Namespace) -> Result<DbKey, RegistryError> {
        match state.high_water.get(&cursor(namespace, self.key_space)).copied() {
            None => Ok(self.floor),
            Some(high) => high
                .checked_add(1)
                .map(|next| next.max(self.floor))
                .ok_or(RegistryError::Exhausted { namespace }),
        }
    }
}

fn check_injective(keys: &KeyMap, key_space: KeySpace) -> Result<(), RegistryError> {
    let scopes: &[Namespace] = match key_space {
        KeySpace::PerNamespace => &[Namespace::Network, Namespace::Service],
        KeySpace::Shared => &[Namespace::Network],
    };
    for namespace in scopes {
        let mut seen: BTreeMap<DbKey, String> = BTreeMap::new();
        for (ns, name, key) in keys.scope(*namespace, key_space) {
            let label = format!("{ns}/{name}");
            if let Some(first) = seen.insert(key, label.clone()) {
                return Err(RegistryError::Conflict {
                    key,
                    first,
                    second: label,
                });
            }
        }
    }
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use super::{
        IdentifierRegistry, JsonFileStore, KeyMap, KeySpace, MemoryStore, Namespace, RegistryError,
        RegistryStore,
    };

    #[test]
    fn assign_is_idempotent_and_injective() {
        let registry = IdentifierRegistry::in_memory(1195, KeySpace::PerNamespace);

        let a = registry.assign(Namespace::Network, "A").expect("assign");
        let b = registry.assign(Namespace::Network, "B").expect("assign");
        let a_again = registry.assign(Namespace::Network, "A").expect("assign");

        assert_eq!(a, 1195);
        assert_eq!(b, 1196);
        assert_eq!(a, a_again);

        let keys: BTreeSet<_> = (0..50)
            .map(|i| registry.assign(Namespace::Network, &format!("n{i}")).expect("assign"))
            .collect();
        assert_eq!(keys.len(), 50);
    }

    #[test]
    fn namespaces_are_independent_by_default() {
        let registry = IdentifierRegistry::in_memory(10, KeySpace::PerNamespace);

        let net = registry.assign(Namespace::Network, "WEB").expect("assign");
        let svc = registry.assign(Namespace::Service, "WEB").expect("assign");

        assert_eq!(net, 10);
        assert_eq!(svc, 10);
    }

    #[test]
    fn shared_key_space_numbers_across_namespaces() {
        let registry = IdentifierRegistry::in_memory(1199, KeySpace::Shared);

        let net = registry.assign(Namespace::Network, "Madaba2").expect("assign");
        let svc = registry.assign(Namespace::Service, "EMP").expect("assign");
        let net2 = registry.assign(Namespace::Network, "T3").expect("assign");

        assert_eq!((net, svc, net2), (1199, 1200, 1201));
    }

    #[test]
    fn continues_after_loaded_keys_and_respects_floor() {
        let mut keys = KeyMap::default();
        keys.network.insert("old".to_string(), 5);
        let registry = IdentifierRegistry::open(MemoryStore::new(keys.clone()), 100, KeySpace::PerNamespace)
            .expect("open");
        assert_eq!(registry.assign(Namespace::Network, "new").expect("assign"), 100);
        assert_eq!(registry.assign(Namespace::Network, "old").expect("assign"), 5);

        keys.network.insert("high".to_string(), 2000);
        let registry = IdentifierRegistry::open(MemoryStore::new(keys), 100, KeySpace::PerNamespace)
            .expect("open");
        assert_eq!(registry.assign(Namespace::Network, "new").expect("assign"), 2001);
    }

    #[test]
    fn cursors_continue_from_loaded_and_allocated_keys() {
        let mut keys = KeyMap::default();
        keys.network.insert("a".to_string(), 10);
        keys.service.insert("s".to_string(), 50);

        let registry = IdentifierRegistry::open(MemoryStore::new(keys.clone()), 1, KeySpace::PerNamespace)
            .expect("open");
        assert_eq!(registry.assign(Namespace::Network, "b").expect("assign"), 11);
        assert_eq!(registry.assign(Namespace::Network, "c").expect("assign"), 12);
        assert_eq!(registry.assign(Namespace::Service, "t").expect("assign"), 51);

        let registry =
            IdentifierRegistry::open(MemoryStore::new(keys), 1, KeySpace::Shared).expect("open");
        assert_eq!(registry.assign(Namespace::Network, "b").expect("assign"), 51);
        assert_eq!(registry.assign(Namespace::Service, "t").expect("assign"), 52);
        assert_eq!(registry.assign(Namespace::Network, "c").expect("assign"), 53);
    }

    #[test]
    fn exhausted_key_space_is_an_error() {
        let mut keys = KeyMap::default();
        keys.service.insert("max".to_string(), u64::MAX);
        let registry =
            IdentifierRegistry::open(MemoryStore::new(keys), 1, KeySpace::PerNamespace).expect("open");

        let err = registry.assign(Namespace::Service, "next").expect_err("should fail");
        assert!(matches!(err, RegistryError::Exhausted { .. }));
    }

    #[test]
    fn open_rejects_duplicate_keys() {
        let mut keys = KeyMap::default();
        keys.network.insert("a".to_string(), 7);
        keys.network.insert("b".to_string(), 7);

        let err = IdentifierRegistry::open(MemoryStore::new(keys), 1, KeySpace::PerNamespace)
            .expect_err("should fail");
        assert!(matches!(err, RegistryError::Conflict { key: 7, .. }));
    }

    #[test]
    fn shared_space_rejects_cross_namespace_duplicates() {
        let mut keys = KeyMap::default();
        keys.network.insert("a".to_string(), 7);
        keys.service.insert("a".to_string(), 7);

        assert!(IdentifierRegistry::open(MemoryStore::new(keys.clone()), 1, KeySpace::PerNamespace).is_ok());
        let err = IdentifierRegistry::open(MemoryStore::new(keys), 1, KeySpace::Shared)
            .expect_err("should fail");
        assert!(matches!(err, RegistryError::Conflict { .. }));
    }

    #[test]
    fn concurrent_first_sightings_converge() {
        let registry = Arc::new(IdentifierRegistry::in_memory(1, KeySpace::PerNamespace));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    (0..100)
                        .map(|i| registry.assign(Namespace::Network, &format!("obj{i}")).expect("assign"))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<Vec<u64>> = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect();
        for other in &results[1..] {
            assert_eq!(&results[0], other);
        }
        assert_eq!(registry.len(), 100);
    }

    #[test]
    fn dirty_flag_tracks_unsaved_allocations() {
        let registry = IdentifierRegistry::in_memory(1, KeySpace::PerNamespace);
        assert!(!registry.is_dirty());

        registry.assign(Namespace::Network, "A").expect("assign");
        assert!(registry.is_dirty());
        registry.save().expect("save");
        assert!(!registry.is_dirty());

        registry.assign(Namespace::Network, "A").expect("assign");
        assert!(!registry.is_dirty());
    }

    #[test]
    fn json_file_store_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("keys.json");

        let registry =
            IdentifierRegistry::open(JsonFileStore::new(&path), 1195, KeySpace::PerNamespace)
                .expect("open missing file");
        assert!(registry.is_empty());
        registry.assign(Namespace::Network, "Kaspersky10").expect("assign");
        registry.assign(Namespace::Service, "EMP").expect("assign");
        registry.save().expect("save");

        let reopened =
            IdentifierRegistry::open(JsonFileStore::new(&path), 1195, KeySpace::PerNamespace)
                .expect("reopen");
        assert_eq!(reopened.lookup(Namespace::Network, "Kaspersky10"), Some(1195));
        assert_eq!(reopened.lookup(Namespace::Service, "EMP"), Some(1195));
        assert_eq!(reopened.entries().len(), 2);
        assert!(!dir.path().join("keys.json.tmp").exists());
    }

    #[test]
    fn json_file_store_reports_parse_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("keys.json");
        std::fs::write(&path, "{ not json").expect("write");

        let err = JsonFileStore::new(&path).load().expect_err("should fail");
        assert!(matches!(err, RegistryError::Parse { .. }));
    }

    #[test]
    fn entries_are_sorted_by_namespace_then_key() {
        let registry = IdentifierRegistry::in_memory(1, KeySpace::Shared);
        registry.assign(Namespace::Service, "s").expect("assign");
        registry.assign(Namespace::Network, "z").expect("assign");
        registry.assign(Namespace::Network, "a").expect("assign");

        let rows: Vec<_> = registry
            .entries()
            .into_iter()
            .map(|e| (e.namespace, e.name, e.db_key))
            .collect();
        assert_eq!(
            rows,
            vec![
                (Namespace::Network, "z".to_string(), 2),
                (Namespace::Network, "a".to_string(), 3),
                (Namespace::Service, "s".to_string(), 1),
            ]
        );
    }
}
