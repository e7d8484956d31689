//! In-process implementation of [`KeyValueStore`].
//!
//! Behaves like the registry where it matters to the accessors above it:
//!
//! - Key paths and value names are case-insensitive; value names keep the
//!   spelling they were first written with.
//! - `ReadOnly` / `ReadWrite` opens require the key to exist;
//!   `CreateIfMissing` creates every intermediate key.
//! - Writes through a handle opened `ReadOnly` are `AccessDenied`.
//!
//! Tests can additionally deny writes to a whole root or take a root
//! offline, which is otherwise hard to provoke against a real registry.
//!
//! Cloning a `MemoryStore` yields another view of the same tree.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::trace;

use super::{AccessMode, KeyHandle, KeyValueStore, StoreError};
use crate::domain::key_path::{RootKey, KEY_SEPARATOR};
use crate::domain::raw::RawValue;

type KeyId = (RootKey, String);

#[derive(Default)]
struct KeyNode {
    /// Lower-cased name → (name as written, value).
    values: BTreeMap<String, (String, RawValue)>,
}

#[derive(Default)]
struct Tree {
    keys: HashMap<KeyId, KeyNode>,
    write_denied: HashSet<RootKey>,
    offline: HashSet<RootKey>,
}

impl Tree {
    fn contains_key(&self, id: &KeyId) -> bool {
        id.1.is_empty() || self.keys.contains_key(id)
    }

    fn check_online(&self, root: RootKey) -> Result<(), StoreError> {
        if self.offline.contains(&root) {
            return Err(StoreError::Unsupported(format!("{root} is offline")));
        }
        Ok(())
    }

    fn check_writable(&self, root: RootKey) -> Result<(), StoreError> {
        self.check_online(root)?;
        if self.write_denied.contains(&root) {
            return Err(StoreError::AccessDenied);
        }
        Ok(())
    }

    /// Inserts the key and all of its ancestors.
    fn create_key(&mut self, root: RootKey, normalized: &str) {
        let mut end = 0;
        for segment in normalized.split(KEY_SEPARATOR) {
            end += segment.len();
            self.keys
                .entry((root, normalized[..end].to_string()))
                .or_default();
            end += 1;
        }
    }
}

/// Lower-cases the path and drops empty segments, so `\A\\b\` and `a\B`
/// name the same key.
fn normalize_path(path: &str) -> String {
    path.split(KEY_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(&KEY_SEPARATOR.to_string())
}

/// Thread-safe in-memory key-value store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tree: Arc<RwLock<Tree>>,
}

impl MemoryStore {
    /// Creates an empty store.  Every root exists and is writable.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tree> {
        self.tree.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tree> {
        self.tree.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every subsequent write below `root` fail with `AccessDenied`.
    pub fn deny_writes(&self, root: RootKey) {
        self.write().write_denied.insert(root);
    }

    /// Reverses [`MemoryStore::deny_writes`].
    pub fn allow_writes(&self, root: RootKey) {
        self.write().write_denied.remove(&root);
    }

    /// Takes `root` offline (every open fails) or brings it back.
    pub fn set_offline(&self, root: RootKey, offline: bool) {
        let mut tree = self.write();
        if offline {
            tree.offline.insert(root);
        } else {
            tree.offline.remove(&root);
        }
    }

    /// Stores `value` directly, creating the key if needed and bypassing
    /// write denial.  Used to plant values no typed accessor would write.
    pub fn seed(&self, root: RootKey, path: &str, name: &str, value: RawValue) {
        let normalized = normalize_path(path);
        let mut tree = self.write();
        tree.create_key(root, &normalized);
        if let Some(node) = tree.keys.get_mut(&(root, normalized)) {
            node.values
                .insert(name.to_lowercase(), (name.to_string(), value));
        }
    }

    /// Returns the stored value, if any, without going through a handle.
    pub fn raw(&self, root: RootKey, path: &str, name: &str) -> Option<RawValue> {
        let id = (root, normalize_path(path));
        self.read()
            .keys
            .get(&id)
            .and_then(|node| node.values.get(&name.to_lowercase()))
            .map(|(_, value)| value.clone())
    }

    /// Returns `true` if the key exists.
    pub fn key_exists(&self, root: RootKey, path: &str) -> bool {
        self.read().contains_key(&(root, normalize_path(path)))
    }
}

impl KeyValueStore for MemoryStore {
    fn open_key(
        &self,
        root: RootKey,
        path: &str,
        mode: AccessMode,
    ) -> Result<Box<dyn KeyHandle>, StoreError> {
        let id = (root, normalize_path(path));
        trace!(%root, path = %id.1, ?mode, "memory store open");

        match mode {
            AccessMode::ReadOnly => {
                let tree = self.read();
                tree.check_online(root)?;
                if !tree.contains_key(&id) {
                    return Err(StoreError::NotFound);
                }
            }
            AccessMode::ReadWrite => {
                let tree = self.read();
                tree.check_writable(root)?;
                if !tree.contains_key(&id) {
                    return Err(StoreError::NotFound);
                }
            }
            AccessMode::CreateIfMissing => {
                let mut tree = self.write();
                tree.check_writable(root)?;
                if !id.1.is_empty() {
                    tree.create_key(root, &id.1);
                }
            }
        }

        Ok(Box::new(MemoryKeyHandle {
            tree: Arc::clone(&self.tree),
            id,
            writable: mode.can_write(),
        }))
    }
}

/// Handle onto one key of a [`MemoryStore`].
struct MemoryKeyHandle {
    tree: Arc<RwLock<Tree>>,
    id: KeyId,
    writable: bool,
}

impl MemoryKeyHandle {
    fn write_guard(&self) -> Result<RwLockWriteGuard<'_, Tree>, StoreError> {
        if !self.writable {
            return Err(StoreError::AccessDenied);
        }
        let tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        tree.check_writable(self.id.0)?;
        Ok(tree)
    }
}

impl KeyHandle for MemoryKeyHandle {
    fn read_value(&self, name: &str) -> Result<RawValue, StoreError> {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        tree.check_online(self.id.0)?;
        tree.keys
            .get(&self.id)
            .and_then(|node| node.values.get(&name.to_lowercase()))
            .map(|(_, value)| value.clone())
            .ok_or(StoreError::NotFound)
    }

    fn write_value(&mut self, name: &str, value: &RawValue) -> Result<(), StoreError> {
        let mut tree = self.write_guard()?;
        let node = tree.keys.entry(self.id.clone()).or_default();
        let spelled = node
            .values
            .get(&name.to_lowercase())
            .map(|(spelled, _)| spelled.clone())
            .unwrap_or_else(|| name.to_string());
        node.values
            .insert(name.to_lowercase(), (spelled, value.clone()));
        Ok(())
    }

    fn delete_value(&mut self, name: &str) -> Result<(), StoreError> {
        let mut tree = self.write_guard()?;
        tree.keys
            .get_mut(&self.id)
            .and_then(|node| node.values.remove(&name.to_lowercase()))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    fn value_names(&self) -> Result<Vec<String>, StoreError> {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        tree.check_online(self.id.0)?;
        Ok(tree
            .keys
            .get(&self.id)
            .map(|node| node.values.values().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: RootKey = RootKey::LocalMachine;

    #[test]
    fn test_read_only_open_of_missing_key_is_not_found() {
        let store = MemoryStore::new();
        let result = store.open_key(ROOT, r"Software\Missing", AccessMode::ReadOnly);
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[test]
    fn test_create_if_missing_creates_intermediate_keys() {
        // Arrange
        let store = MemoryStore::new();

        // Act
        store
            .open_key(ROOT, r"Software\Vendor\App", AccessMode::CreateIfMissing)
            .expect("create must succeed");

        // Assert
        assert!(store.key_exists(ROOT, "Software"));
        assert!(store.key_exists(ROOT, r"Software\Vendor"));
        assert!(store.key_exists(ROOT, r"Software\Vendor\App"));
        assert!(!store.key_exists(RootKey::CurrentUser, "Software"));
    }

    #[test]
    fn test_paths_and_names_are_case_insensitive() {
        // Arrange
        let store = MemoryStore::new();
        let mut handle = store
            .open_key(ROOT, r"Software\Vendor", AccessMode::CreateIfMissing)
            .unwrap();
        handle.write_value("LogLevel", &RawValue::Dword(3)).unwrap();

        // Act
        let reopened = store
            .open_key(ROOT, r"\SOFTWARE\\vendor\", AccessMode::ReadOnly)
            .unwrap();

        // Assert
        assert_eq!(reopened.read_value("loglevel"), Ok(RawValue::Dword(3)));
        assert_eq!(reopened.value_names(), Ok(vec!["LogLevel".to_string()]));
    }

    #[test]
    fn test_overwrite_keeps_first_spelling_of_name() {
        let store = MemoryStore::new();
        let mut handle = store
            .open_key(ROOT, "K", AccessMode::CreateIfMissing)
            .unwrap();
        handle.write_value("logDir", &RawValue::String("a".into())).unwrap();
        handle.write_value("LOGDIR", &RawValue::String("b".into())).unwrap();

        assert_eq!(handle.value_names(), Ok(vec!["logDir".to_string()]));
        assert_eq!(handle.read_value("logdir"), Ok(RawValue::String("b".into())));
    }

    #[test]
    fn test_write_through_read_only_handle_is_denied() {
        let store = MemoryStore::new();
        store.seed(ROOT, "K", "v", RawValue::Dword(1));
        let mut handle = store.open_key(ROOT, "K", AccessMode::ReadOnly).unwrap();

        let result = handle.write_value("v", &RawValue::Dword(2));

        assert_eq!(result, Err(StoreError::AccessDenied));
        assert_eq!(store.raw(ROOT, "K", "v"), Some(RawValue::Dword(1)));
    }

    #[test]
    fn test_deny_writes_rejects_writable_opens_but_allows_reads() {
        // Arrange
        let store = MemoryStore::new();
        store.seed(ROOT, "K", "v", RawValue::Dword(1));
        store.deny_writes(ROOT);

        // Act
        let write_open = store.open_key(ROOT, "K", AccessMode::CreateIfMissing);
        let read_open = store.open_key(ROOT, "K", AccessMode::ReadOnly);

        // Assert
        assert!(matches!(write_open, Err(StoreError::AccessDenied)));
        assert!(read_open.is_ok());

        store.allow_writes(ROOT);
        assert!(store.open_key(ROOT, "K", AccessMode::ReadWrite).is_ok());
    }

    #[test]
    fn test_offline_root_fails_every_open() {
        let store = MemoryStore::new();
        store.set_offline(ROOT, true);

        let result = store.open_key(ROOT, "", AccessMode::ReadOnly);

        assert!(matches!(result, Err(StoreError::Unsupported(_))));
        store.set_offline(ROOT, false);
        assert!(store.open_key(ROOT, "", AccessMode::ReadOnly).is_ok());
    }

    #[test]
    fn test_delete_missing_value_is_not_found() {
        let store = MemoryStore::new();
        let mut handle = store
            .open_key(ROOT, "K", AccessMode::CreateIfMissing)
            .unwrap();

        assert_eq!(handle.delete_value("absent"), Err(StoreError::NotFound));
    }

    #[test]
    fn test_clones_share_the_same_tree() {
        let store = MemoryStore::new();
        let view = store.clone();

        store.seed(ROOT, "K", "v", RawValue::Qword(7));

        assert_eq!(view.raw(ROOT, "k", "V"), Some(RawValue::Qword(7)));
    }
}
