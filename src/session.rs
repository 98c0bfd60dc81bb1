//! Session context: the logged-in principal and its credential.
//!
//! The session is two co-located keys, `token` and `user`, in a small
//! key-value store. Both are written together at login and removed together
//! at logout.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use tempfile::NamedTempFile;

use crate::error::{NyayaError, Result};
use crate::models::{Principal, UserRecord};

/// Key holding the bearer token.
pub const TOKEN_KEY: &str = "token";
/// Key holding the serialized user object.
pub const USER_KEY: &str = "user";

/// Opaque backend credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        format!("Token {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Durable key-value store backing the session.
///
/// Multi-key writes and removals must be observed all-or-nothing by the next
/// reader, and `get_many` must read every key from one snapshot.
pub trait SessionStore: Send + Sync {
    /// Values for `keys`, in order, all taken from the same state.
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>>;
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()>;
    fn remove_many(&self, keys: &[&str]) -> Result<()>;

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get_many(&[key])?.pop().flatten())
    }
}

/// Session store persisted as one JSON document on disk.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring unreadable session file"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    /// Replace the whole document with a rename so readers never see a mix.
    fn store(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            };
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        // NamedTempFile is created with owner-only permissions
        let mut file = NamedTempFile::new_in(&dir)?;
        file.write_all(serde_json::to_string_pretty(entries)?.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| NyayaError::Io(e.to_string()))?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>> {
        let mut entries = self.load()?;
        Ok(keys.iter().map(|key| entries.remove(*key)).collect())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut current = self.load()?;
        for (key, value) in entries {
            current.insert((*key).to_string(), (*value).to_string());
        }
        self.store(&current)
    }

    fn remove_many(&self, keys: &[&str]) -> Result<()> {
        let mut current = self.load()?;
        for key in keys {
            current.remove(*key);
        }
        self.store(&current)
    }
}

/// In-process session store.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| NyayaError::Io("session lock poisoned".to_string()))?;
        Ok(keys.iter().map(|key| entries.get(*key).cloned()).collect())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut current = self
            .entries
            .write()
            .map_err(|_| NyayaError::Io("session lock poisoned".to_string()))?;
        for (key, value) in entries {
            current.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<()> {
        let mut current = self
            .entries
            .write()
            .map_err(|_| NyayaError::Io("session lock poisoned".to_string()))?;
        for key in keys {
            current.remove(*key);
        }
        Ok(())
    }
}

/// Resolves the current principal and credential from a [`SessionStore`].
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn SessionStore>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Session backed by an in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::new()))
    }

    /// Both halves of the session, or `None` if either is absent or malformed.
    ///
    /// Token and user come from one read, so a concurrent login can never
    /// pair one session's token with another session's user.
    pub fn resolve(&self) -> Option<(Principal, Credential)> {
        let (token, user) = self.read_pair()?;

        if token.trim().is_empty() {
            return None;
        }

        match serde_json::from_str::<UserRecord>(&user) {
            Ok(record) => Some((Principal::from(record), Credential::new(token))),
            Err(e) => {
                tracing::warn!(error = %e, "Stored user is malformed");
                None
            }
        }
    }

    pub fn current_principal(&self) -> Option<Principal> {
        self.resolve().map(|(principal, _)| principal)
    }

    pub fn credential(&self) -> Option<Credential> {
        self.resolve().map(|(_, credential)| credential)
    }

    /// Like [`resolve`](Self::resolve) but fails with `SessionMissing`.
    pub fn require(&self) -> Result<(Principal, Credential)> {
        self.resolve().ok_or(NyayaError::SessionMissing)
    }

    /// Persist a fresh login.
    pub fn establish(&self, token: &str, user: &UserRecord) -> Result<Principal> {
        let user_json = serde_json::to_string(user)?;
        self.store
            .set_many(&[(TOKEN_KEY, token), (USER_KEY, user_json.as_str())])?;

        let principal = Principal::from(user.clone());
        tracing::info!(
            principal_id = principal.id,
            role = %principal.role,
            "Session established"
        );
        Ok(principal)
    }

    /// Remove both session keys.
    pub fn clear(&self) -> Result<()> {
        self.store.remove_many(&[TOKEN_KEY, USER_KEY])?;
        tracing::info!("Session cleared");
        Ok(())
    }

    fn read_pair(&self) -> Option<(String, String)> {
        match self.store.get_many(&[TOKEN_KEY, USER_KEY]) {
            Ok(values) => match <[Option<String>; 2]>::try_from(values) {
                Ok([Some(token), Some(user)]) => Some((token, user)),
                _ => None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::rbac::RoleType;

    fn make_cop() -> UserRecord {
        UserRecord {
            id: 77,
            username: None,
            first_name: Some("Ravi".to_string()),
            last_name: None,
            email: None,
            user_type: RoleType::Cop,
            cop_id: Some("KL-77".to_string()),
        }
    }

    #[test]
    fn establish_and_resolve() {
        let session = SessionContext::in_memory();
        session.establish("abc123", &make_cop()).unwrap();

        let (principal, credential) = session.require().unwrap();
        assert_eq!(principal.id, 77);
        assert_eq!(principal.role, RoleType::Cop);
        assert_eq!(principal.display_name, "Cop KL-77");
        assert_eq!(credential.header_value(), "Token abc123");
    }

    #[test]
    fn missing_user_key_means_no_session() {
        let store = Arc::new(MemorySessionStore::new());
        store.set_many(&[(TOKEN_KEY, "abc")]).unwrap();
        let session = SessionContext::new(store);

        assert!(session.current_principal().is_none());
        assert!(session.credential().is_none());
        assert!(matches!(session.require(), Err(NyayaError::SessionMissing)));
    }

    #[test]
    fn malformed_user_means_no_session() {
        let store = Arc::new(MemorySessionStore::new());
        store
            .set_many(&[(TOKEN_KEY, "abc"), (USER_KEY, "{not json")])
            .unwrap();
        let session = SessionContext::new(store);

        assert!(session.resolve().is_none());
    }

    #[test]
    fn clear_removes_both_keys() {
        let store = Arc::new(MemorySessionStore::new());
        let session = SessionContext::new(store.clone());
        session.establish("abc", &make_cop()).unwrap();

        session.clear().unwrap();

        assert!(store.get(TOKEN_KEY).unwrap().is_none());
        assert!(store.get(USER_KEY).unwrap().is_none());
    }

    /// Serves a consistent snapshot from `get_many` and a different,
    /// later session from single-key reads.
    struct TornStore {
        snapshot: Vec<Option<String>>,
        later_user: String,
    }

    impl SessionStore for TornStore {
        fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>> {
            if keys.len() == 1 && keys[0] == USER_KEY {
                return Ok(vec![Some(self.later_user.clone())]);
            }
            Ok(self.snapshot.clone())
        }

        fn set_many(&self, _entries: &[(&str, &str)]) -> Result<()> {
            Ok(())
        }

        fn remove_many(&self, _keys: &[&str]) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn resolve_reads_token_and_user_together() {
        let mut other = make_cop();
        other.id = 5;
        other.cop_id = Some("KL-5".to_string());
        let store = TornStore {
            snapshot: vec![
                Some("tok-77".to_string()),
                Some(serde_json::to_string(&make_cop()).unwrap()),
            ],
            later_user: serde_json::to_string(&other).unwrap(),
        };
        let session = SessionContext::new(Arc::new(store));

        let (principal, credential) = session.require().unwrap();
        assert_eq!(principal.id, 77);
        assert_eq!(credential.as_str(), "tok-77");
    }

    #[test]
    fn file_store_get_many_reads_one_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));
        store
            .set_many(&[(TOKEN_KEY, "tok"), (USER_KEY, "{}")])
            .unwrap();

        let values = store.get_many(&[USER_KEY, "missing", TOKEN_KEY]).unwrap();
        assert_eq!(
            values,
            vec![Some("{}".to_string()), None, Some("tok".to_string())]
        );
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("super-secret");
        assert!(!format!("{:?}", credential).contains("super-secret"));
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let session = SessionContext::new(Arc::new(FileSessionStore::new(&path)));
        session.establish("tok", &make_cop()).unwrap();

        let reopened = SessionContext::new(Arc::new(FileSessionStore::new(&path)));
        let principal = reopened.current_principal().unwrap();
        assert_eq!(principal.cop_id.as_deref(), Some("KL-77"));
    }

    #[test]
    fn file_store_clear_deletes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let store = FileSessionStore::new(&path);
        let session = SessionContext::new(Arc::new(FileSessionStore::new(&path)));

        session.establish("tok", &make_cop()).unwrap();
        assert!(path.exists());

        session.clear().unwrap();
        assert!(!path.exists());
        assert!(store.get(TOKEN_KEY).unwrap().is_none());
    }

    #[test]
    fn file_store_tolerates_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json at all").unwrap();

        let store = FileSessionStore::new(&path);
        assert!(store.get(TOKEN_KEY).unwrap().is_none());
        store.set_many(&[(TOKEN_KEY, "fresh")]).unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("fresh"));
    }
}
