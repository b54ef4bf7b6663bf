use crate::constants::Role;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::debug;

/// Where the bearer token lives between runs.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        let token = fs::read_to_string(&self.path).ok()?;
        let token = token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.lock().clone()
    }

    fn save(&self, token: &str) -> io::Result<()> {
        *self.token.lock() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.token.lock() = None;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(default)]
    pub id: serde_json::Value,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

#[derive(Default)]
struct SessionState {
    token: Option<String>,
    user: Option<SessionUser>,
}

/// The signed-in state, passed explicitly to whatever needs it. Created from
/// a store at startup, changed by login/logout.
pub struct Session {
    store: Box<dyn TokenStore>,
    state: RwLock<SessionState>,
}

impl Session {
    pub fn init(store: Box<dyn TokenStore>) -> Self {
        let token = store.load();
        debug!(has_token = token.is_some(), "Session initialized");
        Self {
            store,
            state: RwLock::new(SessionState { token, user: None }),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.state.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().token.is_some()
    }

    pub fn set_user(&self, user: SessionUser) {
        self.state.write().user = Some(user);
    }

    pub fn login(&self, token: String, user: Option<SessionUser>) -> io::Result<()> {
        self.store.save(&token)?;
        let mut state = self.state.write();
        state.token = Some(token);
        state.user = user;
        Ok(())
    }

    /// Forgets the token in memory first, so a failing store still leaves
    /// this process logged out.
    pub fn logout(&self) -> io::Result<()> {
        *self.state.write() = SessionState::default();
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn admin() -> SessionUser {
        SessionUser {
            id: serde_json::json!(1),
            email: "admin@corp.io".into(),
            role: Role::Admin,
            first_name: None,
            last_name: None,
        }
    }

    #[test]
    fn test_session_lifecycle_with_file_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("token");

        let session = Session::init(Box::new(FileTokenStore::new(&path)));
        assert!(!session.is_authenticated());

        session.login("abc123".into(), Some(admin())).unwrap();
        assert_eq!(session.token().as_deref(), Some("abc123"));
        assert_eq!(session.user().unwrap().role, Role::Admin);

        let restored = Session::init(Box::new(FileTokenStore::new(&path)));
        assert_eq!(restored.token().as_deref(), Some("abc123"));
        assert!(restored.user().is_none());

        restored.logout().unwrap();
        assert!(!restored.is_authenticated());
        assert!(!path.exists());
        restored.logout().unwrap();
    }

    #[test]
    fn test_memory_store() {
        let session = Session::init(Box::new(MemoryTokenStore::with_token("t")));
        assert!(session.is_authenticated());
        session.logout().unwrap();
        assert_eq!(session.token(), None);
    }

    #[test]
    fn test_user_from_api_payload() {
        let json = r#"{"id": "u-7", "email": "m@corp.io", "role": "manager", "firstName": "Max"}"#;
        let user: SessionUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, Role::Manager);
        assert_eq!(user.first_name.as_deref(), Some("Max"));
    }
}
