use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header};
use serde_json::{Value, json};

use capstock_auth::{FileStorage, SessionStore, TOKEN_KEY, TokenStorage};

fn mint(claims: Value) -> String {
    jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(b"unused"))
        .expect("failed to encode jwt")
}

fn storage_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("capstock-restore-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir.join("storage.json")
}

#[test]
fn restart_restores_published_roles() {
    let path = storage_path("roles");
    let token = mint(json!({
        "exp": (Utc::now() + Duration::hours(1)).timestamp(),
        "http://schemas.microsoft.com/ws/2008/06/identity/claims/role": ["SuperAdmin"],
    }));

    {
        let store = SessionStore::with_system_clock(Arc::new(FileStorage::new(&path)));
        store.set_token(token.clone()).unwrap();
    }

    let store = SessionStore::with_system_clock(Arc::new(FileStorage::new(&path)));
    assert!(store.is_authenticated());
    assert_eq!(store.token().as_deref(), Some(token.as_str()));

    let roles = store.subscribe().try_recv().unwrap();
    assert!(roles.is_super_admin());
    assert!(roles.is_admin());
    assert!(!roles.has_role("Admin"));

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn restart_with_expired_token_starts_signed_out() {
    let path = storage_path("expired");
    let storage = FileStorage::new(&path);
    storage
        .set(
            TOKEN_KEY,
            &mint(json!({ "exp": (Utc::now() - Duration::minutes(1)).timestamp(), "role": "Admin" })),
        )
        .unwrap();

    let store = SessionStore::with_system_clock(Arc::new(FileStorage::new(&path)));
    assert!(store.subscribe().try_recv().unwrap().is_empty());
    assert!(!store.is_authenticated());
    assert_eq!(FileStorage::new(&path).get(TOKEN_KEY).unwrap(), None);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
