//! Credential and session layer.
//!
//! Accounts live in the `users` collection; the password never leaves
//! this module unhashed. Session changes are published on a watch
//! channel, which is what the ephemeral lifecycle purger and presence
//! handling key off.

use std::sync::Arc;

use rand::RngCore;
use tokio::sync::watch;
use tracing::info;

use aerie_shared::constants::COLLECTION_USERS;
use aerie_shared::Uid;
use aerie_store::{DocumentStore, Query, StoreError};

use crate::error::{AuthError, ChatError};
use crate::model::{ProfileUpdate, UserRecord};

/// A signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub uid: Uid,
    /// Display handle shown to other users.
    pub email: String,
}

/// Sign-in / sign-up / sign-out against the user collection.
pub struct AuthClient<S> {
    store: Arc<S>,
    sessions: watch::Sender<Option<Session>>,
}

impl<S: DocumentStore> AuthClient<S> {
    pub fn new(store: Arc<S>) -> Self {
        let (sessions, _) = watch::channel(None);
        Self { store, sessions }
    }

    /// The current identity, if any.
    pub fn current(&self) -> Option<Session> {
        self.sessions.borrow().clone()
    }

    /// Subscribe to identity-change events. Receivers observe `Some` on
    /// sign-in and `None` on sign-out.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.sessions.subscribe()
    }

    /// Create an account and sign it in.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, ChatError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials.into());
        }

        let existing = self
            .store
            .query(
                COLLECTION_USERS,
                &Query::new().where_eq("email", serde_json::json!(email)),
            )
            .await?;
        if !existing.is_empty() {
            return Err(AuthError::EmailTaken.into());
        }

        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let salt = hex::encode(salt);

        let record = UserRecord {
            email: email.to_string(),
            password_hash: credential_hash(&salt, password),
            salt,
            display_name: None,
            status: None,
            bio: None,
        };

        let uid = Uid::generate();
        self.store
            .set(
                COLLECTION_USERS,
                uid.as_str(),
                serde_json::to_value(&record)?,
            )
            .await?;

        info!(uid = %uid.short(), "account created");

        let session = Session {
            uid,
            email: email.to_string(),
        };
        self.sessions.send_replace(Some(session.clone()));
        Ok(session)
    }

    /// Verify credentials and publish the session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ChatError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials.into());
        }

        let docs = self
            .store
            .query(
                COLLECTION_USERS,
                &Query::new().where_eq("email", serde_json::json!(email)),
            )
            .await?;
        let Some(doc) = docs.first() else {
            return Err(AuthError::InvalidCredentials.into());
        };

        let record: UserRecord = doc.deserialize()?;
        if credential_hash(&record.salt, password) != record.password_hash {
            return Err(AuthError::InvalidCredentials.into());
        }

        let session = Session {
            uid: Uid(doc.id.clone()),
            email: record.email,
        };
        info!(uid = %session.uid.short(), "signed in");
        self.sessions.send_replace(Some(session.clone()));
        Ok(session)
    }

    /// End the session. Watchers (presence, the ephemeral purger) react
    /// to the `None` they observe.
    pub fn sign_out(&self) {
        if let Some(session) = self.sessions.borrow().clone() {
            info!(uid = %session.uid.short(), "signed out");
        }
        self.sessions.send_replace(None);
    }

    /// Fetch a user's profile document.
    pub async fn get_profile(&self, uid: &Uid) -> Result<UserRecord, ChatError> {
        let doc = self
            .store
            .get(COLLECTION_USERS, uid.as_str())
            .await?
            .ok_or(StoreError::NotFound)?;
        Ok(doc.deserialize()?)
    }

    /// Merge profile fields into the user document. `None` fields are
    /// left untouched.
    pub async fn update_profile(&self, uid: &Uid, update: ProfileUpdate) -> Result<(), ChatError> {
        self.store
            .update(COLLECTION_USERS, uid.as_str(), serde_json::to_value(&update)?)
            .await?;
        Ok(())
    }
}

/// Hex BLAKE3 over salt + password.
fn credential_hash(salt_hex: &str, password: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerie_store::SqliteStore;

    fn client() -> AuthClient<SqliteStore> {
        AuthClient::new(Arc::new(SqliteStore::in_memory().unwrap()))
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let auth = client();

        let created = auth.sign_up("a@b.c", "hunter2").await.unwrap();
        assert_eq!(auth.current(), Some(created.clone()));

        auth.sign_out();
        assert_eq!(auth.current(), None);

        let session = auth.sign_in("a@b.c", "hunter2").await.unwrap();
        assert_eq!(session.uid, created.uid);
        assert_eq!(session.email, "a@b.c");
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let auth = client();
        auth.sign_up("a@b.c", "pw").await.unwrap();
        let err = auth.sign_up("a@b.c", "other").await.unwrap_err();
        assert!(matches!(err, ChatError::Auth(AuthError::EmailTaken)));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let auth = client();
        auth.sign_up("a@b.c", "right").await.unwrap();
        auth.sign_out();

        let err = auth.sign_in("a@b.c", "wrong").await.unwrap_err();
        assert!(matches!(err, ChatError::Auth(AuthError::InvalidCredentials)));
        assert_eq!(auth.current(), None);
    }

    #[tokio::test]
    async fn unknown_email_is_rejected() {
        let auth = client();
        let err = auth.sign_in("ghost@b.c", "pw").await.unwrap_err();
        assert!(matches!(err, ChatError::Auth(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn subscribers_observe_sign_out() {
        let auth = client();
        let mut rx = auth.subscribe();

        auth.sign_up("a@b.c", "pw").await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_some());

        auth.sign_out();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn profile_updates_merge() {
        let auth = client();
        let session = auth.sign_up("a@b.c", "pw").await.unwrap();

        auth.update_profile(
            &session.uid,
            ProfileUpdate {
                display_name: Some("GHOST".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let profile = auth.get_profile(&session.uid).await.unwrap();
        assert_eq!(profile.display_name.as_deref(), Some("GHOST"));
        assert_eq!(profile.email, "a@b.c");
    }
}
