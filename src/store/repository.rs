// src/store/repository.rs

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};

use super::{KvStore, StoreError, keys};
use crate::models::{
    result::AssessmentResult,
    theme::{ThemeMode, ThemePreference, is_known_theme},
    user::{Role, StoredUser},
};

/// Typed access to everything the service persists.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn KvStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    async fn read_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        let raw = self.store.get(key).await?;
        parse_list(key, raw.as_deref())
    }

    /// Edits the list under `key` atomically. `edit` returns false to leave it untouched.
    async fn update_list<T, F>(&self, key: &'static str, edit: F) -> Result<bool, StoreError>
    where
        T: Serialize + DeserializeOwned + 'static,
        F: FnOnce(&mut Vec<T>) -> bool + Send + 'static,
    {
        self.store
            .update(
                key,
                Box::new(move |raw: Option<&str>| {
                    let mut list: Vec<T> = parse_list(key, raw)?;
                    if !edit(&mut list) {
                        return Ok(None);
                    }
                    serde_json::to_string(&list)
                        .map(Some)
                        .map_err(|source| StoreError::Corrupt {
                            key: key.to_string(),
                            source,
                        })
                }),
            )
            .await
    }

    async fn append<T: Serialize>(&self, key: &str, record: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(record).map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        self.store.append(key, value).await
    }

    // ---- users ----

    pub async fn users(&self) -> Result<Vec<StoredUser>, StoreError> {
        self.read_list(keys::USERS).await
    }

    pub async fn find_user(&self, id: &str) -> Result<Option<StoredUser>, StoreError> {
        Ok(self.users().await?.into_iter().find(|u| u.id == id))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<StoredUser>, StoreError> {
        Ok(self.users().await?.into_iter().find(|u| u.email == email))
    }

    /// Stores a new user unless the email is already registered.
    ///
    /// The check and the insert happen in one store update. Returns false on a
    /// duplicate email.
    pub async fn add_user(&self, user: &StoredUser) -> Result<bool, StoreError> {
        let user = user.clone();
        self.update_list(keys::USERS, move |users: &mut Vec<StoredUser>| {
            if users.iter().any(|u| u.email == user.email) {
                return false;
            }
            users.push(user);
            true
        })
        .await
    }

    /// Replaces a user's interests. Returns false if no such user exists.
    pub async fn update_interests(
        &self,
        id: &str,
        interests: Vec<String>,
    ) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.update_list(keys::USERS, move |users: &mut Vec<StoredUser>| {
            match users.iter_mut().find(|u| u.id == id) {
                Some(user) => {
                    user.interests = Some(interests);
                    true
                }
                None => false,
            }
        })
        .await
    }

    /// Resolves a stored identifier to a role.
    ///
    /// This is a lookup, not a security boundary: the admin is recognized by
    /// comparing against a fixed sentinel id.
    pub async fn role_of(&self, id: &str, admin_id: &str) -> Result<Option<Role>, StoreError> {
        if id == admin_id {
            return Ok(Some(Role::Admin));
        }
        Ok(self
            .find_user(id)
            .await?
            .map(|u| Role::User(u.id)))
    }

    // ---- current user ----

    pub async fn current_user_id(&self) -> Result<Option<String>, StoreError> {
        self.store.get(keys::CURRENT_USER_ID).await
    }

    pub async fn set_current_user_id(&self, id: &str) -> Result<(), StoreError> {
        self.store.set(keys::CURRENT_USER_ID, id.to_string()).await
    }

    pub async fn clear_current_user_id(&self) -> Result<(), StoreError> {
        self.store.remove(keys::CURRENT_USER_ID).await
    }

    // ---- results ----

    pub async fn append_result(&self, result: &AssessmentResult) -> Result<(), StoreError> {
        self.append(keys::ASSESSMENT_HISTORY, result).await
    }

    /// History is shared by every user and filtered on read.
    pub async fn results_for_user(&self, user_id: &str) -> Result<Vec<AssessmentResult>, StoreError> {
        let all: Vec<AssessmentResult> = self.read_list(keys::ASSESSMENT_HISTORY).await?;
        Ok(all.into_iter().filter(|r| r.user_id == user_id).collect())
    }

    // ---- theme ----

    /// Stored preference, falling back to defaults for missing or unknown values.
    pub async fn theme_preference(&self, user_id: &str) -> Result<ThemePreference, StoreError> {
        let defaults = ThemePreference::default();
        let theme = self
            .store
            .get(&theme_key(keys::THEME, user_id))
            .await?
            .filter(|name| is_known_theme(name))
            .unwrap_or(defaults.theme);
        let mode = self
            .store
            .get(&theme_key(keys::THEME_MODE, user_id))
            .await?
            .and_then(|raw| ThemeMode::parse(&raw))
            .unwrap_or(defaults.mode);
        Ok(ThemePreference { theme, mode })
    }

    pub async fn set_theme_preference(
        &self,
        user_id: &str,
        preference: &ThemePreference,
    ) -> Result<(), StoreError> {
        self.store
            .set(&theme_key(keys::THEME, user_id), preference.theme.clone())
            .await?;
        self.store
            .set(
                &theme_key(keys::THEME_MODE, user_id),
                preference.mode.as_str().to_string(),
            )
            .await
    }
}

fn parse_list<T: DeserializeOwned>(key: &str, raw: Option<&str>) -> Result<Vec<T>, StoreError> {
    match raw {
        Some(raw) => serde_json::from_str(raw).map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        }),
        None => Ok(Vec::new()),
    }
}

fn theme_key(base: &str, user_id: &str) -> String {
    format!("{}:{}", base, user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessment::AssessmentCategory;
    use crate::models::result::AnswerRecord;
    use crate::store::{MemoryStore, Update};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Memory store whose plain reads of the users key are slow, widening
    /// any read-then-write window a caller might open.
    struct SlowUserReads(MemoryStore);

    #[async_trait]
    impl KvStore for SlowUserReads {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            if key == keys::USERS {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.0.get(key).await
        }

        async fn set(&self, key: &str, raw: String) -> Result<(), StoreError> {
            self.0.set(key, raw).await
        }

        async fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.0.remove(key).await
        }

        async fn update(&self, key: &str, f: Update) -> Result<bool, StoreError> {
            self.0.update(key, f).await
        }
    }

    fn repo() -> Repository {
        Repository::new(Arc::new(MemoryStore::new()))
    }

    fn user(id: &str, email: &str) -> StoredUser {
        StoredUser {
            id: id.to_string(),
            name: format!("Name of {}", id),
            email: email.to_string(),
            interests: None,
            password_hash: None,
        }
    }

    fn result_for(user_id: &str, assessment_id: &str, score: u8) -> AssessmentResult {
        AssessmentResult {
            assessment_id: assessment_id.to_string(),
            assessment_title: "Some Title".to_string(),
            category: AssessmentCategory::Cybersecurity,
            user_id: user_id.to_string(),
            score_percentage: score,
            answers: vec![AnswerRecord {
                question_id: "q1".to_string(),
                selected_answer: "True".to_string(),
            }],
            completed_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn history_is_filtered_by_user() {
        let repo = repo();
        repo.append_result(&result_for("alice", "a1", 60)).await.unwrap();
        repo.append_result(&result_for("bob", "a1", 80)).await.unwrap();
        repo.append_result(&result_for("alice", "a2", 100)).await.unwrap();

        let alice = repo.results_for_user("alice").await.unwrap();
        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|r| r.user_id == "alice"));
        assert_eq!(alice[1].assessment_id, "a2");

        let nobody = repo.results_for_user("carol").await.unwrap();
        assert!(nobody.is_empty());
    }

    #[tokio::test]
    async fn role_of_distinguishes_admin_user_and_unknown() {
        let repo = repo();
        assert!(repo.add_user(&user("user-1", "a@example.com")).await.unwrap());

        assert_eq!(repo.role_of("sentinel", "sentinel").await.unwrap(), Some(Role::Admin));
        assert_eq!(
            repo.role_of("user-1", "sentinel").await.unwrap(),
            Some(Role::User("user-1".to_string()))
        );
        assert_eq!(repo.role_of("ghost", "sentinel").await.unwrap(), None);
    }

    #[tokio::test]
    async fn interests_update_only_touches_target_user() {
        let repo = repo();
        assert!(repo.add_user(&user("u1", "1@example.com")).await.unwrap());
        assert!(repo.add_user(&user("u2", "2@example.com")).await.unwrap());

        assert!(repo.update_interests("u2", vec!["Rust".to_string()]).await.unwrap());
        assert!(!repo.update_interests("missing", vec![]).await.unwrap());

        assert_eq!(repo.find_user("u1").await.unwrap().unwrap().interests, None);
        assert_eq!(
            repo.find_user("u2").await.unwrap().unwrap().interests,
            Some(vec!["Rust".to_string()])
        );
    }

    #[tokio::test]
    async fn theme_defaults_and_roundtrip() {
        let repo = repo();
        assert_eq!(repo.theme_preference("u1").await.unwrap(), ThemePreference::default());

        let pref = ThemePreference {
            theme: "Ocean Breeze".to_string(),
            mode: ThemeMode::Light,
        };
        repo.set_theme_preference("u1", &pref).await.unwrap();
        assert_eq!(repo.theme_preference("u1").await.unwrap(), pref);
        assert_eq!(repo.theme_preference("u2").await.unwrap(), ThemePreference::default());
    }

    #[tokio::test]
    async fn current_user_id_set_and_cleared() {
        let repo = repo();
        repo.set_current_user_id("u1").await.unwrap();
        assert_eq!(repo.current_user_id().await.unwrap().as_deref(), Some("u1"));
        repo.clear_current_user_id().await.unwrap();
        assert_eq!(repo.current_user_id().await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_email_is_refused() {
        let repo = repo();
        assert!(repo.add_user(&user("u1", "same@example.com")).await.unwrap());
        assert!(!repo.add_user(&user("u2", "same@example.com")).await.unwrap());
        assert_eq!(repo.users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn signup_during_interests_update_is_kept() {
        let repo = Repository::new(Arc::new(SlowUserReads(MemoryStore::new())));
        assert!(repo.add_user(&user("u1", "1@example.com")).await.unwrap());

        let updating = {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.update_interests("u1", vec!["Rust".to_string()]).await.unwrap()
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(repo.add_user(&user("u2", "2@example.com")).await.unwrap());
        assert!(updating.await.unwrap());

        let ids: Vec<String> = repo.users().await.unwrap().into_iter().map(|u| u.id).collect();
        assert_eq!(ids, ["u1", "u2"]);
        assert_eq!(
            repo.find_user("u1").await.unwrap().unwrap().interests,
            Some(vec!["Rust".to_string()])
        );
    }

    #[tokio::test]
    async fn concurrent_signups_with_one_email_admit_one() {
        let repo = Repository::new(Arc::new(SlowUserReads(MemoryStore::new())));
        let mut handles = Vec::new();
        for n in 0..8 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.add_user(&user(&format!("u{}", n), "dup@example.com")).await.unwrap()
            }));
        }

        let mut admitted = 0;
        for h in handles {
            if h.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(repo.users().await.unwrap().len(), 1);
    }
}
