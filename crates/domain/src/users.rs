use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::users::UserRepository;
use crate::util::{now_ms, require_non_empty};

pub const DEFAULT_SORT_KEY: &str = "date";
const SORT_KEYS: &[&str] = &["date", "activity", "votes", "comments"];
const MAX_USERNAME_LENGTH: usize = 255;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub external_id: String,
    pub username: Option<String>,
    pub default_sort_key: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub default_sort_key: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    pub async fn create(&self, external_id: &str, username: Option<String>) -> DomainResult<User> {
        require_non_empty("external_id", external_id)?;
        if let Some(username) = username.as_deref() {
            validate_username(username)?;
        }
        let now = now_ms();
        let user = User {
            external_id: external_id.to_string(),
            username,
            default_sort_key: DEFAULT_SORT_KEY.to_string(),
            created_at_ms: now,
            updated_at_ms: now,
        };
        self.repository.create(&user).await
    }

    pub async fn get(&self, external_id: &str) -> DomainResult<User> {
        require_non_empty("external_id", external_id)?;
        self.repository
            .get(external_id)
            .await?
            .ok_or(DomainError::NotFound)
    }

    /// Finds the user or creates it, then applies the update.
    pub async fn upsert(&self, external_id: &str, update: UserUpdate) -> DomainResult<User> {
        require_non_empty("external_id", external_id)?;
        let now = now_ms();
        let mut user = match self.repository.get(external_id).await? {
            Some(user) => user,
            None => User {
                external_id: external_id.to_string(),
                username: None,
                default_sort_key: DEFAULT_SORT_KEY.to_string(),
                created_at_ms: now,
                updated_at_ms: now,
            },
        };

        if let Some(username) = update.username {
            validate_username(&username)?;
            user.username = Some(username);
        }
        if let Some(sort_key) = update.default_sort_key {
            if !SORT_KEYS.contains(&sort_key.as_str()) {
                return Err(DomainError::Validation(format!(
                    "default_sort_key must be one of {}",
                    SORT_KEYS.join(", ")
                )));
            }
            user.default_sort_key = sort_key;
        }
        user.updated_at_ms = now;
        self.repository.upsert(&user).await
    }
}

fn validate_username(username: &str) -> DomainResult<()> {
    require_non_empty("username", username)?;
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(DomainError::Validation(format!(
            "username must be at most {MAX_USERNAME_LENGTH} characters"
        )));
    }
    Ok(())
}
