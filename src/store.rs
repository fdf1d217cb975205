// In-memory user storage
//
// The service is explicitly single-process; users live in a concurrent
// map keyed by normalized email, with an id index for profile lookup.

use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, name: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

#[derive(Default)]
pub struct UserStore {
    by_email: DashMap<String, User>,
    email_by_id: DashMap<Uuid, String>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new user; conflict-checked atomically on the email key
    pub fn insert(&self, user: User) -> Result<()> {
        match self.by_email.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(AppError::UserAlreadyExists),
            Entry::Vacant(vacant) => {
                self.email_by_id.insert(user.id, user.email.clone());
                vacant.insert(user);
                Ok(())
            }
        }
    }

    pub fn find_by_email(&self, email: &str) -> Option<User> {
        self.by_email.get(email).map(|user| user.clone())
    }

    pub fn find_by_id(&self, id: Uuid) -> Option<User> {
        self.email_by_id
            .get(&id)
            .and_then(|email| self.by_email.get(email.value()).map(|user| user.clone()))
    }

    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> User {
        User::new(
            email.to_string(),
            "Test User".to_string(),
            "$argon2id$fake".to_string(),
        )
    }

    #[test]
    fn test_insert_and_lookup() {
        let store = UserStore::new();
        let user = user("user@example.com");
        let id = user.id;

        store.insert(user).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.find_by_email("user@example.com").unwrap().id,
            id
        );
        assert_eq!(store.find_by_id(id).unwrap().email, "user@example.com");
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let store = UserStore::new();
        store.insert(user("user@example.com")).unwrap();

        let result = store.insert(user("user@example.com"));
        assert!(matches!(result.unwrap_err(), AppError::UserAlreadyExists));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_lookups() {
        let store = UserStore::new();
        assert!(store.find_by_email("missing@example.com").is_none());
        assert!(store.find_by_id(Uuid::new_v4()).is_none());
        assert!(store.is_empty());
    }
}
