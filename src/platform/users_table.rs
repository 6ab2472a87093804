//! Cached uid to username lookups

use std::collections::HashMap;
use std::sync::Mutex;

/// Users table for caching UID -> username mappings
///
/// Failed lookups are cached too, so an unknown uid costs one passwd scan.
#[derive(Debug, Default)]
pub struct UsersTable {
    users: Mutex<HashMap<u32, Option<String>>>,
}

impl UsersTable {
    pub fn new() -> Self {
        UsersTable::default()
    }

    /// Get the username for a UID, caching the result
    pub fn get_username(&self, uid: u32) -> Option<String> {
        let mut users = match self.users.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        users.entry(uid).or_insert_with(|| lookup(uid)).clone()
    }
}

#[cfg(unix)]
fn lookup(uid: u32) -> Option<String> {
    users::get_user_by_uid(uid).map(|user| user.name().to_string_lossy().to_string())
}

#[cfg(not(unix))]
fn lookup(_uid: u32) -> Option<String> {
    None
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_root_lookup_is_cached() {
        let table = UsersTable::new();
        let first = table.get_username(0);
        assert_eq!(first.as_deref(), Some("root"));
        assert_eq!(table.get_username(0), first);
    }

    #[test]
    fn test_unknown_uid() {
        let table = UsersTable::new();
        assert_eq!(table.get_username(u32::MAX - 7), None);
    }
}
