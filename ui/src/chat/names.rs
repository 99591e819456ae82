use std::collections::HashMap;

use bazaar_common::ids::UserId;

/// Display names for conversation participants, fetched once per session.
#[derive(Debug, Default, Clone)]
pub struct NameDirectory {
    names: HashMap<UserId, String>,
}

impl NameDirectory {
    pub fn insert(&mut self, user: UserId, name: String) {
        let name = name.trim().to_string();
        if !name.is_empty() {
            self.names.insert(user, name);
        }
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.names.contains_key(user)
    }

    /// "You" for the viewer, the fetched name otherwise, else a shortened id.
    pub fn label(&self, user: &UserId, viewer: &UserId) -> String {
        if user == viewer {
            return "You".to_string();
        }
        self.names.get(user).cloned().unwrap_or_else(|| user.short())
    }
}
