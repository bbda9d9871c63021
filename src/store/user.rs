//! User cache slice, populated by batch lookups.

use std::collections::HashMap;

use super::message::Message;
use crate::types::User;

#[derive(Debug, Clone, Default)]
pub struct UserState {
  users: HashMap<String, User>,
  version: u64,
}

impl UserState {
  pub fn user(&self, key: &str) -> Option<&User> {
    self.users.get(key)
  }

  pub fn version(&self) -> u64 {
    self.version
  }

  pub fn apply(&mut self, msg: &Message) {
    match msg {
      Message::BatchGetUsersSuccess { users, .. } => {
        for user in users {
          self.users.insert(user.entity_key(), user.clone());
        }
        self.version += 1;
      }
      _ => {}
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_batch_ingest_keys_by_display_name() {
    let mut state = UserState::default();
    state.apply(&Message::BatchGetUsersSuccess {
      batch_key: "abc".to_string(),
      users: vec![User {
        display_name: Some("Dev@Example.com".to_string()),
        user_id: Some("42".to_string()),
        ..User::default()
      }],
    });

    assert_eq!(
      state
        .user("dev@example.com")
        .and_then(|u| u.user_id.as_deref()),
      Some("42")
    );
  }
}
