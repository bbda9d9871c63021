//! Permission-set mirror: the current user's permissions per resource name.

use std::collections::HashMap;

use super::message::Message;

#[derive(Debug, Clone, Default)]
pub struct PermissionsState {
  by_resource: HashMap<String, Vec<String>>,
  version: u64,
}

impl PermissionsState {
  pub fn permissions(&self, resource: &str) -> &[String] {
    self
      .by_resource
      .get(resource)
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  pub fn has_permission(&self, resource: &str, permission: &str) -> bool {
    self.permissions(resource).iter().any(|p| p == permission)
  }

  pub fn version(&self) -> u64 {
    self.version
  }

  pub fn apply(&mut self, msg: &Message) {
    match msg {
      Message::FetchPermissionsSuccess { permission_sets } => {
        for set in permission_sets {
          self
            .by_resource
            .insert(set.resource.clone(), set.permissions.clone());
        }
        self.version += 1;
      }
      _ => {}
    }
  }
}
