//! Project configuration and permission orchestrators.

use serde_json::json;
use tracing::warn;

use super::Client;
use crate::api_types::{BatchGetPermissionSetsResponse, GetConfigResponse};
use crate::rpc::{decode, services, RpcTransport};
use crate::store::Message;

impl<T: RpcTransport> Client<T> {
  pub async fn fetch_project_config(&self, project: &str) {
    self.apply(Message::FetchProjectConfigStart);

    let result = self
      .transport()
      .call(
        services::PROJECTS,
        "GetConfig",
        json!({ "projectName": project }),
      )
      .await
      .and_then(|v| decode::<GetConfigResponse>("GetConfig", v));

    match result {
      Ok(resp) => {
        let project = if resp.project_name.is_empty() {
          project.to_string()
        } else {
          resp.project_name
        };
        self.apply(Message::FetchProjectConfigSuccess {
          project,
          field_defs: resp.field_defs,
        });
      }
      Err(error) => {
        warn!(%error, "project config fetch failed");
        self.apply(Message::FetchProjectConfigFailure { error });
      }
    }
  }

  /// The current user's permissions on the given resource names.
  pub async fn fetch_permissions(&self, resources: &[String]) {
    self.apply(Message::FetchPermissionsStart);

    let result = self
      .transport()
      .call(
        services::PERMISSIONS,
        "BatchGetPermissionSets",
        json!({ "names": resources }),
      )
      .await
      .and_then(|v| decode::<BatchGetPermissionSetsResponse>("BatchGetPermissionSets", v));

    match result {
      Ok(resp) => self.apply(Message::FetchPermissionsSuccess {
        permission_sets: resp.permission_sets,
      }),
      Err(error) => {
        warn!(%error, "permission fetch failed");
        self.apply(Message::FetchPermissionsFailure { error });
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fetch::testing::MockTransport;

  #[tokio::test]
  async fn test_fetch_permissions_populates_slice() {
    let mock = MockTransport::new();
    mock.push(
      "BatchGetPermissionSets",
      Ok(json!({ "permissionSets": [
        { "resource": "projects/p/issues/1", "permissions": ["ISSUES_EDIT"] },
      ]})),
    );

    let client = Client::new(mock);
    client
      .fetch_permissions(&["projects/p/issues/1".to_string()])
      .await;

    let store = client.store();
    assert!(store
      .permissions
      .has_permission("projects/p/issues/1", "ISSUES_EDIT"));
    assert!(!store
      .permissions
      .has_permission("projects/p/issues/1", "ISSUES_DELETE"));
  }

  #[tokio::test]
  async fn test_fetch_project_config_keys_by_project() {
    let mock = MockTransport::new();
    mock.push(
      "GetConfig",
      Ok(json!({ "projectName": "Proj", "fieldDefs": [
        { "fieldRef": { "fieldName": "EstimatedDays", "type": "INT_TYPE" } },
      ]})),
    );

    let client = Client::new(mock);
    client.fetch_project_config("proj").await;

    let store = client.store();
    assert_eq!(store.project.field_defs("PROJ").len(), 1);
  }
}
