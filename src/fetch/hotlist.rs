//! Hotlist fetch orchestrators.

use serde_json::json;
use tracing::warn;

use super::Client;
use crate::api_types::{GetHotlistResponse, ListHotlistItemsResponse, ListHotlistsByIssueResponse};
use crate::refs::{HotlistRef, IssueRef};
use crate::rpc::{decode, services, RpcError, RpcTransport};
use crate::store::Message;

impl<T: RpcTransport> Client<T> {
  pub async fn fetch_hotlist(&self, href: &HotlistRef) {
    self.apply(Message::FetchHotlistStart);

    let result = self
      .transport()
      .call(services::FEATURES, "GetHotlist", json!({ "hotlistRef": href }))
      .await
      .and_then(|v| decode::<GetHotlistResponse>("GetHotlist", v));

    match result {
      Ok(GetHotlistResponse {
        hotlist: Some(hotlist),
      }) => self.apply(Message::FetchHotlistSuccess { hotlist }),
      Ok(GetHotlistResponse { hotlist: None }) => {
        self.apply(Message::FetchHotlistFailure {
          error: RpcError::Decode {
            method: "GetHotlist".to_string(),
            message: "response missing hotlist".to_string(),
          },
        })
      }
      Err(error) => {
        warn!(%error, "hotlist fetch failed");
        self.apply(Message::FetchHotlistFailure { error });
      }
    }
  }

  /// Fetch a hotlist's items. The issues inlined in the response ride on
  /// the success message into the issue cache; the items keep only refs.
  pub async fn fetch_hotlist_items(&self, href: &HotlistRef) {
    let hotlist_key = href.key();
    self.apply(Message::FetchHotlistItemsStart {
      hotlist_key: hotlist_key.clone(),
    });

    let result = self
      .transport()
      .call(
        services::FEATURES,
        "ListHotlistItems",
        json!({ "hotlistRef": href }),
      )
      .await
      .and_then(|v| decode::<ListHotlistItemsResponse>("ListHotlistItems", v));

    match result {
      Ok(resp) => {
        let (items, issues): (Vec<_>, Vec<_>) = resp
          .items
          .into_iter()
          .map(|item| item.into_parts())
          .unzip();
        self.apply(Message::FetchHotlistItemsSuccess {
          hotlist_key,
          items,
          issues,
        });
      }
      Err(error) => {
        warn!(%error, "hotlist item fetch failed");
        self.apply(Message::FetchHotlistItemsFailure { hotlist_key, error });
      }
    }
  }

  /// The hotlists containing one issue.
  pub async fn fetch_issue_hotlists(&self, iref: &IssueRef) {
    self.apply(Message::FetchIssueHotlistsStart);

    let result = self
      .transport()
      .call(
        services::FEATURES,
        "ListHotlistsByIssue",
        json!({ "issue": iref }),
      )
      .await
      .and_then(|v| decode::<ListHotlistsByIssueResponse>("ListHotlistsByIssue", v));

    match result {
      Ok(resp) => self.apply(Message::FetchIssueHotlistsSuccess {
        hotlists: resp.hotlists,
      }),
      Err(error) => {
        warn!(%error, "issue hotlist lookup failed");
        self.apply(Message::FetchIssueHotlistsFailure { error });
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fetch::testing::MockTransport;
  use crate::refs::UserRef;

  fn href() -> HotlistRef {
    HotlistRef {
      owner: UserRef::from_display_name("owner@example.com"),
      name: "Backlog".to_string(),
    }
  }

  #[tokio::test]
  async fn test_fetch_hotlist_items_normalizes_inlined_issues() {
    let mock = MockTransport::new();
    mock.push(
      "ListHotlistItems",
      Ok(json!({ "items": [
        {
          "issue": { "projectName": "p", "localId": 1, "summary": "first" },
          "rank": 0,
          "note": "look at this"
        },
        {
          "issue": { "projectName": "p", "localId": 2, "summary": "second" },
          "rank": 1
        },
      ]})),
    );

    let client = Client::new(mock);
    client.fetch_hotlist_items(&href()).await;

    let store = client.store();
    let items = store.hotlist.items("owner@example.com:Backlog");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].note.as_deref(), Some("look at this"));
    // The issues were split off into the issue cache.
    assert_eq!(
      store.issue.issue("p:1").unwrap().summary.as_deref(),
      Some("first")
    );
    assert_eq!(
      store.issue.issue("p:2").unwrap().summary.as_deref(),
      Some("second")
    );
  }

  #[tokio::test]
  async fn test_fetch_hotlist_failure_lands_in_request_state() {
    let mock = MockTransport::new();
    mock.push(
      "GetHotlist",
      Err(RpcError::Http {
        code: 403,
        message: "permission denied".to_string(),
      }),
    );

    let client = Client::new(mock);
    client.fetch_hotlist(&href()).await;

    let store = client.store();
    assert!(store.hotlist.hotlist("owner@example.com:Backlog").is_none());
    assert!(matches!(
      store.requests.fetch_hotlist.error,
      Some(RpcError::Http { code: 403, .. })
    ));
  }
}
