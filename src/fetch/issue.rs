//! Issue fetch orchestrators.
//!
//! `fetch_issue` fans out to the dependent lookups a viewed issue needs
//! (related issues, federated refs, hotlist memberships, referenced users,
//! star state). `fetch_issue_list` is the batched fetch: one call to learn
//! the total, bounded parallel calls for the rest, pages reassembled in
//! request order no matter which resolves first.

use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::json;
use tracing::{debug, warn};

use super::Client;
use crate::api_types::{
  ApiExternalIssue, BatchGetExternalIssuesResponse, GetIssueResponse, IsIssueStarredResponse,
  ListIssuesResponse, ListReferencedIssuesResponse, StarIssueResponse, UpdateApprovalResponse,
};
use crate::refs::{is_shortlink, IssueRef, UserRef};
use crate::rpc::{decode, services, RpcError, RpcTransport};
use crate::store::Message;
use crate::types::{Issue, StatusRef};

/// Parameters for the batched list fetch.
#[derive(Debug, Clone, Default)]
pub struct IssueListParams {
  pub projects: Vec<String>,
  pub query: String,
  pub canned_query: Option<u32>,
  pub group_by_spec: Option<String>,
  pub sort_spec: Option<String>,
  /// Offset of the first item wanted.
  pub start: u32,
  /// Cap on how many items to fetch in total; everything available if unset.
  pub max_items: Option<u32>,
  pub items_per_page: Option<u32>,
  /// Bound on the total number of list calls, the first included.
  pub max_parallel_calls: Option<u32>,
}

const DEFAULT_ITEMS_PER_PAGE: u32 = 1000;
const DEFAULT_MAX_PARALLEL_CALLS: u32 = 6;

/// A requested change to one approval on an issue.
#[derive(Debug, Clone, Default)]
pub struct ApprovalDelta {
  pub field_name: String,
  pub status: Option<String>,
  pub approvers_add: Vec<UserRef>,
}

impl<T: RpcTransport> Client<T> {
  /// Fetch one issue and everything the issue page needs around it.
  pub async fn fetch_issue(&self, iref: &IssueRef) {
    let key = iref.key();
    self.apply(Message::ViewIssue { key: key.clone() });
    self.apply(Message::FetchIssueStart);

    let result = self
      .transport()
      .call(services::ISSUES, "GetIssue", json!({ "issueRef": iref }))
      .await
      .and_then(|v| decode::<GetIssueResponse>("GetIssue", v));

    let issue = match result {
      Ok(resp) => resp.issue.unwrap_or_else(|| Issue::from_ref(iref)),
      Err(error) => {
        warn!(%key, %error, "issue fetch failed");
        self.apply(Message::FetchIssueFailure { error });
        return;
      }
    };

    let deleted = issue.is_deleted.unwrap_or(false);
    let moved = issue.moved_to_ref.is_some();
    self.apply(Message::FetchIssueSuccess {
      issue: issue.clone(),
    });

    if deleted || moved {
      debug!(%key, deleted, moved, "skipping dependent fetches");
      return;
    }

    // Related issues land before federated enrichment so the left-merge
    // sees the primary entries.
    self.fetch_related_issues(&issue).await;
    tokio::join!(
      self.fetch_federated_refs(&issue),
      self.fetch_issue_hotlists(iref),
      self.fetch_referenced_users(&issue),
      self.fetch_is_starred(iref),
    );
  }

  /// Bulk-resolve the issues referenced by blocked-on, blocking, and
  /// merged-into lists into the related-issue index.
  pub async fn fetch_related_issues(&self, issue: &Issue) {
    let mut refs: Vec<IssueRef> = Vec::new();
    refs.extend(issue.blocked_on_issue_refs.clone().unwrap_or_default());
    refs.extend(issue.blocking_issue_refs.clone().unwrap_or_default());
    if let Some(merged) = &issue.merged_into_issue_ref {
      refs.push(merged.clone());
    }
    refs.retain(|r| !r.is_federated());

    self.apply(Message::FetchRelatedIssuesStart);
    if refs.is_empty() {
      self.apply(Message::FetchRelatedIssuesSuccess { issues: Vec::new() });
      return;
    }

    let result = self
      .transport()
      .call(
        services::ISSUES,
        "ListReferencedIssues",
        json!({ "issueRefs": refs }),
      )
      .await
      .and_then(|v| decode::<ListReferencedIssuesResponse>("ListReferencedIssues", v));

    match result {
      Ok(resp) => {
        let issues = resp
          .open_refs
          .into_iter()
          .map(|i| mark_open(i, true))
          .chain(resp.closed_refs.into_iter().map(|i| mark_open(i, false)))
          .collect();
        self.apply(Message::FetchRelatedIssuesSuccess { issues });
      }
      Err(error) => {
        warn!(%error, "related issue fetch failed");
        self.apply(Message::FetchRelatedIssuesFailure { error });
      }
    }
  }

  /// Resolve federated shortlinks among the issue's dangling refs through
  /// the external tracker side channel.
  pub async fn fetch_federated_refs(&self, issue: &Issue) {
    let ext_ids: Vec<String> = issue
      .dangling_blocked_on_refs
      .iter()
      .flatten()
      .chain(issue.dangling_blocking_refs.iter().flatten())
      .chain(issue.merged_into_issue_ref.iter())
      .filter_map(|iref| match iref {
        IssueRef::Federated { ext_identifier } if is_shortlink(ext_identifier) => {
          Some(ext_identifier.clone())
        }
        _ => None,
      })
      .collect();

    if ext_ids.is_empty() {
      return;
    }

    self.apply(Message::FetchFederatedRefsStart);
    let result = self
      .transport()
      .call(
        services::EXTERNAL,
        "BatchGetIssues",
        json!({ "extIdentifiers": ext_ids }),
      )
      .await
      .and_then(|v| decode::<BatchGetExternalIssuesResponse>("BatchGetIssues", v));

    match result {
      Ok(resp) => {
        let issues = resp
          .issues
          .into_iter()
          .map(ApiExternalIssue::into_issue)
          .collect();
        self.apply(Message::FetchFederatedRefsSuccess { issues });
      }
      Err(error) => {
        warn!(%error, "federated ref fetch failed");
        self.apply(Message::FetchFederatedRefsFailure { error });
      }
    }
  }

  /// Batched list fetch. The first call learns `totalResults`; the rest of
  /// the target is split into pages fetched concurrently, bounded by
  /// `max_parallel_calls`. After every page the full accumulated ordered
  /// list is re-emitted with fractional progress.
  pub async fn fetch_issue_list(&self, params: &IssueListParams) {
    let items_per_page = params
      .items_per_page
      .unwrap_or(DEFAULT_ITEMS_PER_PAGE)
      .max(1);
    let max_calls = params
      .max_parallel_calls
      .unwrap_or(DEFAULT_MAX_PARALLEL_CALLS)
      .max(1);

    self.apply(Message::FetchIssueListStart);

    let first = match self
      .list_issues_page(params, params.start, items_per_page)
      .await
    {
      Ok(resp) => resp,
      Err(error) => {
        warn!(%error, "issue list fetch failed");
        self.apply(Message::FetchIssueListFailure { error });
        return;
      }
    };

    let total = first.total_results;
    let available = total.saturating_sub(params.start);
    let target = params.max_items.map_or(available, |m| m.min(available));
    let pages_needed = target.div_ceil(items_per_page).max(1);
    let total_calls = pages_needed.min(max_calls);
    // Item count the bounded calls can actually deliver; progress is
    // measured against this so it always ends at 1.0.
    let expected = target.min(total_calls * items_per_page);

    let mut pages: Vec<Option<Vec<Issue>>> = vec![None; total_calls as usize];
    let mut received = first.issues.len() as u32;
    pages[0] = Some(first.issues);
    let complete = pages.iter().all(Option::is_some);
    self.emit_list_update(&pages, received, expected, total, complete);

    if complete {
      self.apply(Message::FetchIssueListSuccess);
      return;
    }

    let mut remaining = FuturesUnordered::new();
    for i in 1..total_calls {
      let offset = params.start + i * items_per_page;
      remaining.push(async move {
        (
          i as usize,
          self.list_issues_page(params, offset, items_per_page).await,
        )
      });
    }

    while let Some((index, result)) = remaining.next().await {
      match result {
        Ok(resp) => {
          received += resp.issues.len() as u32;
          pages[index] = Some(resp.issues);
          let complete = pages.iter().all(Option::is_some);
          self.emit_list_update(&pages, received, expected, total, complete);
        }
        Err(error) => {
          warn!(%error, page = index, "issue list page fetch failed");
          self.apply(Message::FetchIssueListFailure { error });
          return;
        }
      }
    }

    self.apply(Message::FetchIssueListSuccess);
  }

  /// Re-emit the accumulated list: the longest contiguous prefix of pages,
  /// in request order, so a late page never appears ahead of an earlier
  /// hole.
  fn emit_list_update(
    &self,
    pages: &[Option<Vec<Issue>>],
    received: u32,
    expected: u32,
    total_results: u32,
    complete: bool,
  ) {
    let mut issues: Vec<Issue> = Vec::new();
    for page in pages {
      match page {
        Some(page) => issues.extend(page.iter().cloned()),
        None => break,
      }
    }
    let ordered_keys = issues.iter().map(Issue::entity_key).collect();
    let progress = if expected == 0 || complete {
      1.0
    } else {
      (f64::from(received) / f64::from(expected)).min(1.0)
    };
    self.apply(Message::FetchIssueListUpdate {
      issues,
      ordered_keys,
      progress,
      total_results,
    });
  }

  async fn list_issues_page(
    &self,
    params: &IssueListParams,
    start: u32,
    max_items: u32,
  ) -> Result<ListIssuesResponse, RpcError> {
    let request = json!({
      "projectNames": params.projects,
      "query": params.query,
      "cannedQuery": params.canned_query,
      "groupBySpec": params.group_by_spec,
      "sortSpec": params.sort_spec,
      "pagination": { "start": start, "maxItems": max_items },
    });
    self
      .transport()
      .call(services::ISSUES, "ListIssues", request)
      .await
      .and_then(|v| decode("ListIssues", v))
  }

  /// Set or clear the current user's star on one issue. Tracked per issue
  /// key, so concurrent stars on different issues stay independent.
  pub async fn star_issue(&self, iref: &IssueRef, starred: bool) {
    let key = iref.key();
    self.apply(Message::StarIssueStart { key: key.clone() });

    let result = self
      .transport()
      .call(
        services::ISSUES,
        "StarIssue",
        json!({ "issueRef": iref, "starred": starred }),
      )
      .await
      .and_then(|v| decode::<StarIssueResponse>("StarIssue", v));

    match result {
      Ok(resp) => self.apply(Message::StarIssueSuccess {
        key,
        starred,
        star_count: resp.star_count,
      }),
      Err(error) => {
        warn!(%key, %error, "star request failed");
        self.apply(Message::StarIssueFailure { key, error });
      }
    }
  }

  pub async fn fetch_is_starred(&self, iref: &IssueRef) {
    let key = iref.key();
    self.apply(Message::FetchIsStarredStart { key: key.clone() });

    let result = self
      .transport()
      .call(services::ISSUES, "IsIssueStarred", json!({ "issueRef": iref }))
      .await
      .and_then(|v| decode::<IsIssueStarredResponse>("IsIssueStarred", v));

    match result {
      Ok(resp) => self.apply(Message::FetchIsStarredSuccess {
        key,
        starred: resp.is_starred,
      }),
      Err(error) => self.apply(Message::FetchIsStarredFailure { key, error }),
    }
  }

  /// Update one approval on an issue. The response carries the new approval
  /// without its phase; the cached phase is kept when it is merged.
  pub async fn update_approval(&self, iref: &IssueRef, delta: &ApprovalDelta) {
    self.apply(Message::UpdateApprovalStart);

    let request = json!({
      "issueRef": iref,
      "fieldRef": { "fieldName": delta.field_name },
      "approvalDelta": {
        "status": delta.status,
        "approverRefsAdd": delta.approvers_add,
      },
    });
    let result = self
      .transport()
      .call(services::ISSUES, "UpdateApproval", request)
      .await
      .and_then(|v| decode::<UpdateApprovalResponse>("UpdateApproval", v));

    match result {
      Ok(UpdateApprovalResponse {
        approval: Some(approval),
      }) => self.apply(Message::UpdateApprovalSuccess {
        issue_key: iref.key(),
        approval,
      }),
      Ok(UpdateApprovalResponse { approval: None }) => {
        self.apply(Message::UpdateApprovalFailure {
          error: RpcError::Decode {
            method: "UpdateApproval".to_string(),
            message: "response missing approval".to_string(),
          },
        })
      }
      Err(error) => {
        warn!(%error, "approval update failed");
        self.apply(Message::UpdateApprovalFailure { error });
      }
    }
  }
}

/// The referenced-issue lookup reports status via partition; stamp it onto
/// each issue so views can sort open-first without another lookup.
fn mark_open(mut issue: Issue, open: bool) -> Issue {
  match &mut issue.status_ref {
    Some(status) => status.means_open = Some(open),
    None => {
      issue.status_ref = Some(StatusRef {
        status: if open { "Open" } else { "Closed" }.to_string(),
        means_open: Some(open),
      })
    }
  }
  issue
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fetch::testing::MockTransport;
  use crate::types::{ApprovalValue, FieldRef, FieldType, PhaseRef};
  use std::sync::Arc;
  use std::time::Duration;

  fn local(project: &str, id: u32) -> IssueRef {
    IssueRef::Local {
      project: project.to_string(),
      local_id: id,
    }
  }

  fn issue_json(issue: &Issue) -> serde_json::Value {
    serde_json::to_value(issue).unwrap()
  }

  fn page(keys: &[(&str, u32)], total: u32) -> serde_json::Value {
    let issues: Vec<serde_json::Value> = keys
      .iter()
      .map(|(p, id)| {
        issue_json(&Issue {
          project: Some((*p).to_string()),
          local_id: Some(*id),
          ..Issue::default()
        })
      })
      .collect();
    json!({ "issues": issues, "totalResults": total })
  }

  #[tokio::test]
  async fn test_fetch_issue_populates_cache_and_dependents() {
    let mock = MockTransport::new();
    mock.push(
      "GetIssue",
      Ok(json!({ "issue": {
        "projectName": "p",
        "localId": 1,
        "summary": "the issue",
        "ownerRef": { "displayName": "owner@example.com" },
        "blockedOnIssueRefs": [{ "projectName": "p", "localId": 2 }],
        "danglingBlockedOnRefs": [{ "extIdentifier": "b/5" }],
      }})),
    );
    mock.push(
      "ListReferencedIssues",
      Ok(json!({ "openRefs": [{ "projectName": "p", "localId": 2, "summary": "blocker" }] })),
    );
    mock.push(
      "BatchGetIssues",
      Ok(json!({ "issues": [{ "extIdentifier": "b/5", "isOpen": false }] })),
    );
    mock.push("ListHotlistsByIssue", Ok(json!({ "hotlists": [] })));
    mock.push(
      "ListReferencedUsers",
      Ok(json!({ "users": [{ "displayName": "owner@example.com", "userId": "7" }] })),
    );
    mock.push("IsIssueStarred", Ok(json!({ "isStarred": true })));

    let client = Client::new(mock);
    client.fetch_issue(&local("p", 1)).await;

    let store = client.store();
    assert_eq!(
      store.issue.viewed_issue().unwrap().summary.as_deref(),
      Some("the issue")
    );
    assert_eq!(
      store.issue.related("p:2").unwrap().summary.as_deref(),
      Some("blocker")
    );
    assert!(!store.issue.related("b/5").unwrap().is_open());
    assert!(store.issue.is_starred("p:1"));
    assert!(store.user.user("owner@example.com").is_some());
    assert!(!store.requests.fetch_issue.requesting);
    assert!(store.requests.fetch_issue.error.is_none());
    assert!(store.requests.fetch_related.error.is_none());
  }

  #[tokio::test]
  async fn test_fetch_issue_failure_is_swallowed_into_request_state() {
    let mock = MockTransport::new();
    mock.push(
      "GetIssue",
      Err(RpcError::Http {
        code: 500,
        message: "boom".to_string(),
      }),
    );

    let client = Client::new(mock);
    client.fetch_issue(&local("p", 1)).await;

    let store = client.store();
    assert!(store.issue.issue("p:1").is_none());
    assert!(!store.requests.fetch_issue.requesting);
    assert!(matches!(
      store.requests.fetch_issue.error,
      Some(RpcError::Http { code: 500, .. })
    ));
  }

  #[tokio::test]
  async fn test_fetch_issue_skips_dependents_when_deleted() {
    let mock = MockTransport::new();
    mock.push(
      "GetIssue",
      Ok(json!({ "issue": { "projectName": "p", "localId": 1, "isDeleted": true } })),
    );

    let client = Client::new(mock);
    client.fetch_issue(&local("p", 1)).await;

    let store = client.store();
    // No dependent fetch ever started; their trackers stayed idle.
    assert!(!store.requests.fetch_related.requesting);
    assert!(store.requests.fetch_related.error.is_none());
    assert!(!store.requests.is_starred.get("p:1").requesting);
  }

  #[tokio::test(start_paused = true)]
  async fn test_list_pages_reassemble_in_request_order() {
    let mock = MockTransport::new();
    // First page answers immediately, the second is the slowest, the third
    // resolves in between.
    mock.push(
      "ListIssues",
      Ok(page(&[("p", 1), ("p", 2), ("p", 3)], 9)),
    );
    mock.push_delayed(
      "ListIssues",
      50,
      Ok(page(&[("p", 4), ("p", 5), ("p", 6)], 9)),
    );
    mock.push_delayed(
      "ListIssues",
      10,
      Ok(page(&[("p", 7), ("p", 8), ("p", 9)], 9)),
    );

    let client = Arc::new(Client::new(mock));
    let params = IssueListParams {
      query: "is:open".to_string(),
      items_per_page: Some(3),
      ..IssueListParams::default()
    };
    let task = tokio::spawn({
      let client = Arc::clone(&client);
      async move { client.fetch_issue_list(&params).await }
    });

    // After the third page resolved but before the second: the emitted list
    // is still only the contiguous first page, while progress counts the
    // buffered page too.
    tokio::time::sleep(Duration::from_millis(20)).await;
    {
      let store = client.store();
      assert_eq!(store.issue.list().ordered_keys, vec!["p:1", "p:2", "p:3"]);
      let progress = store.issue.list().progress;
      assert!(progress > 0.6 && progress < 0.7, "progress = {progress}");
    }

    task.await.unwrap();
    let store = client.store();
    assert_eq!(
      store.issue.list().ordered_keys,
      vec!["p:1", "p:2", "p:3", "p:4", "p:5", "p:6", "p:7", "p:8", "p:9"]
    );
    assert_eq!(store.issue.list().progress, 1.0);
    assert_eq!(store.issue.list().total_results, 9);
    assert!(!store.requests.fetch_issue_list.requesting);
    assert!(store.requests.fetch_issue_list.error.is_none());
  }

  #[tokio::test]
  async fn test_list_with_zero_results_reports_complete_immediately() {
    let mock = MockTransport::new();
    mock.push("ListIssues", Ok(json!({ "issues": [], "totalResults": 0 })));

    let client = Client::new(mock);
    client
      .fetch_issue_list(&IssueListParams::default())
      .await;

    let store = client.store();
    assert!(store.issue.list().ordered_keys.is_empty());
    assert_eq!(store.issue.list().progress, 1.0);
    assert!(!store.requests.fetch_issue_list.requesting);
  }

  #[tokio::test]
  async fn test_list_fan_out_is_bounded_by_max_parallel_calls() {
    let mock = MockTransport::new();
    mock.push("ListIssues", Ok(page(&[("p", 1), ("p", 2)], 100)));
    mock.push("ListIssues", Ok(page(&[("p", 3), ("p", 4)], 100)));
    // Only two calls allowed in total; a third would hit an unscripted
    // response and fail the whole fetch.

    let client = Client::new(mock);
    client
      .fetch_issue_list(&IssueListParams {
        items_per_page: Some(2),
        max_parallel_calls: Some(2),
        ..IssueListParams::default()
      })
      .await;

    let store = client.store();
    assert_eq!(
      store.issue.list().ordered_keys,
      vec!["p:1", "p:2", "p:3", "p:4"]
    );
    assert_eq!(store.issue.list().progress, 1.0);
    assert!(store.requests.fetch_issue_list.error.is_none());
  }

  #[tokio::test]
  async fn test_list_page_failure_marks_request_failed() {
    let mock = MockTransport::new();
    mock.push("ListIssues", Ok(page(&[("p", 1)], 3)));
    mock.push(
      "ListIssues",
      Err(RpcError::Transport("reset by peer".to_string())),
    );

    let client = Client::new(mock);
    client
      .fetch_issue_list(&IssueListParams {
        items_per_page: Some(1),
        ..IssueListParams::default()
      })
      .await;

    let store = client.store();
    assert!(!store.requests.fetch_issue_list.requesting);
    assert!(store.requests.fetch_issue_list.error.is_some());
    // The page that made it stays cached.
    assert!(store.issue.issue("p:1").is_some());
  }

  #[tokio::test(start_paused = true)]
  async fn test_concurrent_stars_stay_independent() {
    let mock = MockTransport::new();
    mock.push_delayed("StarIssue", 50, Ok(json!({ "starCount": 2 })));
    mock.push_delayed(
      "StarIssue",
      10,
      Err(RpcError::Transport("timeout".to_string())),
    );

    let client = Client::new(mock);
    let key1 = local("p", 1);
    let key2 = local("p", 2);
    tokio::join!(
      client.star_issue(&key1, true),
      client.star_issue(&key2, true),
    );

    let store = client.store();
    assert!(store.issue.is_starred("p:1"));
    assert_eq!(store.issue.issue("p:1").unwrap().star_count, Some(2));
    assert!(store.requests.star.get("p:1").error.is_none());
    // The other key failed on its own, without touching p:1.
    assert!(!store.issue.is_starred("p:2"));
    assert!(store.requests.star.get("p:2").error.is_some());
  }

  #[tokio::test]
  async fn test_update_approval_keeps_cached_phase() {
    let client = Client::new(MockTransport::new());
    client.apply(Message::FetchIssueSuccess {
      issue: Issue {
        project: Some("p".to_string()),
        local_id: Some(1),
        approval_values: Some(vec![ApprovalValue {
          field_ref: FieldRef {
            field_name: "Privacy-Review".to_string(),
            field_type: FieldType::ApprovalType,
          },
          status: Some("NeedsReview".to_string()),
          approver_refs: Vec::new(),
          phase_ref: Some(PhaseRef {
            phase_name: "Beta".to_string(),
          }),
        }]),
        ..Issue::default()
      },
    });
    client.transport().push(
      "UpdateApproval",
      Ok(json!({ "approval": {
        "fieldRef": { "fieldName": "Privacy-Review", "type": "APPROVAL_TYPE" },
        "status": "Approved",
      }})),
    );

    client
      .update_approval(
        &local("p", 1),
        &ApprovalDelta {
          field_name: "Privacy-Review".to_string(),
          status: Some("Approved".to_string()),
          approvers_add: Vec::new(),
        },
      )
      .await;

    let store = client.store();
    let approvals = store
      .issue
      .issue("p:1")
      .unwrap()
      .approval_values
      .as_ref()
      .unwrap();
    assert_eq!(approvals[0].status.as_deref(), Some("Approved"));
    assert_eq!(
      approvals[0].phase_ref.as_ref().unwrap().phase_name,
      "Beta"
    );
  }
}
