//! Request lifecycle tracking.
//!
//! Each asynchronous operation is observable as a `{requesting, error}`
//! record, either one per operation kind or one per addressed key (stars,
//! user batches), so concurrent requests for different keys never disturb
//! each other's status.

use std::collections::HashMap;

use super::message::Message;
use crate::rpc::RpcError;

/// Lifecycle of one tracked request.
///
/// `succeed` clears the error; `fail` records it and stops requesting. Both
/// are terminal for the invocation, so a finished call can never leave the
/// record stuck in `requesting`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestState {
  pub requesting: bool,
  pub error: Option<RpcError>,
}

impl RequestState {
  fn start(&mut self) {
    self.requesting = true;
    self.error = None;
  }

  fn succeed(&mut self) {
    self.requesting = false;
    self.error = None;
  }

  fn fail(&mut self, error: &RpcError) {
    self.requesting = false;
    self.error = Some(error.clone());
  }
}

static IDLE: RequestState = RequestState {
  requesting: false,
  error: None,
};

/// Independent request records per key.
#[derive(Debug, Clone, Default)]
pub struct KeyedRequests {
  by_key: HashMap<String, RequestState>,
}

impl KeyedRequests {
  fn entry(&mut self, key: &str) -> &mut RequestState {
    self.by_key.entry(key.to_string()).or_default()
  }

  fn start(&mut self, key: &str) {
    self.entry(key).start();
  }

  fn succeed(&mut self, key: &str) {
    self.entry(key).succeed();
  }

  fn fail(&mut self, key: &str, error: &RpcError) {
    self.entry(key).fail(error);
  }

  /// The state for a key; keys never started report idle.
  pub fn get(&self, key: &str) -> &RequestState {
    self.by_key.get(key).unwrap_or(&IDLE)
  }

  /// Whether any key is currently requesting.
  pub fn any_requesting(&self) -> bool {
    self.by_key.values().any(|s| s.requesting)
  }
}

/// All request records of the container.
#[derive(Debug, Clone, Default)]
pub struct Requests {
  pub fetch_issue: RequestState,
  pub fetch_issue_list: RequestState,
  pub fetch_related: RequestState,
  pub fetch_federated: RequestState,
  pub update_approval: RequestState,
  pub fetch_hotlist: RequestState,
  pub fetch_issue_hotlists: RequestState,
  pub fetch_project_config: RequestState,
  pub fetch_permissions: RequestState,
  /// Keyed per issue, so starring A never blocks or fails B.
  pub star: KeyedRequests,
  pub is_starred: KeyedRequests,
  /// Keyed per hotlist.
  pub hotlist_items: KeyedRequests,
  /// Keyed per user batch (see `fetch::user::batch_key`).
  pub batch_users: KeyedRequests,

  version: u64,
}

impl Requests {
  pub fn version(&self) -> u64 {
    self.version
  }

  pub fn apply(&mut self, msg: &Message) {
    match msg {
      Message::FetchIssueStart => self.fetch_issue.start(),
      Message::FetchIssueSuccess { .. } => self.fetch_issue.succeed(),
      Message::FetchIssueFailure { error } => self.fetch_issue.fail(error),

      Message::FetchIssueListStart => self.fetch_issue_list.start(),
      Message::FetchIssueListSuccess => self.fetch_issue_list.succeed(),
      Message::FetchIssueListFailure { error } => self.fetch_issue_list.fail(error),

      Message::FetchRelatedIssuesStart => self.fetch_related.start(),
      Message::FetchRelatedIssuesSuccess { .. } => self.fetch_related.succeed(),
      Message::FetchRelatedIssuesFailure { error } => self.fetch_related.fail(error),

      Message::FetchFederatedRefsStart => self.fetch_federated.start(),
      Message::FetchFederatedRefsSuccess { .. } => self.fetch_federated.succeed(),
      Message::FetchFederatedRefsFailure { error } => self.fetch_federated.fail(error),

      Message::StarIssueStart { key } => self.star.start(key),
      Message::StarIssueSuccess { key, .. } => self.star.succeed(key),
      Message::StarIssueFailure { key, error } => self.star.fail(key, error),

      Message::FetchIsStarredStart { key } => self.is_starred.start(key),
      Message::FetchIsStarredSuccess { key, .. } => self.is_starred.succeed(key),
      Message::FetchIsStarredFailure { key, error } => self.is_starred.fail(key, error),

      Message::UpdateApprovalStart => self.update_approval.start(),
      Message::UpdateApprovalSuccess { .. } => self.update_approval.succeed(),
      Message::UpdateApprovalFailure { error } => self.update_approval.fail(error),

      Message::FetchHotlistStart => self.fetch_hotlist.start(),
      Message::FetchHotlistSuccess { .. } => self.fetch_hotlist.succeed(),
      Message::FetchHotlistFailure { error } => self.fetch_hotlist.fail(error),

      Message::FetchHotlistItemsStart { hotlist_key } => self.hotlist_items.start(hotlist_key),
      Message::FetchHotlistItemsSuccess { hotlist_key, .. } => {
        self.hotlist_items.succeed(hotlist_key)
      }
      Message::FetchHotlistItemsFailure { hotlist_key, error } => {
        self.hotlist_items.fail(hotlist_key, error)
      }

      Message::FetchIssueHotlistsStart => self.fetch_issue_hotlists.start(),
      Message::FetchIssueHotlistsSuccess { .. } => self.fetch_issue_hotlists.succeed(),
      Message::FetchIssueHotlistsFailure { error } => self.fetch_issue_hotlists.fail(error),

      Message::BatchGetUsersStart { batch_key } => self.batch_users.start(batch_key),
      Message::BatchGetUsersSuccess { batch_key, .. } => self.batch_users.succeed(batch_key),
      Message::BatchGetUsersFailure { batch_key, error } => self.batch_users.fail(batch_key, error),

      Message::FetchProjectConfigStart => self.fetch_project_config.start(),
      Message::FetchProjectConfigSuccess { .. } => self.fetch_project_config.succeed(),
      Message::FetchProjectConfigFailure { error } => self.fetch_project_config.fail(error),

      Message::FetchPermissionsStart => self.fetch_permissions.start(),
      Message::FetchPermissionsSuccess { .. } => self.fetch_permissions.succeed(),
      Message::FetchPermissionsFailure { error } => self.fetch_permissions.fail(error),

      Message::ViewIssue { .. } | Message::FetchIssueListUpdate { .. } => return,
    }
    self.version += 1;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn err() -> RpcError {
    RpcError::Transport("connection refused".to_string())
  }

  #[test]
  fn test_singleton_lifecycle() {
    let mut reqs = Requests::default();

    reqs.apply(&Message::FetchIssueStart);
    assert!(reqs.fetch_issue.requesting);
    assert!(reqs.fetch_issue.error.is_none());

    reqs.apply(&Message::FetchIssueFailure { error: err() });
    assert!(!reqs.fetch_issue.requesting);
    assert_eq!(reqs.fetch_issue.error, Some(err()));

    // A new start clears the previous error; success leaves none.
    reqs.apply(&Message::FetchIssueStart);
    assert!(reqs.fetch_issue.error.is_none());
    reqs.apply(&Message::FetchIssueSuccess {
      issue: Default::default(),
    });
    assert!(!reqs.fetch_issue.requesting);
    assert!(reqs.fetch_issue.error.is_none());
  }

  #[test]
  fn test_star_requests_are_isolated_per_key() {
    let mut reqs = Requests::default();

    reqs.apply(&Message::StarIssueStart {
      key: "p:1".to_string(),
    });
    let before = reqs.star.get("p:1").clone();

    // Starting and failing another key leaves p:1 untouched.
    reqs.apply(&Message::StarIssueStart {
      key: "p:2".to_string(),
    });
    assert_eq!(reqs.star.get("p:1"), &before);

    reqs.apply(&Message::StarIssueFailure {
      key: "p:2".to_string(),
      error: err(),
    });
    assert_eq!(reqs.star.get("p:1"), &before);
    assert!(reqs.star.get("p:1").requesting);
    assert_eq!(reqs.star.get("p:2").error, Some(err()));
  }

  #[test]
  fn test_unknown_key_reports_idle() {
    let reqs = Requests::default();
    let state = reqs.star.get("never-started");
    assert!(!state.requesting);
    assert!(state.error.is_none());
  }

  #[test]
  fn test_version_bumps_only_on_handled_messages() {
    let mut reqs = Requests::default();
    let v0 = reqs.version();

    reqs.apply(&Message::ViewIssue {
      key: "p:1".to_string(),
    });
    assert_eq!(reqs.version(), v0);

    reqs.apply(&Message::FetchRelatedIssuesStart);
    assert!(reqs.version() > v0);
  }

  #[test]
  fn test_any_requesting() {
    let mut reqs = Requests::default();
    assert!(!reqs.star.any_requesting());
    reqs.apply(&Message::StarIssueStart {
      key: "p:9".to_string(),
    });
    assert!(reqs.star.any_requesting());
  }
}
