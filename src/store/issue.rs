//! Issue cache slice: the normalized issue map, the related-issue index,
//! star membership, and the ordered issue-list view state.

use std::collections::HashMap;

use super::message::Message;
use crate::types::{ApprovalValue, Issue};

/// Ordered projection over the issue cache, rebuilt incrementally as
/// paginated list results arrive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueListState {
  pub ordered_keys: Vec<String>,
  pub progress: f64,
  pub total_results: u32,
}

#[derive(Debug, Clone, Default)]
pub struct IssueState {
  viewed_key: Option<String>,
  /// Primary-fetched issues by canonical key.
  issues: HashMap<String, Issue>,
  /// Partial data for issues referenced by, but not subjects of, the
  /// current view. Federated lookups merge into this keyspace.
  related: HashMap<String, Issue>,
  /// The current user's star state per issue key.
  stars: HashMap<String, bool>,
  list: IssueListState,

  issues_version: u64,
  related_version: u64,
  stars_version: u64,
  list_version: u64,
  viewed_version: u64,
}

impl IssueState {
  pub fn issue(&self, key: &str) -> Option<&Issue> {
    self.issues.get(key)
  }

  pub fn viewed_key(&self) -> Option<&str> {
    self.viewed_key.as_deref()
  }

  pub fn viewed_issue(&self) -> Option<&Issue> {
    self.issues.get(self.viewed_key.as_deref()?)
  }

  pub fn related(&self, key: &str) -> Option<&Issue> {
    self.related.get(key)
  }

  pub fn is_starred(&self, key: &str) -> bool {
    self.stars.get(key).copied().unwrap_or(false)
  }

  pub fn list(&self) -> &IssueListState {
    &self.list
  }

  pub fn issues_version(&self) -> u64 {
    self.issues_version
  }

  pub fn related_version(&self) -> u64 {
    self.related_version
  }

  pub fn stars_version(&self) -> u64 {
    self.stars_version
  }

  pub fn list_version(&self) -> u64 {
    self.list_version
  }

  pub fn viewed_version(&self) -> u64 {
    self.viewed_version
  }

  /// Merge one issue into the primary map, field by field.
  fn ingest(&mut self, issue: Issue) {
    let key = issue.entity_key();
    self
      .issues
      .entry(key)
      .or_default()
      .merge_from(issue);
    self.issues_version += 1;
  }

  pub fn apply(&mut self, msg: &Message) {
    match msg {
      Message::ViewIssue { key } => {
        if self.viewed_key.as_deref() != Some(key.as_str()) {
          self.viewed_key = Some(key.clone());
          self.viewed_version += 1;
        }
      }

      Message::FetchIssueSuccess { issue } => self.ingest(issue.clone()),

      Message::FetchIssueListUpdate {
        issues,
        ordered_keys,
        progress,
        total_results,
      } => {
        for issue in issues {
          self.ingest(issue.clone());
        }
        self.list = IssueListState {
          ordered_keys: ordered_keys.clone(),
          progress: *progress,
          total_results: *total_results,
        };
        self.list_version += 1;
      }

      Message::FetchIssueListStart => {
        self.list.progress = 0.0;
        self.list_version += 1;
      }

      // Bulk lookup replaces the whole index; stale entries from the
      // previously viewed issue must not linger.
      Message::FetchRelatedIssuesSuccess { issues } => {
        self.related = issues
          .iter()
          .map(|i| (i.entity_key(), i.clone()))
          .collect();
        self.related_version += 1;
      }

      // Left-merge: federated enrichment never clobbers an entry the bulk
      // lookup already resolved under the same key.
      Message::FetchFederatedRefsSuccess { issues } => {
        for issue in issues {
          self
            .related
            .entry(issue.entity_key())
            .or_insert_with(|| issue.clone());
        }
        self.related_version += 1;
      }

      Message::StarIssueSuccess {
        key,
        starred,
        star_count,
      } => {
        self.stars.insert(key.clone(), *starred);
        self.stars_version += 1;
        // Only the star count changes on the cached entity; if it is not
        // cached yet, a record holding just that field is created.
        self.issues.entry(key.clone()).or_default().star_count = Some(*star_count);
        self.issues_version += 1;
      }

      Message::FetchIsStarredSuccess { key, starred } => {
        self.stars.insert(key.clone(), *starred);
        self.stars_version += 1;
      }

      Message::UpdateApprovalSuccess {
        issue_key,
        approval,
      } => {
        if let Some(issue) = self.issues.get_mut(issue_key) {
          if replace_approval(issue.approval_values.as_deref_mut(), approval) {
            self.issues_version += 1;
          }
        }
      }

      // Hotlist items come with their issues inlined; normalize them here.
      Message::FetchHotlistItemsSuccess { issues, .. } => {
        for issue in issues {
          self.ingest(issue.clone());
        }
      }

      Message::FetchIssueStart
      | Message::FetchIssueFailure { .. }
      | Message::FetchIssueListSuccess
      | Message::FetchIssueListFailure { .. }
      | Message::FetchRelatedIssuesStart
      | Message::FetchRelatedIssuesFailure { .. }
      | Message::FetchFederatedRefsStart
      | Message::FetchFederatedRefsFailure { .. }
      | Message::StarIssueStart { .. }
      | Message::StarIssueFailure { .. }
      | Message::FetchIsStarredStart { .. }
      | Message::FetchIsStarredFailure { .. }
      | Message::UpdateApprovalStart
      | Message::UpdateApprovalFailure { .. }
      | Message::FetchHotlistStart
      | Message::FetchHotlistSuccess { .. }
      | Message::FetchHotlistFailure { .. }
      | Message::FetchHotlistItemsStart { .. }
      | Message::FetchHotlistItemsFailure { .. }
      | Message::FetchIssueHotlistsStart
      | Message::FetchIssueHotlistsSuccess { .. }
      | Message::FetchIssueHotlistsFailure { .. }
      | Message::BatchGetUsersStart { .. }
      | Message::BatchGetUsersSuccess { .. }
      | Message::BatchGetUsersFailure { .. }
      | Message::FetchProjectConfigStart
      | Message::FetchProjectConfigSuccess { .. }
      | Message::FetchProjectConfigFailure { .. }
      | Message::FetchPermissionsStart
      | Message::FetchPermissionsSuccess { .. }
      | Message::FetchPermissionsFailure { .. } => {}
    }
  }
}

/// Replace the approval matching the incoming one by field name, keeping
/// siblings intact. The backend omits `phaseRef` from the update response,
/// so the locally-cached value is authoritative for that sub-field.
fn replace_approval(approvals: Option<&mut [ApprovalValue]>, incoming: &ApprovalValue) -> bool {
  let Some(approvals) = approvals else {
    return false;
  };
  for existing in approvals {
    if existing.field_ref.field_name == incoming.field_ref.field_name {
      let phase_ref = existing.phase_ref.clone();
      *existing = incoming.clone();
      existing.phase_ref = phase_ref;
      return true;
    }
  }
  false
}
