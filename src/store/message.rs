//! State-transition messages.
//!
//! Every cache mutation flows through exactly one [`Message`] applied to the
//! whole container. The enum is closed: each slice matches on the variants
//! it handles and explicitly ignores the rest, so adding a variant forces a
//! decision in every slice. More than one slice may respond to the same
//! message (e.g. hotlist items also carry issues for the issue cache).

use crate::rpc::RpcError;
use crate::types::{ApprovalValue, FieldDef, Hotlist, HotlistItem, Issue, PermissionSet, User};

#[derive(Debug, Clone)]
pub enum Message {
  /// Mark an issue as the one being viewed; derived views key off it.
  ViewIssue { key: String },

  FetchIssueStart,
  FetchIssueSuccess { issue: Issue },
  FetchIssueFailure { error: RpcError },

  FetchIssueListStart,
  /// Incremental re-emit of the full accumulated ordered list. Carries the
  /// issues of every page applied so far in request order.
  FetchIssueListUpdate {
    issues: Vec<Issue>,
    ordered_keys: Vec<String>,
    progress: f64,
    total_results: u32,
  },
  FetchIssueListSuccess,
  FetchIssueListFailure { error: RpcError },

  FetchRelatedIssuesStart,
  FetchRelatedIssuesSuccess { issues: Vec<Issue> },
  FetchRelatedIssuesFailure { error: RpcError },

  FetchFederatedRefsStart,
  FetchFederatedRefsSuccess { issues: Vec<Issue> },
  FetchFederatedRefsFailure { error: RpcError },

  StarIssueStart { key: String },
  StarIssueSuccess {
    key: String,
    starred: bool,
    star_count: u32,
  },
  StarIssueFailure { key: String, error: RpcError },

  FetchIsStarredStart { key: String },
  FetchIsStarredSuccess { key: String, starred: bool },
  FetchIsStarredFailure { key: String, error: RpcError },

  UpdateApprovalStart,
  UpdateApprovalSuccess {
    issue_key: String,
    approval: ApprovalValue,
  },
  UpdateApprovalFailure { error: RpcError },

  FetchHotlistStart,
  FetchHotlistSuccess { hotlist: Hotlist },
  FetchHotlistFailure { error: RpcError },

  FetchHotlistItemsStart { hotlist_key: String },
  /// Items hold refs; the issues inlined in the response ride along for the
  /// issue cache to ingest.
  FetchHotlistItemsSuccess {
    hotlist_key: String,
    items: Vec<HotlistItem>,
    issues: Vec<Issue>,
  },
  FetchHotlistItemsFailure { hotlist_key: String, error: RpcError },

  FetchIssueHotlistsStart,
  FetchIssueHotlistsSuccess { hotlists: Vec<Hotlist> },
  FetchIssueHotlistsFailure { error: RpcError },

  BatchGetUsersStart { batch_key: String },
  BatchGetUsersSuccess { batch_key: String, users: Vec<User> },
  BatchGetUsersFailure { batch_key: String, error: RpcError },

  FetchProjectConfigStart,
  FetchProjectConfigSuccess {
    project: String,
    field_defs: Vec<FieldDef>,
  },
  FetchProjectConfigFailure { error: RpcError },

  FetchPermissionsStart,
  FetchPermissionsSuccess { permission_sets: Vec<PermissionSet> },
  FetchPermissionsFailure { error: RpcError },
}
