//! Serde-deserializable response envelopes for the tracker RPC methods.
//!
//! The transport omits default-valued fields, so every collection and count
//! carries `#[serde(default)]` — a missing array decodes as empty instead of
//! failing the whole response.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::refs::{IssueRef, UserRef};
use crate::types::{ApprovalValue, FieldDef, Hotlist, HotlistItem, Issue, PermissionSet, User};

// ============================================================================
// Issues service
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GetIssueResponse {
  pub issue: Option<Issue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListIssuesResponse {
  #[serde(default)]
  pub issues: Vec<Issue>,
  #[serde(default)]
  pub total_results: u32,
}

/// Referenced-issue lookup returns resolved issues partitioned by status.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReferencedIssuesResponse {
  #[serde(default)]
  pub open_refs: Vec<Issue>,
  #[serde(default)]
  pub closed_refs: Vec<Issue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarIssueResponse {
  #[serde(default)]
  pub star_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsIssueStarredResponse {
  #[serde(default)]
  pub is_starred: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateApprovalResponse {
  pub approval: Option<ApprovalValue>,
}

// ============================================================================
// External (federated) lookup
// ============================================================================

/// One issue as reported by an external tracker. Only identity, status, and
/// summary come back from the side channel.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiExternalIssue {
  pub ext_identifier: String,
  pub is_open: Option<bool>,
  pub summary: Option<String>,
}

impl ApiExternalIssue {
  pub fn into_issue(self) -> Issue {
    Issue {
      ext_identifier: Some(self.ext_identifier),
      summary: self.summary,
      status_ref: self.is_open.map(|open| crate::types::StatusRef {
        status: if open { "Open" } else { "Closed" }.to_string(),
        means_open: Some(open),
      }),
      ..Issue::default()
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetExternalIssuesResponse {
  #[serde(default)]
  pub issues: Vec<ApiExternalIssue>,
}

// ============================================================================
// Features service (hotlists)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GetHotlistResponse {
  pub hotlist: Option<Hotlist>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListHotlistsByIssueResponse {
  #[serde(default)]
  pub hotlists: Vec<Hotlist>,
}

/// A hotlist item as it comes over the wire: the full issue is inlined.
/// `into_parts` splits it so the issue can be normalized into the issue
/// cache while the item keeps only the ref.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHotlistItem {
  pub issue: Issue,
  #[serde(default)]
  pub rank: u32,
  pub adder_ref: Option<UserRef>,
  pub note: Option<String>,
  pub added_timestamp: Option<DateTime<Utc>>,
}

impl ApiHotlistItem {
  pub fn into_parts(self) -> (HotlistItem, Issue) {
    let issue_ref = match &self.issue.ext_identifier {
      Some(ext) => IssueRef::Federated {
        ext_identifier: ext.clone(),
      },
      None => IssueRef::Local {
        project: self.issue.project.clone().unwrap_or_default(),
        local_id: self.issue.local_id.unwrap_or(0),
      },
    };
    (
      HotlistItem {
        issue_ref,
        rank: self.rank,
        adder_ref: self.adder_ref,
        note: self.note,
        added_timestamp: self.added_timestamp,
      },
      self.issue,
    )
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListHotlistItemsResponse {
  #[serde(default)]
  pub items: Vec<ApiHotlistItem>,
}

// ============================================================================
// Users service
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReferencedUsersResponse {
  #[serde(default)]
  pub users: Vec<User>,
}

// ============================================================================
// Projects / permissions
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetConfigResponse {
  #[serde(default)]
  pub project_name: String,
  #[serde(default)]
  pub field_defs: Vec<FieldDef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetPermissionSetsResponse {
  #[serde(default)]
  pub permission_sets: Vec<PermissionSet>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_arrays_default_to_empty() {
    let resp: ListIssuesResponse = serde_json::from_str("{}").unwrap();
    assert!(resp.issues.is_empty());
    assert_eq!(resp.total_results, 0);

    let refs: ListReferencedIssuesResponse = serde_json::from_str("{}").unwrap();
    assert!(refs.open_refs.is_empty() && refs.closed_refs.is_empty());
  }

  #[test]
  fn test_external_issue_conversion() {
    let ext: ApiExternalIssue =
      serde_json::from_str(r#"{"extIdentifier": "b/77", "isOpen": false, "summary": "done"}"#)
        .unwrap();
    let issue = ext.into_issue();
    assert_eq!(issue.entity_key(), "b/77");
    assert!(!issue.is_open());
    assert_eq!(issue.summary.as_deref(), Some("done"));
  }

  #[test]
  fn test_hotlist_item_splits_issue_from_item() {
    let item: ApiHotlistItem = serde_json::from_str(
      r#"{"issue": {"projectName": "p", "localId": 3, "summary": "s"}, "rank": 2, "note": "n"}"#,
    )
    .unwrap();
    let (item, issue) = item.into_parts();
    assert_eq!(item.issue_ref.key(), "p:3");
    assert_eq!(item.rank, 2);
    assert_eq!(issue.summary.as_deref(), Some("s"));
  }
}
