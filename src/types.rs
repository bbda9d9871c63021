//! Domain types for cached entities.
//!
//! Every non-identity field on `Issue` is an `Option` so that a merge of a
//! freshly fetched partial record over a cached one overwrites exactly the
//! fields the payload carried and preserves the rest. The serde names match
//! the wire, since the cache stores converted wire objects directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::refs::{IssueRef, UserRef};

/// An issue status together with whether it counts as open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRef {
  pub status: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub means_open: Option<bool>,
}

/// The value type of a custom field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
  EnumType,
  IntType,
  StrType,
  UserType,
  DateType,
  UrlType,
  ApprovalType,
  #[serde(other)]
  NoType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRef {
  pub field_name: String,
  #[serde(rename = "type", default = "FieldType::no_type")]
  pub field_type: FieldType,
}

impl FieldType {
  fn no_type() -> FieldType {
    FieldType::NoType
  }
}

/// Reference to the phase a field value or approval belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseRef {
  pub phase_name: String,
}

/// One `{field, value}` pair on an issue. An issue may carry several values
/// for the same field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValue {
  pub field_ref: FieldRef,
  pub value: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phase_ref: Option<PhaseRef>,
}

/// An approval gate on an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalValue {
  pub field_ref: FieldRef,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub approver_refs: Vec<UserRef>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phase_ref: Option<PhaseRef>,
}

/// A project's definition of a custom field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
  pub field_ref: FieldRef,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub applicable_type: String,
  #[serde(default)]
  pub is_phase_field: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub docstring: Option<String>,
  #[serde(default)]
  pub is_multivalued: bool,
}

/// A cached issue. Partial by design: any field may be absent until a fetch
/// that carries it arrives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Issue {
  #[serde(rename = "projectName", skip_serializing_if = "Option::is_none")]
  pub project: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub local_id: Option<u32>,
  /// Set only for issues tracked by an external system.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ext_identifier: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub summary: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status_ref: Option<StatusRef>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub owner_ref: Option<UserRef>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cc_refs: Option<Vec<UserRef>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reporter_ref: Option<UserRef>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub label_refs: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub component_refs: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub blocked_on_issue_refs: Option<Vec<IssueRef>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub blocking_issue_refs: Option<Vec<IssueRef>>,
  /// Refs known to be unresolvable locally (external trackers, dead
  /// projects). Kept apart from the resolved ref lists.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub dangling_blocked_on_refs: Option<Vec<IssueRef>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub dangling_blocking_refs: Option<Vec<IssueRef>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub merged_into_issue_ref: Option<IssueRef>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field_values: Option<Vec<FieldValue>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub approval_values: Option<Vec<ApprovalValue>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub star_count: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_deleted: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_spam: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub moved_to_ref: Option<IssueRef>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub opened_timestamp: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub closed_timestamp: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub modified_timestamp: Option<DateTime<Utc>>,
}

impl Issue {
  /// The canonical cache key for this issue.
  pub fn entity_key(&self) -> String {
    if let Some(ext) = &self.ext_identifier {
      return ext.clone();
    }
    format!(
      "{}:{}",
      self.project.as_deref().unwrap_or("").to_lowercase(),
      self.local_id.unwrap_or(0)
    )
  }

  /// An issue carrying only the identity fields of a reference. Used when a
  /// ref has no resolved entry anywhere, so views can still render it.
  pub fn from_ref(iref: &IssueRef) -> Issue {
    match iref {
      IssueRef::Local { project, local_id } => Issue {
        project: Some(project.clone()),
        local_id: Some(*local_id),
        ..Issue::default()
      },
      IssueRef::Federated { ext_identifier } => Issue {
        ext_identifier: Some(ext_identifier.clone()),
        ..Issue::default()
      },
      IssueRef::Name { .. } => match IssueRef::parse(&iref.key()) {
        Some(parsed) => Issue::from_ref(&parsed),
        None => Issue::default(),
      },
    }
  }

  /// Whether the issue counts as open. Unknown status means open, so
  /// unresolved refs sort with the open group rather than disappearing.
  pub fn is_open(&self) -> bool {
    self
      .status_ref
      .as_ref()
      .and_then(|s| s.means_open)
      .unwrap_or(true)
  }

  /// The issue's type, derived from a `Type-` label if present.
  pub fn issue_type(&self) -> Option<&str> {
    self
      .label_refs
      .as_deref()
      .unwrap_or(&[])
      .iter()
      .find_map(|label| label.strip_prefix("Type-"))
  }

  /// Shallow field merge: every field the new payload carries replaces the
  /// cached value; absent fields are preserved, never deleted.
  pub fn merge_from(&mut self, new: Issue) {
    if new.project.is_some() {
      self.project = new.project;
    }
    if new.local_id.is_some() {
      self.local_id = new.local_id;
    }
    if new.ext_identifier.is_some() {
      self.ext_identifier = new.ext_identifier;
    }
    if new.summary.is_some() {
      self.summary = new.summary;
    }
    if new.status_ref.is_some() {
      self.status_ref = new.status_ref;
    }
    if new.owner_ref.is_some() {
      self.owner_ref = new.owner_ref;
    }
    if new.cc_refs.is_some() {
      self.cc_refs = new.cc_refs;
    }
    if new.reporter_ref.is_some() {
      self.reporter_ref = new.reporter_ref;
    }
    if new.label_refs.is_some() {
      self.label_refs = new.label_refs;
    }
    if new.component_refs.is_some() {
      self.component_refs = new.component_refs;
    }
    if new.blocked_on_issue_refs.is_some() {
      self.blocked_on_issue_refs = new.blocked_on_issue_refs;
    }
    if new.blocking_issue_refs.is_some() {
      self.blocking_issue_refs = new.blocking_issue_refs;
    }
    if new.dangling_blocked_on_refs.is_some() {
      self.dangling_blocked_on_refs = new.dangling_blocked_on_refs;
    }
    if new.dangling_blocking_refs.is_some() {
      self.dangling_blocking_refs = new.dangling_blocking_refs;
    }
    if new.merged_into_issue_ref.is_some() {
      self.merged_into_issue_ref = new.merged_into_issue_ref;
    }
    if new.field_values.is_some() {
      self.field_values = new.field_values;
    }
    if new.approval_values.is_some() {
      self.approval_values = new.approval_values;
    }
    if new.star_count.is_some() {
      self.star_count = new.star_count;
    }
    if new.is_deleted.is_some() {
      self.is_deleted = new.is_deleted;
    }
    if new.is_spam.is_some() {
      self.is_spam = new.is_spam;
    }
    if new.moved_to_ref.is_some() {
      self.moved_to_ref = new.moved_to_ref;
    }
    if new.opened_timestamp.is_some() {
      self.opened_timestamp = new.opened_timestamp;
    }
    if new.closed_timestamp.is_some() {
      self.closed_timestamp = new.closed_timestamp;
    }
    if new.modified_timestamp.is_some() {
      self.modified_timestamp = new.modified_timestamp;
    }
  }
}

/// A hotlist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hotlist {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub owner_ref: Option<UserRef>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub summary: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub default_col_spec: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_private: Option<bool>,
}

impl Hotlist {
  pub fn entity_key(&self) -> String {
    format!(
      "{}:{}",
      self
        .owner_ref
        .as_ref()
        .map(|o| o.key())
        .unwrap_or_default(),
      self.name
    )
  }
}

/// One issue's membership in a hotlist. The issue itself lives in the issue
/// cache; the item holds only the ref plus item-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotlistItem {
  pub issue_ref: IssueRef,
  #[serde(default)]
  pub rank: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub adder_ref: Option<UserRef>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub added_timestamp: Option<DateTime<Utc>>,
}

/// A user account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub display_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_site_admin: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub availability: Option<String>,
}

impl User {
  pub fn entity_key(&self) -> String {
    UserRef {
      user_id: self.user_id.clone(),
      display_name: self.display_name.clone(),
    }
    .key()
  }
}

/// The permissions the current user holds on one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
  pub resource: String,
  #[serde(default)]
  pub permissions: Vec<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn local(project: &str, id: u32) -> IssueRef {
    IssueRef::Local {
      project: project.to_string(),
      local_id: id,
    }
  }

  #[test]
  fn test_merge_preserves_absent_fields() {
    let mut cached = Issue {
      project: Some("p".to_string()),
      local_id: Some(1),
      summary: Some("old summary".to_string()),
      star_count: Some(4),
      ..Issue::default()
    };

    cached.merge_from(Issue {
      summary: Some("new summary".to_string()),
      ..Issue::default()
    });

    assert_eq!(cached.summary.as_deref(), Some("new summary"));
    // Fields the update did not carry survive.
    assert_eq!(cached.star_count, Some(4));
    assert_eq!(cached.project.as_deref(), Some("p"));
  }

  #[test]
  fn test_entity_key_matches_ref_key() {
    let issue = Issue {
      project: Some("Proj".to_string()),
      local_id: Some(7),
      ..Issue::default()
    };
    assert_eq!(issue.entity_key(), local("Proj", 7).key());

    let fed = Issue {
      ext_identifier: Some("b/11".to_string()),
      ..Issue::default()
    };
    assert_eq!(fed.entity_key(), "b/11");
  }

  #[test]
  fn test_from_ref_round_trips_identity() {
    let iref = local("p", 5);
    let issue = Issue::from_ref(&iref);
    assert_eq!(issue.entity_key(), "p:5");
    assert!(issue.summary.is_none());

    let by_name = IssueRef::Name {
      resource_name: "projects/p/issues/5".to_string(),
    };
    assert_eq!(Issue::from_ref(&by_name).entity_key(), "p:5");
  }

  #[test]
  fn test_issue_type_from_labels() {
    let issue = Issue {
      label_refs: Some(vec!["Pri-1".to_string(), "Type-Defect".to_string()]),
      ..Issue::default()
    };
    assert_eq!(issue.issue_type(), Some("Defect"));
    assert_eq!(Issue::default().issue_type(), None);
  }

  #[test]
  fn test_is_open_defaults_to_open() {
    assert!(Issue::default().is_open());
    let closed = Issue {
      status_ref: Some(StatusRef {
        status: "Fixed".to_string(),
        means_open: Some(false),
      }),
      ..Issue::default()
    };
    assert!(!closed.is_open());
  }
}
