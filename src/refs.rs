//! Canonical keys for entity references.
//!
//! Every cache slice addresses entities by a single canonical string key,
//! no matter which reference encoding produced it. Local issue refs key as
//! `"{project}:{localId}"` (project lowercased), federated refs key as the
//! shortlink itself. The two keyspaces cannot collide: shortlinks contain a
//! slash, local keys a colon.

use serde::{Deserialize, Serialize};

/// A reference to one issue, in any of the encodings the wire can produce.
///
/// Untagged so that a `{projectName, localId}` object, a v3 resource name,
/// or a federated `{extIdentifier}` all deserialize without a discriminator,
/// regardless of field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IssueRef {
  Local {
    #[serde(rename = "projectName")]
    project: String,
    #[serde(rename = "localId")]
    local_id: u32,
  },
  Federated {
    #[serde(rename = "extIdentifier")]
    ext_identifier: String,
  },
  Name {
    #[serde(rename = "resourceName", alias = "name")]
    resource_name: String,
  },
}

impl IssueRef {
  /// Compute the canonical key for this reference.
  ///
  /// Total and deterministic: an unparseable resource name keys to itself
  /// rather than failing, so partially-loaded data can always be addressed.
  pub fn key(&self) -> String {
    match self {
      IssueRef::Local { project, local_id } => local_key(project, *local_id),
      IssueRef::Federated { ext_identifier } => ext_identifier.clone(),
      IssueRef::Name { resource_name } => parse_resource_name(resource_name)
        .map(|(project, local_id)| local_key(&project, local_id))
        .unwrap_or_else(|| resource_name.clone()),
    }
  }

  /// Whether this references an issue tracked by an external system.
  pub fn is_federated(&self) -> bool {
    matches!(self, IssueRef::Federated { .. })
  }

  /// Parse a user-entered reference: `proj:123`, `b/123456`, or a v3
  /// resource name.
  pub fn parse(input: &str) -> Option<IssueRef> {
    let input = input.trim();
    if is_shortlink(input) {
      return Some(IssueRef::Federated {
        ext_identifier: input.to_string(),
      });
    }
    if let Some((project, local_id)) = parse_resource_name(input) {
      return Some(IssueRef::Local { project, local_id });
    }
    let (project, id) = input.split_once(':')?;
    let local_id = id.parse().ok()?;
    Some(IssueRef::Local {
      project: project.to_string(),
      local_id,
    })
  }
}

fn local_key(project: &str, local_id: u32) -> String {
  format!("{}:{}", project.to_lowercase(), local_id)
}

/// Parse a v3 resource name like `projects/chromium/issues/123`.
fn parse_resource_name(name: &str) -> Option<(String, u32)> {
  let mut parts = name.split('/');
  match (parts.next(), parts.next(), parts.next(), parts.next()) {
    (Some("projects"), Some(project), Some("issues"), Some(id)) if parts.next().is_none() => {
      Some((project.to_string(), id.parse().ok()?))
    }
    _ => None,
  }
}

/// Whether a string is a valid federated shortlink (e.g. `b/123456`).
pub fn is_shortlink(s: &str) -> bool {
  match s.split_once('/') {
    Some(("b", digits)) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
    _ => false,
  }
}

/// A reference to a user account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserRef {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub display_name: Option<String>,
}

impl UserRef {
  pub fn from_display_name(name: impl Into<String>) -> Self {
    UserRef {
      user_id: None,
      display_name: Some(name.into()),
    }
  }

  /// Canonical key: lowercased display name, falling back to the user id.
  pub fn key(&self) -> String {
    if let Some(name) = &self.display_name {
      return name.to_lowercase();
    }
    self.user_id.clone().unwrap_or_default()
  }
}

/// A reference to a hotlist, addressed by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotlistRef {
  pub owner: UserRef,
  pub name: String,
}

impl HotlistRef {
  pub fn key(&self) -> String {
    format!("{}:{}", self.owner.key(), self.name)
  }
}
