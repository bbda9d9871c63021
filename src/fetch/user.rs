//! User lookup orchestrators.

use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::warn;

use super::Client;
use crate::api_types::ListReferencedUsersResponse;
use crate::refs::UserRef;
use crate::rpc::{decode, services, RpcTransport};
use crate::store::Message;
use crate::types::Issue;

/// Request-tracker key for one user batch: the same set of users in any
/// order tracks as one request.
pub fn batch_key(refs: &[UserRef]) -> String {
  let mut keys: Vec<String> = refs.iter().map(UserRef::key).collect();
  keys.sort();
  keys.dedup();

  let mut hasher = Sha256::new();
  for key in &keys {
    hasher.update(key.as_bytes());
    hasher.update(b"\n");
  }
  hex::encode(hasher.finalize())
}

impl<T: RpcTransport> Client<T> {
  /// Batch-resolve every user an issue references.
  pub async fn fetch_referenced_users(&self, issue: &Issue) {
    let mut refs: Vec<UserRef> = Vec::new();
    if let Some(owner) = &issue.owner_ref {
      refs.push(owner.clone());
    }
    if let Some(reporter) = &issue.reporter_ref {
      refs.push(reporter.clone());
    }
    refs.extend(issue.cc_refs.clone().unwrap_or_default());
    self.batch_get_users(&refs).await;
  }

  pub async fn batch_get_users(&self, refs: &[UserRef]) {
    if refs.is_empty() {
      return;
    }
    let key = batch_key(refs);
    self.apply(Message::BatchGetUsersStart {
      batch_key: key.clone(),
    });

    let result = self
      .transport()
      .call(
        services::USERS,
        "ListReferencedUsers",
        json!({ "userRefs": refs }),
      )
      .await
      .and_then(|v| decode::<ListReferencedUsersResponse>("ListReferencedUsers", v));

    match result {
      Ok(resp) => self.apply(Message::BatchGetUsersSuccess {
        batch_key: key,
        users: resp.users,
      }),
      Err(error) => {
        warn!(%error, "user batch lookup failed");
        self.apply(Message::BatchGetUsersFailure {
          batch_key: key,
          error,
        });
      }
    }
  }
}
