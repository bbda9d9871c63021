//! The central state container.
//!
//! One `Store` aggregates every cache slice. It is created by the
//! application entry point and passed down explicitly; there is no global
//! instance. All mutation goes through [`Store::apply`] — slices are never
//! written to directly — and each slice keeps version counters so derived
//! views can detect change without comparing contents.

mod hotlist;
mod issue;
mod message;
mod permissions;
mod project;
mod requests;
mod user;

pub use hotlist::HotlistState;
pub use issue::{IssueListState, IssueState};
pub use message::Message;
pub use permissions::PermissionsState;
pub use project::ProjectState;
pub use requests::{KeyedRequests, RequestState, Requests};
pub use user::UserState;

#[derive(Debug, Clone, Default)]
pub struct Store {
  pub issue: IssueState,
  pub hotlist: HotlistState,
  pub user: UserState,
  pub project: ProjectState,
  pub permissions: PermissionsState,
  pub requests: Requests,
}

impl Store {
  pub fn new() -> Store {
    Store::default()
  }

  /// Apply one state-transition message to every slice. A slice that does
  /// not handle the message leaves its state and versions untouched.
  pub fn apply(&mut self, msg: Message) {
    self.issue.apply(&msg);
    self.hotlist.apply(&msg);
    self.user.apply(&msg);
    self.project.apply(&msg);
    self.permissions.apply(&msg);
    self.requests.apply(&msg);
  }

  /// Drop all cached state. Test-only lifecycle hook in spirit; the cache
  /// otherwise lives as long as the session.
  pub fn reset(&mut self) {
    *self = Store::new();
  }
}
