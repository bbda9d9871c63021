//! Derived views: pure projections joining cache slices.
//!
//! Each projection is memoized on the version counters of the slices it
//! reads. While no input version changes, repeated calls return the same
//! `Arc`, so the presentational layer can skip re-rendering on pointer
//! equality alone.

use std::collections::HashMap;
use std::sync::Arc;

use crate::refs::IssueRef;
use crate::store::Store;
use crate::types::{FieldDef, FieldType, HotlistItem, Issue};

/// One memoized value, keyed by a stamp of input slice versions.
#[derive(Debug)]
pub struct Memo<T> {
  stamp: Vec<u64>,
  value: Option<Arc<T>>,
}

impl<T> Default for Memo<T> {
  fn default() -> Self {
    Memo {
      stamp: Vec::new(),
      value: None,
    }
  }
}

impl<T> Memo<T> {
  /// Return the cached value when the stamp matches, recompute otherwise.
  pub fn get(&mut self, stamp: &[u64], compute: impl FnOnce() -> T) -> Arc<T> {
    if let Some(value) = &self.value {
      if self.stamp == stamp {
        return Arc::clone(value);
      }
    }
    let value = Arc::new(compute());
    self.stamp = stamp.to_vec();
    self.value = Some(Arc::clone(&value));
    value
  }
}

/// A hotlist item joined with the cached data of its issue.
#[derive(Debug, Clone, PartialEq)]
pub struct HotlistItemView {
  pub item: HotlistItem,
  pub issue: Issue,
}

/// Memoization state for every derived view. Owned by the presentational
/// caller next to the store; reads the store, never writes it.
#[derive(Debug, Default)]
pub struct Views {
  blocked_on: Memo<Vec<Issue>>,
  blocking: Memo<Vec<Issue>>,
  sorted_blocked_on: Memo<Vec<Issue>>,
  merged_into: Memo<Option<Issue>>,
  field_value_map: Memo<HashMap<String, Vec<String>>>,
  applicable_field_defs: Memo<Vec<FieldDef>>,
  hotlist_items: HashMap<String, Memo<Vec<HotlistItemView>>>,
}

/// Resolve one ref against the related-issue index, degrading to a
/// ref-only issue when nothing is known. Never fails.
fn resolve_ref(store: &Store, iref: &IssueRef) -> Issue {
  match store.issue.related(&iref.key()) {
    Some(found) => found.clone(),
    None => Issue::from_ref(iref),
  }
}

/// Dangling refs first, then the resolved ref list, each in original order,
/// every entry substituted with related-issue data where available.
fn resolve_ref_lists(
  store: &Store,
  dangling: Option<&Vec<IssueRef>>,
  refs: Option<&Vec<IssueRef>>,
) -> Vec<Issue> {
  dangling
    .map(Vec::as_slice)
    .unwrap_or(&[])
    .iter()
    .chain(refs.map(Vec::as_slice).unwrap_or(&[]))
    .map(|iref| resolve_ref(store, iref))
    .collect()
}

impl Views {
  /// The viewed issue's blocked-on issues, related data inlined.
  pub fn blocked_on(&mut self, store: &Store) -> Arc<Vec<Issue>> {
    let stamp = [
      store.issue.viewed_version(),
      store.issue.issues_version(),
      store.issue.related_version(),
    ];
    self.blocked_on.get(&stamp, || {
      let Some(issue) = store.issue.viewed_issue() else {
        return Vec::new();
      };
      resolve_ref_lists(
        store,
        issue.dangling_blocked_on_refs.as_ref(),
        issue.blocked_on_issue_refs.as_ref(),
      )
    })
  }

  /// The viewed issue's blocking issues, related data inlined.
  pub fn blocking(&mut self, store: &Store) -> Arc<Vec<Issue>> {
    let stamp = [
      store.issue.viewed_version(),
      store.issue.issues_version(),
      store.issue.related_version(),
    ];
    self.blocking.get(&stamp, || {
      let Some(issue) = store.issue.viewed_issue() else {
        return Vec::new();
      };
      resolve_ref_lists(
        store,
        issue.dangling_blocking_refs.as_ref(),
        issue.blocking_issue_refs.as_ref(),
      )
    })
  }

  /// Blocked-on issues, open before closed. A stable partition: relative
  /// order within each status group is untouched.
  pub fn sorted_blocked_on(&mut self, store: &Store) -> Arc<Vec<Issue>> {
    let blocked_on = self.blocked_on(store);
    let stamp = [
      store.issue.viewed_version(),
      store.issue.issues_version(),
      store.issue.related_version(),
    ];
    self.sorted_blocked_on.get(&stamp, || {
      let (open, closed): (Vec<Issue>, Vec<Issue>) =
        blocked_on.iter().cloned().partition(Issue::is_open);
      let mut sorted = open;
      sorted.extend(closed);
      sorted
    })
  }

  /// The issue this one was merged into, resolved like a blocked-on ref.
  pub fn merged_into(&mut self, store: &Store) -> Arc<Option<Issue>> {
    let stamp = [
      store.issue.viewed_version(),
      store.issue.issues_version(),
      store.issue.related_version(),
    ];
    self.merged_into.get(&stamp, || {
      let issue = store.issue.viewed_issue()?;
      let iref = issue.merged_into_issue_ref.as_ref()?;
      Some(resolve_ref(store, iref))
    })
  }

  /// The viewed issue's field values as a multi-map: lowercased field name
  /// to values in insertion order.
  pub fn field_value_map(&mut self, store: &Store) -> Arc<HashMap<String, Vec<String>>> {
    let stamp = [store.issue.viewed_version(), store.issue.issues_version()];
    self.field_value_map.get(&stamp, || {
      let mut map: HashMap<String, Vec<String>> = HashMap::new();
      let Some(issue) = store.issue.viewed_issue() else {
        return map;
      };
      for fv in issue.field_values.as_deref().unwrap_or(&[]) {
        map
          .entry(fv.field_ref.field_name.to_lowercase())
          .or_default()
          .push(fv.value.clone());
      }
      map
    })
  }

  /// The project field definitions applicable to the viewed issue: fields
  /// with a value always count; approval and phase fields never do; fields
  /// scoped to another issue type are excluded.
  pub fn applicable_field_defs(&mut self, store: &Store) -> Arc<Vec<FieldDef>> {
    let value_map = self.field_value_map(store);
    let stamp = [
      store.issue.viewed_version(),
      store.issue.issues_version(),
      store.project.version(),
    ];
    self.applicable_field_defs.get(&stamp, || {
      let Some(issue) = store.issue.viewed_issue() else {
        return Vec::new();
      };
      let project = issue.project.clone().unwrap_or_default();
      let issue_type = issue.issue_type().map(str::to_lowercase);

      store
        .project
        .field_defs(&project)
        .iter()
        .filter(|fd| {
          if value_map.contains_key(&fd.field_ref.field_name.to_lowercase()) {
            return true;
          }
          if fd.field_ref.field_type == FieldType::ApprovalType || fd.is_phase_field {
            return false;
          }
          if !fd.applicable_type.is_empty() {
            return issue_type.as_deref() == Some(fd.applicable_type.to_lowercase().as_str());
          }
          true
        })
        .cloned()
        .collect()
    })
  }

  /// A hotlist's items with the cached issue data inlined, in rank order as
  /// stored. Unknown issues degrade to ref-only records.
  pub fn hotlist_items(&mut self, store: &Store, hotlist_key: &str) -> Arc<Vec<HotlistItemView>> {
    let stamp = [
      store.hotlist.items_version(),
      store.issue.issues_version(),
    ];
    let memo = self.hotlist_items.entry(hotlist_key.to_string()).or_default();
    memo.get(&stamp, || {
      store
        .hotlist
        .items(hotlist_key)
        .iter()
        .map(|item| {
          let key = item.issue_ref.key();
          let issue = store
            .issue
            .issue(&key)
            .cloned()
            .unwrap_or_else(|| Issue::from_ref(&item.issue_ref));
          HotlistItemView {
            item: item.clone(),
            issue,
          }
        })
        .collect()
    })
  }
}
