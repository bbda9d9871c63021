//! Hotlist cache slice: hotlists by canonical key plus per-hotlist item
//! lists. Items hold issue refs; the issues themselves live in the issue
//! slice.

use std::collections::HashMap;

use super::message::Message;
use crate::types::{Hotlist, HotlistItem};

#[derive(Debug, Clone, Default)]
pub struct HotlistState {
  hotlists: HashMap<String, Hotlist>,
  items: HashMap<String, Vec<HotlistItem>>,

  hotlists_version: u64,
  items_version: u64,
}

impl HotlistState {
  pub fn hotlist(&self, key: &str) -> Option<&Hotlist> {
    self.hotlists.get(key)
  }

  pub fn items(&self, hotlist_key: &str) -> &[HotlistItem] {
    self
      .items
      .get(hotlist_key)
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  /// All hotlists currently known to contain the viewed issue, by key.
  pub fn hotlists(&self) -> &HashMap<String, Hotlist> {
    &self.hotlists
  }

  pub fn hotlists_version(&self) -> u64 {
    self.hotlists_version
  }

  pub fn items_version(&self) -> u64 {
    self.items_version
  }

  pub fn apply(&mut self, msg: &Message) {
    match msg {
      Message::FetchHotlistSuccess { hotlist } => {
        self.hotlists.insert(hotlist.entity_key(), hotlist.clone());
        self.hotlists_version += 1;
      }
      Message::FetchIssueHotlistsSuccess { hotlists } => {
        for hotlist in hotlists {
          self.hotlists.insert(hotlist.entity_key(), hotlist.clone());
        }
        self.hotlists_version += 1;
      }
      Message::FetchHotlistItemsSuccess {
        hotlist_key, items, ..
      } => {
        self.items.insert(hotlist_key.clone(), items.clone());
        self.items_version += 1;
      }
      _ => {}
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::refs::{IssueRef, UserRef};

  fn hotlist(owner: &str, name: &str) -> Hotlist {
    Hotlist {
      name: name.to_string(),
      owner_ref: Some(UserRef::from_display_name(owner)),
      ..Hotlist::default()
    }
  }

  #[test]
  fn test_hotlists_keyed_by_owner_and_name() {
    let mut state = HotlistState::default();
    state.apply(&Message::FetchHotlistSuccess {
      hotlist: hotlist("Owner@example.com", "Backlog"),
    });

    assert!(state.hotlist("owner@example.com:Backlog").is_some());
    assert!(state.hotlist("owner@example.com:Other").is_none());
  }

  #[test]
  fn test_items_stored_per_hotlist() {
    let mut state = HotlistState::default();
    let items = vec![HotlistItem {
      issue_ref: IssueRef::Local {
        project: "p".to_string(),
        local_id: 1,
      },
      rank: 0,
      adder_ref: None,
      note: None,
      added_timestamp: None,
    }];
    state.apply(&Message::FetchHotlistItemsSuccess {
      hotlist_key: "o:Backlog".to_string(),
      items: items.clone(),
      issues: Vec::new(),
    });

    assert_eq!(state.items("o:Backlog"), items.as_slice());
    assert!(state.items("o:Other").is_empty());
  }
}
