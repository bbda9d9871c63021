//! Per-project configuration mirror. Only the field definitions are kept;
//! the applicable-fields view reads them.

use std::collections::HashMap;

use super::message::Message;
use crate::types::FieldDef;

#[derive(Debug, Clone, Default)]
pub struct ProjectState {
  field_defs: HashMap<String, Vec<FieldDef>>,
  version: u64,
}

impl ProjectState {
  pub fn field_defs(&self, project: &str) -> &[FieldDef] {
    self
      .field_defs
      .get(&project.to_lowercase())
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  pub fn version(&self) -> u64 {
    self.version
  }

  pub fn apply(&mut self, msg: &Message) {
    match msg {
      Message::FetchProjectConfigSuccess {
        project,
        field_defs,
      } => {
        self
          .field_defs
          .insert(project.to_lowercase(), field_defs.clone());
        self.version += 1;
      }
      _ => {}
    }
  }
}
