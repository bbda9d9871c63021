//! Fetch orchestrators.
//!
//! A [`Client`] owns the store and the RPC transport. Every orchestrator
//! follows the same shape: apply a start message, call the transport,
//! apply a success or failure message. Failures are absorbed into request
//! state — an orchestrator never returns an error to its caller. The store
//! lock is only ever taken between awaits, never across one.

mod hotlist;
mod issue;
mod project;
mod user;

pub use issue::{ApprovalDelta, IssueListParams};

use std::sync::{Mutex, MutexGuard};

use crate::rpc::RpcTransport;
use crate::store::{Message, Store};

pub struct Client<T: RpcTransport> {
  transport: T,
  store: Mutex<Store>,
}

impl<T: RpcTransport> Client<T> {
  pub fn new(transport: T) -> Self {
    Client {
      transport,
      store: Mutex::new(Store::new()),
    }
  }

  /// Read access to the container. The lock is uncontended except while a
  /// message is being applied; callers should not hold it across awaits.
  pub fn store(&self) -> MutexGuard<'_, Store> {
    self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  pub(crate) fn transport(&self) -> &T {
    &self.transport
  }

  pub(crate) fn apply(&self, msg: Message) {
    self.store().apply(msg);
  }
}

#[cfg(test)]
pub(crate) mod testing {
  use std::collections::{HashMap, VecDeque};
  use std::sync::Mutex;
  use std::time::Duration;

  use serde_json::Value;

  use crate::rpc::{RpcError, RpcTransport};

  /// Scripted transport: responses are queued per method and popped in call
  /// order, each after an optional virtual delay (tests run with the tokio
  /// clock paused, so delays are deterministic).
  #[derive(Default)]
  pub struct MockTransport {
    responses: Mutex<HashMap<String, VecDeque<(u64, Result<Value, RpcError>)>>>,
  }

  impl MockTransport {
    pub fn new() -> Self {
      Self::default()
    }

    pub fn push(&self, method: &str, response: Result<Value, RpcError>) {
      self.push_delayed(method, 0, response);
    }

    pub fn push_delayed(&self, method: &str, delay_ms: u64, response: Result<Value, RpcError>) {
      self
        .responses
        .lock()
        .unwrap()
        .entry(method.to_string())
        .or_default()
        .push_back((delay_ms, response));
    }
  }

  impl RpcTransport for MockTransport {
    async fn call(
      &self,
      _service: &str,
      method: &str,
      _request: Value,
    ) -> Result<Value, RpcError> {
      let next = self
        .responses
        .lock()
        .unwrap()
        .get_mut(method)
        .and_then(|queue| queue.pop_front());
      match next {
        Some((delay_ms, response)) => {
          if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
          }
          response
        }
        None => Err(RpcError::Transport(format!(
          "no scripted response for {method}"
        ))),
      }
    }
  }
}
