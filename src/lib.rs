//! Client-side data layer for an issue tracker.
//!
//! Partial, overlapping results from many independent RPC calls are merged
//! into one normalized, queryable view of the issue/hotlist/user graph:
//!
//! - [`store`] — the central state container: per-entity cache slices
//!   mutated only through [`store::Message`] transitions, plus per-key
//!   request lifecycle tracking.
//! - [`refs`] — canonical string keys for every reference encoding an
//!   entity can arrive under.
//! - [`views`] — memoized projections joining slices (blocked-on issues
//!   with related data inlined, field value maps, hotlist items with
//!   issues).
//! - [`fetch`] — async orchestrators that call the RPC transport, normalize
//!   responses into messages, and fan out bounded parallel calls for list
//!   fetches.
//!
//! The cache is in-memory only and lives for the session; nothing is
//! persisted or evicted.

pub mod api_types;
pub mod config;
pub mod fetch;
pub mod refs;
pub mod rpc;
pub mod store;
pub mod types;
pub mod views;

pub use fetch::{ApprovalDelta, Client, IssueListParams};
pub use refs::{HotlistRef, IssueRef, UserRef};
pub use rpc::{HttpTransport, RpcError, RpcTransport};
pub use store::{Message, Store};
pub use views::Views;
