//! Persistence for study resources and the per-user vote ledger.
//!
//! `ResourceStore` is the single seam. `PgStore` backs production with
//! Postgres; `MemoryStore` keeps everything in process for tests and local
//! runs. Ranking and search rules live in their own modules so both stores
//! order and filter identically.

pub mod ledger;
pub mod memory;
pub mod pg;
pub mod ranking;
pub mod search;
pub mod store;

pub use ledger::{MarkKind, VoteLedger};
pub use memory::MemoryStore;
pub use pg::PgStore;
pub use search::SearchQuery;
pub use store::ResourceStore;
