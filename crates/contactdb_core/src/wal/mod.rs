//! Write-Ahead Log (WAL) for durability and crash recovery.
//!
//! Every mutation is appended to the WAL and synced before it touches
//! memory. Once a snapshot that covers the logged entries is durable, the
//! WAL is truncated to zero. On open, whatever is still in the WAL is
//! replayed on top of the snapshot.
//!
//! ## Line Format
//!
//! One JSON object per `\n`-terminated line:
//!
//! ```text
//! {"op":"add","data":{"id":1,"name":"Ann","phone_number":"111","remark":""}}
//! {"op":"delete","data":{"id":1,"name":"Ann"}}
//! {"op":"edit","data":{"id":2,"name":"Bo","new_name":"Bob","new_phone":null,"new_remark":null}}
//! ```
//!
//! ## Recovery Policy
//!
//! - **Torn tail**: a final line without a newline is an append that never
//!   completed; it is discarded and reported in [`WalContents::torn_bytes`]
//! - **Blank lines** are skipped
//! - **Undecodable complete line**: fatal [`WalCorruption`], the engine
//!   does not open
//!
//! ## Invariants
//!
//! - WAL is **append-only** between truncations
//! - WAL is **synced before the mutation is applied**
//! - Replay is **idempotent**, keyed by record id
//!
//! [`WalCorruption`]: crate::CoreError::WalCorruption

mod entry;
mod writer;

pub use entry::WalEntry;
pub use writer::{WalContents, WalManager};
