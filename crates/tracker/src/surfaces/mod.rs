//! Render surfaces.
//!
//! Both surfaces are pure derivations over the shared stores: subscribe to
//! the [`EventBus`](crate::events::EventBus), re-derive on every event and
//! every clock tick, own nothing. That is the whole mechanism keeping the
//! header timer and the board's play/stop buttons in agreement about which
//! estimate is running.

pub mod board;
pub mod header;

pub use board::{board_rows, BoardRow};
pub use header::{header_snapshot, HeaderSnapshot};
