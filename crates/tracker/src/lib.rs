//! Client-side time-tracking session coordinator.
//!
//! Owns the in-memory truth about "what is being tracked right now"
//! ([`SessionStore`], [`RealizedTimeCache`]), the start/stop state machine
//! ([`SessionController`]), and the reconciliation loop that converges local
//! belief to server truth ([`Reconciler`]). Render surfaces subscribe to the
//! [`EventBus`] and re-derive their view state from the stores on every
//! event. No surface owns state of its own.

pub mod config;
pub mod controller;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod realized;
pub mod reconciler;
pub mod store;
pub mod surfaces;
pub mod ticker;

pub use config::TrackerConfig;
pub use controller::{SessionController, SessionPhase};
pub use coordinator::Coordinator;
pub use error::TrackerError;
pub use events::{EventBus, TrackerEvent};
pub use realized::RealizedTimeCache;
pub use reconciler::Reconciler;
pub use store::SessionStore;
