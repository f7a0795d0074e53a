//! Real-time collaborative room relay.
//!
//! Clients attach to a named room, exchange drawing events and receive periodic room info
//! (participant count, smallest viewport). Every room is reachable through its canonical id
//! and a generated read-only id that only allows watching.

pub mod access;
pub mod broadcaster;
pub mod config;
pub mod error;
pub mod hub;
pub mod identity;
pub mod relay;
pub mod room_manager;
pub mod sanitize;
pub mod session;
pub mod store;
pub mod uploads;

pub use self::config::RelayConfig;
pub use self::error::{RelayError, RelayResult};
pub use self::relay::{JoinedRoom, Relay};
