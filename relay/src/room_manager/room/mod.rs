mod room_state;
mod viewport_registry;

pub use self::room_state::{RoomSnapshot, RoomState};
