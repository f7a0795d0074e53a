pub use self::room::RoomSnapshot;
pub use self::room_manager::{PendingSnapshot, RoomManager};

mod room;
#[allow(clippy::module_inception)]
mod room_manager;
