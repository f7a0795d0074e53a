use std::{collections::HashMap, sync::Arc};

use comms::viewport::Viewport;
use tokio::sync::Mutex;
use tracing::debug;

use crate::identity::{IdentityKind, RoomIdentity, RoomIdentityMap};

use super::room::{RoomSnapshot, RoomState};

/// A snapshot of a changed room, along with both names it has to be delivered to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSnapshot {
    pub identity: RoomIdentity,
    pub snapshot: RoomSnapshot,
}

#[derive(Debug)]
/// [RoomManager] owns the state of every non-empty room.
///
/// Rooms are keyed by their canonical id, read-only ids are translated at the boundary through
/// the shared [RoomIdentityMap]. A room is created on the first join and removed once its last
/// participant leaves. All operations take the single registry lock, which makes them atomic
/// with respect to each other and to the state broadcaster.
pub struct RoomManager {
    identities: Arc<RoomIdentityMap>,
    rooms: Mutex<HashMap<String, RoomState>>,
    show_smallest_viewport: bool,
}

impl RoomManager {
    pub fn new(identities: Arc<RoomIdentityMap>, show_smallest_viewport: bool) -> Self {
        RoomManager {
            identities,
            rooms: Mutex::new(HashMap::new()),
            show_smallest_viewport,
        }
    }

    /// Joins a connection to a room given either of its ids, creating the room if needed.
    /// Also tells which of the two ids `room_id` was.
    /// A missing or zero-sized viewport is recorded as unreported, not as a 1000x1000 default.
    pub async fn join(
        &self,
        connection_id: &str,
        room_id: &str,
        viewport: Option<Viewport>,
    ) -> (RoomIdentity, IdentityKind) {
        let (identity, kind) = self.identities.resolve(room_id);
        let viewport = viewport.filter(Viewport::is_valid);

        let mut rooms = self.rooms.lock().await;
        rooms
            .entry(identity.canonical.clone())
            .or_insert_with(|| {
                debug!(room = %identity.canonical, "room created");
                RoomState::new(identity.clone())
            })
            .join(connection_id, viewport);

        (identity, kind)
    }

    /// Updates the viewport of a joined connection.
    /// Returns false when there is no such room or connection, which callers treat as a stale update.
    pub async fn set_viewport(&self, connection_id: &str, room_id: &str, viewport: Viewport) -> bool {
        if !viewport.is_valid() {
            return false;
        }

        let canonical = self.identities.canonical_of(room_id);
        let mut rooms = self.rooms.lock().await;

        rooms
            .get_mut(&canonical)
            .map(|room| room.set_viewport(connection_id, viewport))
            .unwrap_or(false)
    }

    /// Removes a connection from a room, dropping the room once it is empty.
    /// Returns false if the connection was not part of the room.
    pub async fn leave(&self, connection_id: &str, room_id: &str) -> bool {
        let canonical = self.identities.canonical_of(room_id);
        let mut rooms = self.rooms.lock().await;

        let Some(room) = rooms.get_mut(&canonical) else {
            return false;
        };

        let left = room.leave(connection_id);

        if !room.has_participants() {
            rooms.remove(&canonical);
            debug!(room = %canonical, "room removed");
        }

        left
    }

    pub async fn snapshot(&self, room_id: &str) -> Option<RoomSnapshot> {
        let canonical = self.identities.canonical_of(room_id);

        self.rooms
            .lock()
            .await
            .get(&canonical)
            .map(|room| room.snapshot(self.show_smallest_viewport))
    }

    /// Number of connections in a room, `None` if the room has no state
    pub async fn participant_count(&self, room_id: &str) -> Option<usize> {
        self.snapshot(room_id)
            .await
            .map(|snapshot| snapshot.participants)
    }

    /// Snapshots every room that changed since the previous call and marks them clean.
    /// Rooms without pending changes are skipped.
    pub async fn take_pending_snapshots(&self) -> Vec<PendingSnapshot> {
        self.rooms
            .lock()
            .await
            .values_mut()
            .filter_map(|room| {
                room.take_pending(self.show_smallest_viewport)
                    .map(|snapshot| PendingSnapshot {
                        identity: room.identity().clone(),
                        snapshot,
                    })
            })
            .collect()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }
}
