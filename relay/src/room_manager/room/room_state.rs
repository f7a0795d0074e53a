use comms::{event::RoomInfoBroadcastEvent, viewport::Viewport};

use crate::identity::RoomIdentity;

use super::viewport_registry::ViewportRegistry;

/// Aggregate state of a room at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub participants: usize,
    pub smallest_viewport: Option<Viewport>,
}

impl From<RoomSnapshot> for RoomInfoBroadcastEvent {
    fn from(snapshot: RoomSnapshot) -> Self {
        RoomInfoBroadcastEvent {
            participants: snapshot.participants,
            smallest_viewport: snapshot.smallest_viewport,
        }
    }
}

#[derive(Debug)]
/// [RoomState] is the mutable state of a single room, reachable through both of its identifiers.
/// `dirty` is set by every mutation and only cleared once a snapshot has been taken for broadcast.
pub struct RoomState {
    identity: RoomIdentity,
    viewports: ViewportRegistry,
    dirty: bool,
}

impl RoomState {
    pub fn new(identity: RoomIdentity) -> Self {
        RoomState {
            identity,
            viewports: ViewportRegistry::new(),
            dirty: false,
        }
    }

    pub fn identity(&self) -> &RoomIdentity {
        &self.identity
    }

    pub fn participants(&self) -> usize {
        self.viewports.len()
    }

    pub fn has_participants(&self) -> bool {
        !self.viewports.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn join(&mut self, connection_id: &str, viewport: Option<Viewport>) {
        self.viewports.insert(connection_id, viewport);
        self.dirty = true;
    }

    /// Returns false if the connection is not part of this room
    pub fn set_viewport(&mut self, connection_id: &str, viewport: Viewport) -> bool {
        let updated = self.viewports.update(connection_id, viewport);
        self.dirty |= updated;

        updated
    }

    /// Returns false if the connection is not part of this room
    pub fn leave(&mut self, connection_id: &str) -> bool {
        let removed = self.viewports.remove(connection_id);
        self.dirty |= removed;

        removed
    }

    pub fn snapshot(&self, with_smallest_viewport: bool) -> RoomSnapshot {
        RoomSnapshot {
            participants: self.participants(),
            smallest_viewport: if with_smallest_viewport {
                self.viewports.smallest()
            } else {
                None
            },
        }
    }

    /// Snapshot the room if anything changed since the last call and mark it clean
    pub fn take_pending(&mut self, with_smallest_viewport: bool) -> Option<RoomSnapshot> {
        if !self.dirty {
            return None;
        }

        self.dirty = false;

        Some(self.snapshot(with_smallest_viewport))
    }
}
