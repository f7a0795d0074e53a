use std::collections::HashMap;

use comms::viewport::Viewport;

/// [ViewportRegistry] keeps track of which connections are joined to a room and the viewport each reported
///
/// A connection may be joined without having reported a viewport yet, so it only counts towards participants
#[derive(Debug, Default)]
pub struct ViewportRegistry {
    viewport_by_connection: HashMap<String, Option<Viewport>>,
}

impl ViewportRegistry {
    pub fn new() -> Self {
        ViewportRegistry::default()
    }

    /// Add a connection to the room, returns true if the connection is new
    /// An already joined connection only gets its viewport replaced
    pub fn insert(&mut self, connection_id: &str, viewport: Option<Viewport>) -> bool {
        self.viewport_by_connection
            .insert(String::from(connection_id), viewport)
            .is_none()
    }

    /// Replace the viewport of a joined connection, returns false if the connection is not joined
    pub fn update(&mut self, connection_id: &str, viewport: Viewport) -> bool {
        match self.viewport_by_connection.get_mut(connection_id) {
            Some(current) => {
                *current = Some(viewport);
                true
            }
            None => false,
        }
    }

    /// Removes a connection, returns false if it was not joined
    pub fn remove(&mut self, connection_id: &str) -> bool {
        self.viewport_by_connection.remove(connection_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.viewport_by_connection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.viewport_by_connection.is_empty()
    }

    /// Componentwise minimum over the connections that reported a viewport
    pub fn smallest(&self) -> Option<Viewport> {
        self.viewport_by_connection
            .values()
            .flatten()
            .copied()
            .reduce(Viewport::min)
    }
}
