use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;

/// Tool of the event that wipes a room's history
const CLEAR_TOOL: &str = "clear";
/// Tools that are relayed but never persisted
const TRANSIENT_TOOLS: [&str; 1] = ["cursor"];

/// Persistence of the drawing history of rooms. The relay does not interpret drawing
/// semantics, it only hands every relayed event over and asks for the history on load.
pub trait EventStore: Send + Sync {
    /// History of a room, keyed by its canonical id
    fn load(&self, room: &str) -> Vec<Value>;

    fn apply(&self, room: &str, event: &Value);
}

/// [MemoryEventStore] keeps histories in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    history_by_room: Mutex<HashMap<String, Vec<Value>>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        MemoryEventStore::default()
    }
}

impl EventStore for MemoryEventStore {
    fn load(&self, room: &str) -> Vec<Value> {
        self.history_by_room
            .lock()
            .get(room)
            .cloned()
            .unwrap_or_default()
    }

    fn apply(&self, room: &str, event: &Value) {
        let tool = event.get("t").and_then(Value::as_str);
        let mut history_by_room = self.history_by_room.lock();

        match tool {
            Some(CLEAR_TOOL) => {
                history_by_room.remove(room);
            }
            Some(tool) if TRANSIENT_TOOLS.contains(&tool) => {}
            _ => history_by_room
                .entry(String::from(room))
                .or_default()
                .push(event.clone()),
        }
    }
}
