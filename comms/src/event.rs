use serde::{Deserialize, Serialize};

use crate::viewport::Viewport;

/// Configuration shared by every room, handed to a client when it joins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Whether room info updates carry the smallest viewport of the room
    #[serde(rename = "ssv")]
    pub show_smallest_viewport: bool,
    /// How many room info updates per second the relay sends at most
    #[serde(rename = "bf")]
    pub broadcast_freq: f64,
}

/// Reply to a successful join with the effective configuration of the room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfigReplyEvent {
    #[serde(rename = "cc")]
    pub common: ClientConfig,
    /// The read-only id paired with the joined room
    #[serde(rename = "ro")]
    pub read_only_id: String,
    /// Whether the connection joined through the read-only id
    #[serde(rename = "iro")]
    pub is_read_only: bool,
}

/// A sanitized drawing event relayed from another participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawBroadcastEvent {
    #[serde(rename = "c")]
    pub content: serde_json::Value,
}

/// Coalesced snapshot of a room's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomInfoBroadcastEvent {
    /// Number of connections currently joined to the room
    #[serde(rename = "n")]
    pub participants: usize,
    /// Componentwise minimum of the reported viewports, when enabled and known
    #[serde(rename = "sv", default, skip_serializing_if = "Option::is_none")]
    pub smallest_viewport: Option<Viewport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomHistoryReplyEvent {
    #[serde(rename = "r")]
    pub room: String,
    #[serde(rename = "h")]
    pub history: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadOnlyIdReplyEvent {
    #[serde(rename = "r")]
    pub room: String,
    #[serde(rename = "ro")]
    pub read_only_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadCompleteReplyEvent {
    /// Name of the stored file, relative to the room's upload folder
    #[serde(rename = "f")]
    pub file_name: String,
}

/// A command could not be carried out, only the sender is told
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReplyEvent {
    #[serde(rename = "m")]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
/// Events that can be sent to the client
/// Events maybe replies to the connection's own commands or broadcasts from its room
pub enum Event {
    RoomConfig(RoomConfigReplyEvent),
    AccessDenied,
    Draw(DrawBroadcastEvent),
    RoomInfo(RoomInfoBroadcastEvent),
    RefreshParticipants,
    RoomHistory(RoomHistoryReplyEvent),
    ReadOnlyId(ReadOnlyIdReplyEvent),
    UploadComplete(UploadCompleteReplyEvent),
    Error(ErrorReplyEvent),
}
