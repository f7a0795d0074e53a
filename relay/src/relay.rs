use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use comms::{
    event::{self, Event},
    viewport::Viewport,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    access::AccessGate,
    config::RelayConfig,
    error::{RelayError, RelayResult},
    hub::ChannelHub,
    identity::{IdentityKind, RoomIdentity, RoomIdentityMap},
    room_manager::RoomManager,
    sanitize::Sanitizer,
    store::{EventStore, MemoryEventStore},
    uploads,
};

/// A connection's membership in a room, handed out by [Relay::join]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRoom {
    identity: RoomIdentity,
    kind: IdentityKind,
}

impl JoinedRoom {
    pub fn identity(&self) -> &RoomIdentity {
        &self.identity
    }

    pub fn is_read_only(&self) -> bool {
        self.kind == IdentityKind::ReadOnly
    }

    /// The identifier the connection joined with, which is also the channel it listens on
    pub fn joined_id(&self) -> &str {
        match self.kind {
            IdentityKind::Canonical => &self.identity.canonical,
            IdentityKind::ReadOnly => &self.identity.read_only,
        }
    }
}

/// [Relay] ties the access gate, the identity map, the room registry, the sanitizer and the channel hub together.
///
/// It is shared by every connection task and the state broadcaster, all of its state synchronizes internally.
/// Each method is one transition of a connection's lifecycle or one informational query.
pub struct Relay {
    config: RelayConfig,
    gate: AccessGate,
    identities: Arc<RoomIdentityMap>,
    rooms: RoomManager,
    hub: ChannelHub,
    sanitizer: Sanitizer,
    store: Arc<dyn EventStore>,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        Relay::with_store(config, Arc::new(MemoryEventStore::new()))
    }

    pub fn with_store(config: RelayConfig, store: Arc<dyn EventStore>) -> Self {
        let identities = Arc::new(RoomIdentityMap::new());

        Relay {
            gate: AccessGate::new(config.access_token.clone()),
            rooms: RoomManager::new(identities.clone(), config.show_smallest_viewport),
            identities,
            hub: ChannelHub::new(),
            sanitizer: Sanitizer::new(),
            store,
            config,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn hub(&self) -> &ChannelHub {
        &self.hub
    }

    pub fn identities(&self) -> &RoomIdentityMap {
        &self.identities
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }

    pub fn check_access(&self, token: Option<&str>) -> RelayResult<()> {
        self.gate.check(token)
    }

    /// Joins a connection to a room through either of its identifiers.
    /// Nothing is recorded when the token is rejected.
    pub async fn join(
        &self,
        connection_id: &str,
        room_id: &str,
        token: Option<&str>,
        viewport: Option<Viewport>,
    ) -> RelayResult<JoinedRoom> {
        self.gate.check(token)?;

        let (identity, kind) = self.rooms.join(connection_id, room_id, viewport).await;

        info!(
            connection = connection_id,
            room = %identity.canonical,
            read_only = kind == IdentityKind::ReadOnly,
            "connection joined room"
        );

        Ok(JoinedRoom { identity, kind })
    }

    /// Reply for a freshly joined connection
    pub fn room_config(&self, joined: &JoinedRoom) -> Event {
        Event::RoomConfig(event::RoomConfigReplyEvent {
            common: self.config.client_config(),
            read_only_id: joined.identity.read_only.clone(),
            is_read_only: joined.is_read_only(),
        })
    }

    /// Relays a drawing event from a joined connection to every other member of the room,
    /// on both of its channels, and hands it to the store.
    pub fn relay_event(
        &self,
        connection_id: &str,
        joined: &JoinedRoom,
        token: Option<&str>,
        content: Value,
    ) -> RelayResult<()> {
        if joined.is_read_only() {
            return Err(RelayError::ReadOnlyRoom(joined.identity.read_only.clone()));
        }

        self.gate.check(token)?;

        self.fan_out(&joined.identity, content, Some(connection_id))
    }

    /// Relays a drawing event that did not come from a room member, every member of the room receives it
    pub fn draw_from_server(&self, room_id: &str, token: Option<&str>, content: Value) -> RelayResult<()> {
        if self.identities.classify(room_id) == IdentityKind::ReadOnly {
            return Err(RelayError::ReadOnlyRoom(String::from(room_id)));
        }

        self.gate.check(token)?;

        let (identity, _) = self.identities.resolve(room_id);

        self.fan_out(&identity, content, None)
    }

    fn fan_out(&self, identity: &RoomIdentity, content: Value, exclude: Option<&str>) -> RelayResult<()> {
        let content = self.sanitizer.sanitize_event(content)?;

        self.store.apply(&identity.canonical, &content);

        let event = Arc::new(Event::Draw(event::DrawBroadcastEvent { content }));
        self.hub.publish(&identity.canonical, event.clone(), exclude);
        self.hub.publish(&identity.read_only, event, exclude);

        Ok(())
    }

    /// Records a new viewport, it reaches other members with the next state broadcast
    pub async fn update_viewport(
        &self,
        connection_id: &str,
        joined: &JoinedRoom,
        token: Option<&str>,
        viewport: Viewport,
    ) -> RelayResult<()> {
        self.gate.check(token)?;

        if !self
            .rooms
            .set_viewport(connection_id, joined.joined_id(), viewport)
            .await
        {
            debug!(connection = connection_id, "ignored stale viewport update");
        }

        Ok(())
    }

    /// Removes a connection from its room and tells the remaining members to refresh their indicators
    pub async fn leave(&self, connection_id: &str, joined: &JoinedRoom) {
        let left = self.rooms.leave(connection_id, joined.joined_id()).await;

        // the leaving connection no longer listens, its channel may be unused now
        self.hub.release(joined.joined_id());

        if !left {
            return;
        }

        info!(connection = connection_id, room = %joined.identity.canonical, "connection left room");

        let event = Arc::new(Event::RefreshParticipants);
        self.hub
            .publish(&joined.identity.canonical, event.clone(), Some(connection_id));
        self.hub
            .publish(&joined.identity.read_only, event, Some(connection_id));
    }

    /// Number of connections in a room given either identifier, `None` for a room without state
    pub async fn participant_count(&self, room_id: &str) -> Option<usize> {
        self.rooms.participant_count(room_id).await
    }

    /// Stored drawing history of a room given either identifier
    pub fn load_room(&self, room_id: &str, token: Option<&str>) -> RelayResult<Vec<Value>> {
        self.gate.check(token)?;

        Ok(self.store.load(&self.identities.canonical_of(room_id)))
    }

    pub fn read_only_id(&self, room_id: &str, token: Option<&str>) -> RelayResult<String> {
        self.gate.check(token)?;

        Ok(self.identities.resolve_read_only(room_id))
    }

    /// Stores an uploaded image in the room's upload folder, returns the file name
    pub async fn upload_image(
        &self,
        room_id: &str,
        token: Option<&str>,
        date: Option<&str>,
        image_data: &str,
    ) -> RelayResult<String> {
        self.gate.check(token)?;

        if self.identities.classify(room_id) == IdentityKind::ReadOnly {
            return Err(RelayError::ReadOnlyRoom(String::from(room_id)));
        }

        let read_only_id = self.identities.resolve_read_only(room_id);
        let date = match date {
            Some(date) => String::from(date),
            None => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis()
                .to_string(),
        };

        let file_name =
            uploads::store_image(&self.config.upload_dir, &read_only_id, &date, image_data).await?;

        info!(file = %file_name, "image uploaded");

        Ok(file_name)
    }
}
