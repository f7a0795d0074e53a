use std::sync::Arc;

use anyhow::Context;
use comms::{
    command::{JoinRoomCommand, UserCommand},
    event::{self, Event},
};
use tokio::{
    sync::mpsc,
    task::{AbortHandle, JoinSet},
};
use tracing::{debug, warn};

use crate::{
    error::RelayError,
    hub::forward_channel,
    relay::{JoinedRoom, Relay},
};

const OUTBOUND_CAPACITY: usize = 100;

/// [RelaySession] is the state of a single connection: `Unjoined` while `joined` is empty,
/// `Joined` while it holds a room. Leaving takes the room out, so it happens at most once.
pub struct RelaySession {
    connection_id: String,
    relay: Arc<Relay>,
    joined: Option<(JoinedRoom, AbortHandle)>,
    join_set: JoinSet<()>,
    mpsc_tx: mpsc::Sender<Arc<Event>>,
    mpsc_rx: mpsc::Receiver<Arc<Event>>,
}

impl RelaySession {
    pub fn new(connection_id: &str, relay: Arc<Relay>) -> Self {
        let (mpsc_tx, mpsc_rx) = mpsc::channel(OUTBOUND_CAPACITY);

        RelaySession {
            connection_id: String::from(connection_id),
            relay,
            joined: None,
            join_set: JoinSet::new(),
            mpsc_tx,
            mpsc_rx,
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn joined_room(&self) -> Option<&JoinedRoom> {
        self.joined.as_ref().map(|(joined, _)| joined)
    }

    /// Handle a single command of this connection. Failures are reported back to the connection only.
    pub async fn handle_user_command(&mut self, cmd: UserCommand) {
        match cmd {
            UserCommand::JoinRoom(cmd) => self.join_room(cmd).await,
            UserCommand::Draw(cmd) => {
                let Some((joined, _)) = &self.joined else {
                    debug!(connection = %self.connection_id, "draw before join ignored");
                    return;
                };

                match self.relay.relay_event(
                    &self.connection_id,
                    joined,
                    cmd.access_token.as_deref(),
                    cmd.content,
                ) {
                    Ok(()) => {}
                    Err(RelayError::ReadOnlyRoom(_)) => {
                        debug!(connection = %self.connection_id, "draw from read-only connection ignored");
                    }
                    Err(e) => self.report(e),
                }
            }
            UserCommand::DrawToRoom(cmd) => {
                if let Err(e) =
                    self.relay
                        .draw_from_server(&cmd.room, cmd.access_token.as_deref(), cmd.content)
                {
                    self.report(e);
                }
            }
            UserCommand::UpdateViewport(cmd) => {
                let Some((joined, _)) = &self.joined else {
                    return;
                };

                if let Err(e) = self
                    .relay
                    .update_viewport(
                        &self.connection_id,
                        joined,
                        cmd.access_token.as_deref(),
                        cmd.viewport,
                    )
                    .await
                {
                    self.report(e);
                }
            }
            UserCommand::LoadRoom(cmd) => {
                match self.relay.load_room(&cmd.room, cmd.access_token.as_deref()) {
                    Ok(history) => self.reply(Event::RoomHistory(event::RoomHistoryReplyEvent {
                        room: cmd.room,
                        history,
                    })),
                    Err(e) => self.report(e),
                }
            }
            UserCommand::GetReadOnlyId(cmd) => {
                match self.relay.read_only_id(&cmd.room, cmd.access_token.as_deref()) {
                    Ok(read_only_id) => self.reply(Event::ReadOnlyId(event::ReadOnlyIdReplyEvent {
                        room: cmd.room,
                        read_only_id,
                    })),
                    Err(e) => self.report(e),
                }
            }
            UserCommand::UploadImage(cmd) => {
                let result = self
                    .relay
                    .upload_image(
                        &cmd.room,
                        cmd.access_token.as_deref(),
                        cmd.date.as_deref(),
                        &cmd.image_data,
                    )
                    .await;

                match result {
                    Ok(file_name) => {
                        self.reply(Event::UploadComplete(event::UploadCompleteReplyEvent {
                            file_name,
                        }))
                    }
                    Err(e) => self.report(e),
                }
            }
            UserCommand::Quit(_) => self.leave_room().await,
        }
    }

    async fn join_room(&mut self, cmd: JoinRoomCommand) {
        let token = cmd.access_token.as_deref();

        // a rejected join leaves the connection where it was
        if let Err(e) = self.relay.check_access(token) {
            self.report(e);
            return;
        }

        // a connection is in at most one room
        self.leave_room().await;

        // subscribe before joining so the first room info update is not missed
        let broadcast_rx = self.relay.hub().subscribe(&cmd.room);

        let joined = match self
            .relay
            .join(&self.connection_id, &cmd.room, token, cmd.viewport)
            .await
        {
            Ok(joined) => joined,
            Err(e) => {
                drop(broadcast_rx);
                self.relay.hub().release(&cmd.room);
                self.report(e);
                return;
            }
        };

        self.reply(self.relay.room_config(&joined));

        let abort_handle = self.join_set.spawn(forward_channel(
            broadcast_rx,
            self.connection_id.clone(),
            self.mpsc_tx.clone(),
        ));

        self.joined = Some((joined, abort_handle));
    }

    /// Leave the joined room, if any, stop listening to it and notify the remaining members
    pub async fn leave_room(&mut self) {
        if let Some((joined, abort_handle)) = self.joined.take() {
            abort_handle.abort();
            // the forwarder owns the channel receiver, wait until it is dropped
            while self.join_set.join_next().await.is_some() {}

            self.relay.leave(&self.connection_id, &joined).await;
        }
    }

    // Replies never wait on a slow connection
    fn reply(&self, event: Event) {
        if let Err(e) = self.mpsc_tx.try_send(Arc::new(event)) {
            warn!(connection = %self.connection_id, error = %e, "dropped reply");
        }
    }

    fn report(&self, error: RelayError) {
        match error {
            RelayError::AccessDenied => {
                warn!(connection = %self.connection_id, "access denied");
                self.reply(Event::AccessDenied);
            }
            RelayError::MalformedPayload(reason) => {
                warn!(connection = %self.connection_id, %reason, "dropped malformed payload");
            }
            error => self.reply(Event::Error(event::ErrorReplyEvent {
                message: error.to_string(),
            })),
        }
    }

    /// Receive the next event for this connection, either a reply or a broadcast of its room
    pub async fn recv(&mut self) -> anyhow::Result<Arc<Event>> {
        self.mpsc_rx
            .recv()
            .await
            .context("could not recv from the outbound channel")
    }
}
