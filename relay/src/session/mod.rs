use std::sync::Arc;

use comms::{command::UserCommand, transport};
use nanoid::nanoid;
use tokio::{net::TcpStream, sync::broadcast};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::relay::Relay;

pub use self::relay_session::RelaySession;

mod relay_session;

/// Given a tcp stream and the relay, handles the connection
/// until the client quits, the tcp stream is closed for some reason, or the server shuts down.
/// Whichever happens first, the connection leaves its room exactly once.
pub async fn handle_user_session(
    relay: Arc<Relay>,
    mut quit_rx: broadcast::Receiver<()>,
    stream: TcpStream,
) -> anyhow::Result<()> {
    let connection_id = nanoid!();
    // Split the tcp stream into a command stream and an event writer with better ergonomics
    let (mut commands, mut event_writer) = transport::server::split_tcp_stream(stream);

    let mut session = RelaySession::new(&connection_id, relay);
    debug!(connection = %connection_id, "connection opened");

    let result = loop {
        tokio::select! {
            cmd = commands.next() => match cmd {
                // If the client closes the tcp stream, or sends a quit cmd
                // the room has to be left so other participants are notified about the departure
                None | Some(Ok(UserCommand::Quit(_))) => break Ok(()),
                // Commands of a single connection are handled one by one, in the order they were sent
                Some(Ok(cmd)) => session.handle_user_command(cmd).await,
                // The connection itself broke
                Some(Err(e)) if e.downcast_ref::<std::io::Error>().is_some() => break Err(e),
                // A line we could not parse, the connection stays usable
                Some(Err(e)) => {
                    warn!(connection = %connection_id, error = %e, "ignored unreadable command");
                }
            },
            // Replies and room broadcasts are written to the client
            Ok(event) = session.recv() => {
                if let Err(e) = event_writer.write(&event).await {
                    break Err(e);
                }
            }
            // If the server is shutting down, we still leave the room
            // but do not wait for the client anymore
            Ok(_) = quit_rx.recv() => {
                info!(connection = %connection_id, "closing connection for shutdown");
                break Ok(());
            }
        }
    };

    session.leave_room().await;
    debug!(connection = %connection_id, "connection closed");

    result
}
