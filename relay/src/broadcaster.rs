use std::sync::Arc;

use comms::event::Event;
use tokio::{
    sync::broadcast,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::relay::Relay;

/// Sends one coalesced room info update per changed room, to both channels of the room.
/// Returns how many rooms were broadcast.
pub async fn broadcast_pending_state(relay: &Relay) -> usize {
    let pending = relay.rooms().take_pending_snapshots().await;

    for room in pending.iter() {
        let event = Arc::new(Event::RoomInfo(room.snapshot.clone().into()));

        relay
            .hub()
            .publish(&room.identity.canonical, event.clone(), None);
        relay.hub().publish(&room.identity.read_only, event, None);
    }

    if !pending.is_empty() {
        debug!(rooms = pending.len(), "broadcast room info");
    }

    pending.len()
}

/// Runs the state broadcaster on its own fixed period until the quit signal fires
pub async fn run_state_broadcaster(relay: Arc<Relay>, mut quit_rx: broadcast::Receiver<()>) {
    let period = relay.config().broadcast_period();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(?period, "state broadcaster started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                broadcast_pending_state(&relay).await;
            }
            _ = quit_rx.recv() => {
                info!("state broadcaster stopped");
                break;
            }
        }
    }
}
