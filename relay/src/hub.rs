use std::{collections::HashMap, sync::Arc};

use comms::event::Event;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

const CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
/// An event published to a channel, tagged with the connection it originated from
pub struct Delivery {
    origin: Option<String>,
    event: Arc<Event>,
}

impl Delivery {
    pub fn event(&self) -> &Arc<Event> {
        &self.event
    }
}

#[derive(Debug, Default)]
/// [ChannelHub] is the in-process transport: named broadcast channels that connections subscribe to.
///
/// Room membership is channel membership, every room is reachable through the channel
/// of its canonical id and the channel of its read-only id.
pub struct ChannelHub {
    channels: Mutex<HashMap<String, broadcast::Sender<Delivery>>>,
}

impl ChannelHub {
    pub fn new() -> Self {
        ChannelHub::default()
    }

    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<Delivery> {
        self.channels
            .lock()
            .entry(String::from(channel))
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish an event to every subscriber of `channel`, except the `exclude`d connection.
    /// Never waits on subscribers, returns how many receivers the event was queued for.
    pub fn publish(&self, channel: &str, event: Arc<Event>, exclude: Option<&str>) -> usize {
        let mut channels = self.channels.lock();

        let Some(sender) = channels.get(channel) else {
            return 0;
        };

        let delivery = Delivery {
            origin: exclude.map(String::from),
            event,
        };

        match sender.send(delivery) {
            Ok(receivers) => receivers,
            Err(_) => {
                // nobody listens anymore
                channels.remove(channel);
                0
            }
        }
    }

    /// Drops `channel` once nobody is subscribed to it anymore
    pub fn release(&self, channel: &str) {
        let mut channels = self.channels.lock();

        if channels
            .get(channel)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            channels.remove(channel);
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }
}

/// Forwards deliveries of a single channel into a connection's outbound queue until the channel
/// closes or the connection stops listening. Deliveries originating from `connection_id` are skipped.
pub async fn forward_channel(
    mut broadcast_rx: broadcast::Receiver<Delivery>,
    connection_id: String,
    mpsc_tx: mpsc::Sender<Arc<Event>>,
) {
    loop {
        match broadcast_rx.recv().await {
            Ok(delivery) => {
                if delivery.origin.as_deref() == Some(connection_id.as_str()) {
                    continue;
                }

                if mpsc_tx.send(delivery.event).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(connection = %connection_id, skipped, "connection lagging behind its room");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
