use std::{sync::Arc, time::Duration};

use comms::{
    command::{self, UserCommand},
    event::{self, Event},
    transport::client::{split_tcp_stream, CommandWriter, EventStream},
    viewport::Viewport,
};
use relay::{broadcaster, session, Relay, RelayConfig};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::broadcast,
};
use tokio_stream::StreamExt;

const TOKEN: &str = "secret";

/// Starts a relay on an ephemeral port, returns it along with its address and the quit signal
async fn start_relay() -> (Arc<Relay>, std::net::SocketAddr, broadcast::Sender<()>) {
    let relay = Arc::new(Relay::new(RelayConfig {
        access_token: TOKEN.into(),
        broadcast_freq: 20.0,
        ..RelayConfig::default()
    }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (quit_tx, quit_rx) = broadcast::channel::<()>(1);

    tokio::spawn(broadcaster::run_state_broadcaster(relay.clone(), quit_rx.resubscribe()));
    let accepting = relay.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(session::handle_user_session(
                accepting.clone(),
                quit_rx.resubscribe(),
                socket,
            ));
        }
    });

    (relay, addr, quit_tx)
}

async fn connect(addr: std::net::SocketAddr) -> (EventStream, CommandWriter) {
    split_tcp_stream(TcpStream::connect(addr).await.unwrap())
}

/// Next event that is not a periodic room info update
async fn next_non_info(events: &mut EventStream) -> Event {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), events.next())
            .await
            .expect("no event within timeout")
            .expect("relay closed the connection")
            .unwrap();

        if !matches!(event, Event::RoomInfo(_)) {
            return event;
        }
    }
}

/// Waits for a room info update with the given participant count
async fn wait_for_participants(events: &mut EventStream, participants: usize) {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), events.next())
            .await
            .expect("no room info within timeout")
            .expect("relay closed the connection")
            .unwrap();

        if let Event::RoomInfo(info) = event {
            if info.participants == participants {
                return;
            }
        }
    }
}

/// Polls the relay until `condition` holds
async fn eventually<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met within timeout");
}

fn join(room: &str, token: &str) -> UserCommand {
    UserCommand::JoinRoom(command::JoinRoomCommand {
        room: room.into(),
        access_token: Some(token.into()),
        viewport: Some(Viewport { w: 1280, h: 720 }),
    })
}

#[tokio::test]
async fn relay_between_writer_and_viewer() {
    let (_, addr, quit_tx) = start_relay().await;
    let (mut writer_events, mut writer) = connect(addr).await;
    let (mut viewer_events, mut viewer) = connect(addr).await;

    writer.write(&join("board", TOKEN)).await.unwrap();
    let Event::RoomConfig(config) = next_non_info(&mut writer_events).await else {
        panic!("expected room config");
    };
    assert!(!config.is_read_only);

    viewer.write(&join(&config.read_only_id, TOKEN)).await.unwrap();
    let Event::RoomConfig(viewer_config) = next_non_info(&mut viewer_events).await else {
        panic!("expected room config");
    };
    assert!(viewer_config.is_read_only);
    assert_eq!(viewer_config.read_only_id, config.read_only_id);

    // both names of the room report the same participants
    wait_for_participants(&mut writer_events, 2).await;
    wait_for_participants(&mut viewer_events, 2).await;

    writer
        .write(&UserCommand::Draw(command::DrawCommand {
            access_token: Some(TOKEN.into()),
            content: serde_json::json!({"t": "pen", "d": [0, 0, 10, 10], "c": "<script>x</script>#000"}),
        }))
        .await
        .unwrap();

    assert_eq!(
        next_non_info(&mut viewer_events).await,
        Event::Draw(event::DrawBroadcastEvent {
            content: serde_json::json!({"t": "pen", "d": [0, 0, 10, 10], "c": "#000"}),
        })
    );

    // the viewer cannot draw, the writer only hears about the departure afterwards
    viewer
        .write(&UserCommand::Draw(command::DrawCommand {
            access_token: Some(TOKEN.into()),
            content: serde_json::json!({"t": "clear"}),
        }))
        .await
        .unwrap();
    drop(viewer);
    drop(viewer_events);

    assert_eq!(next_non_info(&mut writer_events).await, Event::RefreshParticipants);
    wait_for_participants(&mut writer_events, 1).await;

    quit_tx.send(()).unwrap();
}

#[tokio::test]
async fn wrong_token_is_reported_to_sender_only() {
    let (_, addr, quit_tx) = start_relay().await;
    let (mut events, mut commands) = connect(addr).await;

    commands.write(&join("board", "wrong")).await.unwrap();
    assert_eq!(next_non_info(&mut events).await, Event::AccessDenied);

    // the connection is still usable afterwards
    commands.write(&join("board", TOKEN)).await.unwrap();
    assert!(matches!(next_non_info(&mut events).await, Event::RoomConfig(_)));

    quit_tx.send(()).unwrap();
}

#[tokio::test]
async fn closed_connection_leaves_exactly_once() {
    let (relay, addr, quit_tx) = start_relay().await;
    let (mut watcher_events, mut watcher) = connect(addr).await;

    watcher.write(&join("board", TOKEN)).await.unwrap();
    assert!(matches!(next_non_info(&mut watcher_events).await, Event::RoomConfig(_)));

    // the socket closes right behind the join, before the reply is read
    let (leaver_events, mut leaver) = connect(addr).await;
    leaver.write(&join("board", TOKEN)).await.unwrap();
    drop(leaver);
    drop(leaver_events);

    assert_eq!(next_non_info(&mut watcher_events).await, Event::RefreshParticipants);
    assert_eq!(relay.participant_count("board").await, Some(1));
    assert_eq!(relay.hub().channel_count(), 1);

    // no second departure follows
    let second = tokio::time::timeout(Duration::from_millis(200), next_non_info(&mut watcher_events)).await;
    assert!(second.is_err(), "unexpected event {second:?}");

    watcher.write(&UserCommand::Quit(command::QuitCommand)).await.unwrap();
    eventually(|| {
        let relay = relay.clone();
        async move { relay.rooms().room_count().await == 0 && relay.hub().channel_count() == 0 }
    })
    .await;

    quit_tx.send(()).unwrap();
}
