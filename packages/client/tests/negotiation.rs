//! End-to-end negotiation through a real relay served over HTTP.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use parley_client::{
    ClientConfig, ClientError, JoinOutcome, PeerClient,
    domain::{Clocks, Color, ConnectionState, Envelope, Square},
    rules::OccupancyRules,
    session::SessionEvents,
    signaling::{HttpSignalingClient, SignalingError},
    transport::MemoryNetwork,
};
use parley_server::{
    domain::{ParticipantId, RoomId},
    infrastructure::repository::InMemoryRoomRepository,
    ui::Server,
    usecase::{CreateRoomUseCase, GetRoomDetailUseCase, PollSignalsUseCase, SubmitSignalUseCase},
};
use parley_shared::time::SystemClock;
use tokio::task::JoinHandle;

/// Relay bound to an ephemeral port, stopped on drop
struct TestServer {
    handle: JoinHandle<()>,
    url: String,
}

impl TestServer {
    async fn start() -> Self {
        let repository = Arc::new(InMemoryRoomRepository::new());
        let clock = Arc::new(SystemClock);
        let server = Server::new(
            Arc::new(CreateRoomUseCase::new(repository.clone(), clock.clone())),
            Arc::new(SubmitSignalUseCase::new(repository.clone(), clock.clone())),
            Arc::new(PollSignalsUseCase::new(repository.clone(), clock.clone())),
            Arc::new(GetRoomDetailUseCase::new(repository, clock)),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let _ = server.serve(listener).await;
        });
        TestServer { handle, url }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<String>>>);

impl SessionEvents for Recorder {
    fn on_clock_sync(&mut self, clocks: Clocks) {
        self.0
            .lock()
            .unwrap()
            .push(format!("clock-sync {} {}", clocks.white, clocks.black));
    }

    fn on_game_start(&mut self, host_color: Color) {
        self.0.lock().unwrap().push(format!("game-start {host_color}"));
    }

    fn on_peer_disconnect(&mut self) {
        self.0.lock().unwrap().push("disconnect".to_string());
    }
}

impl Recorder {
    fn contains(&self, entry: &str) -> bool {
        self.0.lock().unwrap().iter().any(|e| e == entry)
    }
}

fn config() -> ClientConfig {
    ClientConfig {
        host_color: Some(Color::White),
        ..ClientConfig::default().with_interval(Duration::from_millis(50))
    }
}

async fn peer(network: &Arc<MemoryNetwork>, url: &str, id: &str) -> PeerClient {
    let (transport, events) = network.endpoint().await;
    PeerClient::new(
        config(),
        Arc::new(HttpSignalingClient::new(url)),
        Arc::new(transport),
        events,
        Box::new(OccupancyRules::new()),
    )
    .with_participant_id(ParticipantId::new(id.to_string()).unwrap())
}

async fn join_and_establish(guest: &mut PeerClient, room_id: RoomId) -> Result<JoinOutcome, ClientError> {
    let outcome = guest.join_session(room_id).await?;
    guest.establish().await?;
    Ok(outcome)
}

/// Host and guest connected through the relay in room `r1`
async fn connected_pair(server: &TestServer) -> (PeerClient, PeerClient, Recorder) {
    let network = MemoryNetwork::new();
    let mut host = peer(&network, &server.url, "alice").await;
    let mut guest = peer(&network, &server.url, "bob").await;
    let recorder = Recorder::default();
    guest.set_handlers(Box::new(recorder.clone()));

    let room_id = RoomId::new("r1".to_string()).unwrap();
    host.create_session_with_id(room_id.clone()).await.unwrap();
    let (hosted, joined) = tokio::join!(host.establish(), join_and_establish(&mut guest, room_id));
    hosted.unwrap();
    assert_eq!(joined.unwrap(), JoinOutcome::Player(Color::Black));
    (host, guest, recorder)
}

async fn process_until(client: &mut PeerClient, done: impl Fn(&PeerClient) -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done(client) {
            if !client.process_next_event().await.unwrap() {
                break;
            }
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_host_and_guest_establish_and_sync_clocks() {
    // テスト項目: リレー経由でネゴシエーションし、ホストの clock-sync がゲストの時計に反映される
    // given (前提条件):
    let server = TestServer::start().await;
    let (mut host, mut guest, recorder) = connected_pair(&server).await;

    // when (操作):
    host.send_envelope(Envelope::clock_sync(Clocks {
        white: 300,
        black: 300,
    }))
    .await
    .unwrap();
    process_until(&mut guest, |g| {
        g.clocks()
            == Clocks {
                white: 300,
                black: 300,
            }
    })
    .await;

    // then (期待する結果):
    assert_eq!(host.state(), ConnectionState::Established);
    assert_eq!(guest.state(), ConnectionState::Established);
    assert_eq!(host.color(), Some(Color::White));
    assert_eq!(guest.color(), Some(Color::Black));
    assert!(guest.game_started());
    assert!(recorder.contains("game-start white"));
    assert!(recorder.contains("clock-sync 300 300"));
}

#[tokio::test]
async fn test_move_is_replayed_on_guest_board() {
    // テスト項目: ホストの着手がゲストの盤面に反映され、ゲストの手番になる
    // given (前提条件):
    let server = TestServer::start().await;
    let (mut host, mut guest, _) = connected_pair(&server).await;

    // when (操作):
    host.send_envelope(Envelope::Move {
        from: "e2".parse::<Square>().unwrap(),
        to: "e4".parse::<Square>().unwrap(),
    })
    .await
    .unwrap();
    process_until(&mut guest, |g| g.rules().turn() == Color::Black).await;

    // then (期待する結果):
    assert_eq!(host.rules().turn(), Color::Black);
    assert_eq!(guest.rules().turn(), Color::Black);
}

#[tokio::test]
async fn test_third_participant_is_spectator() {
    // テスト項目: 3 人目の参加者は観戦者になる
    // given (前提条件):
    let server = TestServer::start().await;
    let (_host, _guest, _) = connected_pair(&server).await;
    let network = MemoryNetwork::new();
    let mut third = peer(&network, &server.url, "carol").await;

    // when (操作):
    let outcome = third
        .join_session(RoomId::new("r1".to_string()).unwrap())
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(outcome, JoinOutcome::Spectator);
    assert!(third.is_spectator());
    assert_eq!(third.color(), None);
}

#[tokio::test]
async fn test_disconnect_closes_peer_and_room() {
    // テスト項目: ホストの切断でゲストが closed になり、リレーのルームも消える
    // given (前提条件):
    let server = TestServer::start().await;
    let (mut host, mut guest, recorder) = connected_pair(&server).await;

    // when (操作):
    host.send_envelope(Envelope::Disconnect).await.unwrap();
    process_until(&mut guest, |g| g.state().is_closed()).await;

    // then (期待する結果):
    assert_eq!(host.state(), ConnectionState::Closed);
    assert_eq!(guest.state(), ConnectionState::Closed);
    assert!(recorder.contains("disconnect"));
    let detail = HttpSignalingClient::new(&server.url).room_detail("r1").await;
    assert!(matches!(detail, Err(SignalingError::NotFound(_))));
}

#[tokio::test]
async fn test_duplicate_room_is_rejected() {
    // テスト項目: 既存ルーム ID での作成は衝突として拒否される
    // given (前提条件):
    let server = TestServer::start().await;
    let network = MemoryNetwork::new();
    let mut first = peer(&network, &server.url, "alice").await;
    let mut second = peer(&network, &server.url, "bob").await;
    let room_id = RoomId::new("r1".to_string()).unwrap();
    first.create_session_with_id(room_id.clone()).await.unwrap();

    // when (操作):
    let result = second.create_session_with_id(room_id).await;

    // then (期待する結果):
    assert!(matches!(
        result,
        Err(ClientError::Signaling(SignalingError::Conflict(_)))
    ));
}
