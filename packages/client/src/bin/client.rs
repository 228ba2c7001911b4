//! Peer client for the Parley signaling relay.
//!
//! `demo` runs a host and a guest in one process against a running relay,
//! negotiates a channel between them over an in-memory transport and plays a
//! few envelopes across it. `inspect` prints a room snapshot.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin parley-client -- demo --url http://127.0.0.1:8080
//! cargo run --bin parley-client -- inspect --url http://127.0.0.1:8080 --room abc123
//! ```

use std::{sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use parley_client::{
    ClientConfig, ClientError, JoinOutcome, PeerClient,
    domain::{Clocks, Color, Envelope, Square},
    formatter::MessageFormatter,
    rules::{MoveResult, OccupancyRules},
    session::{SessionEvents, SessionWarning},
    signaling::HttpSignalingClient,
    transport::MemoryNetwork,
};
use parley_server::domain::RoomId;
use parley_shared::{logger::setup_logger, time::get_timestamp};

#[derive(Parser, Debug)]
#[command(name = "parley-client")]
#[command(about = "Peer client for the Parley signaling relay", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Negotiate a host and a guest through the relay and exchange a few envelopes
    Demo {
        /// Relay base URL
        #[arg(short = 'u', long, default_value = "http://127.0.0.1:8080")]
        url: String,

        /// Interval between relay polls in milliseconds
        #[arg(long, default_value = "1000")]
        poll_interval_ms: u64,
    },
    /// Print the relay's view of a room
    Inspect {
        /// Relay base URL
        #[arg(short = 'u', long, default_value = "http://127.0.0.1:8080")]
        url: String,

        /// Room id
        #[arg(short = 'r', long)]
        room: String,
    },
}

/// Prints every session event, prefixed with the side that saw it
struct PrintingEvents {
    side: &'static str,
}

impl SessionEvents for PrintingEvents {
    fn on_move(&mut self, result: &MoveResult) {
        print!("[{}] {}", self.side, MessageFormatter::format_move(result));
    }

    fn on_chat(&mut self, text: &str, sender: Option<Color>, timestamp: i64) {
        print!("[{}] {}", self.side, MessageFormatter::format_chat(text, sender, timestamp));
    }

    fn on_clock_sync(&mut self, clocks: Clocks) {
        print!("[{}] {}", self.side, MessageFormatter::format_clocks(clocks));
    }

    fn on_game_start(&mut self, host_color: Color) {
        let own = if self.side == "host" {
            host_color
        } else {
            host_color.opposite()
        };
        print!("[{}] {}", self.side, MessageFormatter::format_game_start(own));
    }

    fn on_peer_disconnect(&mut self) {
        print!("[{}] {}", self.side, MessageFormatter::format_peer_disconnected());
    }

    fn on_warning(&mut self, warning: &SessionWarning) {
        print!("[{}] {}", self.side, MessageFormatter::format_warning(warning));
    }
}

/// Handle events until none arrive for a short while
async fn drain(client: &mut PeerClient) -> Result<(), ClientError> {
    while let Ok(result) =
        tokio::time::timeout(Duration::from_millis(200), client.process_next_event()).await
    {
        if !result? {
            break;
        }
    }
    Ok(())
}

async fn join_and_establish(guest: &mut PeerClient, room_id: RoomId) -> Result<(), ClientError> {
    match guest.join_session(room_id.clone()).await? {
        JoinOutcome::Player(_) => guest.establish().await,
        JoinOutcome::Spectator => {
            print!("{}", MessageFormatter::format_spectating(room_id.as_str()));
            Ok(())
        }
    }
}

fn square(name: &str) -> Result<Square, Box<dyn std::error::Error>> {
    Ok(name.parse::<Square>()?)
}

async fn run_demo(url: &str, poll_interval: Duration) -> Result<(), Box<dyn std::error::Error>> {
    let network = MemoryNetwork::new();
    let config = ClientConfig {
        host_color: Some(Color::White),
        ..ClientConfig::default().with_interval(poll_interval)
    };

    let (host_transport, host_events) = network.endpoint().await;
    let mut host = PeerClient::new(
        config.clone(),
        Arc::new(HttpSignalingClient::new(url)),
        Arc::new(host_transport),
        host_events,
        Box::new(OccupancyRules::new()),
    );
    host.set_handlers(Box::new(PrintingEvents { side: "host" }));

    let (guest_transport, guest_events) = network.endpoint().await;
    let mut guest = PeerClient::new(
        config,
        Arc::new(HttpSignalingClient::new(url)),
        Arc::new(guest_transport),
        guest_events,
        Box::new(OccupancyRules::new()),
    );
    guest.set_handlers(Box::new(PrintingEvents { side: "guest" }));

    let room_id = host.create_session().await?;
    println!("Room {} created by {}", room_id, host.participant_id());

    let (hosted, joined) = tokio::join!(
        host.establish(),
        join_and_establish(&mut guest, room_id.clone())
    );
    hosted?;
    joined?;

    for client in [&host, &guest] {
        if let (Some(role), Some(color)) = (client.role(), client.color()) {
            print!(
                "{}",
                MessageFormatter::format_connected(room_id.as_str(), role, color)
            );
        }
    }

    host.send_envelope(Envelope::clock_sync(Clocks {
        white: 300,
        black: 300,
    }))
    .await?;
    host.send_envelope(Envelope::Chat {
        text: "good luck".to_string(),
        sender: host.color(),
        timestamp: get_timestamp(),
    })
    .await?;
    host.send_envelope(Envelope::Move {
        from: square("e2")?,
        to: square("e4")?,
    })
    .await?;
    drain(&mut guest).await?;

    guest
        .send_envelope(Envelope::Move {
            from: square("e7")?,
            to: square("e5")?,
        })
        .await?;
    drain(&mut host).await?;
    println!("Next to move: {}", host.rules().turn());

    host.send_envelope(Envelope::Disconnect).await?;
    drain(&mut guest).await?;
    println!("Host: {}, guest: {}", host.state(), guest.state());
    Ok(())
}

async fn run_inspect(url: &str, room: &str) -> Result<(), Box<dyn std::error::Error>> {
    let detail = HttpSignalingClient::new(url).room_detail(room).await?;
    print!("{}", MessageFormatter::format_room_detail(&detail, None));
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let result = match args.command {
        Command::Demo {
            url,
            poll_interval_ms,
        } => run_demo(&url, Duration::from_millis(poll_interval_ms)).await,
        Command::Inspect { url, room } => run_inspect(&url, &room).await,
    };

    if let Err(e) = result {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
