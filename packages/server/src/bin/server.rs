//! Signaling relay server.
//!
//! Holds short-lived rooms in memory and relays session-setup messages
//! between the two peers of each room.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin parley-server
//! cargo run --bin parley-server -- --host 0.0.0.0 --port 3000 --sweep-interval-secs 60
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use parley_server::{
    infrastructure::repository::InMemoryRoomRepository,
    ui::Server,
    usecase::{
        CreateRoomUseCase, GetRoomDetailUseCase, PollSignalsUseCase, SubmitSignalUseCase,
        SweepExpiredRoomsUseCase,
    },
};
use parley_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "parley-server")]
#[command(about = "Signaling relay for peer-to-peer game sessions", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Period of the background expiry sweep in seconds (0 = sweep on access only)
    #[arg(long, default_value = "0")]
    sweep_interval_secs: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. Repository and clock
    // 2. UseCases
    // 3. Background sweeper (optional)
    // 4. Server

    // 1. Create Repository (in-memory database)
    let repository = Arc::new(InMemoryRoomRepository::new());
    let clock = Arc::new(SystemClock);

    // 2. Create UseCases
    let create_room_usecase = Arc::new(CreateRoomUseCase::new(repository.clone(), clock.clone()));
    let submit_signal_usecase =
        Arc::new(SubmitSignalUseCase::new(repository.clone(), clock.clone()));
    let poll_signals_usecase = Arc::new(PollSignalsUseCase::new(repository.clone(), clock.clone()));
    let get_room_detail_usecase =
        Arc::new(GetRoomDetailUseCase::new(repository.clone(), clock.clone()));

    // 3. Spawn the background sweeper
    if args.sweep_interval_secs > 0 {
        let sweeper = Arc::new(SweepExpiredRoomsUseCase::new(repository, clock));
        let interval = Duration::from_secs(args.sweep_interval_secs);
        tracing::info!("Background sweep every {}s", args.sweep_interval_secs);
        tokio::spawn(sweeper.run_every(interval));
    }

    // 4. Create and run the server
    let server = Server::new(
        create_room_usecase,
        submit_signal_usecase,
        poll_signals_usecase,
        get_room_detail_usecase,
    );
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
