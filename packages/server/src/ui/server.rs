//! Server execution logic.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::usecase::{
    CreateRoomUseCase, GetRoomDetailUseCase, PollSignalsUseCase, SubmitSignalUseCase,
};

use super::{
    handler::{create_room, get_room_detail, health_check, poll_signals, submit_signal},
    signal::shutdown_signal,
    state::AppState,
};

/// Signaling relay server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(
///     create_room_usecase,
///     submit_signal_usecase,
///     poll_signals_usecase,
///     get_room_detail_usecase,
/// );
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    create_room_usecase: Arc<CreateRoomUseCase>,
    submit_signal_usecase: Arc<SubmitSignalUseCase>,
    poll_signals_usecase: Arc<PollSignalsUseCase>,
    get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
}

impl Server {
    /// Create a new Server instance
    ///
    /// # Arguments
    ///
    /// * `create_room_usecase` - UseCase for explicit room creation
    /// * `submit_signal_usecase` - UseCase for setup message submission
    /// * `poll_signals_usecase` - UseCase for filtered log reads
    /// * `get_room_detail_usecase` - UseCase for room inspection
    pub fn new(
        create_room_usecase: Arc<CreateRoomUseCase>,
        submit_signal_usecase: Arc<SubmitSignalUseCase>,
        poll_signals_usecase: Arc<PollSignalsUseCase>,
        get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
    ) -> Self {
        Self {
            create_room_usecase,
            submit_signal_usecase,
            poll_signals_usecase,
            get_room_detail_usecase,
        }
    }

    /// Build the relay router
    pub fn router(&self) -> Router {
        let app_state = Arc::new(AppState {
            create_room_usecase: self.create_room_usecase.clone(),
            submit_signal_usecase: self.submit_signal_usecase.clone(),
            poll_signals_usecase: self.poll_signals_usecase.clone(),
            get_room_detail_usecase: self.get_room_detail_usecase.clone(),
        });

        Router::new()
            .route("/api/rooms", post(create_room))
            .route("/api/rooms/{room_id}", get(get_room_detail))
            .route("/api/signal", post(submit_signal).get(poll_signals))
            .route("/api/health", get(health_check))
            .layer(TraceLayer::new_for_http())
            // ブラウザから直接呼ばれるため
            .layer(CorsLayer::permissive())
            .with_state(app_state)
    }

    /// Serve the relay on an already bound listener until Ctrl+C
    pub async fn serve(self, listener: tokio::net::TcpListener) -> std::io::Result<()> {
        let app = self.router();
        tracing::info!("Signaling relay listening on {}", listener.local_addr()?);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Run the signaling relay
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
        self.serve(listener).await?;
        Ok(())
    }
}
