//! Peer client: negotiation over the relay and the session on top of it.
//!
//! Host: create room, post offer (with its colour), read it back, poll for the
//! answer and candidates. Guest: poll for the offer, take the opposite colour,
//! apply it, answer once gathering is done, then poll for candidates. Both
//! stop polling once the channel is open and network readiness is reported.

use std::sync::Arc;

use parley_server::{
    domain::{ParticipantId, RoomId},
    infrastructure::dto::http::{
        LoggedMessageDto, PollResponseDto, RoleDto, SignalKindDto, SubmitRequestDto,
        SubmitResponseDto, SubmittedMessageDto,
    },
};
use parley_shared::time::get_timestamp;
use serde::Serialize;
use serde_json::Value;
use tokio::{sync::mpsc, time::MissedTickBehavior};

use crate::{
    config::ClientConfig,
    domain::{
        CandidateAction, CandidateLedger, Clocks, Color, ConnectionState, Envelope, PeerRole,
        Trigger,
    },
    error::ClientError,
    retry::RetryExhausted,
    room_memory::RoomMemory,
    rules::RulesEngine,
    session::{Inbound, SessionError, SessionEvents, SessionProtocol, SessionWarning},
    signaling::{SignalingApi, SignalingError},
    transport::{
        GAME_CHANNEL, IceCandidate, OfferPayload, PeerTransport, SdpKind, SessionDescription,
        TransportEvent,
    },
};

/// How a join ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Playing the given colour
    Player(Color),
    /// Room already has two participants
    Spectator,
}

/// What one discovery poll found
enum Discovery {
    Spectator,
    Offer(Vec<LoggedMessageDto>),
}

fn discover(response: PollResponseDto) -> Option<Discovery> {
    if response.is_gone() {
        return None;
    }
    match response.role {
        Some(RoleDto::Observer) => Some(Discovery::Spectator),
        Some(RoleDto::Guest) => response
            .messages
            .iter()
            .any(|m| m.kind == SignalKindDto::Offer)
            .then_some(Discovery::Offer(response.messages)),
        _ => None,
    }
}

fn to_payload<T: Serialize>(value: &T) -> Result<Value, ClientError> {
    serde_json::to_value(value).map_err(|e| SessionError::Encode(e.to_string()).into())
}

pub struct PeerClient {
    config: ClientConfig,
    signaling: Arc<dyn SignalingApi>,
    transport: Arc<dyn PeerTransport>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    participant_id: ParticipantId,
    room_id: Option<RoomId>,
    role: Option<PeerRole>,
    spectator: bool,
    state: ConnectionState,
    session: SessionProtocol,
    candidates: CandidateLedger<IceCandidate>,
    offer_sent: bool,
    ice_ready: bool,
    channel_ready: bool,
    handshake_sent: bool,
    expiry_warned: bool,
    memory: RoomMemory,
}

impl PeerClient {
    /// # Arguments
    ///
    /// * `signaling` - Relay access
    /// * `transport` - Platform connection primitives
    /// * `events` - Event stream belonging to `transport`
    /// * `rules` - Rules engine used to replay the peer's moves
    pub fn new(
        config: ClientConfig,
        signaling: Arc<dyn SignalingApi>,
        transport: Arc<dyn PeerTransport>,
        events: mpsc::UnboundedReceiver<TransportEvent>,
        rules: Box<dyn RulesEngine>,
    ) -> Self {
        Self {
            config,
            signaling,
            transport,
            events,
            participant_id: ParticipantId::generate(),
            room_id: None,
            role: None,
            spectator: false,
            state: ConnectionState::Idle,
            session: SessionProtocol::new(rules),
            candidates: CandidateLedger::new(),
            offer_sent: false,
            ice_ready: false,
            channel_ready: false,
            handshake_sent: false,
            expiry_warned: false,
            memory: RoomMemory::new(),
        }
    }

    /// Use a fixed participant id instead of a random one
    pub fn with_participant_id(mut self, participant_id: ParticipantId) -> Self {
        self.participant_id = participant_id;
        self
    }

    pub fn set_handlers(&mut self, handlers: Box<dyn SessionEvents>) {
        self.session.set_handlers(handlers);
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    pub fn room_id(&self) -> Option<&RoomId> {
        self.room_id.as_ref()
    }

    pub fn role(&self) -> Option<PeerRole> {
        self.role
    }

    pub fn is_spectator(&self) -> bool {
        self.spectator
    }

    pub fn color(&self) -> Option<Color> {
        self.session.color()
    }

    pub fn clocks(&self) -> Clocks {
        self.session.clocks()
    }

    pub fn game_started(&self) -> bool {
        self.session.game_started()
    }

    pub fn rules(&self) -> &dyn RulesEngine {
        self.session.rules()
    }

    pub fn room_memory(&self) -> &RoomMemory {
        &self.memory
    }

    fn transition(&mut self, trigger: Trigger) {
        match self.state.next(trigger) {
            Some(next) => {
                tracing::debug!("[{}] {} -> {}", self.participant_id, self.state, next);
                self.state = next;
            }
            None => tracing::debug!(
                "[{}] Ignored {:?} while {}",
                self.participant_id,
                trigger,
                self.state
            ),
        }
    }

    fn ensure_idle(&self, operation: &'static str) -> Result<(), ClientError> {
        if self.state == ConnectionState::Idle && !self.spectator && self.role.is_none() {
            Ok(())
        } else {
            Err(ClientError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn submit_request(
        &self,
        kind: SignalKindDto,
        payload: Option<Value>,
    ) -> Result<SubmitRequestDto, ClientError> {
        let room_id = self.room_id.as_ref().ok_or(ClientError::InvalidState {
            operation: "submit",
            state: self.state,
        })?;
        Ok(SubmitRequestDto {
            room_id: Some(room_id.as_str().to_string()),
            participant_id: Some(self.participant_id.as_str().to_string()),
            message: Some(SubmittedMessageDto {
                kind: Some(kind.as_str().to_string()),
                payload,
            }),
        })
    }

    async fn submit(
        &self,
        kind: SignalKindDto,
        payload: Option<Value>,
    ) -> Result<SubmitResponseDto, ClientError> {
        let request = self.submit_request(kind, payload)?;
        let signaling = &self.signaling;
        let request = &request;
        let response = self
            .config
            .transport_retry
            .retry(
                move |_| async move { signaling.submit(request).await },
                SignalingError::is_retryable,
            )
            .await?;
        tracing::debug!(
            "[{}] Submitted {} (participants: {}, messages: {})",
            self.participant_id,
            kind.as_str(),
            response.participant_count,
            response.message_count
        );
        Ok(response)
    }

    async fn poll(&self, verify: bool) -> Result<PollResponseDto, ClientError> {
        let room_id = self.room_id.as_ref().ok_or(ClientError::InvalidState {
            operation: "poll",
            state: self.state,
        })?;
        let signaling = &self.signaling;
        let room = room_id.as_str();
        let me = self.participant_id.as_str();
        let response = self
            .config
            .transport_retry
            .retry(
                move |_| async move { signaling.poll(room, me, verify).await },
                SignalingError::is_retryable,
            )
            .await?;
        Ok(response)
    }

    /// Create a room under a fresh id and post the offer.
    ///
    /// A colliding id is replaced by another one, up to the configured number
    /// of attempts.
    pub async fn create_session(&mut self) -> Result<RoomId, ClientError> {
        let attempts = self.config.create_attempts.max(1);
        for attempt in 1..=attempts {
            match self.create_session_with_id(RoomId::generate()).await {
                Err(ClientError::Signaling(SignalingError::Conflict(details))) => {
                    tracing::warn!(
                        "Room id collision ({}), attempt {}/{}",
                        details,
                        attempt,
                        attempts
                    );
                }
                result => return result,
            }
        }
        Err(ClientError::Signaling(SignalingError::Conflict(format!(
            "no free room id after {attempts} attempts"
        ))))
    }

    /// Create `room_id` as host and post the offer
    pub async fn create_session_with_id(&mut self, room_id: RoomId) -> Result<RoomId, ClientError> {
        self.ensure_idle("create a session")?;

        let created = {
            let signaling = &self.signaling;
            let room = room_id.as_str();
            let me = self.participant_id.as_str();
            self.config
                .transport_retry
                .retry(
                    move |_| async move { signaling.create_room(room, me).await },
                    SignalingError::is_retryable,
                )
                .await?
        };
        tracing::info!(
            "[{}] Created room '{}' (expires in {}s)",
            self.participant_id,
            created.room_id,
            created.expires_in_seconds
        );

        let color = self.config.host_color.unwrap_or_else(Color::random);
        self.room_id = Some(room_id.clone());
        self.role = Some(PeerRole::Host);
        self.session.assign(PeerRole::Host, color);
        self.transition(Trigger::Begin(PeerRole::Host));

        if let Err(e) = self.post_offer(color).await {
            self.teardown_local().await;
            return Err(e);
        }

        self.offer_sent = true;
        self.transition(Trigger::OfferSent);
        self.memory
            .remember(room_id.clone(), Some(PeerRole::Host), get_timestamp());
        Ok(room_id)
    }

    async fn post_offer(&mut self, color: Color) -> Result<(), ClientError> {
        self.transport.open_channel(GAME_CHANNEL).await?;
        let offer = self.transport.create_offer().await?;
        let payload = to_payload(&OfferPayload {
            description: offer,
            host_color: color,
        })?;
        self.submit(SignalKindDto::Offer, Some(payload)).await?;
        self.verify_offer_stored().await
    }

    /// Read-after-write check of the host's own offer
    async fn verify_offer_stored(&self) -> Result<(), ClientError> {
        let response = self.poll(true).await?;
        if response.is_gone() {
            return Err(ClientError::RoomGone);
        }
        let me = self.participant_id.as_str();
        let stored = response
            .messages
            .iter()
            .any(|m| m.kind == SignalKindDto::Offer && m.participant_id == me);
        if stored {
            Ok(())
        } else {
            Err(ClientError::OfferNotStored)
        }
    }

    /// Find the host's offer in `room_id` and answer it
    pub async fn join_session(&mut self, room_id: RoomId) -> Result<JoinOutcome, ClientError> {
        self.ensure_idle("join a session")?;

        let discovery = {
            let signaling = &self.signaling;
            let room = room_id.as_str();
            let me = self.participant_id.as_str();
            self.config
                .offer_discovery
                .poll_until(move |attempt| async move {
                    match signaling.poll(room, me, false).await {
                        Ok(response) => {
                            let found = discover(response);
                            if found.is_none() {
                                tracing::debug!("No offer in '{}' yet (attempt {})", room, attempt);
                            }
                            found
                        }
                        Err(e) => {
                            tracing::warn!("Offer discovery attempt {} failed: {}", attempt, e);
                            None
                        }
                    }
                })
                .await
        };
        let messages = match discovery {
            Ok(Discovery::Offer(messages)) => messages,
            Ok(Discovery::Spectator) => {
                tracing::info!("[{}] Room '{}' is full, spectating", self.participant_id, room_id);
                self.spectator = true;
                self.room_id = Some(room_id.clone());
                self.memory.remember(room_id, None, get_timestamp());
                return Ok(JoinOutcome::Spectator);
            }
            Err(RetryExhausted { attempts }) => {
                tracing::warn!("No offer found in '{}' after {} attempts", room_id, attempts);
                return Err(ClientError::NoOfferFound { attempts });
            }
        };

        // The first offer counts; later ones are stale
        let offer = messages
            .iter()
            .find(|m| m.kind == SignalKindDto::Offer)
            .ok_or_else(|| ClientError::InvalidOffer("offer vanished".to_string()))?;
        let offer: OfferPayload = serde_json::from_value(offer.payload.clone())
            .map_err(|e| ClientError::InvalidOffer(e.to_string()))?;

        let color = offer.host_color.opposite();
        self.room_id = Some(room_id.clone());
        self.role = Some(PeerRole::Guest);
        self.session.assign(PeerRole::Guest, color);
        self.transition(Trigger::Begin(PeerRole::Guest));

        if let Err(e) = self.answer_offer(offer.description, messages).await {
            self.teardown_local().await;
            return Err(e);
        }

        tracing::info!(
            "[{}] Joined room '{}' as {}",
            self.participant_id,
            room_id,
            color
        );
        self.memory
            .remember(room_id, Some(PeerRole::Guest), get_timestamp());
        Ok(JoinOutcome::Player(color))
    }

    async fn answer_offer(
        &mut self,
        offer: SessionDescription,
        messages: Vec<LoggedMessageDto>,
    ) -> Result<(), ClientError> {
        self.transport
            .apply_remote_description(offer)
            .await
            .map_err(|e| ClientError::InvalidOffer(e.to_string()))?;
        self.transition(Trigger::RemoteDescriptionApplied);
        for candidate in self.candidates.remote_applied() {
            self.add_candidate(candidate).await;
        }
        self.apply_setup_messages(messages).await;

        let answer = self.transport.create_answer().await?;
        self.transport.wait_for_gathering().await?;
        self.submit(SignalKindDto::Answer, Some(to_payload(&answer)?))
            .await?;
        Ok(())
    }

    /// Drive polling and transport events until the connection is established.
    ///
    /// Any error tears the session down; the transport cannot be reused, so a
    /// retry needs a new client.
    pub async fn establish(&mut self) -> Result<(), ClientError> {
        if self.role.is_none() || self.spectator || self.state.is_closed() {
            return Err(ClientError::InvalidState {
                operation: "establish",
                state: self.state,
            });
        }

        let result = self.drive_until_established().await;
        if result.is_err() {
            self.teardown_local().await;
        }
        result
    }

    async fn drive_until_established(&mut self) -> Result<(), ClientError> {
        let mut ticker = tokio::time::interval(self.config.setup_poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.state.is_established() {
            tokio::select! {
                biased;
                event = self.events.recv() => match event {
                    Some(event) => self.handle_transport_event(event).await?,
                    None => {
                        return Err(ClientError::ChannelFailure(
                            "transport event stream ended".to_string(),
                        ));
                    }
                },
                _ = ticker.tick() => self.poll_setup().await?,
            }
            if self.state.is_closed() {
                return Err(ClientError::ChannelFailure(
                    "closed while establishing".to_string(),
                ));
            }
        }
        Ok(())
    }

    async fn poll_setup(&mut self) -> Result<(), ClientError> {
        let response = self.poll(false).await?;
        if response.is_gone() {
            tracing::warn!("[{}] Room is gone, tearing down", self.participant_id);
            self.memory.forget();
            self.teardown_local().await;
            return Err(ClientError::RoomGone);
        }
        if response.expires_in_seconds < self.config.expiry_warning_secs && !self.expiry_warned {
            self.expiry_warned = true;
            self.session.warn(SessionWarning::RoomExpiring {
                seconds_left: response.expires_in_seconds,
            });
        }
        self.apply_setup_messages(response.messages).await;
        Ok(())
    }

    /// Apply answers and candidates; stale or misrouted messages are dropped
    async fn apply_setup_messages(&mut self, messages: Vec<LoggedMessageDto>) {
        for message in messages {
            if message.participant_id == self.participant_id.as_str() {
                continue;
            }
            match message.kind {
                SignalKindDto::Answer => self.apply_answer(message.payload).await,
                SignalKindDto::Candidate => self.apply_candidate(message.payload).await,
                SignalKindDto::Offer if self.role == Some(PeerRole::Host) => {
                    tracing::debug!("Dropped offer from '{}'", message.participant_id);
                }
                SignalKindDto::Offer | SignalKindDto::Disconnect => {}
            }
        }
    }

    async fn apply_answer(&mut self, payload: Value) {
        if self.role != Some(PeerRole::Host) || !self.offer_sent {
            tracing::debug!("Dropped answer with no pending offer");
            return;
        }
        if self.candidates.is_remote_ready() {
            // Every poll repeats the answer
            return;
        }
        let description = match serde_json::from_value::<SessionDescription>(payload) {
            Ok(description) if description.kind == SdpKind::Answer => description,
            _ => {
                tracing::debug!("Dropped malformed answer");
                return;
            }
        };
        if let Err(e) = self.transport.apply_remote_description(description).await {
            tracing::warn!("Failed to apply answer: {}", e);
            return;
        }
        self.transition(Trigger::RemoteDescriptionApplied);
        for candidate in self.candidates.remote_applied() {
            self.add_candidate(candidate).await;
        }
    }

    async fn apply_candidate(&mut self, payload: Value) {
        let candidate = match serde_json::from_value::<IceCandidate>(payload) {
            Ok(candidate) => candidate,
            Err(e) => {
                tracing::debug!("Dropped malformed candidate: {}", e);
                return;
            }
        };
        match self.candidates.accept(candidate.clone()) {
            CandidateAction::Apply => self.add_candidate(candidate).await,
            CandidateAction::Buffer => {
                tracing::debug!("Buffered candidate until the remote description is applied")
            }
            CandidateAction::Duplicate => {}
        }
    }

    async fn add_candidate(&self, candidate: IceCandidate) {
        if let Err(e) = self.transport.add_candidate(candidate).await {
            tracing::warn!("Failed to add candidate: {}", e);
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) -> Result<(), ClientError> {
        if self.state.is_closed() {
            return Ok(());
        }
        match event {
            TransportEvent::LocalCandidate(candidate) => {
                // The relay is only needed until the first connection; a submit
                // after that could recreate a swept room
                if self.handshake_sent {
                    tracing::debug!(
                        "[{}] Not relaying candidate after handshake",
                        self.participant_id
                    );
                    return Ok(());
                }
                let payload = to_payload(&candidate)?;
                self.submit(SignalKindDto::Candidate, Some(payload)).await?;
            }
            TransportEvent::GatheringComplete => {
                tracing::debug!("[{}] Candidate gathering complete", self.participant_id);
            }
            TransportEvent::IceConnected => {
                self.ice_ready = true;
                self.transition(Trigger::IceConnected);
                self.check_ready().await?;
            }
            TransportEvent::ChannelOpen => {
                self.channel_ready = true;
                self.transition(Trigger::ChannelOpened);
                self.check_ready().await?;
            }
            TransportEvent::IceFailed => {
                let Some(role) = self.role else {
                    return Ok(());
                };
                tracing::warn!("[{}] Connection failed, restarting ICE", self.participant_id);
                self.ice_ready = false;
                self.transition(Trigger::ConnectionFailed(role));
                if let Err(e) = self.transport.restart_ice().await {
                    self.teardown_local().await;
                    return Err(ClientError::ChannelFailure(e.to_string()));
                }
                self.transition(Trigger::IceRestarted);
            }
            TransportEvent::ChannelClosed => {
                let was_established = self.handshake_sent;
                self.teardown_local().await;
                if !was_established {
                    return Err(ClientError::ChannelFailure(
                        "channel closed before it was established".to_string(),
                    ));
                }
                self.session.warn(SessionWarning::PeerLost);
            }
            TransportEvent::Message(text) => {
                if self.session.handle_incoming(&text) == Inbound::PeerDisconnected {
                    tracing::info!("[{}] Peer disconnected", self.participant_id);
                    self.teardown_local().await;
                }
            }
        }
        Ok(())
    }

    /// Announce readiness once both the network path and the channel are up
    async fn check_ready(&mut self) -> Result<(), ClientError> {
        if !(self.ice_ready && self.channel_ready) {
            return Ok(());
        }
        if self.state == ConnectionState::ChannelConnecting {
            // Channel stayed open across an ICE restart
            self.transition(Trigger::ChannelOpened);
        }
        if !self.state.is_established() || self.handshake_sent {
            return Ok(());
        }

        self.handshake_sent = true;
        tracing::info!(
            "[{}] Connection established as {:?}",
            self.participant_id,
            self.role
        );
        self.send_raw(&Envelope::HandshakeComplete).await?;
        if let (Some(PeerRole::Host), Some(host_color)) = (self.role, self.session.color()) {
            self.send_raw(&Envelope::GameStart { host_color }).await?;
        }
        Ok(())
    }

    async fn send_raw(&mut self, envelope: &Envelope) -> Result<(), ClientError> {
        let text = self.session.prepare_outgoing(envelope)?;
        self.transport.send(text).await?;
        Ok(())
    }

    /// Send an envelope to the peer. `disconnect` tears the session down.
    pub async fn send_envelope(&mut self, envelope: Envelope) -> Result<(), ClientError> {
        if envelope == Envelope::Disconnect {
            self.disconnect().await;
            return Ok(());
        }
        if !self.state.is_established() {
            return Err(SessionError::ChannelNotReady.into());
        }
        self.send_raw(&envelope).await
    }

    /// Wait for and handle the next transport event.
    ///
    /// Returns `false` once the session is closed.
    pub async fn process_next_event(&mut self) -> Result<bool, ClientError> {
        if self.state.is_closed() {
            return Ok(false);
        }
        match self.events.recv().await {
            Some(event) => {
                if let Err(e) = self.handle_transport_event(event).await {
                    self.teardown_local().await;
                    return Err(e);
                }
                Ok(!self.state.is_closed())
            }
            None => {
                self.teardown_local().await;
                Ok(false)
            }
        }
    }

    /// Best-effort `disconnect` to the peer and the relay, then full teardown
    pub async fn disconnect(&mut self) {
        if self.state.is_closed() {
            return;
        }
        if self.channel_ready {
            if let Ok(text) = self.session.prepare_outgoing(&Envelope::Disconnect) {
                let _ = self.transport.send(text).await;
            }
        }
        if self.role.is_some() {
            if let Ok(request) = self.submit_request(SignalKindDto::Disconnect, None) {
                if let Err(e) = self.signaling.submit(&request).await {
                    tracing::debug!("Relay disconnect failed: {}", e);
                }
            }
        }
        self.teardown_local().await;
        tracing::info!("[{}] Disconnected", self.participant_id);
    }

    async fn teardown_local(&mut self) {
        self.transport.close().await;
        self.transition(Trigger::Close);
        self.ice_ready = false;
        self.channel_ready = false;
        self.offer_sent = false;
        self.candidates.reset();
    }
}
