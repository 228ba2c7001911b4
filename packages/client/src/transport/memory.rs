//! In-process transport.
//!
//! Endpoints created from the same [`MemoryNetwork`] can reach each other.
//! A session description names its endpoint and every candidate names the
//! endpoint it belongs to. A link comes up once both sides have applied the
//! other's description and at least one of its candidates, like a real
//! connection. Delivery is ordered and never retried: messages sent while the
//! peer is down are lost.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use super::{
    ChannelOptions, IceCandidate, PeerTransport, SdpKind, SessionDescription, TransportError,
    TransportEvent,
};

const SDP_PREFIX: &str = "v=0 memory-endpoint:";

struct Endpoint {
    events: mpsc::UnboundedSender<TransportEvent>,
    channel: Option<ChannelOptions>,
    local: Option<SdpKind>,
    gathered: bool,
    /// Incremented on every gathering round (ICE restart included)
    generation: u32,
    remote: Option<String>,
    remote_candidates: usize,
    connected: bool,
    failed: bool,
}

impl Endpoint {
    fn emit(&self, event: TransportEvent) {
        // The receiver may be gone after teardown
        let _ = self.events.send(event);
    }

    fn gather(&mut self, id: &str) {
        self.generation += 1;
        for (component, kind) in [(1, "host"), (2, "srflx")] {
            self.emit(TransportEvent::LocalCandidate(IceCandidate {
                candidate: format!(
                    "candidate:{}{} 1 udp {} memory {} typ {} generation {}",
                    self.generation,
                    component,
                    2_130_706_431u32 - component,
                    id,
                    kind,
                    self.generation
                ),
                sdp_mid: Some("0".to_string()),
                sdp_m_line_index: Some(0),
            }));
        }
        self.gathered = true;
        self.emit(TransportEvent::GatheringComplete);
    }

    fn ready_for(&self, other: &str) -> bool {
        self.remote.as_deref() == Some(other)
            && self.remote_candidates > 0
            && !self.connected
            && !self.failed
    }
}

/// Registry of reachable endpoints
#[derive(Default)]
pub struct MemoryNetwork {
    endpoints: Mutex<HashMap<String, Endpoint>>,
    next_id: AtomicU64,
}

impl MemoryNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of endpoints that have not been closed
    pub async fn open_endpoints(&self) -> usize {
        self.endpoints.lock().await.len()
    }

    /// Register a new endpoint and return it with its event stream
    pub async fn endpoint(
        self: &Arc<Self>,
    ) -> (MemoryTransport, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let id = format!("mem{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.endpoints.lock().await.insert(
            id.clone(),
            Endpoint {
                events,
                channel: None,
                local: None,
                gathered: false,
                generation: 0,
                remote: None,
                remote_candidates: 0,
                connected: false,
                failed: false,
            },
        );
        let transport = MemoryTransport {
            id,
            network: Arc::clone(self),
        };
        (transport, receiver)
    }
}

fn endpoint_mut<'a>(
    endpoints: &'a mut HashMap<String, Endpoint>,
    id: &str,
) -> Result<&'a mut Endpoint, TransportError> {
    match endpoints.get_mut(id) {
        Some(endpoint) => Ok(endpoint),
        None => Err(TransportError::Closed),
    }
}

/// Bring the link up if both ends are ready for each other
fn try_connect(endpoints: &mut HashMap<String, Endpoint>, id: &str) {
    let Some(peer_id) = endpoints.get(id).and_then(|e| e.remote.clone()) else {
        return;
    };
    let ready = match (endpoints.get(id), endpoints.get(&peer_id)) {
        (Some(me), Some(peer)) => me.ready_for(&peer_id) && peer.ready_for(id),
        _ => false,
    };
    if !ready {
        return;
    }
    for endpoint_id in [id, peer_id.as_str()] {
        if let Some(endpoint) = endpoints.get_mut(endpoint_id) {
            endpoint.connected = true;
            endpoint.emit(TransportEvent::IceConnected);
            endpoint.emit(TransportEvent::ChannelOpen);
        }
    }
    tracing::debug!("Memory link {} <-> {} is up", id, peer_id);
}

pub struct MemoryTransport {
    id: String,
    network: Arc<MemoryNetwork>,
}

impl MemoryTransport {
    pub fn endpoint_id(&self) -> &str {
        &self.id
    }

    /// Drop the network path as a real connection would on ICE failure
    pub async fn simulate_failure(&self) {
        let mut endpoints = self.network.endpoints.lock().await;
        if let Ok(endpoint) = endpoint_mut(&mut endpoints, &self.id) {
            endpoint.connected = false;
            endpoint.failed = true;
            endpoint.emit(TransportEvent::IceFailed);
        }
    }

    /// Options the channel was opened with, if any
    pub async fn channel_options(&self) -> Option<ChannelOptions> {
        let endpoints = self.network.endpoints.lock().await;
        endpoints.get(&self.id).and_then(|e| e.channel)
    }
}

#[async_trait]
impl PeerTransport for MemoryTransport {
    async fn open_channel(&self, options: ChannelOptions) -> Result<(), TransportError> {
        let mut endpoints = self.network.endpoints.lock().await;
        let endpoint = endpoint_mut(&mut endpoints, &self.id)?;
        endpoint.channel = Some(options);
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        let mut endpoints = self.network.endpoints.lock().await;
        let endpoint = endpoint_mut(&mut endpoints, &self.id)?;
        if endpoint.local.is_some() {
            return Err(TransportError::InvalidDescription(
                "local description already created".to_string(),
            ));
        }
        endpoint.local = Some(SdpKind::Offer);
        endpoint.gather(&self.id);
        Ok(SessionDescription {
            kind: SdpKind::Offer,
            sdp: format!("{SDP_PREFIX}{}", self.id),
        })
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        let mut endpoints = self.network.endpoints.lock().await;
        let endpoint = endpoint_mut(&mut endpoints, &self.id)?;
        if endpoint.remote.is_none() {
            return Err(TransportError::NoRemoteDescription);
        }
        if endpoint.local.is_some() {
            return Err(TransportError::InvalidDescription(
                "local description already created".to_string(),
            ));
        }
        endpoint.local = Some(SdpKind::Answer);
        endpoint.gather(&self.id);
        Ok(SessionDescription {
            kind: SdpKind::Answer,
            sdp: format!("{SDP_PREFIX}{}", self.id),
        })
    }

    async fn apply_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), TransportError> {
        let mut endpoints = self.network.endpoints.lock().await;
        let peer_id = description
            .sdp
            .strip_prefix(SDP_PREFIX)
            .filter(|peer| *peer != self.id && endpoints.contains_key(*peer))
            .map(str::to_string)
            .ok_or_else(|| TransportError::InvalidDescription(description.sdp.clone()))?;

        let endpoint = endpoint_mut(&mut endpoints, &self.id)?;
        let expected_local = match description.kind {
            SdpKind::Offer => None,
            SdpKind::Answer => Some(SdpKind::Offer),
        };
        if endpoint.local != expected_local || endpoint.remote.is_some() {
            return Err(TransportError::InvalidDescription(format!(
                "unexpected {:?} description",
                description.kind
            )));
        }
        endpoint.remote = Some(peer_id);
        try_connect(&mut endpoints, &self.id);
        Ok(())
    }

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        let mut endpoints = self.network.endpoints.lock().await;
        let endpoint = endpoint_mut(&mut endpoints, &self.id)?;
        let remote = endpoint
            .remote
            .as_deref()
            .ok_or(TransportError::NoRemoteDescription)?;
        if !candidate.candidate.contains(&format!(" memory {remote} ")) {
            return Err(TransportError::Failed(format!(
                "candidate does not belong to {remote}"
            )));
        }
        endpoint.remote_candidates += 1;
        try_connect(&mut endpoints, &self.id);
        Ok(())
    }

    async fn wait_for_gathering(&self) -> Result<(), TransportError> {
        let mut endpoints = self.network.endpoints.lock().await;
        let endpoint = endpoint_mut(&mut endpoints, &self.id)?;
        if endpoint.gathered {
            Ok(())
        } else {
            Err(TransportError::NoLocalDescription)
        }
    }

    async fn restart_ice(&self) -> Result<(), TransportError> {
        let mut endpoints = self.network.endpoints.lock().await;
        let endpoint = endpoint_mut(&mut endpoints, &self.id)?;
        let peer_id = endpoint
            .remote
            .clone()
            .ok_or(TransportError::NoRemoteDescription)?;
        endpoint.failed = false;
        endpoint.gather(&self.id);

        let peer_alive = endpoints
            .get(&peer_id)
            .is_some_and(|peer| peer.remote.as_deref() == Some(self.id.as_str()));
        if !peer_alive {
            return Err(TransportError::Failed(format!("peer {peer_id} is gone")));
        }
        let endpoint = endpoint_mut(&mut endpoints, &self.id)?;
        endpoint.connected = true;
        endpoint.emit(TransportEvent::IceConnected);
        Ok(())
    }

    async fn send(&self, text: String) -> Result<(), TransportError> {
        let mut endpoints = self.network.endpoints.lock().await;
        let endpoint = endpoint_mut(&mut endpoints, &self.id)?;
        if !endpoint.connected {
            return Err(TransportError::ChannelNotOpen);
        }
        let Some(peer_id) = endpoint.remote.clone() else {
            return Err(TransportError::ChannelNotOpen);
        };
        match endpoints.get(&peer_id) {
            Some(peer) if peer.connected => {
                peer.emit(TransportEvent::Message(text));
            }
            _ => tracing::debug!("Dropped message to unreachable endpoint {}", peer_id),
        }
        Ok(())
    }

    async fn close(&self) {
        let mut endpoints = self.network.endpoints.lock().await;
        let Some(endpoint) = endpoints.remove(&self.id) else {
            return;
        };

        if let (true, Some(peer_id)) = (endpoint.connected, endpoint.remote) {
            if let Some(peer) = endpoints.get_mut(&peer_id) {
                if peer.connected {
                    peer.connected = false;
                    peer.emit(TransportEvent::ChannelClosed);
                }
            }
        }
    }
}
