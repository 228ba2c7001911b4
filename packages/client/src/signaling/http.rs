//! Relay client over HTTP (reqwest).

use async_trait::async_trait;
use parley_server::infrastructure::dto::http::{
    CreateRoomRequestDto, CreateRoomResponseDto, ErrorResponseDto, PollQueryDto, PollResponseDto,
    RoomDetailDto, SubmitRequestDto, SubmitResponseDto,
};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use super::{SignalingApi, SignalingError};

pub struct HttpSignalingClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSignalingClient {
    /// # Arguments
    ///
    /// * `base_url` - Relay root, e.g. `http://127.0.0.1:8080`
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Room participants, message count and expiry, without joining the room
    pub async fn room_detail(&self, room_id: &str) -> Result<RoomDetailDto, SignalingError> {
        let response = self
            .http
            .get(self.url(&format!("/api/rooms/{room_id}")))
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }
}

fn network(e: reqwest::Error) -> SignalingError {
    SignalingError::Network(e.to_string())
}

/// Map the status to an error or decode the body
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, SignalingError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| SignalingError::Decode(e.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    let details = serde_json::from_str::<ErrorResponseDto>(&body)
        .map(|e| e.details.unwrap_or(e.error))
        .unwrap_or_else(|_| body.clone());
    Err(match status {
        StatusCode::BAD_REQUEST => SignalingError::BadRequest(details),
        StatusCode::CONFLICT => SignalingError::Conflict(details),
        StatusCode::NOT_FOUND => SignalingError::NotFound(details),
        other => SignalingError::UnexpectedStatus {
            status: other.as_u16(),
            body,
        },
    })
}

#[async_trait]
impl SignalingApi for HttpSignalingClient {
    async fn create_room(
        &self,
        room_id: &str,
        participant_id: &str,
    ) -> Result<CreateRoomResponseDto, SignalingError> {
        let request = CreateRoomRequestDto {
            room_id: Some(room_id.to_string()),
            participant_id: Some(participant_id.to_string()),
        };
        let response = self
            .http
            .post(self.url("/api/rooms"))
            .json(&request)
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }

    async fn submit(
        &self,
        request: &SubmitRequestDto,
    ) -> Result<SubmitResponseDto, SignalingError> {
        let response = self
            .http
            .post(self.url("/api/signal"))
            .json(request)
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }

    async fn poll(
        &self,
        room_id: &str,
        participant_id: &str,
        verify: bool,
    ) -> Result<PollResponseDto, SignalingError> {
        let query = PollQueryDto {
            room_id: Some(room_id.to_string()),
            participant_id: Some(participant_id.to_string()),
            verify,
        };
        let response = self
            .http
            .get(self.url("/api/signal"))
            .query(&query)
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }
}
