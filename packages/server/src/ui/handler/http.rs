//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    domain::{ParticipantId, Role, RoomId},
    infrastructure::dto::http::{
        CreateRoomRequestDto, CreateRoomResponseDto, ErrorResponseDto, LoggedMessageDto,
        ParticipantDetailDto, PollQueryDto, PollResponseDto, RoomDetailDto, SubmitRequestDto,
        SubmitResponseDto,
    },
    ui::state::AppState,
    usecase::{CreateRoomError, PollOutcome, SubmitCommand, SubmitSignalError},
};
use parley_shared::time::timestamp_to_rfc3339;

fn error_response(status: StatusCode, error: &str, details: Option<String>) -> Response {
    let body = ErrorResponseDto {
        error: error.to_string(),
        details,
    };
    (status, Json(body)).into_response()
}

fn bad_request(details: String) -> Response {
    error_response(StatusCode::BAD_REQUEST, "bad request", Some(details))
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Create a room with the caller as host
///
/// A missing `roomId` is replaced by a generated one.
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateRoomRequestDto>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    let room_id = match request.room_id {
        Some(id) => match RoomId::new(id) {
            Ok(id) => id,
            Err(e) => return bad_request(format!("invalid roomId: {e}")),
        },
        None => RoomId::generate(),
    };
    let creator = match request.participant_id.map(ParticipantId::new) {
        Some(Ok(id)) => id,
        Some(Err(e)) => return bad_request(format!("invalid participantId: {e}")),
        None => return bad_request("missing required field 'participantId'".to_string()),
    };

    match state.create_room_usecase.execute(room_id, creator).await {
        Ok(created) => {
            // Domain Model から DTO への変換
            let body = CreateRoomResponseDto {
                room_id: created.room.id.into_string(),
                participants: created
                    .room
                    .participants
                    .into_iter()
                    .map(ParticipantId::into_string)
                    .collect(),
                expires_in_seconds: created.expires_in_seconds,
            };
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Err(CreateRoomError::AlreadyExists(id)) => error_response(
            StatusCode::CONFLICT,
            "room already exists",
            Some(format!("room '{id}' already exists")),
        ),
    }
}

/// Submit one setup message (or a disconnect)
pub async fn submit_signal(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubmitRequestDto>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    // DTO から Domain Model への変換（必須フィールドの検証を含む）
    let command = match SubmitCommand::try_from(request) {
        Ok(command) => command,
        Err(SubmitSignalError::BadRequest(details)) => {
            tracing::debug!("Rejected submission: {}", details);
            return bad_request(details);
        }
        Err(e) => return error_response(StatusCode::NOT_FOUND, "room not found", Some(e.to_string())),
    };

    match state.submit_signal_usecase.execute(command).await {
        Ok(outcome) => Json(SubmitResponseDto {
            accepted: outcome.accepted,
            participant_count: outcome.participant_count,
            message_count: outcome.message_count,
        })
        .into_response(),
        Err(SubmitSignalError::BadRequest(details)) => bad_request(details),
        Err(e @ SubmitSignalError::RoomNotFound(_)) => {
            error_response(StatusCode::NOT_FOUND, "room not found", Some(e.to_string()))
        }
    }
}

/// Read the messages visible to the caller
///
/// Never fails: unknown rooms and malformed queries both read as gone.
pub async fn poll_signals(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PollQueryDto>, QueryRejection>,
) -> Json<PollResponseDto> {
    let Ok(Query(query)) = query else {
        return Json(PollResponseDto::gone("invalid query"));
    };
    let room_id = match query.room_id.map(RoomId::new) {
        Some(Ok(id)) => id,
        _ => return Json(PollResponseDto::gone("missing or invalid roomId")),
    };
    let reader = match query.participant_id.map(ParticipantId::new) {
        Some(Ok(id)) => id,
        _ => return Json(PollResponseDto::gone("missing or invalid participantId")),
    };

    match state
        .poll_signals_usecase
        .execute(&room_id, &reader, query.verify)
        .await
    {
        PollOutcome::Gone => Json(PollResponseDto::gone("room not found or expired")),
        PollOutcome::Active {
            view,
            expires_in_seconds,
        } => Json(PollResponseDto {
            messages: view
                .messages
                .into_iter()
                .map(LoggedMessageDto::from)
                .collect(),
            is_host: view.role == Role::Host,
            role: Some(view.role.into()),
            participants: view
                .participants
                .into_iter()
                .map(ParticipantId::into_string)
                .collect(),
            expires_in_seconds,
            error: None,
        }),
    }
}

/// Get room detail by ID
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetailDto>, StatusCode> {
    let room_id = RoomId::new(room_id).map_err(|_| StatusCode::NOT_FOUND)?;
    let detail = state
        .get_room_detail_usecase
        .execute(&room_id)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;

    // Domain Model から DTO への変換
    let room = detail.room;
    Ok(Json(RoomDetailDto {
        id: room.id.as_str().to_string(),
        participants: room
            .participants
            .iter()
            .enumerate()
            .map(|(position, p)| ParticipantDetailDto {
                participant_id: p.as_str().to_string(),
                role: Role::from_position(position).into(),
            })
            .collect(),
        message_count: room.messages.len(),
        created_at: timestamp_to_rfc3339(room.created_at.value()),
        expires_in_seconds: detail.expires_in_seconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        infrastructure::repository::InMemoryRoomRepository,
        ui::Server,
        usecase::{CreateRoomUseCase, GetRoomDetailUseCase, PollSignalsUseCase, SubmitSignalUseCase},
    };
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, header},
    };
    use parley_shared::time::ManualClock;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn create_router() -> (Router, Arc<ManualClock>) {
        let repository = Arc::new(InMemoryRoomRepository::new());
        let clock = Arc::new(ManualClock::new(0));
        let server = Server::new(
            Arc::new(CreateRoomUseCase::new(repository.clone(), clock.clone())),
            Arc::new(SubmitSignalUseCase::new(repository.clone(), clock.clone())),
            Arc::new(PollSignalsUseCase::new(repository.clone(), clock.clone())),
            Arc::new(GetRoomDetailUseCase::new(repository, clock.clone())),
        );
        (server.router(), clock)
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn submit(room: &str, from: &str, kind: &str, payload: Value) -> Request<Body> {
        post_json(
            "/api/signal",
            json!({
                "roomId": room,
                "participantId": from,
                "message": { "kind": kind, "payload": payload }
            }),
        )
    }

    #[tokio::test]
    async fn test_health_check() {
        // テスト項目: ヘルスチェックが ok を返す
        // given (前提条件):
        let (router, _clock) = create_router();

        // when (操作):
        let (status, body) = send(&router, get("/api/health")).await;

        // then (期待する結果):
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_create_room_then_conflict() {
        // テスト項目: ルーム作成は 201、同じ ID での再作成は 409
        // given (前提条件):
        let (router, _clock) = create_router();
        let body = json!({"roomId": "r1", "participantId": "alice"});

        // when (操作):
        let (first, created) = send(&router, post_json("/api/rooms", body.clone())).await;
        let (second, _) = send(&router, post_json("/api/rooms", body)).await;

        // then (期待する結果):
        assert_eq!(first, StatusCode::CREATED);
        assert_eq!(created["participants"], json!(["alice"]));
        assert_eq!(created["expiresInSeconds"], json!(1200));
        assert_eq!(second, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_submit_missing_field_is_bad_request() {
        // テスト項目: 必須フィールドが欠けた投稿は 400 とエラー本文を返す
        // given (前提条件):
        let (router, _clock) = create_router();
        let request = post_json("/api/signal", json!({"roomId": "r1", "message": {"kind": "offer", "payload": {}}}));

        // when (操作):
        let (status, body) = send(&router, request).await;

        // then (期待する結果):
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"].as_str().unwrap().contains("participantId"));
    }

    #[tokio::test]
    async fn test_submit_malformed_json_is_bad_request() {
        // テスト項目: JSON として不正な本文も 400 になる
        // given (前提条件):
        let (router, _clock) = create_router();
        let request = Request::post("/api/signal")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        // when (操作):
        let (status, body) = send(&router, request).await;

        // then (期待する結果):
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("bad request"));
    }

    #[tokio::test]
    async fn test_submit_and_poll_filtering() {
        // テスト項目: ホストはゲストのメッセージのみ、ゲストはホストのメッセージのみを受け取る
        // given (前提条件):
        let (router, _clock) = create_router();
        let (_, first) = send(&router, submit("r1", "alice", "offer", json!({"sdp": "O1"}))).await;
        send(&router, submit("r1", "bob", "answer", json!({"sdp": "A1"}))).await;
        send(&router, submit("r1", "alice", "candidate", json!({"candidate": "C1"}))).await;
        send(&router, submit("r1", "bob", "candidate", json!({"candidate": "C2"}))).await;

        // when (操作):
        let (_, host) = send(&router, get("/api/signal?roomId=r1&participantId=alice")).await;
        let (_, guest) = send(&router, get("/api/signal?roomId=r1&participantId=bob")).await;

        // then (期待する結果):
        assert_eq!(first, json!({"accepted": true, "participantCount": 1, "messageCount": 1}));
        assert_eq!(host["isHost"], json!(true));
        assert_eq!(host["role"], json!("host"));
        assert_eq!(host["messages"][0]["kind"], json!("answer"));
        assert_eq!(host["messages"][1]["payload"], json!({"candidate": "C2"}));
        assert_eq!(host["messages"].as_array().unwrap().len(), 2);
        assert_eq!(guest["isHost"], json!(false));
        assert_eq!(guest["messages"][0]["kind"], json!("offer"));
        assert_eq!(guest["messages"][1]["payload"], json!({"candidate": "C1"}));
        assert_eq!(guest["participants"], json!(["alice", "bob"]));
    }

    #[tokio::test]
    async fn test_poll_unknown_room_reads_as_gone() {
        // テスト項目: 存在しないルームや不足したクエリはエラーではなく gone 応答
        // given (前提条件):
        let (router, _clock) = create_router();

        // when (操作):
        let (unknown_status, unknown) =
            send(&router, get("/api/signal?roomId=nope&participantId=alice")).await;
        let (missing_status, missing) = send(&router, get("/api/signal?roomId=nope")).await;

        // then (期待する結果):
        assert_eq!(unknown_status, StatusCode::OK);
        assert_eq!(unknown["messages"], json!([]));
        assert_eq!(unknown["expiresInSeconds"], json!(0));
        assert_eq!(missing_status, StatusCode::OK);
        assert_eq!(missing["expiresInSeconds"], json!(0));
    }

    #[tokio::test]
    async fn test_observer_poll_and_submit() {
        // テスト項目: 3人目は observer としてメッセージを受け取らず、投稿も accepted=false
        // given (前提条件):
        let (router, _clock) = create_router();
        send(&router, submit("r1", "alice", "offer", json!({"sdp": "O1"}))).await;
        send(&router, submit("r1", "bob", "answer", json!({"sdp": "A1"}))).await;

        // when (操作):
        let (_, view) =
            send(&router, get("/api/signal?roomId=r1&participantId=carol&verify=true")).await;
        let (_, submitted) =
            send(&router, submit("r1", "carol", "candidate", json!({"candidate": "X"}))).await;

        // then (期待する結果):
        assert_eq!(view["role"], json!("observer"));
        assert_eq!(view["messages"], json!([]));
        assert_eq!(view["participants"], json!(["alice", "bob"]));
        assert_eq!(submitted["accepted"], json!(false));
    }

    #[tokio::test]
    async fn test_expiry_and_disconnect() {
        // テスト項目: TTL 経過後と disconnect 後はルームが gone になり、詳細は 404
        // given (前提条件):
        let (router, clock) = create_router();
        send(&router, submit("r1", "alice", "offer", json!({"sdp": "O1"}))).await;
        send(&router, submit("r2", "alice", "offer", json!({"sdp": "O2"}))).await;
        clock.set(1_199_000);
        let (_, alive) = send(&router, get("/api/signal?roomId=r1&participantId=bob")).await;

        // when (操作):
        let disconnect = post_json(
            "/api/signal",
            json!({"roomId": "r2", "participantId": "alice", "message": {"kind": "disconnect"}}),
        );
        let (_, closed) = send(&router, disconnect).await;
        let (_, r2) = send(&router, get("/api/signal?roomId=r2&participantId=alice")).await;
        clock.set(1_200_000);
        let (_, r1) = send(&router, get("/api/signal?roomId=r1&participantId=bob")).await;
        let (detail_status, _) = send(&router, get("/api/rooms/r1")).await;

        // then (期待する結果):
        assert_eq!(alive["expiresInSeconds"], json!(1));
        assert_eq!(closed["accepted"], json!(true));
        assert_eq!(r2["expiresInSeconds"], json!(0));
        assert_eq!(r1["expiresInSeconds"], json!(0));
        assert_eq!(detail_status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_room_detail() {
        // テスト項目: ルーム詳細に参加者の役割・メッセージ数・作成時刻が含まれる
        // given (前提条件):
        let (router, _clock) = create_router();
        send(&router, submit("r1", "alice", "offer", json!({"sdp": "O1"}))).await;
        send(&router, submit("r1", "bob", "answer", json!({"sdp": "A1"}))).await;

        // when (操作):
        let (status, body) = send(&router, get("/api/rooms/r1")).await;

        // then (期待する結果):
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["participants"][0], json!({"participantId": "alice", "role": "host"}));
        assert_eq!(body["participants"][1]["role"], json!("guest"));
        assert_eq!(body["messageCount"], json!(2));
        assert_eq!(body["createdAt"], json!("1970-01-01T00:00:00+00:00"));
    }
}
