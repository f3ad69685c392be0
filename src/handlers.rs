use crate::twilio_types::{render_reply, TwilioStatusPayload, TwilioVoicePayload, VOICE_PATH};
use crate::types::{AppState, Turn};

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use http::{header, HeaderMap, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, trace};

pub const STATUS_PATH: &str = "/twilio/status";
pub const TEST_DATA_HEADER: &str = "x-test-data";

pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route(VOICE_PATH, post(voice_webhook))
        .route(STATUS_PATH, post(status_callback))
        .route("/", get(|| async { "OK" }))
        .with_state(app_state)
}

#[derive(Deserialize, Debug)]
pub struct TurnQuery {
    pub seq: Option<u32>,
}

fn is_test_request(headers: &HeaderMap) -> bool {
    headers
        .get(TEST_DATA_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.trim().eq_ignore_ascii_case("true"))
}

fn bad_request() -> (StatusCode, HeaderMap, String) {
    (
        StatusCode::BAD_REQUEST,
        HeaderMap::new(),
        "Bad request".to_string(),
    )
}

/// One conversational turn.  Called on call start (no `seq`) and after every gather.
pub async fn voice_webhook(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<TurnQuery>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    trace!(body=%body, "voice webhook body");
    let payload = match serde_urlencoded::from_str::<TwilioVoicePayload>(&body) {
        Ok(payload) => payload,
        Err(e) => {
            error!(error=%e, "failed to deserialize Twilio voice payload");
            return bad_request();
        }
    };
    debug!(
        call_sid=%payload.call_sid,
        seq=?query.seq,
        confidence=?payload.confidence,
        "voice turn"
    );

    let turn = Turn {
        call_id: payload.call_sid,
        utterance: payload.speech_result,
        caller_phone: payload.from,
        seq: query.seq,
        is_test_data: is_test_request(&headers),
    };
    let reply = app_state.flow.handle_turn(turn).await;

    let twiml = render_reply(&reply);
    trace!("twiml: '{}'", twiml);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/xml"),
    );
    (StatusCode::OK, headers, twiml)
}

/// Call progress events.  A finished call abandons whatever session it left behind.
pub async fn status_callback(
    State(app_state): State<Arc<AppState>>,
    body: String,
) -> impl IntoResponse {
    let payload = match serde_urlencoded::from_str::<TwilioStatusPayload>(&body) {
        Ok(payload) => payload,
        Err(e) => {
            error!(error=%e, "failed to deserialize Twilio status payload");
            return bad_request();
        }
    };
    if payload.call_status.is_finished() {
        let left_in = app_state.flow.hangup(&payload.call_sid).await;
        info!(call_sid=%payload.call_sid, status=?payload.call_status, state=?left_in, "call finished");
    }
    (StatusCode::OK, HeaderMap::new(), String::new())
}
