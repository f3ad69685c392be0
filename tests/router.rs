mod common;

use axum::body::Body;
use common::*;
use http::{header, Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;
use twilio_booking::handlers::router;
use twilio_booking::types::AppState;

fn form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, String) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn app(h: Harness) -> axum::Router {
    router(Arc::new(AppState { flow: h.flow }))
}

#[tokio::test]
async fn voice_webhook_drives_the_conversation() {
    let h = harness();
    let sessions = h.sessions.clone();
    let app = app(h);

    let resp = app
        .clone()
        .oneshot(form(
            "/twilio/voice",
            "CallSid=CA1&From=%2B16475550000&To=%2B18005550100&CallStatus=ringing",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/xml"
    );
    let body = hyper::body::to_bytes(resp.into_body()).await.unwrap();
    let twiml = String::from_utf8(body.to_vec()).unwrap();
    assert!(twiml.contains("action=\"/twilio/voice?seq=1\""));
    assert!(twiml.contains("full name"));

    let (status, twiml) = send(
        &app,
        form(
            "/twilio/voice?seq=1",
            "CallSid=CA1&From=%2B16475550000&CallStatus=in-progress&SpeechResult=John+Smith&Confidence=0.9",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(twiml.contains("action=\"/twilio/voice?seq=2\""));
    assert!(twiml.contains("phone number"));

    // gather timed out: redirect without a SpeechResult
    let (_, twiml) = send(
        &app,
        form("/twilio/voice?seq=2", "CallSid=CA1&CallStatus=in-progress"),
    )
    .await;
    assert!(twiml.contains("action=\"/twilio/voice?seq=3\""));

    let session = sessions.get("CA1").await.unwrap().unwrap();
    assert_eq!(session.slots.name.as_deref(), Some("John Smith"));
    assert_eq!(session.caller_phone.as_deref(), Some("+16475550000"));
}

#[tokio::test]
async fn test_header_flags_the_session() {
    let h = harness();
    let sessions = h.sessions.clone();
    let app = app(h);

    let mut req = form("/twilio/voice", "CallSid=CA7&From=%2B16475550000");
    req.headers_mut()
        .insert("X-Test-Data", "true".parse().unwrap());
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(sessions.get("CA7").await.unwrap().unwrap().is_test_data);
}

#[tokio::test]
async fn status_callback_abandons_the_session() {
    let h = harness();
    let sessions = h.sessions.clone();
    let app = app(h);

    send(&app, form("/twilio/voice", "CallSid=CA1&From=%2B16475550000")).await;
    assert!(sessions.get("CA1").await.unwrap().is_some());

    let (status, _) = send(
        &app,
        form("/twilio/status", "CallSid=CA1&CallStatus=completed"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(sessions.get("CA1").await.unwrap().is_none());
}

#[tokio::test]
async fn malformed_bodies_are_rejected() {
    let app = app(harness());
    let (status, _) = send(&app, form("/twilio/voice", "From=%2B16475550000")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, form("/twilio/status", "CallSid=CA1&CallStatus=exploded")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
