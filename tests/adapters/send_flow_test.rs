//! Full send flows against a mock provider: token exchange, batching,
//! dispatch, and reconciliation working together.

use std::time::Duration;

use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::json;

use courier::adapters::fcm::FcmAdapter;
use courier::adapters::mailgun::MailgunAdapter;
use courier::adapters::twilio::TwilioAdapter;
use courier::adapters::{Adapter, SendError};
use courier::credentials::{MailgunCredentials, ServiceAccount, TwilioCredentials};
use courier::dispatch::DispatchOptions;
use courier::message::{EmailMessage, PushMessage, SmsMessage};
use courier::reconcile::EXPIRED_DESTINATION;

const SEND_PATH: &str = "/v1/projects/demo-project/messages:send";

fn service_account() -> ServiceAccount {
    let key = include_str!("../fixtures/test_key.pem");
    let raw = json!({
        "project_id": "demo-project",
        "client_email": "sender@demo-project.iam.gserviceaccount.com",
        "private_key": key,
    });
    ServiceAccount::from_json(&raw.to_string()).expect("service account fixture")
}

fn fcm_adapter(server: &MockServer) -> FcmAdapter {
    FcmAdapter::new(service_account()).with_endpoints(server.url("/token"), server.base_url())
}

fn mock_token_endpoint(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(POST).path("/token");
        then.status(200).json_body(json!({
            "access_token": "ya29.mock-bearer",
            "expires_in": 3600,
        }));
    })
}

#[tokio::test]
async fn push_to_one_recipient_delivers() {
    let server = MockServer::start();
    let token_mock = mock_token_endpoint(&server);
    let send_mock = server.mock(|when, then| {
        when.method(POST)
            .path(SEND_PATH)
            .header("authorization", "Bearer ya29.mock-bearer")
            .body_includes("\"token\":\"device-a\"");
        then.status(200)
            .json_body(json!({"name": "projects/demo-project/messages/1"}));
    });

    let mut message = PushMessage::new(vec!["device-a".to_owned()]);
    message.title = Some("Hello".to_owned());

    let response = fcm_adapter(&server).send(&message).await.expect("send");

    token_mock.assert_calls(1);
    send_mock.assert_calls(1);
    assert_eq!(response.delivered_to, 1);
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].recipient, "device-a");
    assert_eq!(response.results[0].error, None);
}

#[tokio::test]
async fn push_mixed_outcomes_report_per_recipient_in_order() {
    let server = MockServer::start();
    mock_token_endpoint(&server);
    server.mock(|when, then| {
        when.method(POST)
            .path(SEND_PATH)
            .body_includes("\"token\":\"device-ok-1\"");
        then.status(200).json_body(json!({"name": "m/1"}));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path(SEND_PATH)
            .body_includes("\"token\":\"device-dead\"");
        then.status(404).json_body(json!({
            "error": {"status": "NOT_FOUND", "message": "Requested entity was not found."}
        }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path(SEND_PATH)
            .body_includes("\"token\":\"device-ok-2\"");
        then.status(200).json_body(json!({"name": "m/2"}));
    });

    let message = PushMessage::new(vec![
        "device-ok-1".to_owned(),
        "device-dead".to_owned(),
        "device-ok-2".to_owned(),
    ]);

    let response = fcm_adapter(&server).send(&message).await.expect("send");

    assert_eq!(response.delivered_to, 2);
    assert_eq!(response.results.len(), 3);
    assert_eq!(response.results[0].error, None);
    assert_eq!(
        response.results[1].error.as_deref(),
        Some(EXPIRED_DESTINATION)
    );
    assert_eq!(response.results[1].recipient, "device-dead");
    assert_eq!(response.results[2].error, None);
}

#[tokio::test]
async fn auth_failure_aborts_before_any_send_request() {
    let server = MockServer::start();
    let token_mock = server.mock(|when, then| {
        when.method(POST).path("/token");
        then.status(401).json_body(json!({"error": "invalid_grant"}));
    });
    let send_mock = server.mock(|when, then| {
        when.method(POST).path(SEND_PATH);
        then.status(200).json_body(json!({"name": "m/1"}));
    });

    let message = PushMessage::new(vec!["device-a".to_owned()]);
    let outcome = fcm_adapter(&server).send(&message).await;

    assert!(matches!(outcome, Err(SendError::Auth(_))));
    token_mock.assert_calls(1);
    send_mock.assert_calls(0);
}

#[tokio::test]
async fn empty_recipient_list_fails_validation_before_any_network_call() {
    let server = MockServer::start();
    let token_mock = mock_token_endpoint(&server);
    let send_mock = server.mock(|when, then| {
        when.method(POST).path(SEND_PATH);
        then.status(200).json_body(json!({"name": "m/1"}));
    });

    let outcome = fcm_adapter(&server).send(&PushMessage::new(Vec::new())).await;

    assert!(matches!(outcome, Err(SendError::Validation(_))));
    token_mock.assert_calls(0);
    send_mock.assert_calls(0);
}

#[tokio::test]
async fn bearer_token_is_reused_across_sends() {
    let server = MockServer::start();
    let token_mock = mock_token_endpoint(&server);
    let send_mock = server.mock(|when, then| {
        when.method(POST).path(SEND_PATH);
        then.status(200).json_body(json!({"name": "m/1"}));
    });

    let adapter = fcm_adapter(&server);
    let message = PushMessage::new(vec!["device-a".to_owned()]);

    let first = adapter.send(&message).await.expect("first send");
    let second = adapter.send(&message).await.expect("second send");

    token_mock.assert_calls(1);
    send_mock.assert_calls(2);
    assert_eq!(first.delivered_to, second.delivered_to);
    assert_eq!(first.results, second.results);
}

#[tokio::test]
async fn sms_delivers_and_classifies_dead_numbers() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/2010-04-01/Accounts/AC0123/Messages.json")
            .body_includes("To=%2B15551110000");
        then.status(201)
            .json_body(json!({"sid": "SM1", "status": "queued"}));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/2010-04-01/Accounts/AC0123/Messages.json")
            .body_includes("To=%2B15552220000");
        then.status(400).json_body(json!({
            "code": 21211,
            "message": "The 'To' number is not a valid phone number.",
            "status": 400,
        }));
    });

    let adapter = TwilioAdapter::new(TwilioCredentials::new("AC0123", "auth-token"))
        .with_sender("+15550009999")
        .with_endpoint(server.base_url());
    let message = SmsMessage::new(
        vec!["+15551110000".to_owned(), "+15552220000".to_owned()],
        "Your code is 4242",
    );

    let response = adapter.send(&message).await.expect("send");

    assert_eq!(response.delivered_to, 1);
    assert_eq!(response.results[0].error, None);
    assert_eq!(
        response.results[1].error.as_deref(),
        Some(EXPIRED_DESTINATION)
    );
}

#[tokio::test]
async fn sms_falls_back_to_the_message_sender() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/2010-04-01/Accounts/AC0123/Messages.json")
            .body_includes("From=%2B15557770000");
        then.status(201).json_body(json!({"sid": "SM1"}));
    });

    let adapter = TwilioAdapter::new(TwilioCredentials::new("AC0123", "auth-token"))
        .with_endpoint(server.base_url());
    let mut message = SmsMessage::new(vec!["+15551110000".to_owned()], "hi");
    message.from = Some("+15557770000".to_owned());

    let response = adapter.send(&message).await.expect("send");

    mock.assert_calls(1);
    assert_eq!(response.delivered_to, 1);
}

#[tokio::test]
async fn sms_without_any_sender_is_a_validation_error() {
    let server = MockServer::start();
    let adapter = TwilioAdapter::new(TwilioCredentials::new("AC0123", "auth-token"))
        .with_endpoint(server.base_url());
    let message = SmsMessage::new(vec!["+15551110000".to_owned()], "hi");

    let outcome = adapter.send(&message).await;
    assert!(matches!(outcome, Err(SendError::Validation(_))));
}

#[tokio::test]
async fn email_chunk_goes_out_as_one_request_for_all_recipients() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v3/demo.example/messages")
            .body_includes("to=a%40example.com")
            .body_includes("to=b%40example.com");
        then.status(200)
            .json_body(json!({"id": "<1@demo.example>", "message": "Queued. Thank you."}));
    });

    let adapter = MailgunAdapter::new(MailgunCredentials::new("key", "demo.example"))
        .with_endpoint(server.base_url());
    let message = EmailMessage::new(
        vec!["a@example.com".to_owned(), "b@example.com".to_owned()],
        "Subject",
        "Body",
        "sender@demo.example",
    );

    let response = adapter.send(&message).await.expect("send");

    mock.assert_calls(1);
    assert_eq!(response.delivered_to, 2);
    assert_eq!(response.results.len(), 2);
}

#[tokio::test]
async fn email_failure_marks_the_whole_chunk() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v3/demo.example/messages");
        then.status(401).json_body(json!({"message": "Forbidden"}));
    });

    let adapter = MailgunAdapter::new(MailgunCredentials::new("bad-key", "demo.example"))
        .with_endpoint(server.base_url());
    let message = EmailMessage::new(
        vec!["a@example.com".to_owned(), "b@example.com".to_owned()],
        "Subject",
        "Body",
        "sender@demo.example",
    );

    let response = adapter.send(&message).await.expect("send");

    assert_eq!(response.delivered_to, 0);
    assert_eq!(response.results[0].error.as_deref(), Some("Forbidden"));
    assert_eq!(response.results[1].error.as_deref(), Some("Forbidden"));
}

#[tokio::test]
async fn email_beyond_the_limit_splits_into_multiple_requests() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/v3/demo.example/messages");
        then.status(200).json_body(json!({"message": "Queued."}));
    });

    let adapter = MailgunAdapter::new(MailgunCredentials::new("key", "demo.example"))
        .with_endpoint(server.base_url());
    let to: Vec<String> = (0..1001).map(|i| format!("user-{i}@example.com")).collect();
    let message = EmailMessage::new(to, "Subject", "Body", "sender@demo.example");

    let response = adapter.send(&message).await.expect("send");

    mock.assert_calls(2);
    assert_eq!(response.delivered_to, 1001);
    assert_eq!(response.results.len(), 1001);
}

#[tokio::test]
async fn slow_provider_fails_the_send_with_timeout() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v3/demo.example/messages");
        then.status(200)
            .delay(Duration::from_millis(500))
            .json_body(json!({"message": "Queued."}));
    });

    let adapter = MailgunAdapter::new(MailgunCredentials::new("key", "demo.example"))
        .with_endpoint(server.base_url())
        .with_options(DispatchOptions {
            concurrency: 2,
            timeout: Some(Duration::from_millis(50)),
        });
    let message = EmailMessage::new(
        vec!["a@example.com".to_owned()],
        "Subject",
        "Body",
        "sender@demo.example",
    );

    let outcome = adapter.send(&message).await;
    assert!(matches!(outcome, Err(SendError::Timeout(_))));
}
