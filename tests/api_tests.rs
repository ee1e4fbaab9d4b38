mod common;

use std::time::Duration;

use common::MockBackend;
use invoice_reminder::api::{EnvToken, StaticToken, TokenProvider};
use invoice_reminder::chat::{close_session, send_message, ChatPayload, ChatReply, ChatSession};
use invoice_reminder::logs::EmailLog;
use invoice_reminder::{ApiClient, Dispatch, InvoiceStore, ReminderError, SendEmailsRequest};

fn client(backend: &MockBackend) -> ApiClient {
    ApiClient::new(
        &format!("{}/", backend.base_url()),
        Duration::from_secs(5),
        Box::new(StaticToken("test-token".to_string())),
    )
}

#[test]
fn test_list_invoices_sends_bearer_token() {
    let backend = MockBackend::builder()
        .route("GET", "/api/invoices", 200, common::INVOICES_JSON)
        .start();
    let api = client(&backend);

    let store = InvoiceStore::from_raw(api.list_invoices().unwrap()).unwrap();
    assert_eq!(store.len(), 4);

    let requests = backend.requests_to("GET", "/api/invoices");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer test-token"));
}

#[test]
fn test_unauthorized_response_requires_sign_in() {
    let backend = MockBackend::builder()
        .route("GET", "/api/invoices", 401, r#"{"message":"expired"}"#)
        .start();

    let err = client(&backend).list_invoices().unwrap_err();
    assert!(matches!(err, ReminderError::InteractionRequired { login } if login == "reminder"));
}

#[test]
fn test_server_error_carries_status_and_body() {
    let backend = MockBackend::builder()
        .route("GET", "/api/logs", 503, "unavailable")
        .start();

    let err = client(&backend).list_logs().unwrap_err();
    match err {
        ReminderError::Backend { path, status, body } => {
            assert_eq!(path, "/logs");
            assert_eq!(status, 503);
            assert_eq!(body, "unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_send_emails_posts_batch() {
    let backend = MockBackend::builder()
        .route("POST", "/api/send-emails", 200, r#"{"enqueued_departments": 2}"#)
        .start();
    let api = client(&backend);

    let request = SendEmailsRequest {
        invoice_ids: vec!["INV-001".to_string(), "INV-004".to_string()],
        template: None,
        sent_by: "ops".to_string(),
        attachments: vec!["invoices/2025-01/INV-001.pdf".to_string()],
    };
    let response = api.send_emails(&request).unwrap();
    assert_eq!(response.enqueued_departments, 2);

    let sent = backend.requests_to("POST", "/api/send-emails");
    let body: serde_json::Value = serde_json::from_str(&sent[0].body).unwrap();
    assert_eq!(body["invoice_ids"], serde_json::json!(["INV-001", "INV-004"]));
    assert!(body["template"].is_null());
    assert_eq!(body["sent_by"], "ops");
}

#[test]
fn test_mark_paid_and_save_log() {
    let backend = MockBackend::builder()
        .route("POST", "/api/invoices/INV-002/mark-paid", 200, "")
        .route("POST", "/api/logs", 201, r#"{"ok": true}"#)
        .start();
    let api = client(&backend);

    api.mark_paid("INV-002").unwrap();

    let mut entry = EmailLog {
        template_used: "Default Reminder".to_string(),
        ..Default::default()
    };
    api.save_log(&mut entry).unwrap();
    assert!(entry.log_id.starts_with("LOG-"));
    assert!(!entry.timestamp.is_empty());

    let saved = backend.requests_to("POST", "/api/logs");
    let body: serde_json::Value = serde_json::from_str(&saved[0].body).unwrap();
    assert_eq!(body["log_id"], entry.log_id.as_str());
    assert_eq!(body["template_used"], "Default Reminder");
}

#[test]
fn test_chat_adopts_session_and_decodes_csv() {
    let backend = MockBackend::builder()
        .route(
            "POST",
            "/api/chat",
            200,
            r#"{"sessionId": "s-42", "source": "csv", "csvBase64": "aWQsYW1vdW50CjEsMTAK", "filename": "", "count": 1}"#,
        )
        .route("POST", "/api/chat/close", 200, "{}")
        .start();
    let api = client(&backend);
    let mut session = ChatSession::default();

    let reply = send_message(&api, &mut session, "export unpaid").unwrap();
    assert_eq!(session.session_id.as_deref(), Some("s-42"));
    match reply {
        ChatReply::Csv(export) => {
            assert_eq!(export.filename, "export.csv");
            assert_eq!(export.rows.as_deref(), Some("1"));
            assert_eq!(export.data, b"id,amount\n1,10\n");
        }
        other => panic!("expected csv reply, got {other:?}"),
    }

    send_message(&api, &mut session, "again").unwrap();
    let chats = backend.requests_to("POST", "/api/chat");
    let first: serde_json::Value = serde_json::from_str(&chats[0].body).unwrap();
    let second: serde_json::Value = serde_json::from_str(&chats[1].body).unwrap();
    assert!(first.get("sessionId").is_none());
    assert_eq!(second["sessionId"], "s-42");
    assert_eq!(second["message"], "again");

    assert!(close_session(&api, &mut session));
    assert!(!session.is_open());
    assert!(!close_session(&api, &mut session));
    let closed: serde_json::Value =
        serde_json::from_str(&backend.requests_to("POST", "/api/chat/close")[0].body).unwrap();
    assert_eq!(closed["sessionId"], "s-42");
}

#[test]
fn test_close_session_clears_even_when_backend_fails() {
    let backend = MockBackend::builder()
        .route("POST", "/api/chat/close", 500, "")
        .start();
    let api = client(&backend);
    let mut session = ChatSession {
        session_id: Some("s-1".to_string()),
    };

    assert!(close_session(&api, &mut session));
    assert!(!session.is_open());
}

#[test]
fn test_chat_payload_replies() {
    let text: ChatPayload = serde_json::from_str(r#"{"text": "3 invoices are overdue"}"#).unwrap();
    assert_eq!(
        text.into_reply().unwrap(),
        ChatReply::Text("3 invoices are overdue".to_string())
    );

    let empty: ChatPayload = serde_json::from_str("{}").unwrap();
    assert_eq!(empty.into_reply().unwrap(), ChatReply::Empty);

    let broken: ChatPayload =
        serde_json::from_str(r#"{"source": "csv", "csvBase64": "***"}"#).unwrap();
    assert!(matches!(
        broken.into_reply(),
        Err(ReminderError::InvalidExport(_))
    ));
}

#[test]
fn test_csv_export_accepts_wrapped_and_unpadded_base64() {
    for encoded in [
        "aWQsYW1vdW50\nCkEsMTAwCg==",
        "aWQsYW1vdW50CkEsMTAwCg",
        "aWQsYW1v\r\ndW50CkEs MTAwCg",
    ] {
        let payload: ChatPayload = serde_json::from_value(serde_json::json!({
            "source": "csv",
            "csvBase64": encoded,
            "filename": "unpaid.csv",
        }))
        .unwrap();

        match payload.into_reply().unwrap() {
            ChatReply::Csv(export) => {
                assert_eq!(export.filename, "unpaid.csv");
                assert_eq!(export.data, b"id,amount\nA,100\n", "input {encoded:?}");
            }
            other => panic!("expected csv reply for {encoded:?}, got {other:?}"),
        }
    }
}

#[test]
fn test_env_token_requires_a_value() {
    let provider = EnvToken::new("REMINDER_TEST_TOKEN_THAT_IS_NEVER_SET", "az login");
    let err = provider.access_token().unwrap_err();
    assert!(matches!(err, ReminderError::NoAccount { login } if login == "az login"));
    assert_eq!(provider.login_hint(), "az login");
}
