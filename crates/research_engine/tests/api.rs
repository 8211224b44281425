use std::time::Duration;

use pretty_assertions::assert_eq;
use research_core::{
    ChatMessage, Citation, ConversationId, ConversationSummary, JobId, JobStatus, Role,
};
use research_engine::{ClientSettings, HttpResearchApi, ResearchApi, TransportErrorKind};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(server: &MockServer) -> HttpResearchApi {
    HttpResearchApi::new(ClientSettings {
        base_url: server.uri(),
        ..ClientSettings::default()
    })
    .expect("api")
}

#[tokio::test]
async fn create_job_sends_numeric_conversation_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/deep_research"))
        .and(body_json(json!({"query": "weather today", "conversation_id": 42})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"ok": true, "job_id": 1001})))
        .expect(1)
        .mount(&server)
        .await;

    let job_id = api_for(&server)
        .create_job("weather today", &ConversationId::new("42"))
        .await
        .expect("job created");

    assert_eq!(job_id, JobId::new("1001"));
}

#[tokio::test]
async fn create_job_accepts_string_job_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/deep_research"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"ok": true, "job_id": "rq-7f3a"})),
        )
        .mount(&server)
        .await;

    let job_id = api_for(&server)
        .create_job("q", &ConversationId::new("c-1"))
        .await
        .expect("job created");

    assert_eq!(job_id.as_str(), "rq-7f3a");
}

#[tokio::test]
async fn create_job_without_job_id_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/deep_research"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let err = api_for(&server)
        .create_job("q", &ConversationId::new("1"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, TransportErrorKind::Malformed);
    assert_eq!(err.message, "response did not include a job id");
}

#[tokio::test]
async fn status_maps_progress_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/deep_research/status/1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "status": "started",
            "phase": "searching",
            "message": "Reading sources",
            "sub_queries": ["forecast", "radar"],
            "sources_count": 5
        })))
        .mount(&server)
        .await;

    let report = api_for(&server)
        .job_status(&JobId::new("1001"))
        .await
        .expect("status");

    assert_eq!(report.status, JobStatus::Running);
    assert_eq!(report.phase.as_deref(), Some("searching"));
    assert_eq!(report.progress_message.as_deref(), Some("Reading sources"));
    assert_eq!(report.sub_queries, vec!["forecast", "radar"]);
    assert_eq!(report.sources_count, Some(5));
}

#[tokio::test]
async fn unknown_status_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/deep_research/status/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "exploded"})))
        .mount(&server)
        .await;

    let err = api_for(&server)
        .job_status(&JobId::new("5"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, TransportErrorKind::Malformed);
}

#[tokio::test]
async fn failed_status_carries_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/deep_research/status/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "failed",
            "error": "LLM quota exceeded"
        })))
        .mount(&server)
        .await;

    let report = api_for(&server)
        .job_status(&JobId::new("5"))
        .await
        .expect("status");

    assert_eq!(report.status, JobStatus::Failed);
    assert_eq!(report.error.as_deref(), Some("LLM quota exceeded"));
}

#[tokio::test]
async fn result_keeps_report_and_linked_citations() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/deep_research/result/1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result_report": "Sunny, 22°C",
            "citations": [
                {"title": "Met office", "url": "https://weather.example/today"},
                {"title": "No link"}
            ],
            "sub_queries": ["forecast"],
            "sources_count": 1,
            "model_used": "research-large"
        })))
        .mount(&server)
        .await;

    let result = api_for(&server)
        .job_result(&JobId::new("1001"))
        .await
        .expect("result");

    assert_eq!(result.report.as_deref(), Some("Sunny, 22°C"));
    assert_eq!(
        result.citations,
        vec![Citation {
            title: "Met office".to_string(),
            url: "https://weather.example/today".to_string(),
        }]
    );
    assert_eq!(result.sources_count, Some(1));
    assert_eq!(result.model_used.as_deref(), Some("research-large"));
}

#[tokio::test]
async fn history_maps_roles_and_drops_blank_summary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/history/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "summary": "  ",
            "messages": [
                {"role": "user", "content": "weather today", "created_at": "2025-10-13T09:00:00"},
                {"role": "assistant", "content": "Sunny, 22°C"}
            ]
        })))
        .mount(&server)
        .await;

    let transcript = api_for(&server)
        .conversation_history(&ConversationId::new("42"))
        .await
        .expect("history");

    assert_eq!(transcript.summary, None);
    assert_eq!(
        transcript.messages,
        vec![
            ChatMessage::new(Role::User, "weather today"),
            ChatMessage::new(Role::Assistant, "Sunny, 22°C"),
        ]
    );
}

#[tokio::test]
async fn conversations_accept_wrapped_items_and_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/conversations"))
        .and(query_param("q", "weather report"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "items": [
                {"id": 42, "title": "Weather", "summary": "Forecasts", "is_pinned": true},
                {"title": "Missing id"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let conversations = api_for(&server)
        .list_conversations(Some(" weather report "))
        .await
        .expect("conversations");

    assert_eq!(
        conversations,
        vec![ConversationSummary {
            id: ConversationId::new("42"),
            title: "Weather".to_string(),
            summary: Some("Forecasts".to_string()),
            is_pinned: true,
        }]
    );
}

#[tokio::test]
async fn conversations_accept_bare_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "7", "title": "Trip planning"}
        ])))
        .mount(&server)
        .await;

    let conversations = api_for(&server)
        .list_conversations(None)
        .await
        .expect("conversations");

    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].id.as_str(), "7");
    assert!(!conversations[0].is_pinned);
}

#[tokio::test]
async fn job_id_is_encoded_into_a_single_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/deep_research/status/a%23b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "running"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/deep_research/status/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "finished"})))
        .expect(0)
        .mount(&server)
        .await;

    let report = api_for(&server)
        .job_status(&JobId::new("a#b"))
        .await
        .expect("status");

    assert_eq!(report.status, JobStatus::Running);
}

#[tokio::test]
async fn conversation_id_with_slash_stays_in_history_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/history/team%2F7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"messages": []})))
        .expect(1)
        .mount(&server)
        .await;

    let transcript = api_for(&server)
        .conversation_history(&ConversationId::new("team/7"))
        .await
        .expect("history");

    assert!(transcript.messages.is_empty());
}

#[tokio::test]
async fn base_url_path_prefix_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat/api/deep_research/status/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "queued"})))
        .expect(2)
        .mount(&server)
        .await;

    for base_url in [format!("{}/chat", server.uri()), format!("{}/chat/", server.uri())] {
        let api = HttpResearchApi::new(ClientSettings {
            base_url,
            ..ClientSettings::default()
        })
        .expect("api");

        let report = api.job_status(&JobId::new("7")).await.expect("status");
        assert_eq!(report.status, JobStatus::Pending);
    }
}

#[tokio::test]
async fn slow_history_reload_is_bounded_by_reconcile_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/history/42"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"messages": []}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let api = HttpResearchApi::new(ClientSettings {
        base_url: server.uri(),
        reconcile_deadline: Some(Duration::from_millis(100)),
        ..ClientSettings::default()
    })
    .expect("api");

    let err = api
        .conversation_history(&ConversationId::new("42"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, TransportErrorKind::TimedOut);
}
