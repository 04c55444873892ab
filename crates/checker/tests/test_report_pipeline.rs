use std::sync::Arc;

use safecheck_checker::{
    AnalysisPipeline, CheckerConfig, DiagnosticSeverity, OllamaClient, TEXT_REPORT_SEPARATOR,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VULNERABLE_SOURCE: &str = r#"import os

API_KEY = "sk-live-1234567890abcdef"

def connect():
    password = "hunter2"
    return os.environ.get("DB_HOST"), password

def main():
    connect()
"#;

/// The report arrives over the wire in streamed chunks, with the JSON split
/// mid-token and wrapped in prose, the way a real model answers.
fn streamed_report_body() -> String {
    [
        r#"{"response":"Here is my analysis:\n"}"#,
        "\n",
        r#"{"response":"{\"summary\":{\"total_vulnerabilities\":2,\"critical_count\":1,\"high_count\":1},"}"#,
        "\n",
        r#"{"response":"\"vulnerabilities\":[{\"type\":\"Hardcoded Secret\",\"description\":\"API key committed to source\",\"location\":\"line 3\",\"severity\":\"critical\",\"cwe_id\":\"CWE-798\"},"}"#,
        "\n",
        r#"{"response":"{\"type\":\"Hardcoded Password\",\"description\":\"password literal\",\"location\":\"line 6\",\"severity\":\"high\",\"owasp_category\":\"A07:2021\"}]}"}"#,
        "\n",
        r#"{"response":"","done":true}"#,
        "\n",
    ]
    .join("")
}

async fn mock_generate(server: &MockServer, body: String) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(server)
        .await;
}

fn pipeline_for(server: &MockServer) -> AnalysisPipeline {
    let config = CheckerConfig {
        endpoint: server.uri(),
        ..CheckerConfig::default()
    };
    let client = OllamaClient::new(server.uri(), config.model.clone());
    AnalysisPipeline::new(Arc::new(client), config)
}

#[tokio::test]
async fn test_streamed_report_becomes_line_anchored_diagnostics() {
    let server = MockServer::start().await;
    mock_generate(&server, streamed_report_body()).await;

    let pipeline = pipeline_for(&server);
    let run = pipeline
        .analyze_document("app.py", VULNERABLE_SOURCE)
        .await
        .unwrap();

    assert!(run.parsed.is_structured());
    assert_eq!(run.diagnostics.len(), 2);

    let secret = &run.diagnostics[0];
    assert_eq!(secret.line, 2);
    assert_eq!(secret.severity, DiagnosticSeverity::Error);
    assert_eq!(secret.code.as_deref(), Some("CWE-798"));

    let password = &run.diagnostics[1];
    assert_eq!(password.line, 5);
    assert_eq!(password.severity, DiagnosticSeverity::Error);
    assert_eq!(password.code.as_deref(), Some("A07:2021"));

    assert_eq!(
        run.notification.as_deref(),
        Some("2 vulnerabilities (1 critical, 1 high)")
    );
    assert_eq!(pipeline.diagnostics_for("app.py").len(), 2);
}

#[tokio::test]
async fn test_prose_only_answer_falls_back_to_raw_report() {
    let server = MockServer::start().await;
    let body = [
        r#"{"response":"I reviewed the code and "}"#,
        "\n",
        r#"{"response":"found nothing of note.","done":true}"#,
        "\n",
    ]
    .join("");
    mock_generate(&server, body).await;

    let pipeline = pipeline_for(&server);
    let run = pipeline
        .analyze_document("app.py", VULNERABLE_SOURCE)
        .await
        .unwrap();

    assert!(!run.parsed.is_structured());
    assert_eq!(run.raw_text, "I reviewed the code and found nothing of note.");
    assert!(run.diagnostics.is_empty());
    assert!(pipeline.diagnostics_for("app.py").is_empty());
}

#[tokio::test]
async fn test_text_mode_runs_both_prompts_over_the_wire() {
    let server = MockServer::start().await;
    let body = [r#"{"response":"Looks fine.","done":true}"#, "\n"].join("");
    mock_generate(&server, body).await;

    let pipeline = pipeline_for(&server);
    let combined = pipeline.check_text(VULNERABLE_SOURCE).await.unwrap();

    assert_eq!(
        combined,
        format!("Looks fine.{TEXT_REPORT_SEPARATOR}Looks fine.{TEXT_REPORT_SEPARATOR}")
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_unreachable_endpoint_surfaces_transport_error() {
    let config = CheckerConfig {
        endpoint: "http://127.0.0.1:1".to_string(),
        ..CheckerConfig::default()
    };
    let client = OllamaClient::new(config.endpoint.clone(), config.model.clone());
    let pipeline = AnalysisPipeline::new(Arc::new(client), config);

    let err = pipeline
        .analyze_document("app.py", VULNERABLE_SOURCE)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Inference request failed"));
}
