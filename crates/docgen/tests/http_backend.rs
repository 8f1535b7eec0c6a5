use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use docgen::schema::SALES_CONTRACT;
use docgen::{
    DocgenError, DocumentBackend, DocumentFormat, DocumentId, DocumentLifecycleController,
    DocumentState, FormValues, HttpBackend, SchemaRegistry, TemplateId, TransportError,
    UploadRequest,
};
use reqwest::StatusCode;
use serde_json::{Value, json};
use url::Url;

struct CapturedRequest {
    method: String,
    target: String,
    headers: String,
    body: Vec<u8>,
}

impl CapturedRequest {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("request body is json")
    }

    fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Accepts one connection, captures the request, and answers with `status`,
/// `extra_headers`, and `body`.
fn serve_once(
    status: &str,
    extra_headers: &str,
    body: &[u8],
) -> (HttpBackend, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let status = status.to_string();
    let extra_headers = extra_headers.to_string();
    let body = body.to_vec();
    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let request = read_request(&mut stream);
        let mut response = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n{extra_headers}\r\n",
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(&body);
        stream.write_all(&response).unwrap();
        request
    });
    let base = Url::parse(&format!("http://{addr}")).unwrap();
    let backend = HttpBackend::new(base, Duration::from_secs(5)).unwrap();
    (backend, handle)
}

/// Accepts one connection and never answers it. The connection is held open
/// until the returned sender is dropped.
fn serve_stalled(timeout: Duration) -> (HttpBackend, mpsc::Sender<()>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (release, released) = mpsc::channel::<()>();
    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let _ = released.recv();
        drop(stream);
    });
    let base = Url::parse(&format!("http://{addr}")).unwrap();
    let backend = HttpBackend::new(base, timeout).unwrap();
    (backend, release, handle)
}

fn read_request(stream: &mut impl Read) -> CapturedRequest {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let read = stream.read(&mut chunk).unwrap();
        assert!(read > 0, "connection closed before headers ended");
        raw.extend_from_slice(&chunk[..read]);
        if let Some(pos) = raw.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&raw[..header_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .map(|(_, value)| value.trim().parse::<usize>().unwrap())
        .unwrap_or(0);
    while raw.len() < header_end + content_length {
        let read = stream.read(&mut chunk).unwrap();
        assert!(read > 0, "connection closed before body ended");
        raw.extend_from_slice(&chunk[..read]);
    }

    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap().split_whitespace();
    CapturedRequest {
        method: request_line.next().unwrap().to_string(),
        target: request_line.next().unwrap().to_string(),
        headers: head.to_ascii_lowercase(),
        body: raw[header_end..header_end + content_length].to_vec(),
    }
}

#[tokio::test]
async fn lists_templates_with_numeric_ids() {
    let (backend, handle) = serve_once(
        "200 OK",
        "Content-Type: application/json\r\n",
        r#"[{"id": 1, "name": "Договор купли-продажи"}, {"id": "2", "name": "B", "description": "d"}]"#
            .as_bytes(),
    );
    let templates = backend.list_templates().await.expect("templates listed");
    let request = handle.join().unwrap();

    assert_eq!(request.method, "GET");
    assert_eq!(request.target, "/templates/");
    assert_eq!(templates.len(), 2);
    assert_eq!(templates[0].id, TemplateId::new("1"));
    assert_eq!(templates[0].name, "Договор купли-продажи");
    assert_eq!(templates[1].description.as_deref(), Some("d"));
}

#[tokio::test]
async fn generate_posts_payload_as_json() {
    let (backend, handle) = serve_once(
        "200 OK",
        "Content-Type: application/json\r\n",
        br#"{"document_id": 12, "file_path": "generated/document_12.docx"}"#,
    );
    let mut payload = serde_json::Map::new();
    payload.insert("seller_name".into(), json!("A"));
    payload.insert("price".into(), json!(1000));
    payload.insert("template_id".into(), json!("1"));

    let response = backend
        .generate(&TemplateId::new("1"), payload)
        .await
        .expect("generation response");
    let request = handle.join().unwrap();

    assert_eq!(request.method, "POST");
    assert_eq!(request.target, "/generate/1/");
    assert!(request.headers.contains("content-type: application/json"));
    assert_eq!(
        request.json(),
        json!({"seller_name": "A", "price": 1000, "template_id": "1"})
    );
    assert_eq!(response.document_id, Some(DocumentId::new("12")));
    assert_eq!(
        response.file_path.as_deref(),
        Some("generated/document_12.docx")
    );
}

#[tokio::test]
async fn edit_posts_to_document_path() {
    let (backend, handle) = serve_once(
        "200 OK",
        "Content-Type: application/json\r\n",
        br#"{"file_path": "generated/document_12_v2.docx"}"#,
    );
    let mut payload = serde_json::Map::new();
    payload.insert("item".into(), json!("Boat"));

    let response = backend
        .edit(&DocumentId::new("12"), payload)
        .await
        .expect("edit response");
    let request = handle.join().unwrap();

    assert_eq!(request.method, "POST");
    assert_eq!(request.target, "/edit-document/12/");
    assert_eq!(request.json(), json!({"item": "Boat"}));
    assert_eq!(
        response.file_path.as_deref(),
        Some("generated/document_12_v2.docx")
    );
}

#[tokio::test]
async fn create_template_posts_name() {
    let (backend, handle) = serve_once(
        "200 OK",
        "Content-Type: application/json\r\n",
        r#"{"id": 5, "name": "Доверенность"}"#.as_bytes(),
    );
    let template = backend.create_template("Доверенность").await.unwrap();
    let request = handle.join().unwrap();

    assert_eq!(request.method, "POST");
    assert_eq!(request.target, "/templates/");
    assert_eq!(request.json(), json!({"name": "Доверенность"}));
    assert_eq!(template.id, TemplateId::new("5"));
}

#[tokio::test]
async fn upload_sends_multipart_form() {
    let (backend, handle) = serve_once(
        "200 OK",
        "Content-Type: application/json\r\n",
        br#"{"template_id": 9}"#,
    );
    let receipt = backend
        .upload_template(UploadRequest {
            name: "Аренда".into(),
            description: "Типовой".into(),
            file_name: "lease.docx".into(),
            file_bytes: b"PK-docx-bytes".to_vec(),
        })
        .await
        .expect("upload accepted");
    let request = handle.join().unwrap();

    assert_eq!(request.method, "POST");
    assert_eq!(request.target, "/upload-template/");
    assert!(request.headers.contains("content-type: multipart/form-data"));
    let body = request.body_text();
    assert!(body.contains(r#"name="file"; filename="lease.docx""#));
    assert!(body.contains("PK-docx-bytes"));
    assert!(body.contains(r#"name="name""#));
    assert!(body.contains("Аренда"));
    assert!(body.contains(r#"name="description""#));
    assert!(body.contains("Типовой"));
    assert_eq!(receipt.template_id, TemplateId::new("9"));
}

#[tokio::test]
async fn download_uses_format_query_and_disposition() {
    let (backend, handle) = serve_once(
        "200 OK",
        "Content-Type: application/pdf\r\nContent-Disposition: attachment; filename=\"document_12.pdf\"\r\n",
        b"%PDF-1.7",
    );
    let artifact = backend
        .download(&DocumentId::new("12"), DocumentFormat::Pdf)
        .await
        .expect("artifact downloaded");
    let request = handle.join().unwrap();

    assert_eq!(request.method, "GET");
    assert_eq!(request.target, "/documents/12?format=pdf");
    assert_eq!(artifact.bytes, b"%PDF-1.7");
    assert_eq!(artifact.file_name.as_deref(), Some("document_12.pdf"));
}

#[tokio::test]
async fn error_status_carries_backend_reason() {
    let (backend, handle) = serve_once(
        "404 Not Found",
        "Content-Type: application/json\r\n",
        br#"{"error": "Template not found"}"#,
    );
    let err = backend
        .generate(&TemplateId::new("77"), serde_json::Map::new())
        .await
        .unwrap_err();
    handle.join().unwrap();

    match err {
        TransportError::Rejected { status, reason } => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(reason.as_deref(), Some("Template not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn error_status_without_reason_reports_status() {
    let (backend, handle) = serve_once("500 Internal Server Error", "", b"boom");
    let err = backend.list_templates().await.unwrap_err();
    handle.join().unwrap();

    assert!(matches!(err, TransportError::Rejected { reason: None, .. }));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn undecodable_body_is_malformed() {
    let (backend, handle) = serve_once(
        "200 OK",
        "Content-Type: application/json\r\n",
        b"{\"templates\": true}",
    );
    let err = backend.list_templates().await.unwrap_err();
    handle.join().unwrap();

    assert!(matches!(err, TransportError::Malformed(_)));
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base = Url::parse(&format!("http://{addr}")).unwrap();
    let backend = HttpBackend::new(base, Duration::from_secs(5)).unwrap();
    let err = backend.list_templates().await.unwrap_err();
    assert!(matches!(err, TransportError::Unreachable(_)));
}

#[tokio::test]
async fn unanswered_request_times_out() {
    let (backend, release, handle) = serve_stalled(Duration::from_millis(300));
    let err = backend.list_templates().await.unwrap_err();
    drop(release);
    handle.join().unwrap();

    assert!(matches!(err, TransportError::Timeout), "{err:?}");
    assert_eq!(err.to_string(), "request timed out");
}

#[tokio::test]
async fn generation_timeout_fails_without_document() {
    let (backend, release, handle) = serve_stalled(Duration::from_millis(300));
    let schema = SchemaRegistry::with_builtin()
        .resolve(SALES_CONTRACT)
        .unwrap();
    let values: FormValues = [
        ("seller_name", "A"),
        ("buyer_name", "B"),
        ("item", "Car"),
        ("price", "1000"),
    ]
    .into_iter()
    .collect();
    let mut controller = DocumentLifecycleController::new(backend);

    let err = controller
        .generate(&TemplateId::new("1"), schema, values)
        .await
        .unwrap_err();
    drop(release);
    handle.join().unwrap();

    assert!(
        matches!(err, DocgenError::GenerationFailed(ref reason) if reason.contains("timed out")),
        "{err:?}"
    );
    assert_eq!(controller.state(), DocumentState::NoDocument);
    assert!(controller.record().is_none());
}

#[tokio::test]
async fn dot_segment_disposition_leaves_file_name_unset() {
    let (backend, handle) = serve_once(
        "200 OK",
        "Content-Type: application/pdf\r\nContent-Disposition: attachment; filename=\"..\"\r\n",
        b"%PDF-1.7",
    );
    let artifact = backend
        .download(&DocumentId::new("12"), DocumentFormat::Pdf)
        .await
        .expect("artifact downloaded");
    handle.join().unwrap();

    assert_eq!(artifact.bytes, b"%PDF-1.7");
    assert_eq!(artifact.file_name, None);
}
