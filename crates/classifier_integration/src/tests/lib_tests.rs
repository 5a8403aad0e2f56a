use super::*;
use axum::{http::StatusCode, routing::post, Json, Router};
use tokio::net::TcpListener;

async fn echo_labels(Json(payload): Json<serde_json::Value>) -> String {
    serde_json::json!({
        "L1": "Facilities",
        "echo_description": payload["description"],
        "echo_supplier": payload["supplier"],
    })
    .to_string()
}

async fn plain_text() -> &'static str {
    "not valid json"
}

async fn failing() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "model exploded")
}

async fn spawn_classifier_server() -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/classify", post(echo_labels))
        .route("/text", post(plain_text))
        .route("/fail", post(failing));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

fn classifier_for(base: &str, path: &str) -> HttpPoClassifier {
    HttpPoClassifier::new(&ClassifierConfig {
        endpoint: Url::parse(&format!("{base}{path}")).expect("url"),
        timeout: Duration::from_secs(5),
    })
    .expect("client")
}

#[tokio::test]
async fn posts_description_and_supplier_as_json() {
    let base = spawn_classifier_server().await.expect("spawn server");
    let classifier = classifier_for(&base, "/classify");

    let raw = classifier
        .classify_po("HVAC maintenance", "Acme")
        .await
        .expect("classify");
    let parsed: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(parsed["L1"], "Facilities");
    assert_eq!(parsed["echo_description"], "HVAC maintenance");
    assert_eq!(parsed["echo_supplier"], "Acme");
}

#[tokio::test]
async fn returns_non_json_bodies_untouched() {
    let base = spawn_classifier_server().await.expect("spawn server");
    let classifier = classifier_for(&base, "/text");

    let raw = classifier.classify_po("toner", "").await.expect("classify");
    assert_eq!(raw, "not valid json");
}

#[tokio::test]
async fn error_status_is_a_collaborator_failure() {
    let base = spawn_classifier_server().await.expect("spawn server");
    let classifier = classifier_for(&base, "/fail");

    let err = classifier
        .classify_po("toner", "")
        .await
        .expect_err("should fail");
    assert!(err.to_string().contains("500"), "unexpected error: {err}");
}

#[tokio::test]
async fn unreachable_endpoint_is_a_collaborator_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let classifier = classifier_for(&format!("http://{addr}"), "/classify");
    assert!(classifier.classify_po("toner", "").await.is_err());
}
