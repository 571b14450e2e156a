//! The worker's background sync delivering to a running server.

use std::sync::Arc;

use afz_moka::MokaStorage;
use afz_reqwest::ReqwestNetwork;
use afz_server::{AppState, LogMailer, MailConfig, router};
use afz_worker::{ServiceWorker, SubmissionOutcome, WorkerConfig};
use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;

async fn serve(mailer: Arc<LogMailer>) -> Url {
    let app = router(AppState::new(
        mailer,
        MailConfig {
            from: "web@afz.org".into(),
            to: "info@afz.org".into(),
        },
    ));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{address}")).unwrap()
}

fn worker(origin: Url) -> ServiceWorker {
    ServiceWorker::builder()
        .config(
            WorkerConfig::builder()
                .version("v1")
                .origin(origin)
                .build()
                .unwrap(),
        )
        .storage(MokaStorage::builder().max_entries(16).build())
        .network(ReqwestNetwork::default())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_queued_contact_messages_reach_the_mailer() {
    let mailer = Arc::new(LogMailer::new());
    let worker = worker(serve(mailer.clone()).await);
    let sync = worker.background_sync();

    sync.enqueue(json!({"name": "Ana", "email": "ana@example.org", "message": "Hello"}))
        .await
        .unwrap();
    sync.enqueue(json!({"name": "", "email": "ben@example.org", "message": "No name"}))
        .await
        .unwrap();

    let report = worker.sync("contact-form-sync").await.unwrap().unwrap();

    assert_eq!(report.delivered, vec![1]);
    assert_eq!(report.pending, vec![2], "400 keeps the record pending");
    assert_eq!(mailer.sent(), 1);
}

#[tokio::test]
async fn test_online_submission_is_answered_by_the_server() {
    let mailer = Arc::new(LogMailer::new());
    let worker = worker(serve(mailer.clone()).await);

    let outcome = worker
        .queue_submission(json!({"name": "Ana", "email": "ana@example.org", "message": "Hi"}))
        .await
        .unwrap();

    let SubmissionOutcome::Sent(response) = outcome else {
        panic!("server was reachable");
    };
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(mailer.sent(), 1);
}
