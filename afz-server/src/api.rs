//! `POST /api/contact` and `POST /api/newsletter`.

use std::sync::{Arc, LazyLock};

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::MailConfig;
use crate::error::ApiError;
use crate::mail::{MailMessage, Mailer};

const DEFAULT_CONTACT_SUBJECT: &str = "New contact form submission";
const NEWSLETTER_SUBJECT: &str = "New newsletter subscription";

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    mailer: Arc<dyn Mailer>,
    mail: MailConfig,
}

impl AppState {
    pub fn new(mailer: Arc<dyn Mailer>, mail: MailConfig) -> Self {
        Self { mailer, mail }
    }
}

/// Builds the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/contact", post(contact))
        .route("/api/newsletter", post(newsletter))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub subject: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct NewsletterForm {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

impl ApiResponse {
    fn ok(message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_owned(),
        })
    }
}

#[instrument(skip_all, name = "api.contact")]
async fn contact(
    State(state): State<AppState>,
    payload: Result<Json<ContactForm>, JsonRejection>,
) -> Result<Json<ApiResponse>, ApiError> {
    let Json(form) = payload?;
    let name = required(&form.name, "Name is required")?;
    let email = required(&form.email, "Email is required")?;
    let message = required(&form.message, "Message is required")?;
    if !is_email(email) {
        return Err(ApiError::Invalid("Invalid email address"));
    }
    let subject = form
        .subject
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_CONTACT_SUBJECT);

    let html_body = format!(
        "<h2>{}</h2><p><strong>Name:</strong> {}</p><p><strong>Email:</strong> {}</p><p>{}</p>",
        escape_html(subject),
        escape_html(name),
        escape_html(email),
        escape_html(message).replace('\n', "<br>"),
    );
    let receipt = state
        .mailer
        .send(MailMessage {
            from: state.mail.from.clone(),
            to: state.mail.to.clone(),
            subject: subject.to_owned(),
            html_body,
        })
        .await?;

    info!(message_id = %receipt.message_id, "contact message sent");
    Ok(ApiResponse::ok("Message sent successfully"))
}

#[instrument(skip_all, name = "api.newsletter")]
async fn newsletter(
    State(state): State<AppState>,
    payload: Result<Json<NewsletterForm>, JsonRejection>,
) -> Result<Json<ApiResponse>, ApiError> {
    let Json(form) = payload?;
    let email = required(&form.email, "Email is required")?;
    if !is_email(email) {
        return Err(ApiError::Invalid("Invalid email address"));
    }

    let receipt = state
        .mailer
        .send(MailMessage {
            from: state.mail.from.clone(),
            to: state.mail.to.clone(),
            subject: NEWSLETTER_SUBJECT.to_owned(),
            html_body: format!(
                "<p>New subscriber: <strong>{}</strong></p>",
                escape_html(email)
            ),
        })
        .await?;

    info!(message_id = %receipt.message_id, "newsletter subscription sent");
    Ok(ApiResponse::ok("Subscribed successfully"))
}

fn required<'a>(value: &'a str, reason: &'static str) -> Result<&'a str, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ApiError::Invalid(reason))
    } else {
        Ok(value)
    }
}

/// `local@domain.tld`, no whitespace, exactly one `@`.
pub(crate) fn is_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use http::{Request, StatusCode, header};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::mail::{DeliveryReceipt, MailError};

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<MailMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: MailMessage) -> Result<DeliveryReceipt, MailError> {
            if self.fail {
                return Err(MailError::Unavailable("connection refused".into()));
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push(message);
            Ok(DeliveryReceipt {
                message_id: format!("msg-{}", sent.len()),
            })
        }
    }

    fn app(mailer: Arc<RecordingMailer>) -> Router {
        router(AppState::new(
            mailer,
            MailConfig {
                from: "web@afz.org".into(),
                to: "info@afz.org".into(),
            },
        ))
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_contact_sends_mail() {
        let mailer = Arc::new(RecordingMailer::default());

        let (status, body) = post_json(
            app(mailer.clone()),
            "/api/contact",
            json!({"name": "Ana", "email": "ana@example.org", "message": "Hello\nthere"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"success": true, "message": "Message sent successfully"})
        );
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].from, "web@afz.org");
        assert_eq!(sent[0].to, "info@afz.org");
        assert_eq!(sent[0].subject, DEFAULT_CONTACT_SUBJECT);
        assert!(sent[0].html_body.contains("Hello<br>there"));
    }

    #[tokio::test]
    async fn test_contact_escapes_user_input() {
        let mailer = Arc::new(RecordingMailer::default());

        let (status, _) = post_json(
            app(mailer.clone()),
            "/api/contact",
            json!({
                "name": "<script>alert(1)</script>",
                "email": "ana@example.org",
                "subject": "Volunteering",
                "message": "Tom & Jerry"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent[0].subject, "Volunteering");
        assert!(sent[0].html_body.contains("&lt;script&gt;"));
        assert!(sent[0].html_body.contains("Tom &amp; Jerry"));
        assert!(!sent[0].html_body.contains("<script>"));
    }

    #[tokio::test]
    async fn test_contact_validation() {
        let cases = [
            (json!({"email": "ana@example.org", "message": "hi"}), "Name is required"),
            (json!({"name": "Ana", "message": "hi"}), "Email is required"),
            (json!({"name": "Ana", "email": "ana@example.org", "message": "  "}), "Message is required"),
            (json!({"name": "Ana", "email": "ana.example.org", "message": "hi"}), "Invalid email address"),
        ];
        for (payload, reason) in cases {
            let mailer = Arc::new(RecordingMailer::default());
            let (status, body) = post_json(app(mailer.clone()), "/api/contact", payload).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({"success": false, "error": reason}));
            assert!(mailer.sent.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let request = Request::post("/api/contact")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app(Arc::default()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_mailer_failure_is_generic_500() {
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..Default::default()
        });

        let (status, body) = post_json(
            app(mailer),
            "/api/newsletter",
            json!({"email": "ana@example.org"}),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"success": false, "error": "Failed to send message"})
        );
    }

    #[tokio::test]
    async fn test_newsletter_subscription() {
        let mailer = Arc::new(RecordingMailer::default());

        let (status, body) = post_json(
            app(mailer.clone()),
            "/api/newsletter",
            json!({"email": "ben@example.org"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent[0].subject, NEWSLETTER_SUBJECT);
        assert!(sent[0].html_body.contains("ben@example.org"));
    }

    #[test]
    fn test_email_shape() {
        for good in ["ana@example.org", "a.b+c@mail.afz.org"] {
            assert!(is_email(good), "{good}");
        }
        for bad in ["", "ana", "@afz.org", "ana@", "ana@afz", "ana@.org", "a b@afz.org", "a@b@afz.org", "ana@afz."] {
            assert!(!is_email(bad), "{bad}");
        }
    }
}
