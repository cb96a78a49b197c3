use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{header, StatusCode};
use axum::response::Html;
use axum::Json;
use tracing::Instrument;

use crate::models::{AskRequest, AskResponse};
use crate::state::AppState;

pub const MISSING_MESSAGE: &str = "Error: Invalid request format. 'message' key missing.";
pub const GENERATION_FAILED_PREFIX: &str = "Error: Could not generate a response. Details: ";
const REDACTED_DETAILS: &str = "upstream service error";

type AskResult = (StatusCode, Json<AskResponse>);

/// GET / — chat page.
pub async fn home() -> Html<&'static str> {
    Html(include_str!("../../templates/index.html"))
}

/// GET|POST /get — answer `message` with the RAG chain.
pub async fn ask(State(state): State<AppState>, req: Request) -> AskResult {
    let request_id = uuid::Uuid::new_v4();
    answer(state, req)
        .instrument(tracing::info_span!("ask", %request_id))
        .await
}

async fn answer(state: AppState, req: Request) -> AskResult {
    let Some(message) = extract_message(req).await else {
        tracing::warn!("'message' key not found in request data");
        return reply(StatusCode::BAD_REQUEST, MISSING_MESSAGE.to_string());
    };

    tracing::info!("Received query: {message}");

    match state.chain.invoke(&message).await {
        Ok(output) => {
            tracing::info!(
                "Response generated from {} documents",
                output.context.len()
            );
            reply(StatusCode::OK, output.answer)
        }
        Err(e) => {
            tracing::error!("RAG chain failed to invoke: {e:#}");
            let details = if state.expose_error_details {
                format!("{e:#}")
            } else {
                REDACTED_DETAILS.to_string()
            };
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{GENERATION_FAILED_PREFIX}{details}"),
            )
        }
    }
}

fn reply(status: StatusCode, answer: String) -> AskResult {
    (status, Json(AskResponse { answer }))
}

/// How a request body is encoded, judged from its `Content-Type`.
#[derive(Debug, PartialEq)]
enum BodyKind {
    Json,
    Multipart,
    UrlEncoded,
    Other,
}

fn body_kind(req: &Request) -> BodyKind {
    let Some(content_type) = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return BodyKind::Other;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
    {
        BodyKind::Json
    } else if mime == "multipart/form-data" {
        BodyKind::Multipart
    } else if mime == "application/x-www-form-urlencoded" {
        BodyKind::UrlEncoded
    } else {
        BodyKind::Other
    }
}

/// Pull `message` out of the request body: JSON, or form fields sent
/// urlencoded or as multipart. The query string is never consulted, and any
/// decoding failure counts as missing.
async fn extract_message(req: Request) -> Option<String> {
    match body_kind(&req) {
        BodyKind::Json => {
            let Json(body) = Json::<AskRequest>::from_request(req, &()).await.ok()?;
            body.message
        }
        BodyKind::UrlEncoded => {
            let bytes = Bytes::from_request(req, &()).await.ok()?;
            serde_urlencoded::from_bytes::<AskRequest>(&bytes)
                .ok()?
                .message
        }
        BodyKind::Multipart => {
            let mut multipart = Multipart::from_request(req, &()).await.ok()?;
            while let Ok(Some(field)) = multipart.next_field().await {
                // uploaded files are not form fields
                if field.name() == Some("message") && field.file_name().is_none() {
                    return field.text().await.ok();
                }
            }
            None
        }
        BodyKind::Other => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(method: &str, uri: &str, content_type: Option<&str>, body: &str) -> Request {
        let mut builder = axum::http::Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[test]
    fn test_body_kind_variants() {
        let kind = |ct: Option<&str>| body_kind(&request("POST", "/get", ct, ""));
        assert_eq!(kind(Some("application/json")), BodyKind::Json);
        assert_eq!(kind(Some("application/json; charset=utf-8")), BodyKind::Json);
        assert_eq!(kind(Some("application/ld+json")), BodyKind::Json);
        assert_eq!(
            kind(Some("application/x-www-form-urlencoded")),
            BodyKind::UrlEncoded
        );
        assert_eq!(
            kind(Some("multipart/form-data; boundary=XB")),
            BodyKind::Multipart
        );
        assert_eq!(kind(Some("text/plain")), BodyKind::Other);
        assert_eq!(kind(None), BodyKind::Other);
    }

    #[tokio::test]
    async fn test_extract_from_json() {
        let req = request(
            "POST",
            "/get",
            Some("application/json"),
            r#"{"message":"What is diabetes?"}"#,
        );
        assert_eq!(
            extract_message(req).await.as_deref(),
            Some("What is diabetes?")
        );
    }

    #[tokio::test]
    async fn test_extract_from_form_body() {
        let req = request(
            "POST",
            "/get",
            Some("application/x-www-form-urlencoded"),
            "message=What+is+acne%3F",
        );
        assert_eq!(extract_message(req).await.as_deref(), Some("What is acne?"));
    }

    #[tokio::test]
    async fn test_query_string_is_ignored() {
        let req = request("GET", "/get?message=hello", None, "");
        assert!(extract_message(req).await.is_none());
        let req = request(
            "GET",
            "/get?message=hello",
            Some("application/x-www-form-urlencoded"),
            "",
        );
        assert!(extract_message(req).await.is_none());
    }

    #[tokio::test]
    async fn test_extract_from_form_body_on_get() {
        let req = request(
            "GET",
            "/get",
            Some("application/x-www-form-urlencoded"),
            "message=hello",
        );
        assert_eq!(extract_message(req).await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_extract_from_multipart() {
        let body = "--XB\r\n\
                    Content-Disposition: form-data; name=\"other\"\r\n\r\n\
                    ignored\r\n\
                    --XB\r\n\
                    Content-Disposition: form-data; name=\"message\"\r\n\r\n\
                    What is asthma?\r\n\
                    --XB--\r\n";
        let req = request("POST", "/get", Some("multipart/form-data; boundary=XB"), body);
        assert_eq!(extract_message(req).await.as_deref(), Some("What is asthma?"));
    }

    #[tokio::test]
    async fn test_multipart_file_named_message_is_not_a_field() {
        let body = "--XB\r\n\
                    Content-Disposition: form-data; name=\"message\"; filename=\"q.txt\"\r\n\
                    Content-Type: text/plain\r\n\r\n\
                    hi\r\n\
                    --XB--\r\n";
        let req = request("POST", "/get", Some("multipart/form-data; boundary=XB"), body);
        assert!(extract_message(req).await.is_none());
    }

    #[tokio::test]
    async fn test_extract_null_message_is_missing() {
        let req = request("POST", "/get", Some("application/json"), r#"{"message":null}"#);
        assert!(extract_message(req).await.is_none());
    }

    #[tokio::test]
    async fn test_extract_missing_field() {
        let req = request("POST", "/get", Some("application/json"), r#"{"msg":"hi"}"#);
        assert!(extract_message(req).await.is_none());
    }

    #[tokio::test]
    async fn test_extract_malformed_json() {
        let req = request("POST", "/get", Some("application/json"), "{not json");
        assert!(extract_message(req).await.is_none());
    }

    #[tokio::test]
    async fn test_extract_empty_message_is_present() {
        let req = request("POST", "/get", Some("application/json"), r#"{"message":""}"#);
        assert_eq!(extract_message(req).await.as_deref(), Some(""));
    }
}
