//! # Interview HTTP Handlers
//!
//! The three public endpoints, all thin delegations:
//! - `GET /` - landing page with the opening question substituted in
//! - `POST /api/answer` - multipart upload of one spoken answer → pipeline
//! - `GET /api/audio/{filename}` - retrieve previously synthesized feedback audio
//!
//! No business logic lives here beyond multipart draining and filename
//! hygiene; everything interesting happens in `pipeline::process`.

use crate::error::AppError;
use crate::interview::SessionRegistry;
use crate::pipeline;
use crate::state::AppState;
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use tracing::debug;

/// Landing page template; `{{question}}` is replaced with the opening question.
const INDEX_TEMPLATE: &str = include_str!("../../static/index.html");

/// Session tokens are freeform but short; anything longer is garbage.
const MAX_SESSION_TOKEN_BYTES: usize = 256;

/// Serve the landing page with the first interview question filled in.
pub async fn index(state: web::Data<AppState>) -> HttpResponse {
    let page = INDEX_TEMPLATE.replace("{{question}}", state.sessions.first_question());
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(page)
}

/// Accept one spoken answer and run it through the full pipeline.
///
/// ## Request:
/// Multipart form data with a binary `audio` field (webm or similar) and an
/// optional text `session` field carrying the session token. Without a token
/// a fresh one is minted and returned as `session_id`, so the browser can
/// thread subsequent answers onto the same interview.
///
/// ## Responses:
/// - `200` - the serialized `AnswerResult`
/// - `400` - `{error}` when the `audio` field is missing or malformed; no
///   session state is touched in that case
pub async fn answer(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let max_upload = state.get_config().audio.max_upload_bytes;

    let mut audio_data: Option<Vec<u8>> = None;
    let mut session_token: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::Input(format!("Malformed multipart payload: {}", e)))?;

        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .map(|s| s.to_string());

        match name.as_deref() {
            Some("audio") => {
                audio_data = Some(read_field_bytes(&mut field, max_upload).await?);
            }
            Some("session") => {
                let bytes = read_field_bytes(&mut field, MAX_SESSION_TOKEN_BYTES).await?;
                session_token = Some(String::from_utf8_lossy(&bytes).trim().to_string());
            }
            other => {
                debug!(field = ?other, "ignoring unexpected multipart field");
                // Drain so the stream can move on to the next field.
                let _ = read_field_bytes(&mut field, max_upload).await?;
            }
        }
    }

    let audio = audio_data
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| AppError::Input("No audio file provided".to_string()))?;

    let token = session_token
        .filter(|t| !t.is_empty())
        .unwrap_or_else(SessionRegistry::new_session_token);

    let result = pipeline::process(&state, audio, token).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// Stream a previously synthesized feedback file as `audio/mpeg`.
///
/// Filenames are generated server-side (UUID-based), so anything outside the
/// safe character set is rejected outright, in particular path separators
/// and `..`, which would otherwise escape the work directory.
pub async fn fetch_audio(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let filename = path.into_inner();
    if !is_safe_filename(&filename) {
        return Err(AppError::Input(format!("Invalid audio filename: {}", filename)));
    }

    let full_path = state.get_config().audio.work_dir.join(&filename);
    let bytes = tokio::fs::read(&full_path).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            AppError::NotFound(format!("No synthesized audio named {}", filename))
        } else {
            AppError::Internal(format!("Failed to read {}: {}", filename, err))
        }
    })?;

    Ok(HttpResponse::Ok().content_type("audio/mpeg").body(bytes))
}

/// Drain one multipart field into memory, enforcing a size cap.
async fn read_field_bytes(field: &mut Field, limit: usize) -> Result<Vec<u8>, AppError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk =
            chunk.map_err(|e| AppError::Input(format!("Error reading multipart field: {}", e)))?;
        if bytes.len() + chunk.len() > limit {
            return Err(AppError::Input(format!(
                "Field exceeds the {} byte limit",
                limit
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use actix_web::{http::StatusCode, test, App};
    use uuid::Uuid;

    fn test_state() -> AppState {
        let mut config = AppConfig::default();
        config.services.api_key = "test-key".to_string();
        config.audio.work_dir = std::env::temp_dir().join("interview-coach-handler-tests");
        std::fs::create_dir_all(&config.audio.work_dir).unwrap();
        AppState::new(config).unwrap()
    }

    #[actix_web::test]
    async fn test_answer_without_audio_field_is_400() {
        let state = test_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/api/answer", web::post().to(answer)),
        )
        .await;

        // A well-formed multipart body that carries a session token but no
        // audio field.
        let body = "--BOUNDARY\r\n\
                    Content-Disposition: form-data; name=\"session\"\r\n\r\n\
                    abc123\r\n\
                    --BOUNDARY--\r\n";
        let req = test::TestRequest::post()
            .uri("/api/answer")
            .insert_header((
                "content-type",
                "multipart/form-data; boundary=BOUNDARY",
            ))
            .set_payload(body)
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let json: serde_json::Value = test::read_body_json(resp).await;
        assert!(json.get("error").is_some());

        // Rejected uploads must not create or advance any session cursor.
        assert_eq!(state.sessions.session_count(), 0);
    }

    #[actix_web::test]
    async fn test_empty_audio_field_is_400() {
        let state = test_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/api/answer", web::post().to(answer)),
        )
        .await;

        let body = "--BOUNDARY\r\n\
                    Content-Disposition: form-data; name=\"audio\"; filename=\"a.webm\"\r\n\
                    Content-Type: audio/webm\r\n\r\n\
                    \r\n\
                    --BOUNDARY--\r\n";
        let req = test::TestRequest::post()
            .uri("/api/answer")
            .insert_header((
                "content-type",
                "multipart/form-data; boundary=BOUNDARY",
            ))
            .set_payload(body)
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.sessions.session_count(), 0);
    }

    #[actix_web::test]
    async fn test_landing_page_carries_first_question() {
        let state = test_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/", web::get().to(index)),
        )
        .await;

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = test::read_body(resp).await;
        let html = String::from_utf8_lossy(&body);
        assert!(html.contains("Tell me about yourself."));
        assert!(!html.contains("{{question}}"));
    }

    #[actix_web::test]
    async fn test_synthesized_audio_round_trip() {
        let state = test_state();
        let filename = format!("feedback_{}.mp3", Uuid::new_v4());
        let mp3_path = state.get_config().audio.work_dir.join(&filename);
        std::fs::write(&mp3_path, b"ID3 fake mp3 payload").unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/api/audio/{filename}", web::get().to(fetch_audio)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/audio/{}", filename))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "audio/mpeg"
        );

        let body = test::read_body(resp).await;
        assert_eq!(&body[..], b"ID3 fake mp3 payload");

        let _ = std::fs::remove_file(&mp3_path);
    }

    #[actix_web::test]
    async fn test_unknown_audio_file_is_404() {
        let state = test_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/api/audio/{filename}", web::get().to(fetch_audio)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/audio/feedback_does_not_exist.mp3")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_filename_hygiene() {
        assert!(is_safe_filename("feedback_4cf7a2.mp3"));
        assert!(!is_safe_filename(""));
        assert!(!is_safe_filename("../etc/passwd"));
        assert!(!is_safe_filename("a/b.mp3"));
        assert!(!is_safe_filename("a\\b.mp3"));
        assert!(!is_safe_filename("..mp3"));
    }
}
