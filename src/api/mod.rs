use axum::{
    routing::{get, post},
    Router,
    Json,
    extract::State,
    response::{IntoResponse, Response},
    http::{header, HeaderValue, Method, StatusCode},
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{AllowOrigin, CorsLayer};
use validator::Validate;

use crate::database::ScoredChunk;
use crate::llm::AnswerError;
use crate::service::{AskError, InitError, QAService, ServiceLifecycle, ServiceState};

#[derive(Clone)]
pub struct AppState {
    lifecycle: ServiceLifecycle,
}

#[derive(Debug, Deserialize, Validate)]
pub struct QuestionRequest {
    #[validate(length(min = 1, max = 4000))]
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_documents: Option<Vec<ScoredChunk>>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: ServiceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<ServiceState>,
}

/// Create and configure the API router
pub fn create_api(lifecycle: ServiceLifecycle, cors_origins: &[String]) -> Router {
    let state = AppState { lifecycle };

    Router::new()
        .route("/api/ask", post(ask_handler))
        .route("/api/query", post(query_handler))
        .route("/health", get(health_check))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Serve the API on `listener` while `build` initializes the service.
///
/// Requests are rejected as not ready until `build` succeeds. If it fails,
/// the server shuts down gracefully and the initialization error is returned.
pub async fn serve<F>(
    listener: TcpListener,
    lifecycle: ServiceLifecycle,
    cors_origins: &[String],
    build: F,
) -> anyhow::Result<()>
where
    F: Future<Output = Result<QAService, InitError>> + Send + 'static,
{
    let app = create_api(lifecycle.clone(), cors_origins);

    let (failed_tx, failed_rx) = oneshot::channel::<()>();
    let init = tokio::spawn({
        let lifecycle = lifecycle.clone();
        async move {
            match lifecycle.initialize(build).await {
                Ok(service) => {
                    log::info!("Ready to answer questions ({} chunks indexed)", service.chunk_count());
                    Ok(())
                }
                Err(e) => {
                    let _ = failed_tx.send(());
                    Err(e)
                }
            }
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(failed_rx))
        .await
        .context("Server error")?;

    // The state is final before the failure signal is sent, so a FAILED
    // lifecycle always has an error to collect from the task.
    match lifecycle.state().await {
        ServiceState::Failed => init.await?.context("Initialization failed")?,
        ServiceState::Ready => {
            init.await?.context("Initialization failed")?;
            if let Ok(service) = lifecycle.service().await {
                if let Err(e) = service.close().await {
                    log::warn!("Failed to release the index: {}", e);
                }
            }
        }
        _ => init.abort(),
    }
    Ok(())
}

/// Resolves on Ctrl-C, or when initialization reports a failure.
async fn shutdown_signal(init_failed: oneshot::Receiver<()>) {
    let failed = async {
        // A dropped sender means initialization succeeded.
        if init_failed.await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => log::info!("Shutting down"),
        _ = failed => log::error!("Initialization failed, shutting down"),
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) if !origin.contains('*') => Some(value),
            _ => {
                log::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    // Credentials rule out wildcards, so methods and headers are listed.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600))
}

fn error_response(status: StatusCode, error: String, state: Option<ServiceState>) -> Response {
    (status, Json(ErrorResponse { error, state })).into_response()
}

/// Map a failed question onto a status code. Not-ready is the only 503.
fn ask_error_response(err: AskError) -> Response {
    match err {
        AskError::NotReady(state) => {
            log::info!("Rejected question while {}", state);
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Service is not ready (state: {})", state),
                Some(state),
            )
        }
        AskError::Answer(AnswerError::EmptyQuestion) => {
            error_response(StatusCode::BAD_REQUEST, AnswerError::EmptyQuestion.to_string(), None)
        }
        AskError::Answer(e) => {
            log::error!("Error processing the question: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error processing the question: {}", e),
                None,
            )
        }
    }
}

fn validate(request: &QuestionRequest) -> Result<(), Response> {
    request.validate().map_err(|e| {
        error_response(StatusCode::BAD_REQUEST, format!("Invalid request: {}", e), None)
    })
}

async fn ask_handler(
    State(state): State<AppState>,
    Json(request): Json<QuestionRequest>,
) -> Response {
    if let Err(response) = validate(&request) {
        return response;
    }

    match state.lifecycle.ask(&request.question).await {
        Ok(answer) => Json(AskResponse { answer: answer.result }).into_response(),
        Err(e) => ask_error_response(e),
    }
}

async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<QuestionRequest>,
) -> Response {
    if let Err(response) = validate(&request) {
        return response;
    }

    let service = match state.lifecycle.service().await {
        Ok(service) => service,
        Err(e) => return ask_error_response(e),
    };

    match service.answer(&request.question).await {
        Ok(answer) => Json(QueryResponse {
            query: answer.query,
            result: answer.result,
            source_documents: service.return_sources().then_some(answer.sources),
        })
        .into_response(),
        Err(e) => ask_error_response(AskError::Answer(e)),
    }
}

async fn health_check(State(state): State<AppState>) -> Response {
    let status = state.lifecycle.state().await;
    let chunks = state.lifecycle.service().await.ok().map(|s| s.chunk_count());
    let reason = state.lifecycle.failure_reason().await;

    let code = if status == ServiceState::Ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(HealthResponse { status, chunks, reason })).into_response()
}
