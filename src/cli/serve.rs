//! Serve command - HTTP API server

use clap::Args;

use crate::config::Config;

use super::{IndexArgs, RetrievalArgs};

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Enable CORS for all origins
    #[arg(long)]
    pub cors: bool,

    #[command(flatten)]
    pub index: IndexArgs,

    #[command(flatten)]
    pub retrieval: RetrievalArgs,
}

#[cfg(feature = "server")]
pub async fn run(args: ServeArgs, mut config: Config) -> anyhow::Result<()> {
    use std::sync::Arc;

    use tower_http::cors::{Any, CorsLayer};
    use tracing::info;

    args.index.apply(&mut config);
    args.retrieval.apply(&mut config);

    // Everything is loaded before binding so a bad index or model fails fast
    let pipeline = super::open_pipeline(&config).await?;
    let meta = pipeline.retriever().index().meta().clone();
    info!(
        "Serving index at {} ({} passages, {} dims)",
        config.index.dir.display(),
        meta.passage_count,
        meta.dimensions
    );

    let mut app = router(Arc::new(AppState { pipeline }));

    if args.cors {
        app = app.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
    }

    let addr = format!("{}:{}", args.host, args.port);
    println!("grounded server listening on http://{}", addr);
    println!("  POST /ask     - Answer a question");
    println!("  POST /chat    - Alias of /ask");
    println!("  POST /search  - Retrieve passages only");
    println!("  GET  /info    - Get index information");
    println!("  GET  /health  - Health check");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(not(feature = "server"))]
pub async fn run(_args: ServeArgs, _config: Config) -> anyhow::Result<()> {
    anyhow::bail!("Server feature not enabled. Rebuild with --features server")
}

#[cfg(feature = "server")]
struct AppState {
    pipeline: crate::pipeline::Pipeline,
}

#[cfg(feature = "server")]
fn router(state: std::sync::Arc<AppState>) -> axum::Router {
    use axum::routing::{get, post};
    use tower_http::trace::TraceLayer;

    axum::Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/info", get(info_handler))
        .route("/ask", post(ask))
        .route("/chat", post(ask))
        .route("/search", post(search))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error rendered as `{"error": ...}`; 400 for caller mistakes, 500 otherwise
#[cfg(feature = "server")]
struct ApiError {
    status: axum::http::StatusCode,
    message: String,
}

#[cfg(feature = "server")]
impl From<crate::error::RagError> for ApiError {
    fn from(err: crate::error::RagError) -> Self {
        use axum::http::StatusCode;

        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!("Request failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

/// Unreadable bodies get the same JSON error shape as pipeline errors
#[cfg(feature = "server")]
impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        Self {
            status: axum::http::StatusCode::BAD_REQUEST,
            message: rejection.body_text(),
        }
    }
}

#[cfg(feature = "server")]
impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = axum::Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

#[cfg(feature = "server")]
async fn root() -> &'static str {
    "grounded API Server\n\nEndpoints:\n  POST /ask    - Answer a question\n  POST /chat   - Alias of /ask\n  POST /search - Retrieve passages only\n  GET  /info   - Get index information\n  GET  /health - Health check\n"
}

#[cfg(feature = "server")]
async fn health() -> &'static str {
    "ok"
}

#[cfg(feature = "server")]
async fn info_handler(
    axum::extract::State(state): axum::extract::State<std::sync::Arc<AppState>>,
) -> axum::Json<serde_json::Value> {
    let meta = state.pipeline.retriever().index().meta();
    axum::Json(serde_json::json!({
        "version": meta.version,
        "backend": meta.backend_name,
        "embedding_model": meta.embedding_model,
        "dimensions": meta.dimensions,
        "passage_count": meta.passage_count,
        "top_k": state.pipeline.top_k(),
        "threshold": state.pipeline.threshold(),
    }))
}

#[cfg(feature = "server")]
#[derive(serde::Deserialize)]
struct AskRequest {
    #[serde(default)]
    query: String,
}

#[cfg(feature = "server")]
async fn ask(
    axum::extract::State(state): axum::extract::State<std::sync::Arc<AppState>>,
    payload: Result<axum::Json<AskRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<axum::Json<crate::pipeline::AskResponse>, ApiError> {
    let axum::Json(req) = payload?;
    let answer = state.pipeline.answer(&req.query).await?;
    Ok(axum::Json(answer.into()))
}

#[cfg(feature = "server")]
#[derive(serde::Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
}

#[cfg(feature = "server")]
#[derive(serde::Serialize)]
struct SearchResponse {
    query: String,
    is_ood: bool,
    max_score: f32,
    retrieved: Vec<crate::retriever::RetrievedPassage>,
    took_ms: u64,
}

#[cfg(feature = "server")]
async fn search(
    axum::extract::State(state): axum::extract::State<std::sync::Arc<AppState>>,
    payload: Result<axum::Json<SearchRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<axum::Json<SearchResponse>, ApiError> {
    let axum::Json(req) = payload?;
    let start = std::time::Instant::now();

    let retrieval = state.pipeline.search(&req.query, req.top_k).await?;

    Ok(axum::Json(SearchResponse {
        query: req.query,
        is_ood: retrieval.is_ood,
        max_score: retrieval.max_score,
        retrieved: retrieval.passages,
        took_ms: start.elapsed().as_millis() as u64,
    }))
}
