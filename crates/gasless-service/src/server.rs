//! HTTP server for the gasless relay API.

use axum::{
	extract::{DefaultBodyLimit, Path, State},
	response::Json,
	routing::{get, post},
	Router,
};
use gasless_config::ApiConfig;
use gasless_core::GaslessEngine;
use gasless_types::{APIError, DelegatedCallRequest, DispatchResponse, DomainResponse, NonceResponse};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<GaslessEngine>,
}

/// Builds the `/api` router.
pub fn router(engine: Arc<GaslessEngine>, max_request_size: usize) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/domain", get(handle_domain))
				.route("/nonces/{address}", get(handle_nonce))
				.route("/authorizations", post(handle_authorization)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive())
				.layer(DefaultBodyLimit::max(max_request_size)),
		)
		.with_state(AppState { engine })
}

pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<GaslessEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(engine, api_config.max_request_size);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Gasless API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

async fn handle_domain(State(state): State<AppState>) -> Json<DomainResponse> {
	Json(crate::apis::domain::get_domain(&state.engine))
}

async fn handle_nonce(
	Path(address): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<NonceResponse>, APIError> {
	crate::apis::domain::get_nonce(&address, &state.engine)
		.await
		.map(Json)
}

/// Handles POST /api/authorizations.
///
/// Rejections are already logged by the dispatcher; only the HTTP outcome
/// is traced here.
async fn handle_authorization(
	State(state): State<AppState>,
	Json(request): Json<DelegatedCallRequest>,
) -> Result<Json<DispatchResponse>, APIError> {
	match crate::apis::authorization::submit_authorization(request, &state.engine).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::debug!(status = e.status_code(), "Authorization request failed: {}", e);
			Err(e)
		}
	}
}
