//! HTTP surface of the retrieval service.

use axum::{
	Extension, Json, Router,
	extract::State,
	http::{StatusCode, header, header::HeaderValue},
	middleware,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use strata_service::{
	DeleteRequest, DeleteResponse, RequestContext, SearchRequest, SearchResponse, SpaceInfo,
	UploadRequest, UploadResponse,
};

use crate::{auth, state::AppState};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search", post(search))
		.route("/v1/documents", post(upload))
		.route("/v1/documents/delete", post(delete))
		.route("/v1/spaces", get(spaces))
		.layer(middleware::from_fn_with_state(state.clone(), auth::authenticate))
		.with_state(state)
}

async fn health() -> Json<serde_json::Value> {
	Json(serde_json::json!({ "status": "ok" }))
}

async fn search(
	State(state): State<AppState>,
	Extension(ctx): Extension<RequestContext>,
	Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	Ok(Json(state.service.search(&ctx, request).await?))
}

async fn upload(
	State(state): State<AppState>,
	Extension(ctx): Extension<RequestContext>,
	Json(request): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
	Ok(Json(state.service.upload(&ctx, request).await?))
}

async fn delete(
	State(state): State<AppState>,
	Extension(ctx): Extension<RequestContext>,
	Json(request): Json<DeleteRequest>,
) -> Result<Json<DeleteResponse>, ApiError> {
	Ok(Json(state.service.delete(&ctx, request).await?))
}

async fn spaces(
	State(state): State<AppState>,
	Extension(ctx): Extension<RequestContext>,
) -> Json<SpacesResponse> {
	Json(SpacesResponse { spaces: state.service.list_spaces(&ctx) })
}

#[derive(Debug, Serialize)]
struct SpacesResponse {
	spaces: Vec<SpaceInfo>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: &'static str,
	message: String,
	// Adds a `WWW-Authenticate` challenge to the response.
	challenge: bool,
}
impl ApiError {
	pub fn unauthorized<M>(message: M) -> Self
	where
		M: Into<String>,
	{
		Self {
			status: StatusCode::UNAUTHORIZED,
			error_code: "unauthorized",
			message: message.into(),
			challenge: true,
		}
	}

	pub fn forbidden<M>(message: M) -> Self
	where
		M: Into<String>,
	{
		Self {
			status: StatusCode::FORBIDDEN,
			error_code: "forbidden",
			message: message.into(),
			challenge: false,
		}
	}
}
impl From<strata_service::Error> for ApiError {
	fn from(err: strata_service::Error) -> Self {
		let (status, error_code) = match &err {
			strata_service::Error::AccessDenied { .. } => (StatusCode::FORBIDDEN, "access_denied"),
			strata_service::Error::NoWritableSpace =>
				(StatusCode::FORBIDDEN, "no_writable_space"),
			strata_service::Error::UnknownSpace { .. } =>
				(StatusCode::BAD_REQUEST, "unknown_space"),
			strata_service::Error::InvalidRequest { .. } =>
				(StatusCode::BAD_REQUEST, "invalid_request"),
			strata_service::Error::Provider { .. } => (StatusCode::BAD_GATEWAY, "provider_error"),
			strata_service::Error::Storage { .. } =>
				(StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
		};

		if status.is_server_error() {
			tracing::error!(error = %err, "Request failed.");
		}

		Self { status, error_code, message: err.to_string(), challenge: false }
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		#[derive(Serialize)]
		struct ErrorBody {
			error_code: &'static str,
			message: String,
		}

		let body = ErrorBody { error_code: self.error_code, message: self.message };
		let mut response = (self.status, Json(body)).into_response();

		if self.challenge {
			response
				.headers_mut()
				.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
		}

		response
	}
}
