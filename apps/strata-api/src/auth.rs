//! Request authentication middleware.
//!
//! Builds the per-request [`RequestContext`] from the bearer token and the
//! scoping headers; handlers never see an unauthenticated request.

use axum::{
	extract::{Request, State},
	http::{HeaderMap, header},
	middleware::Next,
	response::Response,
};

use strata_auth::audience_matches;
use strata_domain::{Principal, principal_from_claims};
use strata_service::RequestContext;

use crate::{routes::ApiError, state::AppState};

/// Comma-separated knowledge-space ids (or aliases) to search.
pub const KNOWLEDGE_SPACES_HEADER: &str = "x-knowledge-spaces";
/// Knowledge-space id (or alias) writes and deletes are targeted at.
pub const TARGET_SPACE_HEADER: &str = "x-target-space";

const PUBLIC_PATHS: [&str; 3] = ["/health", "/docs", "/openapi.json"];

pub async fn authenticate(
	State(state): State<AppState>,
	mut request: Request,
	next: Next,
) -> Result<Response, ApiError> {
	let path = request.uri().path().to_string();

	if PUBLIC_PATHS.contains(&path.as_str()) {
		return Ok(next.run(request).await);
	}

	let principal = match bearer_token(request.headers()) {
		Some(token) => {
			let claims = state.verifier.verify(&token).await.map_err(|err| {
				tracing::debug!(error = %err, "Token verification failed.");

				ApiError::unauthorized("Invalid bearer token.")
			})?;

			if let Some(audience) = &state.service.cfg.auth.audience
				&& !audience_matches(&claims, audience)
			{
				return Err(ApiError::forbidden("Token audience mismatch."));
			}

			let principal = principal_from_claims(&claims);

			// Every authenticated caller must belong to a tenant; a token
			// without one has no home space to scope writes to.
			if principal.tenant_id.is_none() {
				return Err(ApiError::forbidden("Token is missing the tenant_id claim."));
			}

			principal
		},
		None if state.service.cfg.auth.allow_anonymous_search && path == "/v1/search" =>
			Principal::anonymous(),
		None => return Err(ApiError::unauthorized("Missing bearer token.")),
	};
	let ctx = RequestContext::new(principal)
		.with_spaces(header_list(request.headers(), KNOWLEDGE_SPACES_HEADER))
		.with_target(header_value(request.headers(), TARGET_SPACE_HEADER));

	request.extensions_mut().insert(ctx);

	Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
	let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
	let (scheme, token) = raw.split_once(' ')?;
	let token = token.trim();

	(scheme.eq_ignore_ascii_case("bearer") && !token.is_empty())
		.then(|| token.to_string())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
	headers
		.get(name)
		.and_then(|value| value.to_str().ok())
		.map(str::trim)
		.filter(|value| !value.is_empty())
		.map(ToString::to_string)
}

fn header_list(headers: &HeaderMap, name: &str) -> Vec<String> {
	header_value(headers, name)
		.map(|raw| {
			raw.split(',')
				.map(str::trim)
				.filter(|part| !part.is_empty())
				.map(ToString::to_string)
				.collect()
		})
		.unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use axum::http::HeaderValue;

	use super::*;

	#[test]
	fn bearer_extraction_is_scheme_insensitive_and_trims() {
		let mut headers = HeaderMap::new();

		headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer  abc.def.ghi "));

		assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def.ghi"));

		headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));

		assert!(bearer_token(&headers).is_none());

		headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));

		assert!(bearer_token(&headers).is_none());
	}

	#[test]
	fn space_header_splits_on_commas() {
		let mut headers = HeaderMap::new();

		headers.insert(
			KNOWLEDGE_SPACES_HEADER,
			HeaderValue::from_static("tenant_t1, global,,shared_legal "),
		);

		assert_eq!(
			header_list(&headers, KNOWLEDGE_SPACES_HEADER),
			["tenant_t1", "global", "shared_legal"],
		);
		assert!(header_list(&headers, TARGET_SPACE_HEADER).is_empty());
	}
}
