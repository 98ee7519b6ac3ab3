//! End-to-end HTTP tests over an in-memory store and programmable keys.

use std::sync::Arc;

use axum::{
	Router,
	body::Body,
	http::{Request, Response, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use strata_api::{routes, state::AppState};
use strata_testkit::{
	HashEmbedder, MemoryVectorStore, StaticKeyFetcher, bearer_claims, oct_jwk, sample_config,
	sign_hs256,
};

const SECRET: &[u8] = b"http-test-secret";
const ISSUER: &str = "http://localhost:8080/realms/master";
const JWKS_URL: &str = "http://localhost:8080/realms/master/protocol/openid-connect/certs";

fn app_with<F>(mutate: F) -> Router
where
	F: FnOnce(&mut strata_config::Config),
{
	let mut config = sample_config();

	mutate(&mut config);

	let fetcher = StaticKeyFetcher::new();

	fetcher.set_jwks(JWKS_URL, vec![oct_jwk("k1", SECRET)]);

	let state = AppState::with_parts(
		config,
		Arc::new(MemoryVectorStore::new()),
		Arc::new(HashEmbedder::new(8)),
		Arc::new(fetcher),
	)
	.expect("Failed to wire the application state.");

	routes::router(state)
}

fn app() -> Router {
	app_with(|_| {})
}

fn token_with<F>(mutate: F) -> String
where
	F: FnOnce(&mut serde_json::Map<String, Value>),
{
	let mut claims = bearer_claims(ISSUER, "user-1");

	mutate(&mut claims);

	sign_hs256(SECRET, Some("k1"), &claims)
}

fn tenant_token(tenant_id: &str) -> String {
	token_with(|claims| {
		claims.insert("tenant_id".to_string(), json!(tenant_id));
	})
}

fn request(method: &str, path: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
	let mut builder = Request::builder().method(method).uri(path);

	if let Some(token) = token {
		builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
	}

	match body {
		Some(body) => builder
			.header(header::CONTENT_TYPE, "application/json")
			.body(Body::from(body.to_string())),
		None => builder.body(Body::empty()),
	}
	.expect("Failed to build the request.")
}

async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
	app.clone().oneshot(req).await.expect("The router is infallible.")
}

async fn json_body(response: Response<Body>) -> Value {
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read the response body.");

	serde_json::from_slice(&bytes).expect("The response body must be JSON.")
}

async fn upload(app: &Router, token: &str, target: Option<&str>, content: &str) -> Value {
	let mut req = request(
		"POST",
		"/v1/documents",
		Some(token),
		Some(json!({ "documents": [{ "content": content, "metadata": {} }] })),
	);

	if let Some(target) = target {
		req.headers_mut()
			.insert("x-target-space", target.parse().expect("Invalid header value."));
	}

	let response = send(app, req).await;

	assert_eq!(response.status(), StatusCode::OK);

	json_body(response).await
}

async fn search(app: &Router, token: Option<&str>, query: &str) -> Response<Body> {
	send(app, request("POST", "/v1/search", token, Some(json!({ "query": query })))).await
}

#[tokio::test]
async fn missing_token_is_challenged() {
	let app = app();
	let response = search(&app, None, "anything").await;

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(
		response.headers().get(header::WWW_AUTHENTICATE).and_then(|v| v.to_str().ok()),
		Some("Bearer"),
	);
}

#[tokio::test]
async fn health_needs_no_token() {
	let app = app();
	let response = send(&app, request("GET", "/health", None, None)).await;

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(json_body(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn garbage_tokens_are_rejected() {
	let app = app();
	let response = search(&app, Some("not-a-jwt"), "anything").await;

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tokens_without_a_tenant_are_forbidden() {
	let app = app();
	let response = search(&app, Some(&token_with(|_| {})), "anything").await;

	assert_eq!(response.status(), StatusCode::FORBIDDEN);

	let body = json_body(response).await;

	assert_eq!(body["error_code"], "forbidden");
}

#[tokio::test]
async fn search_results_stay_within_the_caller_tenant() {
	let app = app();

	upload(&app, &tenant_token("t1"), None, "alpha onboarding guide").await;

	let response = search(&app, Some(&tenant_token("t1")), "alpha onboarding").await;

	assert_eq!(response.status(), StatusCode::OK);

	let body = json_body(response).await;
	let items = body["items"].as_array().expect("items must be an array.");

	assert_eq!(items.len(), 1);
	assert_eq!(items[0]["content"], "alpha onboarding guide");
	assert_eq!(items[0]["metadata"]["space_id"], "tenant_t1");

	let response = search(&app, Some(&tenant_token("t2")), "alpha onboarding").await;

	assert_eq!(response.status(), StatusCode::OK);
	assert!(json_body(response).await["items"].as_array().is_some_and(Vec::is_empty));
}

#[tokio::test]
async fn requesting_a_foreign_space_is_denied() {
	let app = app();
	let mut req =
		request("POST", "/v1/search", Some(&tenant_token("t1")), Some(json!({ "query": "x" })));

	req.headers_mut()
		.insert("x-knowledge-spaces", "tenant_t2".parse().expect("Invalid header value."));

	let response = send(&app, req).await;

	assert_eq!(response.status(), StatusCode::FORBIDDEN);

	let body = json_body(response).await;

	assert_eq!(body["error_code"], "access_denied");
	assert!(body["message"].as_str().is_some_and(|m| m.contains("tenant_t2")));
}

#[tokio::test]
async fn anonymous_search_reads_global_only_when_enabled() {
	let app = app_with(|config| config.auth.allow_anonymous_search = true);
	let writer = token_with(|claims| {
		claims.insert("tenant_id".to_string(), json!("t1"));
		claims.insert("can_write_global".to_string(), json!(true));
	});

	upload(&app, &writer, Some("global"), "public platform handbook").await;
	upload(&app, &writer, None, "tenant-only playbook").await;

	let response = search(&app, None, "handbook playbook").await;

	assert_eq!(response.status(), StatusCode::OK);

	let body = json_body(response).await;
	let items = body["items"].as_array().expect("items must be an array.");

	assert_eq!(items.len(), 1);
	assert_eq!(items[0]["content"], "public platform handbook");

	// Anonymous callers still cannot write.
	let response = send(
		&app,
		request(
			"POST",
			"/v1/documents",
			None,
			Some(json!({ "documents": [{ "content": "x" }] })),
		),
	)
	.await;

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn audience_is_enforced_when_configured() {
	let app = app_with(|config| config.auth.audience = Some("strata-backend".to_string()));
	let wrong = token_with(|claims| {
		claims.insert("tenant_id".to_string(), json!("t1"));
		claims.insert("aud".to_string(), json!("another-client"));
	});
	let right = token_with(|claims| {
		claims.insert("tenant_id".to_string(), json!("t1"));
		claims.insert("aud".to_string(), json!(["another-client", "strata-backend"]));
	});

	assert_eq!(search(&app, Some(&wrong), "x").await.status(), StatusCode::FORBIDDEN);
	assert_eq!(search(&app, Some(&right), "x").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn spaces_listing_reflects_grants() {
	let app = app();
	let token = token_with(|claims| {
		claims.insert("tenant_id".to_string(), json!("t1"));
		claims.insert("allowed_domain_ids".to_string(), json!(["legal"]));
	});
	let response = send(&app, request("GET", "/v1/spaces", Some(&token), None)).await;

	assert_eq!(response.status(), StatusCode::OK);

	let body = json_body(response).await;
	let spaces = body["spaces"].as_array().expect("spaces must be an array.");
	let ids: Vec<&str> = spaces.iter().filter_map(|space| space["id"].as_str()).collect();

	assert_eq!(ids, ["tenant_t1", "shared_legal", "shared_global"]);

	let tenant = &spaces[0];

	assert_eq!(tenant["can_write"], true);
	assert_eq!(tenant["enabled"], true);

	// No shared-domain write grant in the token.
	assert_eq!(spaces[1]["can_write"], false);
}

#[tokio::test]
async fn deletion_removes_documents_from_search() {
	let app = app();
	let token = tenant_token("t1");
	let uploaded = upload(&app, &token, None, "quarterly revenue report").await;
	let document_id = uploaded["document_ids"][0].as_str().expect("Missing document id.");

	assert_eq!(uploaded["space_id"], "tenant_t1");

	let response = send(
		&app,
		request(
			"POST",
			"/v1/documents/delete",
			Some(&token),
			Some(json!({ "document_ids": [document_id] })),
		),
	)
	.await;

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(json_body(response).await["space_ids"], json!(["tenant_t1"]));

	let response = search(&app, Some(&token), "quarterly revenue").await;

	assert!(json_body(response).await["items"].as_array().is_some_and(Vec::is_empty));
}

#[tokio::test]
async fn blank_requests_are_rejected() {
	let app = app();
	let token = tenant_token("t1");
	let response = search(&app, Some(&token), "   ").await;

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(json_body(response).await["error_code"], "invalid_request");

	let response = send(
		&app,
		request("POST", "/v1/documents", Some(&token), Some(json!({ "documents": [] }))),
	)
	.await;

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
