//! Token fixtures: symmetric JWKs, signable claims, and a key fetcher whose
//! key material tests can swap at will to simulate provider rotation.

use std::{
	collections::HashMap,
	sync::Mutex,
	time::{SystemTime, UNIX_EPOCH},
};

use base64::Engine;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Map, Value, json};
use strata_auth::{Error as AuthError, Jwk, JwkSet, KeyFetcher};

/// Symmetric JWK carrying the given secret, the cheapest verifiable key kind.
pub fn oct_jwk(kid: &str, secret: &[u8]) -> Jwk {
	Jwk {
		kid: Some(kid.to_string()),
		kty: "oct".to_string(),
		alg: Some("HS256".to_string()),
		n: None,
		e: None,
		k: Some(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(secret)),
	}
}

pub fn sign_hs256(secret: &[u8], kid: Option<&str>, claims: &Map<String, Value>) -> String {
	let mut header = Header::new(Algorithm::HS256);

	header.kid = kid.map(ToString::to_string);

	encode(&header, claims, &EncodingKey::from_secret(secret))
		.expect("Failed to sign test token.")
}

/// Minimal live claims for an issuer and subject; extend before signing.
pub fn bearer_claims(issuer: &str, subject: &str) -> Map<String, Value> {
	let now = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System clock before epoch.")
		.as_secs();

	json!({
		"iss": issuer,
		"sub": subject,
		"iat": now,
		"exp": now + 3_600,
	})
	.as_object()
	.cloned()
	.expect("Claims must be an object.")
}

/// [`KeyFetcher`] serving key material from in-memory maps, counting fetches
/// so tests can assert refresh behavior.
#[derive(Default)]
pub struct StaticKeyFetcher {
	jwks: Mutex<HashMap<String, JwkSet>>,
	pems: Mutex<HashMap<String, String>>,
	jwks_fetches: Mutex<HashMap<String, usize>>,
}
impl StaticKeyFetcher {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set_jwks(&self, url: &str, keys: Vec<Jwk>) {
		self.jwks
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.insert(url.to_string(), JwkSet { keys });
	}

	pub fn set_realm_pem(&self, url: &str, pem: &str) {
		self.pems
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.insert(url.to_string(), pem.to_string());
	}

	pub fn jwks_fetch_count(&self, url: &str) -> usize {
		self.jwks_fetches
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.get(url)
			.copied()
			.unwrap_or(0)
	}
}
impl KeyFetcher for StaticKeyFetcher {
	fn fetch_jwks<'a>(
		&'a self,
		url: &'a str,
	) -> strata_auth::BoxFuture<'a, strata_auth::Result<JwkSet>> {
		Box::pin(async move {
			*self
				.jwks_fetches
				.lock()
				.unwrap_or_else(|err| err.into_inner())
				.entry(url.to_string())
				.or_insert(0) += 1;

			self.jwks
				.lock()
				.unwrap_or_else(|err| err.into_inner())
				.get(url)
				.cloned()
				.ok_or_else(|| AuthError::KeyFetch {
					url: url.to_string(),
					message: "no key set registered".to_string(),
				})
		})
	}

	fn fetch_realm_pem<'a>(
		&'a self,
		url: &'a str,
	) -> strata_auth::BoxFuture<'a, strata_auth::Result<String>> {
		Box::pin(async move {
			self.pems
				.lock()
				.unwrap_or_else(|err| err.into_inner())
				.get(url)
				.cloned()
				.ok_or_else(|| AuthError::KeyFetch {
					url: url.to_string(),
					message: "no realm key registered".to_string(),
				})
		})
	}
}
