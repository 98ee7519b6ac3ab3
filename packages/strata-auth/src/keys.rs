//! Key-material retrieval and caching.
//!
//! JWKS documents are cached per source URL and only refetched on demand,
//! either on a cache miss or when the verifier requests a refresh after a
//! signature mismatch. A refresh replaces the whole cached document so a
//! rotated-out key can never linger next to its replacement.

use std::{
	collections::HashMap,
	sync::{Arc, RwLock},
};

use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use serde_json::Value;

use crate::{
	BoxFuture,
	error::{Error, Result},
};

/// The subset of RFC 7517 this service consumes. RSA keys carry `n`/`e`,
/// symmetric keys carry `k`.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
	#[serde(default)]
	pub kid: Option<String>,
	pub kty: String,
	#[serde(default)]
	pub alg: Option<String>,
	#[serde(default)]
	pub n: Option<String>,
	#[serde(default)]
	pub e: Option<String>,
	#[serde(default)]
	pub k: Option<String>,
}
impl Jwk {
	pub fn decoding_key(&self) -> Result<DecodingKey> {
		match self.kty.as_str() {
			"RSA" => {
				let (Some(n), Some(e)) = (self.n.as_deref(), self.e.as_deref()) else {
					return Err(Error::VerificationFailed {
						message: "RSA JWK is missing the n or e component".to_string(),
					});
				};

				DecodingKey::from_rsa_components(n, e)
					.map_err(|err| Error::VerificationFailed { message: err.to_string() })
			},
			"oct" => {
				let Some(k) = self.k.as_deref() else {
					return Err(Error::VerificationFailed {
						message: "oct JWK is missing the k component".to_string(),
					});
				};
				let secret = base64::engine::general_purpose::URL_SAFE_NO_PAD
					.decode(k)
					.map_err(|err| Error::VerificationFailed { message: err.to_string() })?;

				Ok(DecodingKey::from_secret(&secret))
			},
			other => Err(Error::VerificationFailed {
				message: format!("unsupported JWK key type {other:?}"),
			}),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JwkSet {
	#[serde(default)]
	pub keys: Vec<Jwk>,
}
impl JwkSet {
	pub fn kids(&self) -> Vec<String> {
		self.keys.iter().filter_map(|key| key.kid.clone()).collect()
	}

	/// Pick the verification key for a token header.
	///
	/// A `kid` must match exactly. Without a `kid`, a single-key set is
	/// unambiguous and that key is used; anything else is unresolvable.
	pub fn select_key(&self, kid: Option<&str>, key_source: &str) -> Result<&Jwk> {
		if let Some(kid) = kid {
			return self
				.keys
				.iter()
				.find(|key| key.kid.as_deref() == Some(kid))
				.ok_or_else(|| Error::KeyNotFound {
					key_source: key_source.to_string(),
					kid: kid.to_string(),
					available: self.kids(),
				});
		}

		if self.keys.len() == 1 {
			return Ok(&self.keys[0]);
		}

		Err(Error::NoSuitableKey { key_source: key_source.to_string(), available: self.kids() })
	}
}

/// Fetches key material from an identity provider.
///
/// Abstracted so tests can rotate keys without a live provider.
pub trait KeyFetcher
where
	Self: Send + Sync,
{
	fn fetch_jwks<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<JwkSet>>;

	/// Fetch the realm's current signing key as a PEM document.
	fn fetch_realm_pem<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String>>;
}

/// [`KeyFetcher`] backed by the provider's HTTP endpoints.
pub struct HttpKeyFetcher {
	client: reqwest::Client,
}
impl HttpKeyFetcher {
	pub fn new() -> Result<Self> {
		let client = reqwest::Client::builder()
			.timeout(std::time::Duration::from_secs(5))
			.build()
			.map_err(|err| Error::KeyFetch {
				url: "<client>".to_string(),
				message: err.to_string(),
			})?;

		Ok(Self { client })
	}

	async fn get_json(&self, url: &str) -> Result<Value> {
		let response = self
			.client
			.get(url)
			.send()
			.await
			.and_then(reqwest::Response::error_for_status)
			.map_err(|err| Error::KeyFetch { url: url.to_string(), message: err.to_string() })?;

		response
			.json()
			.await
			.map_err(|err| Error::KeyFetch { url: url.to_string(), message: err.to_string() })
	}
}
impl KeyFetcher for HttpKeyFetcher {
	fn fetch_jwks<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<JwkSet>> {
		Box::pin(async move {
			let value = self.get_json(url).await?;

			serde_json::from_value(value)
				.map_err(|err| Error::KeyFetch { url: url.to_string(), message: err.to_string() })
		})
	}

	fn fetch_realm_pem<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move {
			let value = self.get_json(url).await?;
			let Some(public_key) = value.get("public_key").and_then(Value::as_str) else {
				return Err(Error::KeyFetch {
					url: url.to_string(),
					message: "realm document has no public_key field".to_string(),
				});
			};

			Ok(wrap_pem(public_key))
		})
	}
}

/// Keycloak's realm endpoint serves the public key as bare base64; wrap it in
/// PEM markers unless it already carries them.
pub fn wrap_pem(public_key: &str) -> String {
	let public_key = public_key.trim();

	if public_key.starts_with("-----BEGIN") {
		return public_key.to_string();
	}

	let mut pem = String::from("-----BEGIN PUBLIC KEY-----\n");

	for chunk in public_key.as_bytes().chunks(64) {
		pem.push_str(std::str::from_utf8(chunk).unwrap_or_default());
		pem.push('\n');
	}

	pem.push_str("-----END PUBLIC KEY-----\n");

	pem
}

/// Build a [`DecodingKey`] from a PEM document for the given algorithm family.
pub fn pem_decoding_key(pem: &str, algorithm: Algorithm) -> Result<DecodingKey> {
	let key = match algorithm {
		Algorithm::RS256
		| Algorithm::RS384
		| Algorithm::RS512
		| Algorithm::PS256
		| Algorithm::PS384
		| Algorithm::PS512 => DecodingKey::from_rsa_pem(pem.as_bytes()),
		Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem.as_bytes()),
		Algorithm::EdDSA => DecodingKey::from_ed_pem(pem.as_bytes()),
		Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 =>
			return Ok(DecodingKey::from_secret(pem.as_bytes())),
	};

	key.map_err(|err| Error::VerificationFailed { message: err.to_string() })
}

/// Per-source cache of JWKS documents plus the realm PEM key.
pub struct KeyMaterialCache {
	fetcher: Arc<dyn KeyFetcher>,
	jwks: RwLock<HashMap<String, Arc<JwkSet>>>,
	pem: RwLock<Option<Arc<String>>>,
}
impl KeyMaterialCache {
	pub fn new(fetcher: Arc<dyn KeyFetcher>) -> Self {
		Self { fetcher, jwks: RwLock::new(HashMap::new()), pem: RwLock::new(None) }
	}

	pub async fn jwks(&self, url: &str) -> Result<Arc<JwkSet>> {
		if let Some(cached) = self.jwks.read().unwrap_or_else(|err| err.into_inner()).get(url) {
			return Ok(cached.clone());
		}

		self.refresh_jwks(url).await
	}

	pub async fn refresh_jwks(&self, url: &str) -> Result<Arc<JwkSet>> {
		let fresh = Arc::new(self.fetcher.fetch_jwks(url).await?);

		self.jwks
			.write()
			.unwrap_or_else(|err| err.into_inner())
			.insert(url.to_string(), fresh.clone());

		Ok(fresh)
	}

	pub async fn realm_pem(&self, url: &str) -> Result<Arc<String>> {
		if let Some(cached) = self.pem.read().unwrap_or_else(|err| err.into_inner()).as_ref() {
			return Ok(cached.clone());
		}

		self.refresh_realm_pem(url).await
	}

	pub async fn refresh_realm_pem(&self, url: &str) -> Result<Arc<String>> {
		let fresh = Arc::new(self.fetcher.fetch_realm_pem(url).await?);

		*self.pem.write().unwrap_or_else(|err| err.into_inner()) = Some(fresh.clone());

		Ok(fresh)
	}
}
