//! Bearer-token authentication against a Keycloak-style identity provider.

pub mod error;
pub use error::{Error, Result};

pub mod issuer;
pub use issuer::{TrustedIssuers, normalize_issuer};

pub mod keys;
pub use keys::{HttpKeyFetcher, Jwk, JwkSet, KeyFetcher, KeyMaterialCache};

pub mod verifier;
pub use verifier::{TokenVerifier, audience_matches};

pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn Future<Output = T> + Send + 'a>>;
