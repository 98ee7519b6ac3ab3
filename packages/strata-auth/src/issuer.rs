//! Trusted-issuer derivation and enforcement.
//!
//! Keycloak deployments expose the same realm under URLs with and without the
//! legacy `/auth` path segment, so both variants of the configured server URL
//! are trusted by default.

use strata_config::Auth;

use crate::error::{Error, Result};

/// Strip the trailing slash an identity provider may or may not emit in the
/// `iss` claim.
pub fn normalize_issuer(issuer: &str) -> String {
	issuer.trim().trim_end_matches('/').to_string()
}

#[derive(Debug, Clone)]
pub struct TrustedIssuers {
	issuers: Vec<String>,
}
impl TrustedIssuers {
	pub fn from_auth(cfg: &Auth) -> Self {
		let mut issuers = Vec::new();
		let mut push = |issuer: String| {
			let issuer = normalize_issuer(&issuer);

			if !issuer.is_empty() && !issuers.contains(&issuer) {
				issuers.push(issuer);
			}
		};
		let base = cfg.server_url.trim().trim_end_matches('/');
		let realm = cfg.realm.trim().trim_matches('/');

		push(format!("{base}/realms/{realm}"));

		if let Some(stripped) = base.strip_suffix("/auth") {
			push(format!("{stripped}/realms/{realm}"));
		} else {
			push(format!("{base}/auth/realms/{realm}"));
		}

		for extra in cfg.allowed_issuers.split(',') {
			if !extra.trim().is_empty() {
				push(extra.to_string());
			}
		}

		Self { issuers }
	}

	/// The primary issuer, derived directly from the configured server URL and
	/// realm.
	pub fn primary(&self) -> &str {
		&self.issuers[0]
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.issuers.iter().map(String::as_str)
	}

	pub fn is_trusted(&self, issuer: Option<&str>) -> bool {
		issuer.map(|issuer| self.issuers.contains(&normalize_issuer(issuer))).unwrap_or(false)
	}

	/// Enforce trust on an issuer taken from verified claims.
	pub fn assert_trusted(&self, issuer: Option<&str>) -> Result<String> {
		match issuer {
			Some(issuer) if self.is_trusted(Some(issuer)) => Ok(normalize_issuer(issuer)),
			Some(issuer) => Err(Error::UntrustedIssuer { issuer: issuer.to_string() }),
			None => Err(Error::UntrustedIssuer { issuer: "<missing>".to_string() }),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn auth(server_url: &str, allowed_issuers: &str) -> Auth {
		Auth {
			server_url: server_url.to_string(),
			realm: "master".to_string(),
			client_id: "backend".to_string(),
			algorithm: "RS256".to_string(),
			allowed_issuers: allowed_issuers.to_string(),
			audience: None,
			allow_anonymous_search: false,
		}
	}

	#[test]
	fn default_issuers_cover_auth_path_variants() {
		let issuers = TrustedIssuers::from_auth(&auth("http://kc:8080/", ""));

		assert!(issuers.is_trusted(Some("http://kc:8080/realms/master")));
		assert!(issuers.is_trusted(Some("http://kc:8080/auth/realms/master")));

		let issuers = TrustedIssuers::from_auth(&auth("http://kc:8080/auth", ""));

		assert!(issuers.is_trusted(Some("http://kc:8080/auth/realms/master")));
		assert!(issuers.is_trusted(Some("http://kc:8080/realms/master")));
	}

	#[test]
	fn trailing_slash_is_ignored_when_matching() {
		let issuers = TrustedIssuers::from_auth(&auth("http://kc:8080", ""));

		assert!(issuers.is_trusted(Some("http://kc:8080/realms/master/")));
	}

	#[test]
	fn allow_list_extends_defaults() {
		let issuers =
			TrustedIssuers::from_auth(&auth("http://kc:8080", "https://sso.example.com/realms/x, "));

		assert!(issuers.is_trusted(Some("https://sso.example.com/realms/x")));
		assert!(!issuers.is_trusted(Some("https://rogue.example.com/realms/x")));
	}

	#[test]
	fn assert_trusted_rejects_missing_and_unknown_issuers() {
		let issuers = TrustedIssuers::from_auth(&auth("http://kc:8080", ""));

		assert!(matches!(
			issuers.assert_trusted(Some("http://rogue/realms/master")),
			Err(Error::UntrustedIssuer { .. })
		));
		assert!(matches!(issuers.assert_trusted(None), Err(Error::UntrustedIssuer { .. })));
	}
}
