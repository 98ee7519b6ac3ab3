mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Auth, CollectionStrategy, Config, EmbeddingProviderConfig, Providers, Qdrant, Service, Spaces,
	Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.auth.server_url.trim().is_empty() {
		return Err(Error::Validation { message: "auth.server_url must be non-empty.".to_string() });
	}
	if cfg.auth.realm.trim().is_empty() {
		return Err(Error::Validation { message: "auth.realm must be non-empty.".to_string() });
	}
	if cfg.auth.algorithm.trim().is_empty() {
		return Err(Error::Validation { message: "auth.algorithm must be non-empty.".to_string() });
	}

	// Collection templates are rejected here so routing stays a pure,
	// infallible rendering step at request time.
	let tenant_fields = template_fields(&cfg.spaces.tenant_collection_template);

	if tenant_fields != ["tenant_id"] {
		return Err(Error::Validation {
			message: "spaces.tenant_collection_template must contain exactly the {tenant_id} placeholder.".to_string(),
		});
	}

	let shared_fields = template_fields(&cfg.spaces.shared_domain_collection_template);

	if shared_fields != ["domain_id"] {
		return Err(Error::Validation {
			message: "spaces.shared_domain_collection_template must contain exactly the {domain_id} placeholder.".to_string(),
		});
	}

	let global_name = cfg.spaces.global_collection_name.trim();

	if global_name.is_empty() {
		return Err(Error::Validation {
			message: "spaces.global_collection_name must be non-empty.".to_string(),
		});
	}
	if global_name.contains('{') || global_name.contains('}') {
		return Err(Error::Validation {
			message: "spaces.global_collection_name must not contain template placeholders."
				.to_string(),
		});
	}

	if cfg.storage.qdrant.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.qdrant.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.embedding.api_key must be non-empty.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.auth.audience.as_deref().map(|audience| audience.trim().is_empty()).unwrap_or(false) {
		cfg.auth.audience = None;
	}
	if cfg
		.spaces
		.state_file
		.as_deref()
		.map(|path| path.as_os_str().is_empty())
		.unwrap_or(false)
	{
		cfg.spaces.state_file = None;
	}
}

/// Collect `{placeholder}` names from a collection template, in order.
pub fn template_fields(template: &str) -> Vec<String> {
	let mut fields = Vec::new();
	let mut rest = template;

	while let Some(open) = rest.find('{') {
		let Some(close) = rest[open..].find('}') else {
			// Unbalanced brace; surface it as a bogus field so validation fails.
			fields.push(rest[open..].to_string());

			break;
		};

		fields.push(rest[open + 1..open + close].to_string());

		rest = &rest[open + close + 1..];
	}

	fields
}

/// Render a collection template that was validated to contain exactly one
/// placeholder.
pub fn render_template(template: &str, field: &str, value: &str) -> String {
	template.replace(&format!("{{{field}}}"), value)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn template_fields_extracts_placeholders() {
		assert_eq!(template_fields("tenant_{tenant_id}"), vec!["tenant_id"]);
		assert_eq!(template_fields("a_{x}_b_{y}"), vec!["x", "y"]);
		assert!(template_fields("plain").is_empty());
	}

	#[test]
	fn template_fields_flags_unbalanced_braces() {
		assert_eq!(template_fields("tenant_{tenant_id"), vec!["{tenant_id"]);
	}

	#[test]
	fn render_template_substitutes_value() {
		assert_eq!(render_template("tenant_{tenant_id}", "tenant_id", "acme"), "tenant_acme");
	}
}
