use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub auth: Auth,
	pub spaces: Spaces,
	pub storage: Storage,
	pub providers: Providers,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

/// Token-issuer settings, Keycloak-style.
#[derive(Debug, Clone, Deserialize)]
pub struct Auth {
	pub server_url: String,
	pub realm: String,
	pub client_id: String,
	/// Default signature algorithm, used for the PEM realm-key fallback.
	#[serde(default = "default_algorithm")]
	pub algorithm: String,
	/// Extra trusted issuers, comma-separated. The default issuers derived
	/// from server_url + realm are always trusted.
	#[serde(default)]
	pub allowed_issuers: String,
	/// Optional expected audience, enforced upstream of signature checks.
	#[serde(default)]
	pub audience: Option<String>,
	#[serde(default)]
	pub allow_anonymous_search: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStrategy {
	Single,
	Hybrid,
	Isolated,
}
impl CollectionStrategy {
	pub fn is_partitioned(self) -> bool {
		!matches!(self, Self::Single)
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Spaces {
	#[serde(default = "default_collection_strategy")]
	pub collection_strategy: CollectionStrategy,
	#[serde(default = "default_tenant_collection_template")]
	pub tenant_collection_template: String,
	#[serde(default = "default_shared_domain_collection_template")]
	pub shared_domain_collection_template: String,
	#[serde(default = "default_global_collection_name")]
	pub global_collection_name: String,
	/// Path of the mutable enable/disable overlay document. Absent means
	/// nothing is ever disabled.
	#[serde(default)]
	pub state_file: Option<std::path::PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

fn default_algorithm() -> String {
	"RS256".to_string()
}

fn default_collection_strategy() -> CollectionStrategy {
	CollectionStrategy::Single
}

fn default_tenant_collection_template() -> String {
	"tenant_{tenant_id}".to_string()
}

fn default_shared_domain_collection_template() -> String {
	"shared_{domain_id}".to_string()
}

fn default_global_collection_name() -> String {
	"shared_global".to_string()
}
