//! Test doubles and fixtures: an in-memory vector store that interprets
//! Qdrant filters, a deterministic embedder, signable tokens with
//! programmable key material, and a ready-made configuration.

pub mod auth;
pub use auth::{StaticKeyFetcher, bearer_claims, oct_jwk, sign_hs256};

pub mod embed;
pub use embed::{HashEmbedder, hash_embed};

pub mod store;
pub use store::{MemoryVectorStore, filter_matches};

use strata_config::{
	Auth, CollectionStrategy, Config, EmbeddingProviderConfig, Providers, Qdrant, Service, Spaces,
	Storage,
};

/// A valid configuration for tests; tweak fields as needed.
///
/// Uses HS256 so tests can mint verifiable tokens from a shared secret.
pub fn sample_config() -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		auth: Auth {
			server_url: "http://localhost:8080".to_string(),
			realm: "master".to_string(),
			client_id: "strata-backend".to_string(),
			algorithm: "HS256".to_string(),
			allowed_issuers: String::new(),
			audience: None,
			allow_anonymous_search: false,
		},
		spaces: Spaces {
			collection_strategy: CollectionStrategy::Single,
			tenant_collection_template: "tenant_{tenant_id}".to_string(),
			shared_domain_collection_template: "shared_{domain_id}".to_string(),
			global_collection_name: "shared_global".to_string(),
			state_file: None,
		},
		storage: Storage {
			qdrant: Qdrant {
				url: "http://localhost:6334".to_string(),
				collection: "documents_v1".to_string(),
				vector_dim: 8,
			},
		},
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://localhost:9090".to_string(),
				api_key: "test-key".to_string(),
				path: "/v1/embeddings".to_string(),
				model: "test-embedding".to_string(),
				dimensions: 8,
				timeout_ms: 1_000,
				default_headers: serde_json::Map::new(),
			},
		},
	}
}
