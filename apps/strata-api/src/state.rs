use std::sync::Arc;

use strata_auth::{HttpKeyFetcher, KeyFetcher, TokenVerifier};
use strata_providers::{Embedder, HttpEmbedder};
use strata_service::SpaceService;
use strata_storage::{VectorStore, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SpaceService>,
	pub verifier: Arc<TokenVerifier>,
}
impl AppState {
	pub fn new(config: strata_config::Config) -> color_eyre::Result<Self> {
		let store = Arc::new(QdrantStore::new(&config.storage.qdrant)?);
		let embedder = Arc::new(HttpEmbedder::new(&config.providers.embedding)?);
		let fetcher = Arc::new(HttpKeyFetcher::new()?);

		Self::with_parts(config, store, embedder, fetcher)
	}

	/// Wire the state from explicit parts; tests inject doubles here.
	pub fn with_parts(
		config: strata_config::Config,
		store: Arc<dyn VectorStore>,
		embedder: Arc<dyn Embedder>,
		fetcher: Arc<dyn KeyFetcher>,
	) -> color_eyre::Result<Self> {
		let verifier = Arc::new(TokenVerifier::new(&config.auth, fetcher)?);
		let service = Arc::new(SpaceService::new(config, store, embedder));

		Ok(Self { service, verifier })
	}
}
