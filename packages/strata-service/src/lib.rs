//! Knowledge-space scoped retrieval: access resolution, collection routing,
//! ACL-filtered search, uploads and deletes.

pub mod access;
pub mod context;
pub mod delete;
pub mod overlay;
pub mod router;
pub mod search;
pub mod spaces;
pub mod upload;

mod error;
pub use error::{Error, Result};

/// Metadata field names stamped onto and read back from stored documents.
pub mod fields {
	pub const ID: &str = "id";
	pub const VISIBILITY: &str = "visibility";
	pub const SPACE_ID: &str = "space_id";
	pub const SPACE_TYPE: &str = "space_type";
	pub const TENANT_ID: &str = "tenant_id";
	pub const DOMAIN_ID: &str = "domain_id";
	pub const OWNER_TENANT_ID: &str = "owner_tenant_id";
	pub const RELATED_IDS: &str = "related_ids";
	/// Annotation only; never stored.
	pub const COLLECTION_NAME: &str = "_collection_name";
}

pub use context::RequestContext;
pub use delete::{DeleteRequest, DeleteResponse};
pub use overlay::SpaceStateOverlay;
pub use search::{SearchItem, SearchRequest, SearchResponse};
pub use spaces::SpaceInfo;
pub use upload::{UploadDocument, UploadRequest, UploadResponse};

use std::sync::Arc;

use strata_config::Config;
use strata_providers::Embedder;
use strata_storage::VectorStore;

pub struct SpaceService {
	pub cfg: Config,
	overlay: SpaceStateOverlay,
	store: Arc<dyn VectorStore>,
	embedder: Arc<dyn Embedder>,
}
impl SpaceService {
	pub fn new(cfg: Config, store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
		let overlay = SpaceStateOverlay::new(cfg.spaces.state_file.clone());

		Self { cfg, overlay, store, embedder }
	}

	pub fn overlay(&self) -> &SpaceStateOverlay {
		&self.overlay
	}

	pub(crate) async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		let vectors = self
			.embedder
			.embed(texts)
			.await
			.map_err(|err| Error::Provider { message: err.to_string() })?;

		if vectors.len() != texts.len() {
			return Err(Error::Provider {
				message: format!(
					"embedding count mismatch: {} texts, {} vectors",
					texts.len(),
					vectors.len()
				),
			});
		}
		for vector in &vectors {
			if vector.len() != self.cfg.storage.qdrant.vector_dim as usize {
				return Err(Error::Provider {
					message: "Embedding vector dimension mismatch.".to_string(),
				});
			}
		}

		Ok(vectors)
	}
}
