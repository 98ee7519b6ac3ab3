//! Scoped document deletion.
//!
//! Deletes combine the requested document ids with the caller's writable
//! scope, so an id belonging to a space the caller cannot write to is simply
//! not matched.

use qdrant_client::qdrant::{Condition, Filter};
use serde::{Deserialize, Serialize};
use strata_storage::metadata_key;

use crate::{
	Error, RequestContext, Result, SpaceService, fields,
	search::{scope_filter, space_partition_filter},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
	pub document_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
	/// Spaces the delete was applied against.
	pub space_ids: Vec<String>,
}

impl SpaceService {
	pub async fn delete(
		&self,
		ctx: &RequestContext,
		request: DeleteRequest,
	) -> Result<DeleteResponse> {
		if request.document_ids.is_empty() {
			return Err(Error::InvalidRequest {
				message: "document_ids must be non-empty".to_string(),
			});
		}

		let spaces = self.delete_scope(ctx)?;
		let ids_condition =
			Condition::matches(metadata_key(fields::ID), request.document_ids.clone());

		if self.cfg.spaces.collection_strategy.is_partitioned() {
			for space in &spaces {
				let collection = self.collection_for(space)?;

				if !self.store.collection_exists(&collection).await? {
					continue;
				}

				let filter = Filter::all([
					ids_condition.clone(),
					Condition::from(space_partition_filter(space)),
				]);

				self.store.delete_by_filter(&collection, filter).await?;
			}
		} else {
			let collection = self.cfg.storage.qdrant.collection.clone();

			if self.store.collection_exists(&collection).await? {
				let filter =
					Filter::all([ids_condition, Condition::from(scope_filter(&spaces))]);

				self.store.delete_by_filter(&collection, filter).await?;
			}
		}

		let space_ids: Vec<String> = spaces.into_iter().map(|space| space.id).collect();

		tracing::info!(
			spaces = ?space_ids,
			count = request.document_ids.len(),
			"Deleted documents.",
		);

		Ok(DeleteResponse { space_ids })
	}
}
