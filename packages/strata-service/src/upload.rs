//! Document upload into a single resolved knowledge space.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strata_domain::space::{KnowledgeSpace, SpaceType};
use strata_storage::DocumentRecord;
use uuid::Uuid;

use crate::{Error, RequestContext, Result, SpaceService, fields};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadDocument {
	pub content: String,
	#[serde(default)]
	pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest {
	pub documents: Vec<UploadDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
	pub space_id: String,
	pub document_ids: Vec<String>,
}

impl SpaceService {
	pub async fn upload(
		&self,
		ctx: &RequestContext,
		request: UploadRequest,
	) -> Result<UploadResponse> {
		if request.documents.is_empty() {
			return Err(Error::InvalidRequest {
				message: "documents must be non-empty".to_string(),
			});
		}
		if request.documents.iter().any(|document| document.content.trim().is_empty()) {
			return Err(Error::InvalidRequest {
				message: "document content must be non-empty".to_string(),
			});
		}

		let space = self.upload_target(ctx)?;
		let collection = self.collection_for(&space)?;

		self.ensure_collection(&collection).await?;

		let texts: Vec<String> =
			request.documents.iter().map(|document| document.content.clone()).collect();
		let vectors = self.embed_texts(&texts).await?;
		let mut records = Vec::with_capacity(request.documents.len());
		let mut document_ids = Vec::with_capacity(request.documents.len());

		for (document, vector) in request.documents.into_iter().zip(vectors) {
			let point_id = Uuid::new_v4().to_string();
			let mut metadata = document.metadata;

			metadata
				.entry(fields::ID.to_string())
				.or_insert_with(|| Value::String(point_id.clone()));
			stamp_visibility(&mut metadata, &space, ctx.principal.tenant_id.as_deref());

			document_ids.push(
				metadata
					.get(fields::ID)
					.and_then(Value::as_str)
					.unwrap_or(&point_id)
					.to_string(),
			);
			records.push(DocumentRecord {
				id: point_id,
				content: document.content,
				metadata,
				vector,
			});
		}

		self.store.upsert(&collection, records).await?;

		tracing::info!(
			space_id = %space.id,
			%collection,
			count = document_ids.len(),
			"Uploaded documents.",
		);

		Ok(UploadResponse { space_id: space.id, document_ids })
	}

	/// Create the target collection on first write.
	///
	/// New collections copy the default collection's dense dimension when it
	/// exists, so partitioned collections stay compatible with content
	/// migrated from single-collection deployments.
	async fn ensure_collection(&self, collection: &str) -> Result<()> {
		if self.store.collection_exists(collection).await? {
			return Ok(());
		}

		let default_collection = &self.cfg.storage.qdrant.collection;
		let mut vector_dim = None;

		if collection != default_collection
			&& self.store.collection_exists(default_collection).await?
		{
			vector_dim = self.store.collection_dim(default_collection).await?;
		}

		let vector_dim = vector_dim.unwrap_or(self.cfg.storage.qdrant.vector_dim);

		tracing::info!(%collection, vector_dim, "Creating collection.");

		Ok(self.store.create_collection(collection, vector_dim).await?)
	}
}

/// Stamp authoritative visibility metadata for the target space.
///
/// Caller-supplied visibility fields are overwritten, and fields that do not
/// apply to the space type are removed rather than left stale, so a document
/// can never claim a broader audience than the space it lives in.
pub fn stamp_visibility(
	metadata: &mut Map<String, Value>,
	space: &KnowledgeSpace,
	owner_tenant_id: Option<&str>,
) {
	let type_str = space.space_type.as_str().to_string();

	metadata.insert(fields::VISIBILITY.to_string(), Value::String(type_str.clone()));
	metadata.insert(fields::SPACE_ID.to_string(), Value::String(space.id.clone()));
	metadata.insert(fields::SPACE_TYPE.to_string(), Value::String(type_str));

	match owner_tenant_id {
		Some(owner) =>
			metadata
				.insert(fields::OWNER_TENANT_ID.to_string(), Value::String(owner.to_string())),
		None => metadata.remove(fields::OWNER_TENANT_ID),
	};

	match space.space_type {
		SpaceType::Tenant => {
			if let Some(tenant_id) = &space.tenant_id {
				metadata
					.insert(fields::TENANT_ID.to_string(), Value::String(tenant_id.clone()));
			}

			metadata.remove(fields::DOMAIN_ID);
		},
		SpaceType::SharedDomain => {
			if let Some(domain_id) = &space.domain_id {
				metadata
					.insert(fields::DOMAIN_ID.to_string(), Value::String(domain_id.clone()));
			}

			metadata.remove(fields::TENANT_ID);
		},
		SpaceType::Global => {
			metadata.remove(fields::TENANT_ID);
			metadata.remove(fields::DOMAIN_ID);
		},
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn metadata(value: Value) -> Map<String, Value> {
		value.as_object().cloned().unwrap()
	}

	#[test]
	fn tenant_stamp_sets_tenant_id_and_drops_domain_id() {
		let mut md = metadata(json!({ "domain_id": "stale", "title": "kept" }));

		stamp_visibility(&mut md, &KnowledgeSpace::tenant("t1"), Some("t1"));

		assert_eq!(md.get("visibility"), Some(&json!("tenant")));
		assert_eq!(md.get("space_id"), Some(&json!("tenant_t1")));
		assert_eq!(md.get("tenant_id"), Some(&json!("t1")));
		assert_eq!(md.get("owner_tenant_id"), Some(&json!("t1")));
		assert!(md.get("domain_id").is_none());
		assert_eq!(md.get("title"), Some(&json!("kept")));
	}

	#[test]
	fn shared_domain_stamp_drops_tenant_id() {
		let mut md = metadata(json!({ "tenant_id": "t1" }));

		stamp_visibility(&mut md, &KnowledgeSpace::shared_domain("legal"), Some("t1"));

		assert_eq!(md.get("visibility"), Some(&json!("shared_domain")));
		assert_eq!(md.get("domain_id"), Some(&json!("legal")));
		assert!(md.get("tenant_id").is_none());
	}

	#[test]
	fn global_stamp_drops_both_scoping_ids() {
		let mut md = metadata(json!({ "tenant_id": "t1", "domain_id": "legal" }));

		stamp_visibility(&mut md, &KnowledgeSpace::global(), None);

		assert_eq!(md.get("visibility"), Some(&json!("global")));
		assert!(md.get("tenant_id").is_none());
		assert!(md.get("domain_id").is_none());
		assert!(md.get("owner_tenant_id").is_none());
	}

	#[test]
	fn caller_supplied_visibility_is_overwritten() {
		let mut md = metadata(json!({ "visibility": "global", "space_id": "shared_global" }));

		stamp_visibility(&mut md, &KnowledgeSpace::tenant("t1"), Some("t1"));

		assert_eq!(md.get("visibility"), Some(&json!("tenant")));
		assert_eq!(md.get("space_id"), Some(&json!("tenant_t1")));
	}
}
