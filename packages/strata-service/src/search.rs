//! ACL-scoped search across knowledge spaces.
//!
//! The access filter is built server-side from the resolved scope and pushed
//! into the vector store, so a query can never see content its principal was
//! not granted, regardless of what the caller sends.

use qdrant_client::qdrant::{Condition, Filter};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strata_domain::space::{KnowledgeSpace, SpaceType};
use strata_storage::{ScoredDocument, SearchQuery, metadata_key};

use crate::{Error, RequestContext, Result, SpaceService, fields};

pub const DEFAULT_SEARCH_LIMIT: u64 = 10;
/// Upper bound on related documents pulled per collection.
const RELATED_FETCH_LIMIT: u32 = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	#[serde(default)]
	pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchItem {
	pub id: String,
	pub content: String,
	pub metadata: Map<String, Value>,
	pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
	pub items: Vec<SearchItem>,
}

struct Hit {
	doc: ScoredDocument,
}

impl SpaceService {
	pub async fn search(
		&self,
		ctx: &RequestContext,
		request: SearchRequest,
	) -> Result<SearchResponse> {
		if request.query.trim().is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty".to_string() });
		}

		let limit = request.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);

		if limit == 0 {
			return Err(Error::InvalidRequest {
				message: "limit must be greater than zero".to_string(),
			});
		}

		let spaces = self.effective_scope(ctx)?;

		if spaces.is_empty() {
			return Ok(SearchResponse { items: Vec::new() });
		}

		let vector = self.embed_texts(std::slice::from_ref(&request.query)).await?.remove(0);
		let query = SearchQuery { text: request.query.clone(), vector, limit };
		let mut hits = if self.cfg.spaces.collection_strategy.is_partitioned() {
			self.fan_out_search(&spaces, query).await?
		} else {
			self.single_collection_search(&spaces, query).await?
		};
		let related = self.expand_related(&spaces, &hits).await?;

		hits.extend(related);

		let items = dedupe_hits(hits)
			.into_iter()
			.map(|hit| {
				let id = hit
					.doc
					.metadata
					.get(fields::ID)
					.and_then(Value::as_str)
					.map(ToString::to_string)
					.unwrap_or_else(|| hit.doc.id.clone());

				SearchItem {
					id,
					content: hit.doc.content,
					metadata: hit.doc.metadata,
					score: hit.doc.score,
				}
			})
			.collect();

		Ok(SearchResponse { items })
	}

	async fn single_collection_search(
		&self,
		spaces: &[KnowledgeSpace],
		query: SearchQuery,
	) -> Result<Vec<Hit>> {
		let collection = self.cfg.storage.qdrant.collection.clone();

		if !self.store.collection_exists(&collection).await? {
			tracing::info!(%collection, "Collection missing; returning no results.");

			return Ok(Vec::new());
		}

		let docs = self.store.search(&collection, query, Some(scope_filter(spaces))).await?;

		Ok(docs
			.into_iter()
			.map(|mut doc| {
				annotate_collection(&mut doc.metadata, &collection);

				Hit { doc }
			})
			.collect())
	}

	/// Query every scoped space's collection concurrently and merge by score.
	///
	/// Any failing space fails the whole search; a partial result would be
	/// indistinguishable from a complete one to the caller.
	async fn fan_out_search(
		&self,
		spaces: &[KnowledgeSpace],
		query: SearchQuery,
	) -> Result<Vec<Hit>> {
		let mut handles = Vec::with_capacity(spaces.len());

		for space in spaces {
			let collection = self.collection_for(space)?;
			let store = self.store.clone();
			let query = query.clone();
			let filter = space_partition_filter(space);
			let space = space.clone();

			handles.push(tokio::spawn(async move {
				if !store.collection_exists(&collection).await? {
					tracing::info!(
						space_id = %space.id,
						%collection,
						"Skipping space with missing collection.",
					);

					return Ok::<_, strata_storage::Error>((space, collection, Vec::new()));
				}

				let docs = store.search(&collection, query, Some(filter)).await?;

				Ok((space, collection, docs))
			}));
		}

		let mut hits = Vec::new();

		for handle in handles {
			let (space, collection, docs) =
				handle.await.map_err(|err| Error::Storage { message: err.to_string() })??;

			for mut doc in docs {
				annotate_space(&mut doc.metadata, &space);
				annotate_collection(&mut doc.metadata, &collection);

				hits.push(Hit { doc });
			}
		}

		hits.sort_by(|a, b| {
			b.doc.score.partial_cmp(&a.doc.score).unwrap_or(std::cmp::Ordering::Equal)
		});

		Ok(hits)
	}

	/// Pull documents referenced by the hits' `related_ids`, under the same
	/// access filter as the search itself.
	async fn expand_related(
		&self,
		spaces: &[KnowledgeSpace],
		hits: &[Hit],
	) -> Result<Vec<Hit>> {
		let present: Vec<String> = hits
			.iter()
			.map(|hit| {
				hit.doc
					.metadata
					.get(fields::ID)
					.and_then(Value::as_str)
					.map(ToString::to_string)
					.unwrap_or_else(|| hit.doc.id.clone())
			})
			.collect();
		let mut related_ids: Vec<String> = Vec::new();

		for hit in hits {
			let Some(ids) = hit.doc.metadata.get(fields::RELATED_IDS).and_then(Value::as_array)
			else {
				continue;
			};

			for id in ids.iter().filter_map(Value::as_str) {
				if !present.iter().any(|p| p == id) && !related_ids.iter().any(|r| r == id) {
					related_ids.push(id.to_string());
				}
			}
		}

		if related_ids.is_empty() {
			return Ok(Vec::new());
		}

		let ids_condition = Condition::matches(metadata_key(fields::ID), related_ids);
		let mut related = Vec::new();

		if self.cfg.spaces.collection_strategy.is_partitioned() {
			for space in spaces {
				let collection = self.collection_for(space)?;

				if !self.store.collection_exists(&collection).await? {
					continue;
				}

				let filter = Filter::all([
					ids_condition.clone(),
					Condition::matches(metadata_key(fields::SPACE_ID), space.id.clone()),
				]);
				let docs = self.store.scroll(&collection, filter, RELATED_FETCH_LIMIT).await?;

				for mut doc in docs {
					annotate_space(&mut doc.metadata, space);
					annotate_collection(&mut doc.metadata, &collection);

					related.push(Hit { doc });
				}
			}
		} else {
			let collection = self.cfg.storage.qdrant.collection.clone();
			let filter =
				Filter::all([ids_condition, Condition::from(scope_filter(spaces))]);
			let docs = self.store.scroll(&collection, filter, RELATED_FETCH_LIMIT).await?;

			for mut doc in docs {
				annotate_collection(&mut doc.metadata, &collection);

				related.push(Hit { doc });
			}
		}

		Ok(related)
	}
}

/// Read-access condition for one knowledge space.
///
/// Every space matches its stamped `space_id`, OR-ed with a legacy fallback
/// for documents written before stamping: a bare `tenant_id` for tenant
/// spaces, the visibility/domain pair for shared domains, and the global
/// visibility marker for the global space.
pub(crate) fn space_read_condition(space: &KnowledgeSpace) -> Condition {
	match space.space_type {
		SpaceType::Tenant => {
			let mut should =
				vec![Condition::matches(metadata_key(fields::SPACE_ID), space.id.clone())];

			if let Some(tenant_id) = &space.tenant_id {
				should.push(Condition::matches(
					metadata_key(fields::TENANT_ID),
					tenant_id.clone(),
				));
			}

			Condition::from(Filter { should, ..Default::default() })
		},
		SpaceType::SharedDomain => {
			let mut should =
				vec![Condition::matches(metadata_key(fields::SPACE_ID), space.id.clone())];

			if let Some(domain_id) = &space.domain_id {
				should.push(Condition::from(Filter::all([
					Condition::matches(
						metadata_key(fields::VISIBILITY),
						SpaceType::SharedDomain.as_str().to_string(),
					),
					Condition::matches(metadata_key(fields::DOMAIN_ID), domain_id.clone()),
				])));
			}

			Condition::from(Filter { should, ..Default::default() })
		},
		SpaceType::Global => Condition::from(Filter {
			should: vec![
				Condition::matches(
					metadata_key(fields::VISIBILITY),
					SpaceType::Global.as_str().to_string(),
				),
				Condition::matches(metadata_key(fields::SPACE_ID), space.id.clone()),
			],
			..Default::default()
		}),
	}
}

/// OR of the per-space read conditions; used as the single-collection ACL.
pub(crate) fn scope_filter(spaces: &[KnowledgeSpace]) -> Filter {
	Filter { should: spaces.iter().map(space_read_condition).collect(), ..Default::default() }
}

/// Partitioned collections are still filtered by stamped space id, so two
/// spaces sharing one collection cannot bleed into each other.
pub(crate) fn space_partition_filter(space: &KnowledgeSpace) -> Filter {
	Filter::must([Condition::matches(metadata_key(fields::SPACE_ID), space.id.clone())])
}

/// Fill in space provenance on a fan-out hit without clobbering stamped
/// values.
fn annotate_space(metadata: &mut Map<String, Value>, space: &KnowledgeSpace) {
	metadata
		.entry(fields::SPACE_ID.to_string())
		.or_insert_with(|| Value::String(space.id.clone()));
	metadata
		.entry(fields::SPACE_TYPE.to_string())
		.or_insert_with(|| Value::String(space.space_type.as_str().to_string()));
}

fn annotate_collection(metadata: &mut Map<String, Value>, collection: &str) {
	metadata.insert(fields::COLLECTION_NAME.to_string(), Value::String(collection.to_string()));
}

/// Order-preserving dedup keyed by document id, falling back to content for
/// unidentified documents.
fn dedupe_hits(hits: Vec<Hit>) -> Vec<Hit> {
	let mut seen = std::collections::HashSet::new();

	hits.into_iter()
		.filter(|hit| {
			let key = hit
				.doc
				.metadata
				.get(fields::ID)
				.and_then(Value::as_str)
				.map(ToString::to_string)
				.unwrap_or_else(|| {
					if hit.doc.id.is_empty() {
						hit.doc.content.clone()
					} else {
						hit.doc.id.clone()
					}
				});

			seen.insert(key)
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use strata_testkit::filter_matches;

	use super::*;

	fn payload(metadata: Value) -> Value {
		json!({ "content": "text", "metadata": metadata })
	}

	#[test]
	fn tenant_condition_matches_stamped_and_legacy_documents() {
		let filter = scope_filter(&[KnowledgeSpace::tenant("t1")]);

		assert!(filter_matches(&filter, &payload(json!({ "space_id": "tenant_t1" }))));
		assert!(filter_matches(&filter, &payload(json!({ "tenant_id": "t1" }))));
		assert!(!filter_matches(&filter, &payload(json!({ "tenant_id": "t2" }))));
		assert!(!filter_matches(&filter, &payload(json!({ "space_id": "tenant_t2" }))));
	}

	#[test]
	fn shared_domain_condition_matches_space_id_or_legacy_pair() {
		let filter = scope_filter(&[KnowledgeSpace::shared_domain("legal")]);

		assert!(filter_matches(&filter, &payload(json!({ "space_id": "shared_legal" }))));
		assert!(filter_matches(
			&filter,
			&payload(json!({ "visibility": "shared_domain", "domain_id": "legal" })),
		));
		assert!(!filter_matches(
			&filter,
			&payload(json!({ "visibility": "shared_domain", "domain_id": "hr" })),
		));
		assert!(!filter_matches(&filter, &payload(json!({ "domain_id": "legal" }))));
		assert!(!filter_matches(&filter, &payload(json!({ "space_id": "shared_hr" }))));
	}

	#[test]
	fn global_condition_matches_visibility_or_space_id() {
		let filter = scope_filter(&[KnowledgeSpace::global()]);

		assert!(filter_matches(&filter, &payload(json!({ "visibility": "global" }))));
		assert!(filter_matches(&filter, &payload(json!({ "space_id": "shared_global" }))));
		assert!(!filter_matches(&filter, &payload(json!({ "visibility": "tenant" }))));
	}

	#[test]
	fn scope_filter_is_a_union_of_space_conditions() {
		let filter =
			scope_filter(&[KnowledgeSpace::tenant("t1"), KnowledgeSpace::global()]);

		assert!(filter_matches(&filter, &payload(json!({ "space_id": "tenant_t1" }))));
		assert!(filter_matches(&filter, &payload(json!({ "visibility": "global" }))));
		assert!(!filter_matches(&filter, &payload(json!({ "space_id": "tenant_t2" }))));
	}

	#[test]
	fn annotation_never_clobbers_stamped_metadata() {
		let mut metadata =
			json!({ "space_id": "tenant_t1" }).as_object().cloned().unwrap();

		annotate_space(&mut metadata, &KnowledgeSpace::global());
		annotate_collection(&mut metadata, "documents_v1");

		assert_eq!(metadata.get("space_id"), Some(&json!("tenant_t1")));
		assert_eq!(metadata.get("space_type"), Some(&json!("global")));
		assert_eq!(metadata.get("_collection_name"), Some(&json!("documents_v1")));
	}

	#[test]
	fn dedupe_prefers_metadata_id_and_keeps_first_hit() {
		let hit = |id: Option<&str>, point: &str, content: &str, score: f32| Hit {
			doc: ScoredDocument {
				id: point.to_string(),
				content: content.to_string(),
				metadata: id
					.map(|id| json!({ "id": id }).as_object().cloned().unwrap())
					.unwrap_or_default(),
				score,
			},
		};
		let deduped = dedupe_hits(vec![
			hit(Some("a"), "p1", "first", 0.9),
			hit(Some("a"), "p2", "duplicate", 0.8),
			hit(None, "", "same text", 0.7),
			hit(None, "", "same text", 0.6),
			hit(None, "p4", "same text", 0.5),
		]);
		let scores: Vec<f32> = deduped.iter().map(|hit| hit.doc.score).collect();

		// Same metadata id collapses, id-less hits collapse by content, and a
		// distinct point id keeps otherwise identical content.
		assert_eq!(scores, [0.9, 0.7, 0.5]);
	}
}
