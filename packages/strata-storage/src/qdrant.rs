//! Qdrant-backed [`VectorStore`].
//!
//! Every collection carries a named dense vector plus a named BM25 sparse
//! vector; searches run both legs and fuse them with reciprocal rank fusion.

pub const DENSE_VECTOR_NAME: &str = "dense";
pub const BM25_VECTOR_NAME: &str = "bm25";
pub const BM25_MODEL: &str = "qdrant/bm25";

use std::collections::HashMap;

use qdrant_client::{
	client::Payload,
	qdrant::{
		CreateCollectionBuilder, DeletePointsBuilder, Distance, Document, Filter, Fusion, Modifier,
		PointId, PointStruct, PrefetchQueryBuilder, Query, QueryPointsBuilder, ScrollPointsBuilder,
		SparseVectorParamsBuilder, SparseVectorsConfigBuilder, UpsertPointsBuilder, Vector,
		VectorParamsBuilder, VectorsConfigBuilder, point_id::PointIdOptions,
		vectors_config::Config as VectorsConfig,
	},
};
use serde_json::Value as JsonValue;

use crate::{
	BoxFuture, CONTENT_KEY, DocumentRecord, METADATA_KEY, Result, ScoredDocument, SearchQuery,
	VectorStore, decode_payload,
};

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
}
impl QdrantStore {
	pub fn new(cfg: &strata_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client })
	}
}
impl VectorStore for QdrantStore {
	fn collection_exists<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(self.client.collection_exists(collection).await?) })
	}

	fn collection_dim<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, Result<Option<u32>>> {
		Box::pin(async move {
			let info = self.client.collection_info(collection).await?;
			let params = info
				.result
				.and_then(|info| info.config)
				.and_then(|config| config.params)
				.and_then(|params| params.vectors_config)
				.and_then(|vectors| vectors.config);
			let dim = match params {
				Some(VectorsConfig::Params(params)) => Some(params.size),
				Some(VectorsConfig::ParamsMap(map)) =>
					map.map.get(DENSE_VECTOR_NAME).map(|params| params.size),
				None => None,
			};

			Ok(dim.map(|size| size as u32))
		})
	}

	fn create_collection<'a>(
		&'a self,
		collection: &'a str,
		vector_dim: u32,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut vectors_config = VectorsConfigBuilder::default();

			vectors_config.add_named_vector_params(
				DENSE_VECTOR_NAME,
				VectorParamsBuilder::new(vector_dim.into(), Distance::Cosine),
			);

			let mut sparse_vectors_config = SparseVectorsConfigBuilder::default();

			sparse_vectors_config.add_named_vector_params(
				BM25_VECTOR_NAME,
				SparseVectorParamsBuilder::default().modifier(Modifier::Idf as i32),
			);

			self.client
				.create_collection(
					CreateCollectionBuilder::new(collection.to_string())
						.vectors_config(vectors_config)
						.sparse_vectors_config(sparse_vectors_config),
				)
				.await?;

			Ok(())
		})
	}

	fn search<'a>(
		&'a self,
		collection: &'a str,
		query: SearchQuery,
		filter: Option<Filter>,
	) -> BoxFuture<'a, Result<Vec<ScoredDocument>>> {
		Box::pin(async move {
			let mut dense_prefetch = PrefetchQueryBuilder::default()
				.query(Query::new_nearest(query.vector.clone()))
				.using(DENSE_VECTOR_NAME)
				.limit(query.limit);
			let mut bm25_prefetch = PrefetchQueryBuilder::default()
				.query(Query::new_nearest(Document::new(query.text.clone(), BM25_MODEL)))
				.using(BM25_VECTOR_NAME)
				.limit(query.limit);

			if let Some(filter) = filter {
				dense_prefetch = dense_prefetch.filter(filter.clone());
				bm25_prefetch = bm25_prefetch.filter(filter);
			}

			let search = QueryPointsBuilder::new(collection.to_string())
				.add_prefetch(dense_prefetch)
				.add_prefetch(bm25_prefetch)
				.with_payload(true)
				.query(Fusion::Rrf)
				.limit(query.limit);
			let response = self.client.query(search).await?;

			response
				.result
				.into_iter()
				.map(|point| {
					let (content, metadata) = decode_payload(&point.payload)?;

					Ok(ScoredDocument {
						id: point.id.map(point_id_string).unwrap_or_default(),
						content,
						metadata,
						score: point.score,
					})
				})
				.collect()
		})
	}

	fn upsert<'a>(
		&'a self,
		collection: &'a str,
		documents: Vec<DocumentRecord>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut points = Vec::with_capacity(documents.len());

			for document in documents {
				let mut payload = Payload::new();

				payload.insert(CONTENT_KEY, document.content.clone());
				payload.insert(METADATA_KEY, JsonValue::Object(document.metadata));

				let mut vectors = HashMap::new();

				vectors.insert(DENSE_VECTOR_NAME.to_string(), Vector::from(document.vector));
				vectors.insert(
					BM25_VECTOR_NAME.to_string(),
					Vector::from(Document::new(document.content, BM25_MODEL)),
				);

				points.push(PointStruct::new(document.id, vectors, payload));
			}

			self.client
				.upsert_points(UpsertPointsBuilder::new(collection.to_string(), points).wait(true))
				.await?;

			Ok(())
		})
	}

	fn delete_by_filter<'a>(
		&'a self,
		collection: &'a str,
		filter: Filter,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.client
				.delete_points(
					DeletePointsBuilder::new(collection.to_string()).points(filter).wait(true),
				)
				.await?;

			Ok(())
		})
	}

	fn scroll<'a>(
		&'a self,
		collection: &'a str,
		filter: Filter,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<ScoredDocument>>> {
		Box::pin(async move {
			let response = self
				.client
				.scroll(
					ScrollPointsBuilder::new(collection.to_string())
						.filter(filter)
						.limit(limit)
						.with_payload(true),
				)
				.await?;

			response
				.result
				.into_iter()
				.map(|point| {
					let (content, metadata) = decode_payload(&point.payload)?;

					Ok(ScoredDocument {
						id: point.id.map(point_id_string).unwrap_or_default(),
						content,
						metadata,
						score: 0.,
					})
				})
				.collect()
		})
	}
}

fn point_id_string(id: PointId) -> String {
	match id.point_id_options {
		Some(PointIdOptions::Uuid(uuid)) => uuid,
		Some(PointIdOptions::Num(num)) => num.to_string(),
		None => String::new(),
	}
}
