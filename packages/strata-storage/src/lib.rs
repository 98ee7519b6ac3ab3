//! Vector-store access for document collections.

pub mod qdrant;

mod error;
pub use error::{Error, Result};

use std::{collections::HashMap, pin::Pin};

use serde_json::{Map, Value as JsonValue};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Payload key holding the document text.
pub const CONTENT_KEY: &str = "content";
/// Payload key holding the nested metadata object.
pub const METADATA_KEY: &str = "metadata";

/// Dotted payload path of a metadata field, for filter conditions.
pub fn metadata_key(field: &str) -> String {
	format!("{METADATA_KEY}.{field}")
}

/// A stored document chunk: text, metadata and its dense embedding.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
	/// Point id, a UUID rendered as a string.
	pub id: String,
	pub content: String,
	pub metadata: Map<String, JsonValue>,
	pub vector: Vec<f32>,
}

/// A search hit with its similarity score and source collection.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
	pub id: String,
	pub content: String,
	pub metadata: Map<String, JsonValue>,
	pub score: f32,
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
	/// Raw query text, used for the sparse BM25 leg of the hybrid query.
	pub text: String,
	/// Dense embedding of the query text.
	pub vector: Vec<f32>,
	pub limit: u64,
}

/// Backend-agnostic vector-store operations over named collections.
///
/// Filters are expressed in Qdrant's filter model, the native dialect of the
/// production backend; the in-memory test double interprets the same model.
pub trait VectorStore
where
	Self: Send + Sync,
{
	fn collection_exists<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, Result<bool>>;

	/// Dense-vector dimensionality of an existing collection, if it exposes
	/// one.
	fn collection_dim<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, Result<Option<u32>>>;

	fn create_collection<'a>(
		&'a self,
		collection: &'a str,
		vector_dim: u32,
	) -> BoxFuture<'a, Result<()>>;

	fn search<'a>(
		&'a self,
		collection: &'a str,
		query: SearchQuery,
		filter: Option<qdrant_client::qdrant::Filter>,
	) -> BoxFuture<'a, Result<Vec<ScoredDocument>>>;

	fn upsert<'a>(
		&'a self,
		collection: &'a str,
		documents: Vec<DocumentRecord>,
	) -> BoxFuture<'a, Result<()>>;

	fn delete_by_filter<'a>(
		&'a self,
		collection: &'a str,
		filter: qdrant_client::qdrant::Filter,
	) -> BoxFuture<'a, Result<()>>;

	/// Fetch points matching a filter without scoring, payload only.
	fn scroll<'a>(
		&'a self,
		collection: &'a str,
		filter: qdrant_client::qdrant::Filter,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<ScoredDocument>>>;
}

/// Decode a point payload into content plus metadata.
pub fn decode_payload(
	payload: &HashMap<String, qdrant_client::qdrant::Value>,
) -> Result<(String, Map<String, JsonValue>)> {
	let content = payload
		.get(CONTENT_KEY)
		.map(|value| qdrant_to_json(value.clone()))
		.and_then(|value| value.as_str().map(ToString::to_string))
		.unwrap_or_default();
	let metadata = match payload.get(METADATA_KEY).map(|value| qdrant_to_json(value.clone())) {
		Some(JsonValue::Object(metadata)) => metadata,
		Some(other) =>
			return Err(Error::Payload {
				message: format!("metadata must be an object, got {other}"),
			}),
		None => Map::new(),
	};

	Ok((content, metadata))
}

pub fn qdrant_to_json(value: qdrant_client::qdrant::Value) -> JsonValue {
	use qdrant_client::qdrant::value::Kind;

	match value.kind {
		None | Some(Kind::NullValue(_)) => JsonValue::Null,
		Some(Kind::BoolValue(value)) => JsonValue::Bool(value),
		Some(Kind::IntegerValue(value)) => JsonValue::from(value),
		Some(Kind::DoubleValue(value)) => {
			serde_json::Number::from_f64(value).map(JsonValue::Number).unwrap_or(JsonValue::Null)
		},
		Some(Kind::StringValue(value)) => JsonValue::String(value),
		Some(Kind::ListValue(values)) =>
			JsonValue::Array(values.values.into_iter().map(qdrant_to_json).collect()),
		Some(Kind::StructValue(fields)) => JsonValue::Object(
			fields
				.fields
				.into_iter()
				.map(|(key, value)| (key, qdrant_to_json(value)))
				.collect(),
		),
	}
}
