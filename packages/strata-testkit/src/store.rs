//! In-memory [`VectorStore`] that interprets Qdrant filters over JSON
//! payloads, close enough to the real engine for access-control tests.

use std::{collections::HashMap, sync::Mutex};

use qdrant_client::qdrant::{
	Condition, FieldCondition, Filter, condition::ConditionOneOf, r#match::MatchValue,
};
use serde_json::{Value, json};
use strata_storage::{
	BoxFuture, DocumentRecord, Error as StorageError, Result as StorageResult, ScoredDocument,
	SearchQuery, VectorStore,
};

struct Collection {
	vector_dim: u32,
	docs: Vec<DocumentRecord>,
}

#[derive(Default)]
pub struct MemoryVectorStore {
	collections: Mutex<HashMap<String, Collection>>,
}
impl MemoryVectorStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Documents currently stored in a collection, for assertions.
	pub fn documents(&self, collection: &str) -> Vec<DocumentRecord> {
		self.collections
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.get(collection)
			.map(|collection| collection.docs.clone())
			.unwrap_or_default()
	}
}
impl VectorStore for MemoryVectorStore {
	fn collection_exists<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, StorageResult<bool>> {
		Box::pin(async move {
			Ok(self
				.collections
				.lock()
				.unwrap_or_else(|err| err.into_inner())
				.contains_key(collection))
		})
	}

	fn collection_dim<'a>(
		&'a self,
		collection: &'a str,
	) -> BoxFuture<'a, StorageResult<Option<u32>>> {
		Box::pin(async move {
			Ok(self
				.collections
				.lock()
				.unwrap_or_else(|err| err.into_inner())
				.get(collection)
				.map(|collection| collection.vector_dim))
		})
	}

	fn create_collection<'a>(
		&'a self,
		collection: &'a str,
		vector_dim: u32,
	) -> BoxFuture<'a, StorageResult<()>> {
		Box::pin(async move {
			self.collections
				.lock()
				.unwrap_or_else(|err| err.into_inner())
				.entry(collection.to_string())
				.or_insert(Collection { vector_dim, docs: Vec::new() });

			Ok(())
		})
	}

	fn search<'a>(
		&'a self,
		collection: &'a str,
		query: SearchQuery,
		filter: Option<Filter>,
	) -> BoxFuture<'a, StorageResult<Vec<ScoredDocument>>> {
		Box::pin(async move {
			let collections = self.collections.lock().unwrap_or_else(|err| err.into_inner());
			let data = collections.get(collection).ok_or_else(|| {
				StorageError::MissingCollection { collection: collection.to_string() }
			})?;
			let mut scored: Vec<ScoredDocument> = data
				.docs
				.iter()
				.filter(|doc| {
					filter
						.as_ref()
						.map(|filter| filter_matches(filter, &doc_payload(doc)))
						.unwrap_or(true)
				})
				.map(|doc| ScoredDocument {
					id: doc.id.clone(),
					content: doc.content.clone(),
					metadata: doc.metadata.clone(),
					score: cosine(&query.vector, &doc.vector),
				})
				.collect();

			scored.sort_by(|a, b| {
				b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal)
			});
			scored.truncate(query.limit as usize);

			Ok(scored)
		})
	}

	fn upsert<'a>(
		&'a self,
		collection: &'a str,
		documents: Vec<DocumentRecord>,
	) -> BoxFuture<'a, StorageResult<()>> {
		Box::pin(async move {
			let mut collections = self.collections.lock().unwrap_or_else(|err| err.into_inner());
			let data = collections.get_mut(collection).ok_or_else(|| {
				StorageError::MissingCollection { collection: collection.to_string() }
			})?;

			for document in documents {
				data.docs.retain(|existing| existing.id != document.id);
				data.docs.push(document);
			}

			Ok(())
		})
	}

	fn delete_by_filter<'a>(
		&'a self,
		collection: &'a str,
		filter: Filter,
	) -> BoxFuture<'a, StorageResult<()>> {
		Box::pin(async move {
			let mut collections = self.collections.lock().unwrap_or_else(|err| err.into_inner());
			let data = collections.get_mut(collection).ok_or_else(|| {
				StorageError::MissingCollection { collection: collection.to_string() }
			})?;

			data.docs.retain(|doc| !filter_matches(&filter, &doc_payload(doc)));

			Ok(())
		})
	}

	fn scroll<'a>(
		&'a self,
		collection: &'a str,
		filter: Filter,
		limit: u32,
	) -> BoxFuture<'a, StorageResult<Vec<ScoredDocument>>> {
		Box::pin(async move {
			let collections = self.collections.lock().unwrap_or_else(|err| err.into_inner());
			let data = collections.get(collection).ok_or_else(|| {
				StorageError::MissingCollection { collection: collection.to_string() }
			})?;

			Ok(data
				.docs
				.iter()
				.filter(|doc| filter_matches(&filter, &doc_payload(doc)))
				.take(limit as usize)
				.map(|doc| ScoredDocument {
					id: doc.id.clone(),
					content: doc.content.clone(),
					metadata: doc.metadata.clone(),
					score: 0.,
				})
				.collect())
		})
	}
}

fn doc_payload(doc: &DocumentRecord) -> Value {
	json!({ "content": doc.content, "metadata": doc.metadata })
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
	if a.len() != b.len() {
		return 0.;
	}

	let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
	let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
	let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();

	if norm_a == 0. || norm_b == 0. { 0. } else { dot / (norm_a * norm_b) }
}

/// Evaluate a Qdrant filter against a JSON payload with dotted-path keys.
pub fn filter_matches(filter: &Filter, payload: &Value) -> bool {
	let must = filter.must.iter().all(|condition| condition_matches(condition, payload));
	let must_not = filter.must_not.iter().all(|condition| !condition_matches(condition, payload));
	let should = if filter.should.is_empty() {
		true
	} else {
		let matched = filter
			.should
			.iter()
			.filter(|condition| condition_matches(condition, payload))
			.count();
		let min = filter.min_should.as_ref().map(|m| m.min_count as usize).unwrap_or(1);

		matched >= min
	};

	must && must_not && should
}

fn condition_matches(condition: &Condition, payload: &Value) -> bool {
	match &condition.condition_one_of {
		Some(ConditionOneOf::Field(field)) => field_matches(field, payload),
		Some(ConditionOneOf::Filter(filter)) => filter_matches(filter, payload),
		_ => false,
	}
}

fn field_matches(field: &FieldCondition, payload: &Value) -> bool {
	let Some(value) = lookup(payload, &field.key) else {
		return false;
	};
	let Some(match_value) =
		field.r#match.as_ref().and_then(|m| m.match_value.as_ref())
	else {
		return false;
	};

	// Qdrant matches array payloads element-wise.
	let candidates: Vec<&Value> = match value {
		Value::Array(values) => values.iter().collect(),
		other => vec![other],
	};

	candidates.iter().any(|value| match match_value {
		MatchValue::Keyword(keyword) => value.as_str() == Some(keyword.as_str()),
		MatchValue::Keywords(keywords) => value
			.as_str()
			.map(|v| keywords.strings.iter().any(|keyword| keyword == v))
			.unwrap_or(false),
		MatchValue::Integer(integer) => value.as_i64() == Some(*integer),
		MatchValue::Boolean(boolean) => value.as_bool() == Some(*boolean),
		MatchValue::Text(text) => {
			value.as_str().map(|v| v.contains(text.as_str())).unwrap_or(false)
		},
		_ => false,
	})
}

fn lookup<'a>(payload: &'a Value, key: &str) -> Option<&'a Value> {
	key.split('.').try_fold(payload, |value, part| value.get(part))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn dotted_paths_resolve_nested_fields() {
		let payload = json!({ "metadata": { "tenant_id": "t1" } });
		let filter = Filter::must([Condition::matches("metadata.tenant_id", "t1".to_string())]);

		assert!(filter_matches(&filter, &payload));
		assert!(!filter_matches(
			&Filter::must([Condition::matches("metadata.tenant_id", "t2".to_string())]),
			&payload,
		));
	}

	#[test]
	fn keywords_match_any_of_and_arrays_match_elementwise() {
		let payload = json!({ "metadata": { "related_ids": ["a", "b"] } });
		let filter = Filter::must([Condition::matches(
			"metadata.related_ids",
			vec!["b".to_string(), "c".to_string()],
		)]);

		assert!(filter_matches(&filter, &payload));
	}

	#[test]
	fn nested_filters_and_should_semantics() {
		let payload = json!({ "metadata": { "visibility": "shared_domain", "domain_id": "legal" } });
		let inner = Filter::all([
			Condition::matches("metadata.visibility", "shared_domain".to_string()),
			Condition::matches("metadata.domain_id", "legal".to_string()),
		]);
		let filter = Filter {
			should: vec![
				Condition::from(inner),
				Condition::matches("metadata.visibility", "global".to_string()),
			],
			..Default::default()
		};

		assert!(filter_matches(&filter, &payload));
		assert!(!filter_matches(&filter, &json!({ "metadata": { "visibility": "tenant" } })));
	}

	#[test]
	fn missing_fields_never_match() {
		let filter = Filter::must([Condition::matches("metadata.tenant_id", "t1".to_string())]);

		assert!(!filter_matches(&filter, &json!({ "metadata": {} })));
		assert!(!filter_matches(&filter, &json!({})));
	}
}
