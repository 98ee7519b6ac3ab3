//! Deterministic embeddings for tests.

use std::hash::{DefaultHasher, Hash, Hasher};

use strata_providers::{BoxFuture, Embedder};

/// Token-hashing embedder: similar texts get similar vectors, identical texts
/// get identical ones, and no network is involved.
pub struct HashEmbedder {
	dim: usize,
}
impl HashEmbedder {
	pub fn new(dim: usize) -> Self {
		Self { dim }
	}
}
impl Embedder for HashEmbedder {
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(texts.iter().map(|text| hash_embed(text, self.dim)).collect()) })
	}
}

pub fn hash_embed(text: &str, dim: usize) -> Vec<f32> {
	let mut vector = vec![0_f32; dim.max(1)];

	for token in text.to_lowercase().split_whitespace() {
		let mut hasher = DefaultHasher::new();

		token.hash(&mut hasher);

		let slot = (hasher.finish() % vector.len() as u64) as usize;

		vector[slot] += 1.;
	}

	let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();

	if norm == 0. {
		vector[0] = 1.;
	} else {
		for v in &mut vector {
			*v /= norm;
		}
	}

	vector
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn embeddings_are_deterministic_and_normalized() {
		let a = hash_embed("alpha beta", 8);
		let b = hash_embed("alpha beta", 8);
		let norm = a.iter().map(|v| v * v).sum::<f32>().sqrt();

		assert_eq!(a, b);
		assert!((norm - 1.).abs() < 1e-5);
	}

	#[test]
	fn different_texts_differ() {
		assert_ne!(hash_embed("alpha", 8), hash_embed("omega", 8));
	}
}
