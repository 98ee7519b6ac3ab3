//! Logical-to-physical collection routing.
//!
//! Routing is a pure function of the validated configuration, so it never
//! fails for a well-formed space.

use strata_config::{CollectionStrategy, render_template};
use strata_domain::space::{KnowledgeSpace, SpaceType};

use crate::{Error, Result, SpaceService};

impl SpaceService {
	/// Physical collection name backing a knowledge space.
	///
	/// * `single`: everything lives in the one configured collection.
	/// * `hybrid` and `isolated`: tenant and shared-domain spaces get templated
	///   per-id collections, global content a fixed one.
	pub fn collection_for(&self, space: &KnowledgeSpace) -> Result<String> {
		let spaces_cfg = &self.cfg.spaces;

		if spaces_cfg.collection_strategy == CollectionStrategy::Single {
			return Ok(self.cfg.storage.qdrant.collection.clone());
		}

		match space.space_type {
			SpaceType::Tenant => {
				let tenant_id = space.tenant_id.as_deref().ok_or_else(|| Error::UnknownSpace {
					space_id: space.id.clone(),
				})?;

				Ok(render_template(&spaces_cfg.tenant_collection_template, "tenant_id", tenant_id))
			},
			SpaceType::SharedDomain => {
				let domain_id = space.domain_id.as_deref().ok_or_else(|| Error::UnknownSpace {
					space_id: space.id.clone(),
				})?;

				Ok(render_template(
					&spaces_cfg.shared_domain_collection_template,
					"domain_id",
					domain_id,
				))
			},
			SpaceType::Global => Ok(spaces_cfg.global_collection_name.clone()),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use strata_testkit::{HashEmbedder, MemoryVectorStore, sample_config};

	use super::*;

	fn service_with(strategy: CollectionStrategy) -> SpaceService {
		let mut cfg = sample_config();

		cfg.spaces.collection_strategy = strategy;

		SpaceService::new(cfg, Arc::new(MemoryVectorStore::new()), Arc::new(HashEmbedder::new(8)))
	}

	#[test]
	fn single_strategy_routes_everything_to_one_collection() {
		let svc = service_with(CollectionStrategy::Single);
		let collection = svc.cfg.storage.qdrant.collection.clone();

		assert_eq!(svc.collection_for(&KnowledgeSpace::tenant("acme")).unwrap(), collection);
		assert_eq!(svc.collection_for(&KnowledgeSpace::shared_domain("legal")).unwrap(), collection);
		assert_eq!(svc.collection_for(&KnowledgeSpace::global()).unwrap(), collection);
	}

	#[test]
	fn hybrid_strategy_templates_tenant_and_shared_domain_collections() {
		let svc = service_with(CollectionStrategy::Hybrid);

		assert_eq!(svc.collection_for(&KnowledgeSpace::tenant("acme")).unwrap(), "tenant_acme");
		assert_eq!(
			svc.collection_for(&KnowledgeSpace::shared_domain("legal")).unwrap(),
			"shared_legal",
		);
		assert_eq!(
			svc.collection_for(&KnowledgeSpace::global()).unwrap(),
			svc.cfg.spaces.global_collection_name,
		);
	}

	#[test]
	fn isolated_strategy_gives_every_space_type_its_own_collection() {
		let svc = service_with(CollectionStrategy::Isolated);

		assert_eq!(svc.collection_for(&KnowledgeSpace::tenant("acme")).unwrap(), "tenant_acme");
		assert_eq!(
			svc.collection_for(&KnowledgeSpace::shared_domain("legal")).unwrap(),
			"shared_legal",
		);
		assert_eq!(
			svc.collection_for(&KnowledgeSpace::global()).unwrap(),
			svc.cfg.spaces.global_collection_name,
		);
	}
}
