pub mod claims;
pub mod principal;
pub mod space;

pub use claims::{claim_bool, claim_string, claim_string_list};
pub use principal::{Principal, PrincipalType, principal_from_claims};
pub use space::{
	GLOBAL_SPACE_ID, KnowledgeSpace, SpaceType, global_space_id, shared_domain_space_id,
	tenant_space_id,
};
