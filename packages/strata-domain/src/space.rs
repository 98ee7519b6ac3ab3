use serde::{Deserialize, Serialize};

/// Process-wide id of the single global knowledge space.
pub const GLOBAL_SPACE_ID: &str = "shared_global";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceType {
	Tenant,
	SharedDomain,
	Global,
}
impl SpaceType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Tenant => "tenant",
			Self::SharedDomain => "shared_domain",
			Self::Global => "global",
		}
	}
}

/// A logical, access-controlled partition of retrievable content.
///
/// Spaces are computed on demand from a principal's claims; only the enabled
/// flag is overlaid from external state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeSpace {
	pub id: String,
	pub space_type: SpaceType,
	pub tenant_id: Option<String>,
	pub domain_id: Option<String>,
	pub display_name: String,
	pub enabled: bool,
}
impl KnowledgeSpace {
	pub fn tenant(tenant_id: &str) -> Self {
		Self {
			id: tenant_space_id(tenant_id),
			space_type: SpaceType::Tenant,
			tenant_id: Some(tenant_id.to_string()),
			domain_id: None,
			display_name: format!("Tenant {tenant_id}"),
			enabled: true,
		}
	}

	pub fn shared_domain(domain_id: &str) -> Self {
		Self {
			id: shared_domain_space_id(domain_id),
			space_type: SpaceType::SharedDomain,
			tenant_id: None,
			domain_id: Some(domain_id.to_string()),
			display_name: format!("Shared ({domain_id})"),
			enabled: true,
		}
	}

	pub fn global() -> Self {
		Self {
			id: global_space_id(),
			space_type: SpaceType::Global,
			tenant_id: None,
			domain_id: None,
			display_name: "Global".to_string(),
			enabled: true,
		}
	}
}

pub fn tenant_space_id(tenant_id: &str) -> String {
	format!("tenant_{tenant_id}")
}

pub fn shared_domain_space_id(domain_id: &str) -> String {
	format!("shared_{domain_id}")
}

pub fn global_space_id() -> String {
	GLOBAL_SPACE_ID.to_string()
}
