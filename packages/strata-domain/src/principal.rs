use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::claims::{claim_bool, claim_string, claim_string_list};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalType {
	Authenticated,
	Anonymous,
}

/// Resolved identity and authorization claims for a single request.
///
/// Built once per request and passed by value from there on; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
	pub principal_type: PrincipalType,
	pub subject: Option<String>,
	pub tenant_id: Option<String>,
	pub allowed_tenant_ids: Vec<String>,
	pub allowed_domain_ids: Vec<String>,
	pub can_write_shared_domain: bool,
	pub can_write_global: bool,
	/// Raw verified claims, kept for downstream auditing.
	pub token_claims: Map<String, Value>,
}
impl Principal {
	pub fn anonymous() -> Self {
		Self {
			principal_type: PrincipalType::Anonymous,
			subject: Some("anonymous".to_string()),
			tenant_id: None,
			allowed_tenant_ids: Vec::new(),
			allowed_domain_ids: Vec::new(),
			can_write_shared_domain: false,
			can_write_global: false,
			token_claims: Map::new(),
		}
	}

	pub fn is_anonymous(&self) -> bool {
		self.principal_type == PrincipalType::Anonymous
	}
}

/// Build an authenticated principal from verified JWT claims.
///
/// Never fails; callers that require a tenant reject principals with an empty
/// `tenant_id` themselves.
pub fn principal_from_claims(claims: &Map<String, Value>) -> Principal {
	let tenant_id = claim_string(claims.get("tenant_id"));
	let mut allowed_tenant_ids = claim_string_list(claims.get("allowed_tenant_ids"));

	if let Some(tenant_id) = tenant_id.as_ref()
		&& !allowed_tenant_ids.iter().any(|id| id == tenant_id)
	{
		allowed_tenant_ids.insert(0, tenant_id.clone());
	}

	Principal {
		principal_type: PrincipalType::Authenticated,
		subject: claim_string(claims.get("sub"))
			.or_else(|| claim_string(claims.get("preferred_username"))),
		tenant_id,
		allowed_tenant_ids,
		allowed_domain_ids: claim_string_list(claims.get("allowed_domain_ids")),
		can_write_shared_domain: claim_bool(claims.get("can_write_shared_domain")),
		can_write_global: claim_bool(claims.get("can_write_global")),
		token_claims: claims.clone(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn claims(value: Value) -> Map<String, Value> {
		value.as_object().expect("claims must be an object").clone()
	}

	#[test]
	fn anonymous_principal_has_no_grants() {
		let principal = Principal::anonymous();

		assert!(principal.is_anonymous());
		assert!(principal.tenant_id.is_none());
		assert!(principal.allowed_tenant_ids.is_empty());
		assert!(!principal.can_write_shared_domain);
		assert!(!principal.can_write_global);
	}

	#[test]
	fn tenant_id_is_prepended_to_allowed_tenants() {
		let principal = principal_from_claims(&claims(serde_json::json!({
			"sub": "user-1",
			"tenant_id": "t1",
			"allowed_tenant_ids": ["t2", "t3"],
		})));

		assert_eq!(principal.tenant_id.as_deref(), Some("t1"));
		assert_eq!(principal.allowed_tenant_ids, vec!["t1", "t2", "t3"]);
	}

	#[test]
	fn tenant_id_is_not_duplicated_when_already_listed() {
		let principal = principal_from_claims(&claims(serde_json::json!({
			"tenant_id": "t1",
			"allowed_tenant_ids": "t2,t1",
		})));

		assert_eq!(principal.allowed_tenant_ids, vec!["t2", "t1"]);
	}

	#[test]
	fn write_flags_parse_permissively() {
		let principal = principal_from_claims(&claims(serde_json::json!({
			"tenant_id": "t1",
			"can_write_shared_domain": "yes",
			"can_write_global": 1,
		})));

		assert!(principal.can_write_shared_domain);
		assert!(principal.can_write_global);
	}

	#[test]
	fn subject_falls_back_to_preferred_username() {
		let principal = principal_from_claims(&claims(serde_json::json!({
			"preferred_username": "alice",
		})));

		assert_eq!(principal.subject.as_deref(), Some("alice"));
		assert!(principal.tenant_id.is_none());
		assert!(principal.allowed_tenant_ids.is_empty());
	}

	#[test]
	fn raw_claims_are_preserved() {
		let raw = claims(serde_json::json!({ "tenant_id": "t1", "custom": { "a": 1 } }));
		let principal = principal_from_claims(&raw);

		assert_eq!(principal.token_claims, raw);
	}
}
