//! Access resolution: which knowledge spaces a principal may read and write,
//! and how requested scopes map onto them.

use strata_domain::{
	Principal,
	space::{KnowledgeSpace, global_space_id, shared_domain_space_id, tenant_space_id},
};

use crate::{Error, RequestContext, Result, SpaceService};

/// Scope aliases callers may use instead of concrete space ids.
const TENANT_ALIASES: [&str; 2] = ["tenant", "my_tenant"];
const GLOBAL_ALIAS: &str = "global";

impl SpaceService {
	/// Every space a principal's claims grant, with the overlay's enabled
	/// flag applied but disabled spaces still listed.
	///
	/// Claim lists arrive unsanitized; repeated ids collapse onto the first
	/// occurrence so no space is resolved twice.
	pub fn known_spaces(&self, principal: &Principal) -> Vec<KnowledgeSpace> {
		let disabled = self.overlay().disabled();
		let mut spaces: Vec<KnowledgeSpace> = Vec::new();
		let push = |spaces: &mut Vec<KnowledgeSpace>, space: KnowledgeSpace| {
			if !spaces.iter().any(|known| known.id == space.id) {
				spaces.push(space);
			}
		};

		if !principal.is_anonymous() {
			for tenant_id in &principal.allowed_tenant_ids {
				push(&mut spaces, KnowledgeSpace::tenant(tenant_id));
			}
			for domain_id in &principal.allowed_domain_ids {
				push(&mut spaces, KnowledgeSpace::shared_domain(domain_id));
			}
		}

		push(&mut spaces, KnowledgeSpace::global());

		for space in &mut spaces {
			space.enabled = !disabled.contains(&space.id);
		}

		spaces
	}

	/// Spaces the principal may search, in claim order, global last.
	pub fn readable_spaces(&self, principal: &Principal) -> Vec<KnowledgeSpace> {
		self.known_spaces(principal).into_iter().filter(|space| space.enabled).collect()
	}

	/// Spaces the principal may upload to or delete from.
	pub fn writable_spaces(&self, principal: &Principal) -> Vec<KnowledgeSpace> {
		if principal.is_anonymous() {
			return Vec::new();
		}

		let disabled = self.overlay().disabled();
		let mut spaces: Vec<KnowledgeSpace> = Vec::new();

		if let Some(tenant_id) = &principal.tenant_id {
			spaces.push(KnowledgeSpace::tenant(tenant_id));
		}
		if principal.can_write_shared_domain {
			for domain_id in &principal.allowed_domain_ids {
				if !spaces.iter().any(|known| known.id == shared_domain_space_id(domain_id)) {
					spaces.push(KnowledgeSpace::shared_domain(domain_id));
				}
			}
		}
		if principal.can_write_global {
			spaces.push(KnowledgeSpace::global());
		}

		spaces.retain(|space| !disabled.contains(&space.id));

		spaces
	}

	/// Resolve the spaces a search request is scoped to.
	///
	/// An empty request means every readable space. Otherwise aliases are
	/// normalized, duplicates dropped, request order preserved, and any id
	/// outside the readable set fails the whole request so a caller can never
	/// silently search less than they asked for.
	pub fn effective_scope(&self, ctx: &RequestContext) -> Result<Vec<KnowledgeSpace>> {
		let readable = self.readable_spaces(&ctx.principal);

		if ctx.requested_space_ids.is_empty() {
			return Ok(readable);
		}

		let mut resolved: Vec<KnowledgeSpace> = Vec::new();
		let mut denied = Vec::new();

		for raw in &ctx.requested_space_ids {
			let space_id = normalize_space_alias(&ctx.principal, raw);

			if resolved.iter().any(|space| space.id == space_id)
				|| denied.contains(&space_id)
			{
				continue;
			}

			match readable.iter().find(|space| space.id == space_id) {
				Some(space) => resolved.push(space.clone()),
				None => denied.push(space_id),
			}
		}

		if !denied.is_empty() {
			return Err(Error::AccessDenied { space_ids: denied });
		}

		Ok(resolved)
	}

	/// Resolve the single space an upload lands in.
	///
	/// Without an explicit target this prefers the caller's own tenant space
	/// and falls back to the first writable space.
	pub fn upload_target(&self, ctx: &RequestContext) -> Result<KnowledgeSpace> {
		let writable = self.writable_spaces(&ctx.principal);

		match &ctx.target_space_id {
			Some(raw) => {
				let space_id = normalize_space_alias(&ctx.principal, raw);

				writable
					.iter()
					.find(|space| space.id == space_id)
					.cloned()
					.ok_or(Error::AccessDenied { space_ids: vec![space_id] })
			},
			None => {
				let own_tenant =
					ctx.principal.tenant_id.as_deref().map(tenant_space_id);

				writable
					.iter()
					.find(|space| Some(&space.id) == own_tenant.as_ref())
					.or_else(|| writable.first())
					.cloned()
					.ok_or(Error::NoWritableSpace)
			},
		}
	}

	/// Resolve the spaces a delete is allowed to touch: one explicit target,
	/// or the whole writable set.
	pub fn delete_scope(&self, ctx: &RequestContext) -> Result<Vec<KnowledgeSpace>> {
		let writable = self.writable_spaces(&ctx.principal);

		if writable.is_empty() {
			return Err(Error::NoWritableSpace);
		}

		match &ctx.target_space_id {
			Some(raw) => {
				let space_id = normalize_space_alias(&ctx.principal, raw);

				writable
					.iter()
					.find(|space| space.id == space_id)
					.cloned()
					.map(|space| vec![space])
					.ok_or(Error::AccessDenied { space_ids: vec![space_id] })
			},
			None => Ok(writable),
		}
	}
}

fn normalize_space_alias(principal: &Principal, raw: &str) -> String {
	let raw = raw.trim();

	if TENANT_ALIASES.contains(&raw) {
		// Without a tenant the alias stays unresolved and fails the access
		// check downstream.
		return principal.tenant_id.as_deref().map(tenant_space_id).unwrap_or_else(|| {
			raw.to_string()
		});
	}
	if raw == GLOBAL_ALIAS {
		return global_space_id();
	}

	raw.to_string()
}
