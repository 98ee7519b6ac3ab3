//! Knowledge-space listing for the calling principal.

use serde::{Deserialize, Serialize};
use strata_domain::space::SpaceType;

use crate::{RequestContext, SpaceService};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceInfo {
	pub id: String,
	pub space_type: SpaceType,
	pub display_name: String,
	pub enabled: bool,
	pub can_write: bool,
}

impl SpaceService {
	/// Every space the principal's claims grant, including disabled ones so
	/// clients can render them greyed out.
	pub fn list_spaces(&self, ctx: &RequestContext) -> Vec<SpaceInfo> {
		let writable: Vec<String> = self
			.writable_spaces(&ctx.principal)
			.into_iter()
			.map(|space| space.id)
			.collect();

		self.known_spaces(&ctx.principal)
			.into_iter()
			.map(|space| SpaceInfo {
				can_write: space.enabled && writable.contains(&space.id),
				id: space.id,
				space_type: space.space_type,
				display_name: space.display_name,
				enabled: space.enabled,
			})
			.collect()
	}
}
