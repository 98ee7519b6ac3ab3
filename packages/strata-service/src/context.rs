use strata_domain::Principal;

/// Per-request scoping inputs, resolved once by the transport layer.
#[derive(Debug, Clone)]
pub struct RequestContext {
	pub principal: Principal,
	/// Knowledge-space ids (or aliases) the caller asked to search.
	/// Empty means every readable space.
	pub requested_space_ids: Vec<String>,
	/// Knowledge-space id (or alias) the caller asked to write to or delete
	/// from. Absent means the caller's default writable space.
	pub target_space_id: Option<String>,
}
impl RequestContext {
	pub fn new(principal: Principal) -> Self {
		Self { principal, requested_space_ids: Vec::new(), target_space_id: None }
	}

	pub fn with_spaces(mut self, requested_space_ids: Vec<String>) -> Self {
		self.requested_space_ids = requested_space_ids;

		self
	}

	pub fn with_target(mut self, target_space_id: Option<String>) -> Self {
		self.target_space_id = target_space_id;

		self
	}
}
