//! Enable/disable overlay for knowledge spaces.
//!
//! Spaces are derived from claims, so the only mutable state is an external
//! JSON document naming spaces that operators turned off. The document is
//! re-read when its mtime changes; an unreadable or unparsable document keeps
//! the previously loaded state so a bad edit cannot silently re-enable
//! everything.

use std::{
	collections::HashSet,
	fs, io,
	path::PathBuf,
	sync::{Arc, Mutex},
	time::SystemTime,
};

use serde_json::Value;
use strata_domain::claims::claim_bool;

#[derive(Default)]
struct OverlayState {
	modified: Option<SystemTime>,
	disabled: Arc<HashSet<String>>,
}

pub struct SpaceStateOverlay {
	path: Option<PathBuf>,
	state: Mutex<OverlayState>,
}
impl SpaceStateOverlay {
	pub fn new(path: Option<PathBuf>) -> Self {
		Self { path, state: Mutex::new(OverlayState::default()) }
	}

	pub fn is_enabled(&self, space_id: &str) -> bool {
		!self.disabled().contains(space_id)
	}

	/// Currently disabled space ids, reloading the state file if it changed.
	pub fn disabled(&self) -> Arc<HashSet<String>> {
		let Some(path) = &self.path else {
			return Arc::new(HashSet::new());
		};
		let mut state = self.state.lock().unwrap_or_else(|err| err.into_inner());

		match fs::metadata(path).and_then(|metadata| metadata.modified()) {
			Ok(modified) => {
				if state.modified == Some(modified) {
					return state.disabled.clone();
				}

				match fs::read_to_string(path)
					.map_err(|err| err.to_string())
					.and_then(|raw| parse_overlay(&raw))
				{
					Ok(disabled) => {
						state.modified = Some(modified);
						state.disabled = Arc::new(disabled);
					},
					Err(message) => {
						// Keep the previous state and leave mtime untouched so
						// the next call retries.
						tracing::warn!(
							path = %path.display(),
							error = %message,
							"Failed to reload space state overlay; keeping previous state.",
						);
					},
				}
			},
			Err(err) if err.kind() == io::ErrorKind::NotFound => {
				state.modified = None;
				state.disabled = Arc::new(HashSet::new());
			},
			Err(err) => {
				tracing::warn!(
					path = %path.display(),
					error = %err,
					"Failed to stat space state overlay; keeping previous state.",
				);
			},
		}

		state.disabled.clone()
	}
}

/// The document maps space ids to an enabled flag, either bare
/// (`{"tenant_a": false}`) or wrapped (`{"tenant_a": {"enabled": "no"}}`),
/// optionally nested under a top-level `spaces` key. Flags are coerced the
/// same way boolean claims are.
fn parse_overlay(raw: &str) -> Result<HashSet<String>, String> {
	let value: Value = serde_json::from_str(raw).map_err(|err| err.to_string())?;
	let Value::Object(root) = value else {
		return Err("overlay document must be a JSON object".to_string());
	};
	let entries = match root.get("spaces") {
		Some(Value::Object(spaces)) => spaces,
		Some(other) => return Err(format!("spaces must be an object, got {other}")),
		None => &root,
	};

	Ok(entries
		.iter()
		.filter(|(_, value)| !entry_enabled(value))
		.map(|(space_id, _)| space_id.clone())
		.collect())
}

fn entry_enabled(value: &Value) -> bool {
	match value {
		Value::Object(entry) => entry
			.get("enabled")
			.map(|enabled| claim_bool(Some(enabled)))
			.unwrap_or(true),
		other => claim_bool(Some(other)),
	}
}
