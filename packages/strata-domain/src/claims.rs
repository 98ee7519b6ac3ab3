use serde_json::Value;

/// Coerce a claim value into a string list.
///
/// Accepts a JSON array, a single scalar, or a comma-separated string; blank
/// entries are dropped.
pub fn claim_string_list(value: Option<&Value>) -> Vec<String> {
	let Some(value) = value else {
		return Vec::new();
	};

	match value {
		Value::Null => Vec::new(),
		Value::Array(items) => items
			.iter()
			.filter_map(|item| match item {
				Value::Null => None,
				other => claim_scalar(other),
			})
			.filter(|item| !item.trim().is_empty())
			.collect(),
		Value::String(raw) => {
			let trimmed = raw.trim();

			if trimmed.is_empty() {
				return Vec::new();
			}
			if trimmed.contains(',') {
				return trimmed
					.split(',')
					.map(str::trim)
					.filter(|item| !item.is_empty())
					.map(str::to_string)
					.collect();
			}

			vec![trimmed.to_string()]
		},
		other => claim_scalar(other).into_iter().collect(),
	}
}

/// Coerce a claim value into a bool. `"1"`, `"true"`, `"yes"`, and `"on"`
/// (case-insensitive) and non-zero numbers are true; everything else is false.
pub fn claim_bool(value: Option<&Value>) -> bool {
	let Some(value) = value else {
		return false;
	};

	match value {
		Value::Bool(flag) => *flag,
		Value::Null => false,
		Value::Number(number) => number.as_f64().map(|number| number != 0.0).unwrap_or(false),
		Value::String(raw) => {
			matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
		},
		_ => false,
	}
}

/// Coerce a claim value into a non-empty string.
pub fn claim_string(value: Option<&Value>) -> Option<String> {
	value.and_then(claim_scalar).filter(|raw| !raw.trim().is_empty())
}

fn claim_scalar(value: &Value) -> Option<String> {
	match value {
		Value::String(raw) => Some(raw.clone()),
		Value::Number(number) => Some(number.to_string()),
		Value::Bool(flag) => Some(flag.to_string()),
		_ => None,
	}
}
