use serde_json::{Map, Value};

/// Keys the system assigns on every vector payload to preserve provenance and expiry semantics.
/// Caller-supplied metadata must never overwrite them.
pub const RESERVED_METADATA_KEYS: [&str; 4] = ["knowledge_base_id", "type", "memory_id", "expires_at"];

pub fn is_reserved_key(key: &str) -> bool {
	RESERVED_METADATA_KEYS.contains(&key)
}

/// Returns the reserved keys present in `metadata`, sorted, so validation errors can name the
/// offending fields.
pub fn reserved_keys_in(metadata: &Map<String, Value>) -> Vec<String> {
	let mut found: Vec<String> =
		metadata.keys().filter(|key| is_reserved_key(key)).cloned().collect();

	found.sort();

	found
}
