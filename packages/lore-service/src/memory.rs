use qdrant_client::qdrant::{Condition, Filter};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::{Error, LoreService, Result, activity::ActivityAction, registry::IndexEntry};
use lore_domain::{metadata as metadata_rules, role::Role, ttl};
use lore_storage::{models::MemoryItem, queries};

const DEFAULT_CLEANUP_LIMIT: u32 = 100;
const MAX_CLEANUP_LIMIT: u32 = 1_000;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreMemoryRequest {
	pub workspace_id: Uuid,
	pub user_id: Uuid,
	pub content: String,
	#[serde(default)]
	pub metadata: Map<String, Value>,
	pub ttl_seconds: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryMemoryRequest {
	pub workspace_id: Uuid,
	pub user_id: Uuid,
	pub query: String,
	pub top_k: Option<u32>,
	#[serde(default)]
	pub metadata_filter: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CleanupMemoryRequest {
	pub workspace_id: Uuid,
	pub user_id: Uuid,
	pub limit: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CleanupMemoryResponse {
	pub deleted_rows: u64,
	pub deleted_vectors: u64,
	pub skipped_vectors: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoryResponse {
	pub memory_id: Uuid,
	pub workspace_id: Uuid,
	pub user_id: Uuid,
	pub content: String,
	pub metadata: Value,
	pub ttl_seconds: Option<i64>,
	#[serde(with = "crate::time_serde::option")]
	pub expires_at: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

fn reject_reserved_keys(metadata: &Map<String, Value>, field: &str) -> Result<()> {
	let reserved = metadata_rules::reserved_keys_in(metadata);

	if reserved.is_empty() {
		return Ok(());
	}

	Err(Error::Validation {
		message: format!("{field} uses reserved keys: {}.", reserved.join(", ")),
	})
}

fn memory_response(item: MemoryItem) -> MemoryResponse {
	MemoryResponse {
		memory_id: item.memory_id,
		workspace_id: item.workspace_id,
		user_id: item.user_id,
		content: item.content,
		metadata: item.metadata,
		ttl_seconds: item.ttl_seconds,
		expires_at: item.expires_at,
		created_at: item.created_at,
	}
}

impl LoreService {
	/// Relational row first, vector entry second. A failed vector write deletes the row again
	/// before the error propagates, so the two stores never disagree about a live item.
	pub async fn store_memory(&self, req: StoreMemoryRequest) -> Result<MemoryResponse> {
		let workspace = self.require_workspace(req.workspace_id).await?;

		self.require_role(&workspace, req.user_id, Role::Write).await?;

		if req.content.trim().is_empty() {
			return Err(Error::Validation { message: "content is required.".to_string() });
		}

		reject_reserved_keys(&req.metadata, "metadata")?;

		let now = OffsetDateTime::now_utc();
		let expires_at = ttl::expires_at_from_ttl(req.ttl_seconds, now);
		let item = MemoryItem {
			memory_id: Uuid::new_v4(),
			workspace_id: req.workspace_id,
			user_id: req.user_id,
			content: req.content.clone(),
			metadata: Value::Object(req.metadata.clone()),
			ttl_seconds: req.ttl_seconds,
			expires_at,
			created_at: now,
		};

		queries::insert_memory_item(&self.db.pool, &item).await?;

		let mut payload = req.metadata;

		payload.insert(
			"knowledge_base_id".to_string(),
			Value::String(req.workspace_id.to_string()),
		);
		payload.insert("type".to_string(), Value::String("memory".to_string()));
		payload.insert("memory_id".to_string(), Value::String(item.memory_id.to_string()));

		if let Some(expires_at) = expires_at {
			let formatted = expires_at.format(&Rfc3339).map_err(|err| Error::Storage {
				message: format!("Failed to format expiry timestamp: {err}."),
			})?;

			payload.insert("expires_at".to_string(), Value::String(formatted));
		}

		let entry = IndexEntry { id: item.memory_id, text: item.content.clone(), metadata: payload };
		let write_result = match self.registry.collection(req.workspace_id).await {
			Ok(handle) => handle.add_entries(vec![entry]).await,
			Err(err) => Err(err),
		};

		if let Err(err) = write_result {
			if let Err(cleanup_err) =
				queries::delete_memory_item(&self.db.pool, item.memory_id).await
			{
				tracing::error!(memory_id = %item.memory_id, error = %cleanup_err, "Failed to remove memory row after a vector write failure.");
			}

			return Err(err);
		}

		self.record_activity(
			req.user_id,
			ActivityAction::StoreMemory,
			Some(req.workspace_id),
			Some(serde_json::json!({ "memory_id": item.memory_id })),
		)
		.await?;

		Ok(memory_response(item))
	}

	/// Expiry is enforced twice on this path: once against the vector payload, once against the
	/// re-fetched relational row. An item expired by either test is absent.
	pub async fn query_memory(&self, req: QueryMemoryRequest) -> Result<Vec<MemoryResponse>> {
		let workspace = self.require_workspace(req.workspace_id).await?;

		self.require_access(&workspace, req.user_id).await?;

		if req.query.trim().is_empty() {
			return Err(Error::Validation { message: "query is required.".to_string() });
		}

		reject_reserved_keys(&req.metadata_filter, "metadata_filter")?;

		let top_k = crate::search::clamp_top_k(&self.cfg.retrieval, req.top_k);
		let mut conditions = vec![Condition::matches("type", "memory".to_string())];

		for (key, value) in &req.metadata_filter {
			conditions.push(metadata_condition(key, value)?);
		}

		let filter = Filter::must(conditions);
		let handle = self.registry.collection(req.workspace_id).await?;
		let hits = handle.search(&req.query, top_k, Some(filter)).await?;
		let now = OffsetDateTime::now_utc();
		let mut out = Vec::with_capacity(hits.len());

		for hit in hits {
			if crate::payload_str(&hit.payload, "type") != Some("memory") {
				continue;
			}
			if crate::payload_memory_expired(&hit.payload, now) {
				continue;
			}

			let Some(memory_id) = crate::payload_uuid(&hit.payload, "memory_id") else {
				continue;
			};
			let Some(item) =
				queries::fetch_live_memory_item(&self.db.pool, memory_id, now).await?
			else {
				continue;
			};

			if item.workspace_id != req.workspace_id {
				continue;
			}

			out.push(memory_response(item));
		}

		Ok(out)
	}

	/// Maintenance only; the read paths stay correct without it. Physically deletes expired items
	/// from both stores, keeping rows whose vector delete failed so a later run can retry them.
	pub async fn cleanup_expired_memory(
		&self,
		req: CleanupMemoryRequest,
	) -> Result<CleanupMemoryResponse> {
		let workspace = self.require_workspace(req.workspace_id).await?;

		self.require_role(&workspace, req.user_id, Role::Admin).await?;

		let limit = req.limit.unwrap_or(DEFAULT_CLEANUP_LIMIT).clamp(1, MAX_CLEANUP_LIMIT);
		let now = OffsetDateTime::now_utc();
		let expired =
			queries::list_expired_memory_items(&self.db.pool, req.workspace_id, now, limit as i64)
				.await?;

		if expired.is_empty() {
			return Ok(CleanupMemoryResponse {
				deleted_rows: 0,
				deleted_vectors: 0,
				skipped_vectors: 0,
			});
		}

		let handle = self.registry.collection(req.workspace_id).await?;
		let mut deletable = Vec::with_capacity(expired.len());
		let mut deleted_vectors = 0_u64;
		let mut skipped_vectors = 0_u64;

		for item in &expired {
			let filter =
				Filter::must([Condition::matches("memory_id", item.memory_id.to_string())]);

			match handle.delete_points(filter).await {
				Ok(()) => {
					deletable.push(item.memory_id);

					deleted_vectors += 1;
				},
				Err(err) => {
					tracing::warn!(memory_id = %item.memory_id, error = %err, "Skipping expired memory item; vector delete failed.");

					skipped_vectors += 1;
				},
			}
		}

		let deleted_rows = queries::delete_memory_items(&self.db.pool, &deletable).await?;

		tracing::info!(workspace_id = %req.workspace_id, deleted_rows, deleted_vectors, skipped_vectors, "Cleaned up expired memory items.");

		Ok(CleanupMemoryResponse { deleted_rows, deleted_vectors, skipped_vectors })
	}
}

fn metadata_condition(key: &str, value: &Value) -> Result<Condition> {
	match value {
		Value::String(text) => Ok(Condition::matches(key, text.clone())),
		Value::Bool(flag) => Ok(Condition::matches(key, *flag)),
		Value::Number(number) => number
			.as_i64()
			.map(|int| Condition::matches(key, int))
			.ok_or_else(|| Error::Validation {
				message: format!("metadata_filter.{key} must be an integer number."),
			}),
		_ => Err(Error::Validation {
			message: format!(
				"metadata_filter.{key} must be a string, integer, or boolean."
			),
		}),
	}
}
