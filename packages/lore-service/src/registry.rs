use std::{
	collections::HashMap,
	sync::{Arc, RwLock},
};

use qdrant_client::{
	client::Payload,
	qdrant::{Filter, PointStruct, Value},
};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::{EmbeddingProvider, Error, Result};
use lore_config::{EmbeddingProviderConfig, Qdrant};
use lore_storage::qdrant::{ScoredHit, VectorIndex};

/// One entry to be indexed: the chunk text plus its payload metadata. The embedding is computed
/// by the handle, transparently to the caller.
#[derive(Debug, Clone)]
pub struct IndexEntry {
	pub id: Uuid,
	pub text: String,
	pub metadata: Map<String, JsonValue>,
}

/// Keyed cache of per-workspace collection handles. Handles are expensive (they bundle the index
/// client and the embedding provider), safe to share across requests, and must be invalidated
/// before their collection is deleted.
pub struct CollectionRegistry {
	index: Arc<VectorIndex>,
	qdrant_cfg: Qdrant,
	embedding_cfg: EmbeddingProviderConfig,
	embedding: Arc<dyn EmbeddingProvider>,
	handles: RwLock<HashMap<Uuid, Arc<CollectionHandle>>>,
}
impl CollectionRegistry {
	pub fn new(
		index: VectorIndex,
		qdrant_cfg: Qdrant,
		embedding_cfg: EmbeddingProviderConfig,
		embedding: Arc<dyn EmbeddingProvider>,
	) -> Self {
		Self {
			index: Arc::new(index),
			qdrant_cfg,
			embedding_cfg,
			embedding,
			handles: RwLock::new(HashMap::new()),
		}
	}

	/// Deterministic mapping from a workspace to its collection; reconstructible without any
	/// stored state.
	pub fn collection_name(&self, workspace_id: Uuid) -> String {
		format!("{}{}", self.qdrant_cfg.collection_prefix, workspace_id.simple())
	}

	pub async fn collection(&self, workspace_id: Uuid) -> Result<Arc<CollectionHandle>> {
		{
			let handles = self.handles.read().unwrap_or_else(|err| err.into_inner());

			if let Some(handle) = handles.get(&workspace_id) {
				return Ok(handle.clone());
			}
		}

		if self.embedding_cfg.api_key.trim().is_empty() {
			return Err(Error::Config {
				message: "Embedding provider api_key is not configured.".to_string(),
			});
		}

		let collection = self.collection_name(workspace_id);

		self.index.ensure_collection(&collection).await?;

		let handle = Arc::new(CollectionHandle {
			index: self.index.clone(),
			embedding_cfg: self.embedding_cfg.clone(),
			embedding: self.embedding.clone(),
			collection,
		});
		// Two requests may race to construct the same handle; create-or-get above is idempotent
		// and the first insert wins.
		let mut handles = self.handles.write().unwrap_or_else(|err| err.into_inner());
		let entry = handles.entry(workspace_id).or_insert(handle).clone();

		Ok(entry)
	}

	/// The cached handle is dropped before the remote collection, so once this returns no caller
	/// can obtain a handle bound to the destroyed collection.
	pub async fn delete_collection(&self, workspace_id: Uuid) -> Result<()> {
		{
			let mut handles = self.handles.write().unwrap_or_else(|err| err.into_inner());

			handles.remove(&workspace_id);
		}

		let collection = self.collection_name(workspace_id);

		self.index.delete_collection(&collection).await?;

		tracing::info!(workspace_id = %workspace_id, collection = %collection, "Deleted workspace collection.");

		Ok(())
	}
}

pub struct CollectionHandle {
	index: Arc<VectorIndex>,
	embedding_cfg: EmbeddingProviderConfig,
	embedding: Arc<dyn EmbeddingProvider>,
	collection: String,
}
impl CollectionHandle {
	pub fn name(&self) -> &str {
		&self.collection
	}

	/// Embeds and writes `entries` as one batch. Returns the number of entries written; zero
	/// entries is a no-op, not an error.
	pub async fn add_entries(&self, entries: Vec<IndexEntry>) -> Result<usize> {
		if entries.is_empty() {
			return Ok(0);
		}

		let texts: Vec<String> = entries.iter().map(|entry| entry.text.clone()).collect();
		let vectors = self.embedding.embed(&self.embedding_cfg, &texts).await?;

		if vectors.len() != entries.len() {
			return Err(Error::DependencyUnavailable {
				message: format!(
					"Embedding provider returned {} vectors for {} entries.",
					vectors.len(),
					entries.len()
				),
			});
		}

		let mut points = Vec::with_capacity(entries.len());

		for (entry, vector) in entries.into_iter().zip(vectors.into_iter()) {
			self.validate_vector_dim(&vector)?;

			let mut payload_map: HashMap<String, Value> = entry
				.metadata
				.into_iter()
				.map(|(key, value)| (key, Value::from(value)))
				.collect();

			payload_map.insert("text".to_string(), Value::from(entry.text));

			let payload = Payload::from(payload_map);

			points.push(PointStruct::new(entry.id.to_string(), vector, payload));
		}

		let written = points.len();

		self.index.upsert(&self.collection, points).await?;

		Ok(written)
	}

	pub async fn search(
		&self,
		query: &str,
		limit: u64,
		filter: Option<Filter>,
	) -> Result<Vec<ScoredHit>> {
		let vectors =
			self.embedding.embed(&self.embedding_cfg, &[query.to_string()]).await?;
		let Some(vector) = vectors.into_iter().next() else {
			return Err(Error::DependencyUnavailable {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};

		self.validate_vector_dim(&vector)?;

		let hits = self.index.search(&self.collection, vector, limit, filter).await?;

		Ok(hits)
	}

	pub async fn delete_points(&self, filter: Filter) -> Result<()> {
		self.index.delete_points(&self.collection, filter).await?;

		Ok(())
	}

	fn validate_vector_dim(&self, vector: &[f32]) -> Result<()> {
		if vector.len() != self.embedding_cfg.dimensions as usize {
			return Err(Error::DependencyUnavailable {
				message: format!(
					"Embedding dimension {} does not match configured dimensions {}.",
					vector.len(),
					self.embedding_cfg.dimensions
				),
			});
		}

		Ok(())
	}
}
