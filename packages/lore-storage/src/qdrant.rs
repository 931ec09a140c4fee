use std::collections::HashMap;

use qdrant_client::qdrant::{
	CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointStruct,
	SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};

use crate::Result;

/// One similarity hit. `distance` is ascending-better: the cosine similarity score reported by
/// Qdrant is converted to `1 - score` so merge-ranking across collections can sort one way.
#[derive(Debug, Clone)]
pub struct ScoredHit {
	pub payload: HashMap<String, Value>,
	pub distance: f32,
}

pub struct VectorIndex {
	pub client: qdrant_client::Qdrant,
	pub vector_dim: u32,
}
impl VectorIndex {
	pub fn new(cfg: &lore_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, vector_dim: cfg.vector_dim })
	}

	/// Create-or-get. Safe to race: a concurrent creation of the same collection is treated as
	/// success.
	pub async fn ensure_collection(&self, collection: &str) -> Result<()> {
		if self.client.collection_exists(collection).await? {
			return Ok(());
		}

		let request = CreateCollectionBuilder::new(collection)
			.vectors_config(VectorParamsBuilder::new(self.vector_dim as u64, Distance::Cosine));

		match self.client.create_collection(request).await {
			Ok(_) => Ok(()),
			Err(err) if is_already_exists_error(&err) => Ok(()),
			Err(err) => Err(err.into()),
		}
	}

	pub async fn delete_collection(&self, collection: &str) -> Result<()> {
		match self.client.delete_collection(collection).await {
			Ok(_) => Ok(()),
			Err(err) if is_not_found_error(&err) => Ok(()),
			Err(err) => Err(err.into()),
		}
	}

	/// Writes one ingestion batch and waits for it to be applied, so a returned success means the
	/// entries are queryable.
	pub async fn upsert(&self, collection: &str, points: Vec<PointStruct>) -> Result<()> {
		if points.is_empty() {
			return Ok(());
		}

		let request = UpsertPointsBuilder::new(collection, points).wait(true);

		self.client.upsert_points(request).await?;

		Ok(())
	}

	pub async fn search(
		&self,
		collection: &str,
		vector: Vec<f32>,
		limit: u64,
		filter: Option<Filter>,
	) -> Result<Vec<ScoredHit>> {
		let mut request =
			SearchPointsBuilder::new(collection, vector, limit).with_payload(true);

		if let Some(filter) = filter {
			request = request.filter(filter);
		}

		let response = self.client.search_points(request).await?;
		let hits = response
			.result
			.into_iter()
			.map(|point| ScoredHit { payload: point.payload, distance: 1.0 - point.score })
			.collect();

		Ok(hits)
	}

	pub async fn delete_points(&self, collection: &str, filter: Filter) -> Result<()> {
		let request = DeletePointsBuilder::new(collection).points(filter).wait(true);

		match self.client.delete_points(request).await {
			Ok(_) => Ok(()),
			Err(err) if is_not_found_error(&err) => Ok(()),
			Err(err) => Err(err.into()),
		}
	}
}

fn is_not_found_error(err: &qdrant_client::QdrantError) -> bool {
	let message = err.to_string().to_lowercase();

	message.contains("not found") || message.contains("doesn't exist") || message.contains("404")
}

fn is_already_exists_error(err: &qdrant_client::QdrantError) -> bool {
	let message = err.to_string().to_lowercase();

	message.contains("already exists")
}
