use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, LoreService, Result, activity::ActivityAction, registry::IndexEntry};
use lore_chunking::ChunkingConfig;
use lore_domain::role::Role;
use lore_storage::{models::Document, queries};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestRequest {
	pub workspace_id: Uuid,
	pub text: String,
	#[serde(default)]
	pub metadata: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadDocumentRequest {
	pub workspace_id: Uuid,
	pub user_id: Uuid,
	pub filename: String,
	pub content_type: String,
	pub file_size: i64,
	/// Plain text already extracted from the uploaded file; format parsing happens upstream.
	pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadDocumentResponse {
	pub document_id: Uuid,
	pub chunk_count: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
	pub document_id: Uuid,
	pub filename: String,
	pub content_type: String,
	pub file_size: i64,
	pub chunk_count: u32,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

impl LoreService {
	/// Splits `text` and writes every chunk, tagged with `metadata`, as one batch into the
	/// workspace's collection. Returns the number of chunks written. A dependency failure leaves
	/// it to the caller to compensate any metadata row written beforehand.
	pub async fn ingest(&self, req: IngestRequest) -> Result<u32> {
		if req.text.trim().is_empty() {
			return Err(Error::Validation { message: "text is empty.".to_string() });
		}

		let chunking = ChunkingConfig {
			chunk_size: self.cfg.chunking.chunk_size,
			chunk_overlap: self.cfg.chunking.chunk_overlap,
		};
		let chunks = lore_chunking::split_text(&req.text, &chunking);
		let mut entries = Vec::with_capacity(chunks.len());

		for chunk in &chunks {
			let mut metadata = req.metadata.clone();

			metadata.insert(
				"knowledge_base_id".to_string(),
				Value::String(req.workspace_id.to_string()),
			);
			metadata.insert("type".to_string(), Value::String("document".to_string()));
			metadata.insert("chunk_index".to_string(), Value::from(chunk.chunk_index));

			entries.push(IndexEntry {
				id: Uuid::new_v4(),
				text: chunk.text.clone(),
				metadata,
			});
		}

		let handle = self.registry.collection(req.workspace_id).await?;
		let written = handle.add_entries(entries).await?;

		Ok(written as u32)
	}

	/// Writes the document row first, then the index batch; an ingestion failure deletes the row
	/// again so no document survives with a chunk count inconsistent with the index.
	pub async fn upload_document(
		&self,
		req: UploadDocumentRequest,
	) -> Result<UploadDocumentResponse> {
		let workspace = self.require_workspace(req.workspace_id).await?;

		self.require_role(&workspace, req.user_id, Role::Write).await?;

		if req.text.trim().is_empty() {
			return Err(Error::Validation {
				message: "Document text is empty or could not be extracted.".to_string(),
			});
		}

		let document = Document {
			document_id: Uuid::new_v4(),
			workspace_id: req.workspace_id,
			filename: req.filename.clone(),
			content_type: req.content_type.clone(),
			file_size: req.file_size,
			chunk_count: None,
			created_at: OffsetDateTime::now_utc(),
		};

		queries::insert_document(&self.db.pool, &document).await?;

		let mut metadata = Map::new();

		metadata.insert(
			"document_id".to_string(),
			Value::String(document.document_id.to_string()),
		);
		metadata.insert("filename".to_string(), Value::String(req.filename.clone()));

		let ingest = IngestRequest { workspace_id: req.workspace_id, text: req.text, metadata };
		let chunk_count = match self.ingest(ingest).await {
			Ok(count) => count,
			Err(err) => {
				if let Err(cleanup_err) =
					queries::delete_document(&self.db.pool, document.document_id).await
				{
					tracing::error!(document_id = %document.document_id, error = %cleanup_err, "Failed to remove document row after ingestion failure.");
				}

				return Err(err);
			},
		};

		queries::set_document_chunk_count(
			&self.db.pool,
			document.document_id,
			chunk_count as i32,
		)
		.await?;

		self.record_activity(
			req.user_id,
			ActivityAction::UploadDocument,
			Some(req.workspace_id),
			Some(serde_json::json!({
				"filename": req.filename,
				"document_id": document.document_id,
			})),
		)
		.await?;

		Ok(UploadDocumentResponse { document_id: document.document_id, chunk_count })
	}

	pub async fn list_documents(
		&self,
		workspace_id: Uuid,
		user_id: Uuid,
	) -> Result<Vec<DocumentResponse>> {
		let workspace = self.require_workspace(workspace_id).await?;

		self.require_access(&workspace, user_id).await?;

		let documents = queries::list_documents(&self.db.pool, workspace_id).await?;
		let out = documents
			.into_iter()
			.map(|document| DocumentResponse {
				document_id: document.document_id,
				filename: document.filename,
				content_type: document.content_type,
				file_size: document.file_size,
				chunk_count: document.chunk_count.unwrap_or(0).max(0) as u32,
				created_at: document.created_at,
			})
			.collect();

		Ok(out)
	}
}
