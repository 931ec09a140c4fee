use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
	pub user_id: Uuid,
	pub username: String,
	pub email: String,
	pub api_key: Option<String>,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Workspace {
	pub workspace_id: Uuid,
	pub name: String,
	pub description: String,
	pub visibility: String,
	pub owner_id: Uuid,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WorkspaceMember {
	pub membership_id: Uuid,
	pub workspace_id: Uuid,
	pub user_id: Uuid,
	pub role: String,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Document {
	pub document_id: Uuid,
	pub workspace_id: Uuid,
	pub filename: String,
	pub content_type: String,
	pub file_size: i64,
	/// NULL until the ingestion batch for this document has been written; once set it must equal
	/// the number of vector entries actually indexed.
	pub chunk_count: Option<i32>,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MemoryItem {
	pub memory_id: Uuid,
	pub workspace_id: Uuid,
	pub user_id: Uuid,
	pub content: String,
	pub metadata: Value,
	pub ttl_seconds: Option<i64>,
	pub expires_at: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Activity {
	pub activity_id: Uuid,
	pub user_id: Uuid,
	pub action: String,
	pub workspace_id: Option<Uuid>,
	pub detail: Option<Value>,
	pub created_at: OffsetDateTime,
}
