use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result,
	models::{Activity, Document, MemoryItem, User, Workspace, WorkspaceMember},
};

const WORKSPACE_COLUMNS: &str =
	"workspace_id, name, description, visibility, owner_id, created_at, updated_at";
const MEMORY_COLUMNS: &str =
	"memory_id, workspace_id, user_id, content, metadata, ttl_seconds, expires_at, created_at";

fn conflict_on_unique(err: sqlx::Error, message: &str) -> Error {
	if let sqlx::Error::Database(db_err) = &err
		&& db_err.code().as_deref() == Some("23505")
	{
		return Error::Conflict(message.to_string());
	}

	Error::Sqlx(err)
}

pub async fn insert_user<'e, E>(executor: E, user: &User) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO users (user_id, username, email, api_key, created_at)
VALUES ($1, $2, $3, $4, $5)",
	)
	.bind(user.user_id)
	.bind(user.username.as_str())
	.bind(user.email.as_str())
	.bind(user.api_key.as_deref())
	.bind(user.created_at)
	.execute(executor)
	.await
	.map_err(|err| conflict_on_unique(err, "Username or email is already in use."))?;

	Ok(())
}

pub async fn fetch_user<'e, E>(executor: E, user_id: Uuid) -> Result<Option<User>>
where
	E: PgExecutor<'e>,
{
	let user = sqlx::query_as::<_, User>(
		"SELECT user_id, username, email, api_key, created_at FROM users WHERE user_id = $1",
	)
	.bind(user_id)
	.fetch_optional(executor)
	.await?;

	Ok(user)
}

pub async fn search_users<'e, E>(executor: E, query: &str, limit: i64) -> Result<Vec<User>>
where
	E: PgExecutor<'e>,
{
	let pattern = format!("%{}%", query.trim());
	let users = sqlx::query_as::<_, User>(
		"\
SELECT user_id, username, email, api_key, created_at
FROM users
WHERE username ILIKE $1 OR email ILIKE $1
ORDER BY username
LIMIT $2",
	)
	.bind(pattern.as_str())
	.bind(limit)
	.fetch_all(executor)
	.await?;

	Ok(users)
}

pub async fn update_user_api_key<'e, E>(executor: E, user_id: Uuid, api_key: &str) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("UPDATE users SET api_key = $1 WHERE user_id = $2")
		.bind(api_key)
		.bind(user_id)
		.execute(executor)
		.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound("User does not exist.".to_string()));
	}

	Ok(())
}

pub async fn insert_workspace<'e, E>(executor: E, workspace: &Workspace) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO workspaces (workspace_id, name, description, visibility, owner_id, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $7)",
	)
	.bind(workspace.workspace_id)
	.bind(workspace.name.as_str())
	.bind(workspace.description.as_str())
	.bind(workspace.visibility.as_str())
	.bind(workspace.owner_id)
	.bind(workspace.created_at)
	.bind(workspace.updated_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn fetch_workspace<'e, E>(executor: E, workspace_id: Uuid) -> Result<Option<Workspace>>
where
	E: PgExecutor<'e>,
{
	let workspace = sqlx::query_as::<_, Workspace>(&format!(
		"SELECT {WORKSPACE_COLUMNS} FROM workspaces WHERE workspace_id = $1"
	))
	.bind(workspace_id)
	.fetch_optional(executor)
	.await?;

	Ok(workspace)
}

pub async fn update_workspace<'e, E>(executor: E, workspace: &Workspace) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE workspaces
SET name = $1, description = $2, visibility = $3, updated_at = $4
WHERE workspace_id = $5",
	)
	.bind(workspace.name.as_str())
	.bind(workspace.description.as_str())
	.bind(workspace.visibility.as_str())
	.bind(workspace.updated_at)
	.bind(workspace.workspace_id)
	.execute(executor)
	.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound("Workspace does not exist.".to_string()));
	}

	Ok(())
}

pub async fn delete_workspace<'e, E>(executor: E, workspace_id: Uuid) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM workspaces WHERE workspace_id = $1")
		.bind(workspace_id)
		.execute(executor)
		.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound("Workspace does not exist.".to_string()));
	}

	Ok(())
}

/// Workspaces the user owns or belongs to. Public workspaces are excluded here; they only widen
/// the set of queryable workspaces, not the user's own listing.
pub async fn list_joined_workspaces<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Workspace>>
where
	E: PgExecutor<'e>,
{
	let workspaces = sqlx::query_as::<_, Workspace>(&format!(
		"\
SELECT {WORKSPACE_COLUMNS}
FROM workspaces
WHERE owner_id = $1
	OR workspace_id IN (SELECT workspace_id FROM workspace_members WHERE user_id = $1)
ORDER BY created_at DESC"
	))
	.bind(user_id)
	.fetch_all(executor)
	.await?;

	Ok(workspaces)
}

/// Owned, member, and public workspace ids, deduplicated by the query itself.
pub async fn list_accessible_workspace_ids<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Uuid>>
where
	E: PgExecutor<'e>,
{
	let ids = sqlx::query_scalar::<_, Uuid>(
		"\
SELECT workspace_id
FROM workspaces
WHERE visibility = 'public'
	OR owner_id = $1
	OR workspace_id IN (SELECT workspace_id FROM workspace_members WHERE user_id = $1)
ORDER BY created_at DESC",
	)
	.bind(user_id)
	.fetch_all(executor)
	.await?;

	Ok(ids)
}

pub async fn insert_member<'e, E>(executor: E, member: &WorkspaceMember) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO workspace_members (membership_id, workspace_id, user_id, role, created_at)
VALUES ($1, $2, $3, $4, $5)",
	)
	.bind(member.membership_id)
	.bind(member.workspace_id)
	.bind(member.user_id)
	.bind(member.role.as_str())
	.bind(member.created_at)
	.execute(executor)
	.await
	.map_err(|err| conflict_on_unique(err, "User is already a member of this workspace."))?;

	Ok(())
}

pub async fn fetch_member<'e, E>(
	executor: E,
	workspace_id: Uuid,
	user_id: Uuid,
) -> Result<Option<WorkspaceMember>>
where
	E: PgExecutor<'e>,
{
	let member = sqlx::query_as::<_, WorkspaceMember>(
		"\
SELECT membership_id, workspace_id, user_id, role, created_at
FROM workspace_members
WHERE workspace_id = $1 AND user_id = $2",
	)
	.bind(workspace_id)
	.bind(user_id)
	.fetch_optional(executor)
	.await?;

	Ok(member)
}

pub async fn list_members<'e, E>(executor: E, workspace_id: Uuid) -> Result<Vec<WorkspaceMember>>
where
	E: PgExecutor<'e>,
{
	let members = sqlx::query_as::<_, WorkspaceMember>(
		"\
SELECT membership_id, workspace_id, user_id, role, created_at
FROM workspace_members
WHERE workspace_id = $1
ORDER BY created_at",
	)
	.bind(workspace_id)
	.fetch_all(executor)
	.await?;

	Ok(members)
}

pub async fn update_member_role<'e, E>(
	executor: E,
	workspace_id: Uuid,
	user_id: Uuid,
	role: &str,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let result =
		sqlx::query("UPDATE workspace_members SET role = $1 WHERE workspace_id = $2 AND user_id = $3")
			.bind(role)
			.bind(workspace_id)
			.bind(user_id)
			.execute(executor)
			.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound("Membership does not exist.".to_string()));
	}

	Ok(())
}

pub async fn delete_member<'e, E>(executor: E, workspace_id: Uuid, user_id: Uuid) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let result =
		sqlx::query("DELETE FROM workspace_members WHERE workspace_id = $1 AND user_id = $2")
			.bind(workspace_id)
			.bind(user_id)
			.execute(executor)
			.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound("Membership does not exist.".to_string()));
	}

	Ok(())
}

pub async fn insert_document<'e, E>(executor: E, document: &Document) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO documents (document_id, workspace_id, filename, content_type, file_size, chunk_count, created_at)
VALUES ($1, $2, $3, $4, $5, $6, $7)",
	)
	.bind(document.document_id)
	.bind(document.workspace_id)
	.bind(document.filename.as_str())
	.bind(document.content_type.as_str())
	.bind(document.file_size)
	.bind(document.chunk_count)
	.bind(document.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn set_document_chunk_count<'e, E>(
	executor: E,
	document_id: Uuid,
	chunk_count: i32,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("UPDATE documents SET chunk_count = $1 WHERE document_id = $2")
		.bind(chunk_count)
		.bind(document_id)
		.execute(executor)
		.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound("Document does not exist.".to_string()));
	}

	Ok(())
}

pub async fn delete_document<'e, E>(executor: E, document_id: Uuid) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query("DELETE FROM documents WHERE document_id = $1")
		.bind(document_id)
		.execute(executor)
		.await?;

	Ok(())
}

pub async fn list_documents<'e, E>(executor: E, workspace_id: Uuid) -> Result<Vec<Document>>
where
	E: PgExecutor<'e>,
{
	let documents = sqlx::query_as::<_, Document>(
		"\
SELECT document_id, workspace_id, filename, content_type, file_size, chunk_count, created_at
FROM documents
WHERE workspace_id = $1
ORDER BY created_at DESC",
	)
	.bind(workspace_id)
	.fetch_all(executor)
	.await?;

	Ok(documents)
}

pub async fn count_documents<'e, E>(executor: E, workspace_id: Uuid) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let count =
		sqlx::query_scalar::<_, i64>("SELECT count(*) FROM documents WHERE workspace_id = $1")
			.bind(workspace_id)
			.fetch_one(executor)
			.await?;

	Ok(count)
}

pub async fn insert_memory_item<'e, E>(executor: E, item: &MemoryItem) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO memory_items (memory_id, workspace_id, user_id, content, metadata, ttl_seconds, expires_at, created_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
	)
	.bind(item.memory_id)
	.bind(item.workspace_id)
	.bind(item.user_id)
	.bind(item.content.as_str())
	.bind(&item.metadata)
	.bind(item.ttl_seconds)
	.bind(item.expires_at)
	.bind(item.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

/// Fetches a memory item only if it has not expired as of `now`. Expiry is re-checked here on
/// every relational lookup; the vector index applies its own check independently.
pub async fn fetch_live_memory_item<'e, E>(
	executor: E,
	memory_id: Uuid,
	now: OffsetDateTime,
) -> Result<Option<MemoryItem>>
where
	E: PgExecutor<'e>,
{
	let item = sqlx::query_as::<_, MemoryItem>(&format!(
		"\
SELECT {MEMORY_COLUMNS}
FROM memory_items
WHERE memory_id = $1
	AND (expires_at IS NULL OR expires_at > $2)"
	))
	.bind(memory_id)
	.bind(now)
	.fetch_optional(executor)
	.await?;

	Ok(item)
}

pub async fn delete_memory_item<'e, E>(executor: E, memory_id: Uuid) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query("DELETE FROM memory_items WHERE memory_id = $1")
		.bind(memory_id)
		.execute(executor)
		.await?;

	Ok(())
}

pub async fn list_expired_memory_items<'e, E>(
	executor: E,
	workspace_id: Uuid,
	now: OffsetDateTime,
	limit: i64,
) -> Result<Vec<MemoryItem>>
where
	E: PgExecutor<'e>,
{
	let items = sqlx::query_as::<_, MemoryItem>(&format!(
		"\
SELECT {MEMORY_COLUMNS}
FROM memory_items
WHERE workspace_id = $1
	AND expires_at IS NOT NULL
	AND expires_at <= $2
ORDER BY expires_at
LIMIT $3"
	))
	.bind(workspace_id)
	.bind(now)
	.bind(limit)
	.fetch_all(executor)
	.await?;

	Ok(items)
}

pub async fn delete_memory_items<'e, E>(executor: E, memory_ids: &[Uuid]) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM memory_items WHERE memory_id = ANY($1)")
		.bind(memory_ids)
		.execute(executor)
		.await?;

	Ok(result.rows_affected())
}

pub async fn insert_activity<'e, E>(executor: E, activity: &Activity) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO activities (activity_id, user_id, action, workspace_id, detail, created_at)
VALUES ($1, $2, $3, $4, $5, $6)",
	)
	.bind(activity.activity_id)
	.bind(activity.user_id)
	.bind(activity.action.as_str())
	.bind(activity.workspace_id)
	.bind(activity.detail.as_ref())
	.bind(activity.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn list_recent_activities<'e, E>(
	executor: E,
	user_id: Option<Uuid>,
	limit: i64,
) -> Result<Vec<Activity>>
where
	E: PgExecutor<'e>,
{
	let activities = sqlx::query_as::<_, Activity>(
		"\
SELECT activity_id, user_id, action, workspace_id, detail, created_at
FROM activities
WHERE $1::uuid IS NULL OR user_id = $1
ORDER BY created_at DESC
LIMIT $2",
	)
	.bind(user_id)
	.bind(limit)
	.fetch_all(executor)
	.await?;

	Ok(activities)
}
