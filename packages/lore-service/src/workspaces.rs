use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, LoreService, Result, activity::ActivityAction};
use lore_domain::role::{Role, Visibility};
use lore_storage::{models::Workspace, queries};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateWorkspaceRequest {
	pub user_id: Uuid,
	pub name: String,
	#[serde(default)]
	pub description: String,
	pub visibility: Visibility,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateWorkspaceRequest {
	pub workspace_id: Uuid,
	pub user_id: Uuid,
	pub name: Option<String>,
	pub description: Option<String>,
	pub visibility: Option<Visibility>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkspaceResponse {
	pub workspace_id: Uuid,
	pub name: String,
	pub description: String,
	pub visibility: Visibility,
	pub owner_id: Uuid,
	pub owner_username: String,
	pub document_count: i64,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

impl LoreService {
	pub async fn create_workspace(
		&self,
		req: CreateWorkspaceRequest,
	) -> Result<WorkspaceResponse> {
		let name = req.name.trim();

		if name.is_empty() {
			return Err(Error::Validation { message: "name is required.".to_string() });
		}

		let now = OffsetDateTime::now_utc();
		let workspace = Workspace {
			workspace_id: Uuid::new_v4(),
			name: name.to_string(),
			description: req.description.clone(),
			visibility: req.visibility.as_str().to_string(),
			owner_id: req.user_id,
			created_at: now,
			updated_at: now,
		};

		queries::insert_workspace(&self.db.pool, &workspace).await?;

		self.record_activity(
			req.user_id,
			ActivityAction::CreateWorkspace,
			Some(workspace.workspace_id),
			Some(serde_json::json!({ "name": workspace.name })),
		)
		.await?;

		self.workspace_response(workspace).await
	}

	pub async fn get_workspace(
		&self,
		workspace_id: Uuid,
		user_id: Uuid,
	) -> Result<WorkspaceResponse> {
		let workspace = self.require_workspace(workspace_id).await?;

		self.require_access(&workspace, user_id).await?;

		self.workspace_response(workspace).await
	}

	/// Workspaces the user owns or is a member of.
	pub async fn list_workspaces(&self, user_id: Uuid) -> Result<Vec<WorkspaceResponse>> {
		let workspaces = queries::list_joined_workspaces(&self.db.pool, user_id).await?;
		let mut out = Vec::with_capacity(workspaces.len());

		for workspace in workspaces {
			out.push(self.workspace_response(workspace).await?);
		}

		Ok(out)
	}

	pub async fn update_workspace(
		&self,
		req: UpdateWorkspaceRequest,
	) -> Result<WorkspaceResponse> {
		let mut workspace = self.require_workspace(req.workspace_id).await?;

		self.require_role(&workspace, req.user_id, Role::Admin).await?;

		if let Some(name) = req.name {
			let name = name.trim().to_string();

			if name.is_empty() {
				return Err(Error::Validation { message: "name must be non-empty.".to_string() });
			}

			workspace.name = name;
		}
		if let Some(description) = req.description {
			workspace.description = description;
		}
		if let Some(visibility) = req.visibility {
			workspace.visibility = visibility.as_str().to_string();
		}

		workspace.updated_at = OffsetDateTime::now_utc();

		queries::update_workspace(&self.db.pool, &workspace).await?;

		self.workspace_response(workspace).await
	}

	/// Owner only. The vector collection is torn down (and its cached handle invalidated) before
	/// the relational row cascades away.
	pub async fn delete_workspace(&self, workspace_id: Uuid, user_id: Uuid) -> Result<()> {
		let workspace = self.require_workspace(workspace_id).await?;

		Self::require_owner(&workspace, user_id)?;

		self.registry.delete_collection(workspace_id).await?;

		queries::delete_workspace(&self.db.pool, workspace_id).await?;

		Ok(())
	}

	async fn workspace_response(&self, workspace: Workspace) -> Result<WorkspaceResponse> {
		let document_count =
			queries::count_documents(&self.db.pool, workspace.workspace_id).await?;
		let owner_username = queries::fetch_user(&self.db.pool, workspace.owner_id)
			.await?
			.map(|user| user.username)
			.unwrap_or_default();
		let visibility = crate::access::visibility_of(&workspace);

		Ok(WorkspaceResponse {
			workspace_id: workspace.workspace_id,
			name: workspace.name,
			description: workspace.description,
			visibility,
			owner_id: workspace.owner_id,
			owner_username,
			document_count,
			created_at: workspace.created_at,
		})
	}
}
