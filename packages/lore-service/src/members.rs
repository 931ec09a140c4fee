use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, LoreService, Result, activity::ActivityAction};
use lore_domain::role::Role;
use lore_storage::{models::WorkspaceMember, queries};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddMemberRequest {
	pub workspace_id: Uuid,
	pub user_id: Uuid,
	pub member_user_id: Uuid,
	pub role: Role,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateMemberRequest {
	pub workspace_id: Uuid,
	pub user_id: Uuid,
	pub member_user_id: Uuid,
	pub role: Role,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoveMemberRequest {
	pub workspace_id: Uuid,
	pub user_id: Uuid,
	pub member_user_id: Uuid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemberResponse {
	pub user_id: Uuid,
	pub username: String,
	pub email: String,
	pub role: Role,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

/// Membership rows never carry the `owner` role; the owner is authoritative without one.
fn reject_owner_role(role: Role) -> Result<()> {
	if role == Role::Owner {
		return Err(Error::Validation {
			message: "role owner cannot be assigned to a member.".to_string(),
		});
	}

	Ok(())
}

impl LoreService {
	/// Members plus a synthesized entry for the owner at the head of the list.
	pub async fn list_members(
		&self,
		workspace_id: Uuid,
		user_id: Uuid,
	) -> Result<Vec<MemberResponse>> {
		let workspace = self.require_workspace(workspace_id).await?;

		self.require_access(&workspace, user_id).await?;

		let members = queries::list_members(&self.db.pool, workspace_id).await?;
		let mut out = Vec::with_capacity(members.len() + 1);

		if let Some(owner) = queries::fetch_user(&self.db.pool, workspace.owner_id).await? {
			out.push(MemberResponse {
				user_id: owner.user_id,
				username: owner.username,
				email: owner.email,
				role: Role::Owner,
				created_at: workspace.created_at,
			});
		}

		for member in members {
			let Some(user) = queries::fetch_user(&self.db.pool, member.user_id).await? else {
				continue;
			};
			let Some(role) = Role::parse(&member.role) else {
				tracing::warn!(workspace_id = %workspace_id, user_id = %member.user_id, role = %member.role, "Skipping membership row with an unknown role.");

				continue;
			};

			out.push(MemberResponse {
				user_id: user.user_id,
				username: user.username,
				email: user.email,
				role,
				created_at: member.created_at,
			});
		}

		Ok(out)
	}

	pub async fn add_member(&self, req: AddMemberRequest) -> Result<MemberResponse> {
		let workspace = self.require_workspace(req.workspace_id).await?;

		self.require_role(&workspace, req.user_id, Role::Admin).await?;

		reject_owner_role(req.role)?;

		if req.member_user_id == workspace.owner_id {
			return Err(Error::Validation {
				message: "The workspace owner cannot be added as a member.".to_string(),
			});
		}

		let user = queries::fetch_user(&self.db.pool, req.member_user_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: "User does not exist.".to_string() })?;
		let member = WorkspaceMember {
			membership_id: Uuid::new_v4(),
			workspace_id: req.workspace_id,
			user_id: req.member_user_id,
			role: req.role.as_str().to_string(),
			created_at: OffsetDateTime::now_utc(),
		};

		queries::insert_member(&self.db.pool, &member).await?;

		self.record_activity(
			req.user_id,
			ActivityAction::AddMember,
			Some(req.workspace_id),
			Some(serde_json::json!({
				"member_username": user.username,
				"role": req.role.as_str(),
			})),
		)
		.await?;

		Ok(MemberResponse {
			user_id: user.user_id,
			username: user.username,
			email: user.email,
			role: req.role,
			created_at: member.created_at,
		})
	}

	pub async fn update_member(&self, req: UpdateMemberRequest) -> Result<MemberResponse> {
		let workspace = self.require_workspace(req.workspace_id).await?;

		self.require_role(&workspace, req.user_id, Role::Admin).await?;

		reject_owner_role(req.role)?;

		if req.member_user_id == workspace.owner_id {
			return Err(Error::Validation {
				message: "The workspace owner cannot be modified.".to_string(),
			});
		}

		let member = queries::fetch_member(&self.db.pool, req.workspace_id, req.member_user_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: "Membership does not exist.".to_string() })?;

		queries::update_member_role(
			&self.db.pool,
			req.workspace_id,
			req.member_user_id,
			req.role.as_str(),
		)
		.await?;

		let user = queries::fetch_user(&self.db.pool, req.member_user_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: "User does not exist.".to_string() })?;

		Ok(MemberResponse {
			user_id: user.user_id,
			username: user.username,
			email: user.email,
			role: req.role,
			created_at: member.created_at,
		})
	}

	/// Admins remove anyone; a member may also remove themselves. The owner is untouchable.
	pub async fn remove_member(&self, req: RemoveMemberRequest) -> Result<()> {
		let workspace = self.require_workspace(req.workspace_id).await?;

		if req.member_user_id == workspace.owner_id {
			return Err(Error::Validation {
				message: "The workspace owner cannot be removed.".to_string(),
			});
		}
		if req.user_id != req.member_user_id {
			self.require_role(&workspace, req.user_id, Role::Admin).await?;
		}

		queries::delete_member(&self.db.pool, req.workspace_id, req.member_user_id).await?;

		Ok(())
	}
}
