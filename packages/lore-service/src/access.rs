use uuid::Uuid;

use crate::{Error, LoreService, Result};
use lore_domain::role::{Role, Visibility};
use lore_storage::{models::Workspace, queries};

pub(crate) fn visibility_of(workspace: &Workspace) -> Visibility {
	Visibility::parse(&workspace.visibility).unwrap_or(Visibility::Private)
}

pub(crate) fn is_owner(workspace: &Workspace, user_id: Uuid) -> bool {
	workspace.owner_id == user_id
}

/// Read access: public workspace, owner, or any membership row.
pub(crate) fn can_access(workspace: &Workspace, user_id: Uuid, membership: Option<Role>) -> bool {
	if visibility_of(workspace) == Visibility::Public {
		return true;
	}
	if is_owner(workspace, user_id) {
		return true;
	}

	membership.is_some()
}

/// The owner outranks every membership role; everyone else is compared on the explicit role
/// ordinals.
pub(crate) fn role_at_least(
	workspace: &Workspace,
	user_id: Uuid,
	membership: Option<Role>,
	min_role: Role,
) -> bool {
	if is_owner(workspace, user_id) {
		return true;
	}

	membership.map(|role| role.satisfies(min_role)).unwrap_or(false)
}

impl LoreService {
	pub(crate) async fn membership_role(
		&self,
		workspace_id: Uuid,
		user_id: Uuid,
	) -> Result<Option<Role>> {
		let member = queries::fetch_member(&self.db.pool, workspace_id, user_id).await?;
		let Some(member) = member else {
			return Ok(None);
		};
		let Some(role) = Role::parse(&member.role) else {
			tracing::warn!(workspace_id = %workspace_id, user_id = %user_id, role = %member.role, "Membership row carries an unknown role.");

			return Ok(None);
		};

		Ok(Some(role))
	}

	pub(crate) async fn require_workspace(&self, workspace_id: Uuid) -> Result<Workspace> {
		queries::fetch_workspace(&self.db.pool, workspace_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: "Workspace does not exist.".to_string() })
	}

	pub(crate) async fn require_access(&self, workspace: &Workspace, user_id: Uuid) -> Result<()> {
		let membership = self.membership_role(workspace.workspace_id, user_id).await?;

		if can_access(workspace, user_id, membership) {
			return Ok(());
		}

		Err(Error::Forbidden { message: "No access to this workspace.".to_string() })
	}

	pub(crate) async fn require_role(
		&self,
		workspace: &Workspace,
		user_id: Uuid,
		min_role: Role,
	) -> Result<()> {
		let membership = self.membership_role(workspace.workspace_id, user_id).await?;

		if role_at_least(workspace, user_id, membership, min_role) {
			return Ok(());
		}

		Err(Error::Forbidden {
			message: format!("Requires at least the {} role.", min_role.as_str()),
		})
	}

	pub(crate) fn require_owner(workspace: &Workspace, user_id: Uuid) -> Result<()> {
		if is_owner(workspace, user_id) {
			return Ok(());
		}

		Err(Error::Forbidden { message: "Only the workspace owner may do this.".to_string() })
	}
}
