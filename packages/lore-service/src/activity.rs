use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{LoreService, Result, access};
use lore_storage::{
	models::{Activity, Workspace},
	queries,
};

const DEFAULT_FEED_LIMIT: u32 = 50;
const MAX_FEED_LIMIT: u32 = 100;

#[derive(Clone, Copy, Debug)]
pub(crate) enum ActivityAction {
	CreateWorkspace,
	UploadDocument,
	AddMember,
	StoreMemory,
}
impl ActivityAction {
	fn as_str(self) -> &'static str {
		match self {
			Self::CreateWorkspace => "create_workspace",
			Self::UploadDocument => "upload_document",
			Self::AddMember => "add_member",
			Self::StoreMemory => "store_memory",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityScope {
	All,
	Mine,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListActivitiesRequest {
	pub user_id: Uuid,
	pub scope: ActivityScope,
	pub limit: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityResponse {
	pub activity_id: Uuid,
	pub user_id: Uuid,
	pub username: String,
	pub action: String,
	pub workspace_id: Option<Uuid>,
	pub workspace_name: Option<String>,
	pub detail: Option<Value>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

impl LoreService {
	pub(crate) async fn record_activity(
		&self,
		user_id: Uuid,
		action: ActivityAction,
		workspace_id: Option<Uuid>,
		detail: Option<Value>,
	) -> Result<()> {
		let activity = Activity {
			activity_id: Uuid::new_v4(),
			user_id,
			action: action.as_str().to_string(),
			workspace_id,
			detail,
			created_at: OffsetDateTime::now_utc(),
		};

		queries::insert_activity(&self.db.pool, &activity).await?;

		Ok(())
	}

	/// The feed is the one place authorization filters instead of rejecting: with scope `all`,
	/// entries whose workspace the caller cannot access are silently dropped.
	pub async fn list_activities(
		&self,
		req: ListActivitiesRequest,
	) -> Result<Vec<ActivityResponse>> {
		let limit = req.limit.unwrap_or(DEFAULT_FEED_LIMIT).clamp(1, MAX_FEED_LIMIT) as usize;
		let (filter_user, fetch_limit) = match req.scope {
			ActivityScope::Mine => (Some(req.user_id), limit as i64),
			// Over-fetch so access filtering can still fill the page.
			ActivityScope::All => (None, (limit * 2) as i64),
		};
		let activities =
			queries::list_recent_activities(&self.db.pool, filter_user, fetch_limit).await?;
		let mut usernames: HashMap<Uuid, String> = HashMap::new();
		let mut workspaces: HashMap<Uuid, Option<Workspace>> = HashMap::new();
		let mut out = Vec::with_capacity(limit);

		for activity in activities {
			if out.len() >= limit {
				break;
			}

			let workspace = match activity.workspace_id {
				Some(workspace_id) => {
					if !workspaces.contains_key(&workspace_id) {
						let loaded =
							queries::fetch_workspace(&self.db.pool, workspace_id).await?;

						workspaces.insert(workspace_id, loaded);
					}

					workspaces.get(&workspace_id).cloned().flatten()
				},
				None => None,
			};

			if req.scope == ActivityScope::All
				&& let Some(workspace_id) = activity.workspace_id
			{
				let Some(workspace) = workspace.as_ref() else {
					continue;
				};
				let membership =
					self.membership_role(workspace_id, req.user_id).await?;

				if !access::can_access(workspace, req.user_id, membership) {
					continue;
				}
			}

			let username = match usernames.get(&activity.user_id) {
				Some(username) => username.clone(),
				None => {
					let username = queries::fetch_user(&self.db.pool, activity.user_id)
						.await?
						.map(|user| user.username)
						.unwrap_or_default();

					usernames.insert(activity.user_id, username.clone());

					username
				},
			};

			out.push(ActivityResponse {
				activity_id: activity.activity_id,
				user_id: activity.user_id,
				username,
				action: activity.action,
				workspace_id: activity.workspace_id,
				workspace_name: workspace.map(|workspace| workspace.name),
				detail: activity.detail,
				created_at: activity.created_at,
			});
		}

		Ok(out)
	}
}
