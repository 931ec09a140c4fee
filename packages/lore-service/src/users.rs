use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{LoreService, Result};
use lore_storage::queries;

const USER_SEARCH_LIMIT: i64 = 20;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserResponse {
	pub user_id: Uuid,
	pub username: String,
	pub email: String,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

impl LoreService {
	/// Rotates the user's opaque access token and returns the new value. Everything else about a
	/// user is immutable here; credential issuance itself lives outside the core.
	pub async fn rotate_api_key(&self, user_id: Uuid) -> Result<String> {
		let api_key = format!("lore_{}", Uuid::new_v4().simple());

		queries::update_user_api_key(&self.db.pool, user_id, &api_key).await?;

		Ok(api_key)
	}

	/// Substring search over username and email, used when picking members to add.
	pub async fn search_users(&self, query: &str) -> Result<Vec<UserResponse>> {
		if query.trim().is_empty() {
			return Ok(Vec::new());
		}

		let users = queries::search_users(&self.db.pool, query, USER_SEARCH_LIMIT).await?;
		let out = users
			.into_iter()
			.map(|user| UserResponse {
				user_id: user.user_id,
				username: user.username,
				email: user.email,
				created_at: user.created_at,
			})
			.collect();

		Ok(out)
	}
}
