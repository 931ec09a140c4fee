use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, LoreService, Result, access, answer};
use lore_storage::queries;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
	pub user_id: Uuid,
	/// Explicit workspaces to query; empty means every workspace the user can access.
	#[serde(default)]
	pub workspace_ids: Vec<Uuid>,
	pub query: String,
	pub top_k: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrievedPassage {
	pub content: String,
	pub distance: f32,
	pub workspace_id: Uuid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AskRequest {
	pub user_id: Uuid,
	#[serde(default)]
	pub workspace_ids: Vec<Uuid>,
	pub question: String,
	pub top_k: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceRef {
	pub content: String,
	/// Present for multi-workspace questions so a source can be traced back to its workspace.
	pub workspace_id: Option<Uuid>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AskResponse {
	pub answer: String,
	pub sources: Vec<SourceRef>,
}

pub(crate) fn clamp_top_k(cfg: &lore_config::Retrieval, requested: Option<u32>) -> u64 {
	requested.unwrap_or(cfg.top_k).clamp(1, cfg.max_top_k) as u64
}

/// Global merge across per-workspace result sets: ascending by distance (smaller = closer), then
/// truncated. Expired memory hits must already be filtered out by the caller, so the truncation
/// never spends slots on dead entries.
pub(crate) fn merge_passages(
	mut passages: Vec<RetrievedPassage>,
	top_k: u64,
) -> Vec<RetrievedPassage> {
	passages.sort_by(|a, b| a.distance.total_cmp(&b.distance));
	passages.truncate(top_k as usize);

	passages
}

impl LoreService {
	/// Similarity search across one or many workspace collections, merged on one distance metric.
	pub async fn search(&self, req: SearchRequest) -> Result<Vec<RetrievedPassage>> {
		if req.query.trim().is_empty() {
			return Err(Error::Validation { message: "query is required.".to_string() });
		}

		let workspace_ids = self.resolve_workspaces(req.user_id, &req.workspace_ids).await?;

		if workspace_ids.is_empty() {
			return Err(Error::Validation {
				message: "No workspaces available. Create or join a workspace first.".to_string(),
			});
		}

		let top_k = clamp_top_k(&self.cfg.retrieval, req.top_k);
		let now = OffsetDateTime::now_utc();
		let mut passages = Vec::new();

		// Each collection is queried with the same bounded top_k; a workspace whose hits rank low
		// globally may contribute nothing after the final merge. That is the accepted tradeoff
		// for bounding per-collection query cost.
		for workspace_id in workspace_ids {
			let handle = self.registry.collection(workspace_id).await?;
			let hits = handle.search(&req.query, top_k, None).await?;

			for hit in hits {
				if crate::payload_memory_expired(&hit.payload, now) {
					continue;
				}

				let Some(content) = crate::payload_str(&hit.payload, "text") else {
					tracing::warn!(workspace_id = %workspace_id, "Skipping indexed entry without text payload.");

					continue;
				};

				passages.push(RetrievedPassage {
					content: content.to_string(),
					distance: hit.distance,
					workspace_id,
				});
			}
		}

		Ok(merge_passages(passages, top_k))
	}

	/// Retrieval plus generation. With no retrieved context the model is never called; with a
	/// failed model call the answer degrades to a deterministic extractive fallback.
	pub async fn ask(&self, req: AskRequest) -> Result<AskResponse> {
		let multi_workspace = req.workspace_ids.len() != 1;
		let passages = self
			.search(SearchRequest {
				user_id: req.user_id,
				workspace_ids: req.workspace_ids,
				query: req.question.clone(),
				top_k: req.top_k,
			})
			.await?;

		if passages.is_empty() {
			return Ok(AskResponse {
				answer: answer::NO_CONTEXT_ANSWER.to_string(),
				sources: Vec::new(),
			});
		}

		let answer = self.generate_answer(&passages, &req.question).await;
		let preview_chars = self.cfg.retrieval.source_preview_chars as usize;
		let sources = passages
			.iter()
			.map(|passage| SourceRef {
				content: answer::truncate_preview(&passage.content, preview_chars),
				workspace_id: multi_workspace.then_some(passage.workspace_id),
			})
			.collect();

		Ok(AskResponse { answer, sources })
	}

	/// Explicit ids must each pass the access check; any failing id rejects the whole request,
	/// naming every unauthorized id. An empty list derives owned ∪ member ∪ public.
	async fn resolve_workspaces(
		&self,
		user_id: Uuid,
		explicit: &[Uuid],
	) -> Result<Vec<Uuid>> {
		if explicit.is_empty() {
			let ids = queries::list_accessible_workspace_ids(&self.db.pool, user_id).await?;

			return Ok(ids);
		}

		let mut seen = HashSet::new();
		let mut allowed = Vec::with_capacity(explicit.len());
		let mut unauthorized = Vec::new();

		for workspace_id in explicit {
			if !seen.insert(*workspace_id) {
				continue;
			}

			let workspace = queries::fetch_workspace(&self.db.pool, *workspace_id).await?;
			let accessible = match workspace {
				Some(workspace) => {
					let membership = self.membership_role(*workspace_id, user_id).await?;

					access::can_access(&workspace, user_id, membership)
				},
				None => false,
			};

			if accessible {
				allowed.push(*workspace_id);
			} else {
				unauthorized.push(workspace_id.to_string());
			}
		}

		if !unauthorized.is_empty() {
			return Err(Error::Forbidden {
				message: format!("No access to workspaces: {}.", unauthorized.join(", ")),
			});
		}

		Ok(allowed)
	}
}
