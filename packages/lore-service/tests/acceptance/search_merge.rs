use uuid::Uuid;

use lore_domain::role::Visibility;
use lore_service::{AskRequest, Error, SearchRequest, UploadDocumentRequest};

use super::{create_user, create_workspace, keyword_providers, setup};

async fn upload(harness: &super::Harness, workspace_id: Uuid, user_id: Uuid, text: &str) {
	harness
		.service
		.upload_document(UploadDocumentRequest {
			workspace_id,
			user_id,
			filename: "doc.txt".to_string(),
			content_type: "text/plain".to_string(),
			file_size: text.len() as i64,
			text: text.to_string(),
		})
		.await
		.expect("Upload must succeed.");
}

#[tokio::test]
async fn closest_workspace_wins_the_merged_ranking() {
	let Some(harness) = setup(keyword_providers()).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let workspace_a = create_workspace(&harness, &owner, "a", Visibility::Private).await;
	let workspace_b = create_workspace(&harness, &owner, "b", Visibility::Private).await;

	upload(&harness, workspace_a.workspace_id, owner.user_id, "blue sky report").await;
	upload(&harness, workspace_b.workspace_id, owner.user_id, "red apple facts").await;

	let results = harness
		.service
		.search(SearchRequest {
			user_id: owner.user_id,
			workspace_ids: vec![workspace_a.workspace_id, workspace_b.workspace_id],
			query: "red".to_string(),
			top_k: Some(1),
		})
		.await
		.expect("Search must succeed.");

	assert_eq!(results.len(), 1);
	assert_eq!(results[0].workspace_id, workspace_b.workspace_id);
	assert!(results[0].content.contains("red apple"));

	harness.finish().await;
}

#[tokio::test]
async fn oversized_top_k_is_clamped_not_rejected() {
	let Some(harness) = setup(keyword_providers()).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let workspace = create_workspace(&harness, &owner, "docs", Visibility::Private).await;

	upload(&harness, workspace.workspace_id, owner.user_id, "red note").await;

	let results = harness
		.service
		.search(SearchRequest {
			user_id: owner.user_id,
			workspace_ids: vec![workspace.workspace_id],
			query: "red".to_string(),
			top_k: Some(999),
		})
		.await
		.expect("An oversized top_k must be clamped, not rejected.");

	assert_eq!(results.len(), 1);

	harness.finish().await;
}

#[tokio::test]
async fn unauthorized_workspace_ids_reject_the_whole_request() {
	let Some(harness) = setup(keyword_providers()).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let intruder = create_user(&harness.service, "intruder").await;
	let workspace = create_workspace(&harness, &owner, "secret", Visibility::Private).await;
	let missing = Uuid::new_v4();

	match harness
		.service
		.search(SearchRequest {
			user_id: intruder.user_id,
			workspace_ids: vec![workspace.workspace_id, missing],
			query: "red".to_string(),
			top_k: None,
		})
		.await
	{
		Err(Error::Forbidden { message }) => {
			assert!(message.contains(&workspace.workspace_id.to_string()));
			assert!(message.contains(&missing.to_string()));
		},
		other => panic!("Expected Forbidden naming the unauthorized ids, got {other:?}."),
	}

	harness.finish().await;
}

#[tokio::test]
async fn empty_workspace_list_derives_the_accessible_set() {
	let Some(harness) = setup(keyword_providers()).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let visitor = create_user(&harness.service, "visitor").await;
	let public = create_workspace(&harness, &owner, "public docs", Visibility::Public).await;
	let private = create_workspace(&harness, &owner, "private docs", Visibility::Private).await;

	upload(&harness, public.workspace_id, owner.user_id, "red public fact").await;
	upload(&harness, private.workspace_id, owner.user_id, "red private fact").await;

	let results = harness
		.service
		.search(SearchRequest {
			user_id: visitor.user_id,
			workspace_ids: Vec::new(),
			query: "red".to_string(),
			top_k: Some(10),
		})
		.await
		.expect("Search over the accessible set must succeed.");

	assert_eq!(results.len(), 1, "only the public workspace is accessible");
	assert_eq!(results[0].workspace_id, public.workspace_id);

	harness.finish().await;
}

#[tokio::test]
async fn sources_carry_workspace_ids_only_for_multi_workspace_questions() {
	let Some(harness) = setup(keyword_providers()).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let workspace_a = create_workspace(&harness, &owner, "a", Visibility::Private).await;
	let workspace_b = create_workspace(&harness, &owner, "b", Visibility::Private).await;

	upload(&harness, workspace_a.workspace_id, owner.user_id, "red summary").await;
	upload(&harness, workspace_b.workspace_id, owner.user_id, "red details").await;

	let multi = harness
		.service
		.ask(AskRequest {
			user_id: owner.user_id,
			workspace_ids: vec![workspace_a.workspace_id, workspace_b.workspace_id],
			question: "what is red?".to_string(),
			top_k: Some(5),
		})
		.await
		.expect("Ask must succeed.");

	assert!(!multi.sources.is_empty());
	assert!(multi.sources.iter().all(|source| source.workspace_id.is_some()));

	let single = harness
		.service
		.ask(AskRequest {
			user_id: owner.user_id,
			workspace_ids: vec![workspace_a.workspace_id],
			question: "what is red?".to_string(),
			top_k: Some(5),
		})
		.await
		.expect("Ask must succeed.");

	assert!(!single.sources.is_empty());
	assert!(single.sources.iter().all(|source| source.workspace_id.is_none()));

	harness.finish().await;
}
