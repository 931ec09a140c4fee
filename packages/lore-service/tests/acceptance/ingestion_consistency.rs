use std::sync::{Arc, atomic::AtomicUsize};

use lore_chunking::ChunkingConfig;
use lore_domain::role::{Role, Visibility};
use lore_service::{AddMemberRequest, Error, Providers, UploadDocumentRequest};

use super::{FailingEmbedding, SpyCompletion, create_user, create_workspace, keyword_providers, setup};

#[tokio::test]
async fn upload_chunk_count_matches_the_splitter() {
	let Some(harness) = setup(keyword_providers()).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let workspace = create_workspace(&harness, &owner, "docs", Visibility::Private).await;
	let text = format!("{}\n\n{}\n\n{}", "a".repeat(400), "b".repeat(400), "c".repeat(400));
	let expected = lore_chunking::split_text(
		&text,
		&ChunkingConfig { chunk_size: 500, chunk_overlap: 50 },
	)
	.len() as u32;
	let uploaded = harness
		.service
		.upload_document(UploadDocumentRequest {
			workspace_id: workspace.workspace_id,
			user_id: owner.user_id,
			filename: "notes.txt".to_string(),
			content_type: "text/plain".to_string(),
			file_size: text.len() as i64,
			text,
		})
		.await
		.expect("Upload must succeed.");

	assert!(expected > 1);
	assert_eq!(uploaded.chunk_count, expected);

	let documents = harness
		.service
		.list_documents(workspace.workspace_id, owner.user_id)
		.await
		.expect("Owner must list documents.");

	assert_eq!(documents.len(), 1);
	assert_eq!(documents[0].chunk_count, expected);

	harness.finish().await;
}

#[tokio::test]
async fn empty_text_is_rejected_before_any_write() {
	let Some(harness) = setup(keyword_providers()).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let workspace = create_workspace(&harness, &owner, "docs", Visibility::Private).await;

	match harness
		.service
		.upload_document(UploadDocumentRequest {
			workspace_id: workspace.workspace_id,
			user_id: owner.user_id,
			filename: "blank.txt".to_string(),
			content_type: "text/plain".to_string(),
			file_size: 3,
			text: "  \n ".to_string(),
		})
		.await
	{
		Err(Error::Validation { .. }) => {},
		other => panic!("Expected Validation for empty text, got {other:?}."),
	}

	let documents = harness
		.service
		.list_documents(workspace.workspace_id, owner.user_id)
		.await
		.expect("Owner must list documents.");

	assert!(documents.is_empty());

	harness.finish().await;
}

#[tokio::test]
async fn failed_vector_write_rolls_back_the_document_row() {
	let providers = Providers::new(
		Arc::new(FailingEmbedding),
		Arc::new(SpyCompletion {
			calls: Arc::new(AtomicUsize::new(0)),
			answer: "unused".to_string(),
		}),
	);
	let Some(harness) = setup(providers).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let workspace = create_workspace(&harness, &owner, "docs", Visibility::Private).await;

	match harness
		.service
		.upload_document(UploadDocumentRequest {
			workspace_id: workspace.workspace_id,
			user_id: owner.user_id,
			filename: "doomed.txt".to_string(),
			content_type: "text/plain".to_string(),
			file_size: 11,
			text: "hello world".to_string(),
		})
		.await
	{
		Err(Error::DependencyUnavailable { .. }) => {},
		other => panic!("Expected DependencyUnavailable, got {other:?}."),
	}

	// No document row may survive with a chunk count inconsistent with the index.
	let documents = harness
		.service
		.list_documents(workspace.workspace_id, owner.user_id)
		.await
		.expect("Owner must list documents.");

	assert!(documents.is_empty());

	harness.finish().await;
}

#[tokio::test]
async fn upload_requires_the_write_role() {
	let Some(harness) = setup(keyword_providers()).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let reader = create_user(&harness.service, "reader").await;
	let workspace = create_workspace(&harness, &owner, "docs", Visibility::Private).await;

	harness
		.service
		.add_member(AddMemberRequest {
			workspace_id: workspace.workspace_id,
			user_id: owner.user_id,
			member_user_id: reader.user_id,
			role: Role::Read,
		})
		.await
		.expect("Owner must be able to add members.");

	match harness
		.service
		.upload_document(UploadDocumentRequest {
			workspace_id: workspace.workspace_id,
			user_id: reader.user_id,
			filename: "notes.txt".to_string(),
			content_type: "text/plain".to_string(),
			file_size: 5,
			text: "hello".to_string(),
		})
		.await
	{
		Err(Error::Forbidden { .. }) => {},
		other => panic!("Expected Forbidden for a read-only member, got {other:?}."),
	}

	harness.finish().await;
}
