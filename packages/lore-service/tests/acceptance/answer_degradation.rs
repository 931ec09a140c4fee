use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use lore_domain::role::Visibility;
use lore_service::{AskRequest, Providers, UploadDocumentRequest};

use super::{
	FailingCompletion, KeywordEmbedding, SpyCompletion, create_user, create_workspace, setup,
};

#[tokio::test]
async fn model_answer_is_returned_with_previewed_sources() {
	let calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(KeywordEmbedding),
		Arc::new(SpyCompletion { calls: calls.clone(), answer: "Red is a color.".to_string() }),
	);
	let Some(harness) = setup(providers).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let workspace = create_workspace(&harness, &owner, "docs", Visibility::Private).await;
	let long_text = format!("red {}", "detail ".repeat(60));

	harness
		.service
		.upload_document(UploadDocumentRequest {
			workspace_id: workspace.workspace_id,
			user_id: owner.user_id,
			filename: "red.txt".to_string(),
			content_type: "text/plain".to_string(),
			file_size: long_text.len() as i64,
			text: long_text,
		})
		.await
		.expect("Upload must succeed.");

	let response = harness
		.service
		.ask(AskRequest {
			user_id: owner.user_id,
			workspace_ids: vec![workspace.workspace_id],
			question: "what is red?".to_string(),
			top_k: Some(3),
		})
		.await
		.expect("Ask must succeed.");

	assert_eq!(response.answer, "Red is a color.");
	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert!(!response.sources.is_empty());

	for source in &response.sources {
		assert!(source.content.chars().count() <= 203, "previews are capped at 200 chars");
	}

	harness.finish().await;
}

#[tokio::test]
async fn model_failure_degrades_to_the_extractive_fallback() {
	let calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(KeywordEmbedding),
		Arc::new(FailingCompletion { calls: calls.clone() }),
	);
	let Some(harness) = setup(providers).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let workspace = create_workspace(&harness, &owner, "docs", Visibility::Private).await;

	harness
		.service
		.upload_document(UploadDocumentRequest {
			workspace_id: workspace.workspace_id,
			user_id: owner.user_id,
			filename: "red.txt".to_string(),
			content_type: "text/plain".to_string(),
			file_size: 16,
			text: "red deploy notes".to_string(),
		})
		.await
		.expect("Upload must succeed.");

	let response = harness
		.service
		.ask(AskRequest {
			user_id: owner.user_id,
			workspace_ids: vec![workspace.workspace_id],
			question: "what is red?".to_string(),
			top_k: Some(3),
		})
		.await
		.expect("A failed model call must degrade, not error.");

	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert!(response.answer.contains("temporarily unavailable"));
	assert!(response.answer.contains("red deploy notes"));
	assert!(!response.sources.is_empty());

	harness.finish().await;
}

#[tokio::test]
async fn empty_retrieval_short_circuits_without_calling_the_model() {
	let calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(KeywordEmbedding),
		Arc::new(SpyCompletion { calls: calls.clone(), answer: "unused".to_string() }),
	);
	let Some(harness) = setup(providers).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let workspace = create_workspace(&harness, &owner, "empty", Visibility::Private).await;
	let response = harness
		.service
		.ask(AskRequest {
			user_id: owner.user_id,
			workspace_ids: vec![workspace.workspace_id],
			question: "anything there?".to_string(),
			top_k: None,
		})
		.await
		.expect("Ask must succeed on an empty workspace.");

	assert!(response.answer.contains("No relevant documents"));
	assert!(response.sources.is_empty());
	assert_eq!(calls.load(Ordering::SeqCst), 0, "the model is never called without context");

	harness.finish().await;
}
