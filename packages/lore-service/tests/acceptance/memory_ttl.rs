use std::time::Duration;

use serde_json::Map;
use tokio::time;

use lore_domain::role::Visibility;
use lore_service::{CleanupMemoryRequest, Error, QueryMemoryRequest, StoreMemoryRequest};

use super::{create_user, create_workspace, keyword_providers, setup};

fn store_request(
	workspace_id: uuid::Uuid,
	user_id: uuid::Uuid,
	content: &str,
	ttl_seconds: Option<i64>,
) -> StoreMemoryRequest {
	StoreMemoryRequest {
		workspace_id,
		user_id,
		content: content.to_string(),
		metadata: Map::new(),
		ttl_seconds,
	}
}

fn query_request(
	workspace_id: uuid::Uuid,
	user_id: uuid::Uuid,
	query: &str,
) -> QueryMemoryRequest {
	QueryMemoryRequest {
		workspace_id,
		user_id,
		query: query.to_string(),
		top_k: Some(10),
		metadata_filter: Map::new(),
	}
}

#[tokio::test]
async fn expired_items_disappear_from_the_query_path() {
	let Some(harness) = setup(keyword_providers()).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let workspace = create_workspace(&harness, &owner, "memory", Visibility::Private).await;

	harness
		.service
		.store_memory(store_request(
			workspace.workspace_id,
			owner.user_id,
			"red deploy is frozen",
			Some(1),
		))
		.await
		.expect("Store must succeed.");
	harness
		.service
		.store_memory(store_request(
			workspace.workspace_id,
			owner.user_id,
			"red release notes are final",
			None,
		))
		.await
		.expect("Store must succeed.");

	let fresh = harness
		.service
		.query_memory(query_request(workspace.workspace_id, owner.user_id, "red"))
		.await
		.expect("Query must succeed.");

	assert_eq!(fresh.len(), 2, "both items are live before the TTL elapses");

	time::sleep(Duration::from_secs(2)).await;

	let later = harness
		.service
		.query_memory(query_request(workspace.workspace_id, owner.user_id, "red"))
		.await
		.expect("Query must succeed.");

	assert_eq!(later.len(), 1);
	assert_eq!(later[0].content, "red release notes are final");
	assert_eq!(later[0].ttl_seconds, None);

	harness.finish().await;
}

#[tokio::test]
async fn non_positive_ttl_means_never_expires() {
	let Some(harness) = setup(keyword_providers()).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let workspace = create_workspace(&harness, &owner, "memory", Visibility::Private).await;
	let stored = harness
		.service
		.store_memory(store_request(
			workspace.workspace_id,
			owner.user_id,
			"blue pipeline owner is on call",
			Some(-1),
		))
		.await
		.expect("Store must succeed.");

	assert_eq!(stored.expires_at, None);
	assert_eq!(stored.ttl_seconds, Some(-1));

	let results = harness
		.service
		.query_memory(query_request(workspace.workspace_id, owner.user_id, "blue"))
		.await
		.expect("Query must succeed.");

	assert_eq!(results.len(), 1);

	harness.finish().await;
}

#[tokio::test]
async fn reserved_metadata_keys_are_rejected() {
	let Some(harness) = setup(keyword_providers()).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let workspace = create_workspace(&harness, &owner, "memory", Visibility::Private).await;
	let mut metadata = Map::new();

	metadata.insert(
		"expires_at".to_string(),
		serde_json::Value::String("2099-01-01T00:00:00Z".to_string()),
	);

	match harness
		.service
		.store_memory(StoreMemoryRequest {
			workspace_id: workspace.workspace_id,
			user_id: owner.user_id,
			content: "sneaky".to_string(),
			metadata,
			ttl_seconds: None,
		})
		.await
	{
		Err(Error::Validation { message }) => {
			assert!(message.contains("expires_at"), "unexpected message: {message}");
		},
		other => panic!("Expected Validation for a reserved key, got {other:?}."),
	}

	// Nothing may have been stored.
	let results = harness
		.service
		.query_memory(query_request(workspace.workspace_id, owner.user_id, "sneaky"))
		.await
		.expect("Query must succeed.");

	assert!(results.is_empty());

	harness.finish().await;
}

#[tokio::test]
async fn metadata_filter_narrows_results() {
	let Some(harness) = setup(keyword_providers()).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let workspace = create_workspace(&harness, &owner, "memory", Visibility::Private).await;
	let mut tagged = Map::new();

	tagged.insert("topic".to_string(), serde_json::Value::String("billing".to_string()));

	harness
		.service
		.store_memory(StoreMemoryRequest {
			workspace_id: workspace.workspace_id,
			user_id: owner.user_id,
			content: "green invoices ship monthly".to_string(),
			metadata: tagged,
			ttl_seconds: None,
		})
		.await
		.expect("Store must succeed.");
	harness
		.service
		.store_memory(store_request(
			workspace.workspace_id,
			owner.user_id,
			"green deploys ship daily",
			None,
		))
		.await
		.expect("Store must succeed.");

	let mut filter = Map::new();

	filter.insert("topic".to_string(), serde_json::Value::String("billing".to_string()));

	let results = harness
		.service
		.query_memory(QueryMemoryRequest {
			workspace_id: workspace.workspace_id,
			user_id: owner.user_id,
			query: "green".to_string(),
			top_k: Some(10),
			metadata_filter: filter,
		})
		.await
		.expect("Query must succeed.");

	assert_eq!(results.len(), 1);
	assert_eq!(results[0].content, "green invoices ship monthly");

	harness.finish().await;
}

#[tokio::test]
async fn cleanup_physically_deletes_expired_items() {
	let Some(harness) = setup(keyword_providers()).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let workspace = create_workspace(&harness, &owner, "memory", Visibility::Private).await;

	harness
		.service
		.store_memory(store_request(workspace.workspace_id, owner.user_id, "short lived", Some(1)))
		.await
		.expect("Store must succeed.");
	harness
		.service
		.store_memory(store_request(workspace.workspace_id, owner.user_id, "long lived", None))
		.await
		.expect("Store must succeed.");

	time::sleep(Duration::from_secs(2)).await;

	let report = harness
		.service
		.cleanup_expired_memory(CleanupMemoryRequest {
			workspace_id: workspace.workspace_id,
			user_id: owner.user_id,
			limit: None,
		})
		.await
		.expect("Cleanup must succeed.");

	assert_eq!(report.deleted_rows, 1);
	assert_eq!(report.deleted_vectors, 1);
	assert_eq!(report.skipped_vectors, 0);

	let again = harness
		.service
		.cleanup_expired_memory(CleanupMemoryRequest {
			workspace_id: workspace.workspace_id,
			user_id: owner.user_id,
			limit: None,
		})
		.await
		.expect("Cleanup must succeed.");

	assert_eq!(again.deleted_rows, 0);

	harness.finish().await;
}
