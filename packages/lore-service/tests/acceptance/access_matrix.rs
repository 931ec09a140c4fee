use lore_domain::role::{Role, Visibility};
use lore_service::{AddMemberRequest, Error, RemoveMemberRequest};

use super::{create_user, create_workspace, keyword_providers, setup};

#[tokio::test]
async fn private_workspace_is_visible_to_owner_and_members_only() {
	let Some(harness) = setup(keyword_providers()).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let member = create_user(&harness.service, "member").await;
	let stranger = create_user(&harness.service, "stranger").await;
	let workspace = create_workspace(&harness, &owner, "team notes", Visibility::Private).await;

	harness
		.service
		.add_member(AddMemberRequest {
			workspace_id: workspace.workspace_id,
			user_id: owner.user_id,
			member_user_id: member.user_id,
			role: Role::Read,
		})
		.await
		.expect("Owner must be able to add members.");

	harness
		.service
		.get_workspace(workspace.workspace_id, owner.user_id)
		.await
		.expect("Owner must see the workspace.");
	harness
		.service
		.get_workspace(workspace.workspace_id, member.user_id)
		.await
		.expect("A member must see the workspace.");

	match harness.service.get_workspace(workspace.workspace_id, stranger.user_id).await {
		Err(Error::Forbidden { .. }) => {},
		other => panic!("Expected Forbidden for a stranger, got {other:?}."),
	}

	harness.finish().await;
}

#[tokio::test]
async fn public_workspace_is_readable_by_anyone() {
	let Some(harness) = setup(keyword_providers()).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let stranger = create_user(&harness.service, "stranger").await;
	let workspace = create_workspace(&harness, &owner, "handbook", Visibility::Public).await;

	harness
		.service
		.get_workspace(workspace.workspace_id, stranger.user_id)
		.await
		.expect("Public workspaces must be readable by anyone.");

	harness.finish().await;
}

#[tokio::test]
async fn duplicate_membership_is_a_validation_error() {
	let Some(harness) = setup(keyword_providers()).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let member = create_user(&harness.service, "member").await;
	let workspace = create_workspace(&harness, &owner, "notes", Visibility::Private).await;
	let request = AddMemberRequest {
		workspace_id: workspace.workspace_id,
		user_id: owner.user_id,
		member_user_id: member.user_id,
		role: Role::Write,
	};

	harness.service.add_member(request.clone()).await.expect("First add must succeed.");

	match harness.service.add_member(request).await {
		Err(Error::Validation { message }) => {
			assert!(message.contains("already a member"), "unexpected message: {message}");
		},
		other => panic!("Expected Validation for a duplicate member, got {other:?}."),
	}

	harness.finish().await;
}

#[tokio::test]
async fn owner_role_cannot_be_granted_or_revoked() {
	let Some(harness) = setup(keyword_providers()).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let member = create_user(&harness.service, "member").await;
	let workspace = create_workspace(&harness, &owner, "notes", Visibility::Private).await;

	match harness
		.service
		.add_member(AddMemberRequest {
			workspace_id: workspace.workspace_id,
			user_id: owner.user_id,
			member_user_id: member.user_id,
			role: Role::Owner,
		})
		.await
	{
		Err(Error::Validation { .. }) => {},
		other => panic!("Expected Validation when assigning the owner role, got {other:?}."),
	}

	match harness
		.service
		.remove_member(RemoveMemberRequest {
			workspace_id: workspace.workspace_id,
			user_id: owner.user_id,
			member_user_id: owner.user_id,
		})
		.await
	{
		Err(Error::Validation { .. }) => {},
		other => panic!("Expected Validation when removing the owner, got {other:?}."),
	}

	harness.finish().await;
}

#[tokio::test]
async fn member_may_leave_but_not_manage_others() {
	let Some(harness) = setup(keyword_providers()).await else {
		return;
	};
	let owner = create_user(&harness.service, "owner").await;
	let member = create_user(&harness.service, "member").await;
	let other = create_user(&harness.service, "other").await;
	let workspace = create_workspace(&harness, &owner, "notes", Visibility::Private).await;

	for target in [&member, &other] {
		harness
			.service
			.add_member(AddMemberRequest {
				workspace_id: workspace.workspace_id,
				user_id: owner.user_id,
				member_user_id: target.user_id,
				role: Role::Read,
			})
			.await
			.expect("Owner must be able to add members.");
	}

	match harness
		.service
		.remove_member(RemoveMemberRequest {
			workspace_id: workspace.workspace_id,
			user_id: member.user_id,
			member_user_id: other.user_id,
		})
		.await
	{
		Err(Error::Forbidden { .. }) => {},
		other => panic!("Expected Forbidden for a non-admin removal, got {other:?}."),
	}

	harness
		.service
		.remove_member(RemoveMemberRequest {
			workspace_id: workspace.workspace_id,
			user_id: member.user_id,
			member_user_id: member.user_id,
		})
		.await
		.expect("A member must be able to leave.");

	let members = harness
		.service
		.list_members(workspace.workspace_id, owner.user_id)
		.await
		.expect("Owner must list members.");

	assert!(members.iter().all(|entry| entry.user_id != member.user_id));
	assert_eq!(members.first().map(|entry| entry.role), Some(Role::Owner));

	harness.finish().await;
}
