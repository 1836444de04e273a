/// Group service
///
/// Creates groups and manages who belongs to them.
///
/// Creating a group also creates its three reserved roles (`Owner`,
/// `Admin`, `Default`) and grants all three to the creator. Every member
/// added afterwards receives `Default`, which makes them chore-eligible.

use std::sync::Arc;

use choreshare_shared::models::role::DEFAULT_ROLE;
use choreshare_shared::models::{Group, GroupId, Membership, NewGroup, NewRole, Permission, UserId};
use choreshare_shared::repository::Repository;
use tracing::info;
use validator::Validate;

use super::{authorize, load_member, logged};
use crate::error::{ServiceError, ServiceResult};

/// Group management
#[derive(Clone)]
pub struct GroupService {
    repo: Arc<dyn Repository>,
}

impl GroupService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        GroupService { repo }
    }

    /// Creates a group owned by `owner`
    ///
    /// The group, the owner's membership and the reserved roles are written
    /// in one repository call, so a failure leaves nothing behind.
    ///
    /// # Errors
    ///
    /// - `Validation` if the name is empty or longer than 64 characters
    /// - `NotFound` if `owner` does not exist
    pub async fn create_group(&self, name: &str, owner: UserId) -> ServiceResult<Group> {
        logged("create_group", async move {
            let new_group = NewGroup::new(name.trim());
            new_group.validate()?;
            self.repo.get_user(owner).await?;

            let group = self
                .repo
                .create_group_with_owner(&new_group, owner, &NewRole::reserved())
                .await?;

            info!(group_id = %group.id, owner = %owner, "Group created");
            Ok(group)
        })
        .await
    }

    /// Finds a group
    pub async fn get_group(&self, group_id: GroupId) -> ServiceResult<Group> {
        logged("get_group", async move {
            Ok(self.repo.get_group(group_id).await?)
        })
        .await
    }

    /// Renames a group; requires `EditGroup`
    pub async fn rename_group(
        &self,
        group_id: GroupId,
        actor: UserId,
        name: &str,
    ) -> ServiceResult<Group> {
        logged("rename_group", async move {
            let new_group = NewGroup::new(name.trim());
            new_group.validate()?;
            authorize(self.repo.as_ref(), group_id, actor, Permission::EditGroup).await?;

            let group = self.repo.rename_group(group_id, &new_group.name).await?;
            info!(group_id = %group_id, actor = %actor, "Group renamed");
            Ok(group)
        })
        .await
    }

    /// Adds `user_id` to the group with the `Default` role; requires
    /// `EditMembers`
    ///
    /// # Errors
    ///
    /// - `NotFound` if the group or user does not exist
    /// - `Validation` if the user is already a member
    pub async fn add_member(
        &self,
        group_id: GroupId,
        actor: UserId,
        user_id: UserId,
    ) -> ServiceResult<Membership> {
        logged("add_member", async move {
            authorize(self.repo.as_ref(), group_id, actor, Permission::EditMembers).await?;
            self.repo.get_user(user_id).await?;

            match self.repo.get_membership(group_id, user_id).await {
                Ok(_) => {
                    return Err(ServiceError::validation(
                        "User is already a member of this group",
                    ))
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }

            let default_role = self
                .repo
                .list_roles(group_id)
                .await?
                .into_iter()
                .find(|role| role.name == DEFAULT_ROLE)
                .ok_or_else(|| ServiceError::NotFound("Default role not found".to_string()))?;

            let mut membership = self.repo.create_membership(group_id, user_id).await?;
            self.repo.grant_role(default_role.id, user_id).await?;
            membership.roles.push(default_role);

            info!(group_id = %group_id, actor = %actor, user_id = %user_id, "Member added");
            Ok(membership)
        })
        .await
    }

    /// Removes `user_id` from the group; requires `EditMembers`
    ///
    /// The member's role grants and current chore assignments in this group
    /// are removed with them.
    ///
    /// # Errors
    ///
    /// - `Validation` if the target holds the `Owner` role
    /// - `NotFound` if the target is not a member
    pub async fn remove_member(
        &self,
        group_id: GroupId,
        actor: UserId,
        user_id: UserId,
    ) -> ServiceResult<()> {
        logged("remove_member", async move {
            authorize(self.repo.as_ref(), group_id, actor, Permission::EditMembers).await?;

            let target = load_member(self.repo.as_ref(), group_id, user_id)
                .await
                .map_err(|e| match e {
                    ServiceError::Authorization(_) => {
                        ServiceError::NotFound("Member not found".to_string())
                    }
                    other => other,
                })?;
            if target.is_owner() {
                return Err(ServiceError::validation("Cannot remove the group owner"));
            }

            self.repo.delete_membership(group_id, user_id).await?;
            info!(group_id = %group_id, actor = %actor, user_id = %user_id, "Member removed");
            Ok(())
        })
        .await
    }

    /// Loads a membership with its current roles and assignments
    pub async fn member(&self, group_id: GroupId, user_id: UserId) -> ServiceResult<Membership> {
        logged("member", async move {
            let mut membership = load_member(self.repo.as_ref(), group_id, user_id).await?;
            membership.assignments = self
                .repo
                .list_chores(group_id)
                .await?
                .into_iter()
                .filter_map(|chore| chore.assignment)
                .filter(|assignment| assignment.user_id == user_id)
                .collect();
            Ok(membership)
        })
        .await
    }

    /// Lists a group's members with their current roles
    pub async fn members(&self, group_id: GroupId) -> ServiceResult<Vec<Membership>> {
        logged("members", async move {
            self.repo.get_group(group_id).await?;
            super::load_memberships(self.repo.as_ref(), group_id).await
        })
        .await
    }
}
