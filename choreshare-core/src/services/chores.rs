/// Chore service
///
/// Chore CRUD (requires `EditChores`), completion by the current assignee,
/// and each user's chore list across groups. Assignments themselves are
/// only created by [`ChoreDistributor`](crate::orchestrator::ChoreDistributor).

use std::sync::Arc;

use chrono::Utc;
use choreshare_shared::models::{
    Chore, ChoreAssignment, ChoreId, ChoreListItem, ChoreUpdate, GroupId, NewChore, Permission,
    UserId,
};
use choreshare_shared::repository::Repository;
use tracing::info;
use validator::Validate;

use super::{authorize, load_member, logged};
use crate::error::{ServiceError, ServiceResult};

/// Chore management
#[derive(Clone)]
pub struct ChoreService {
    repo: Arc<dyn Repository>,
}

impl ChoreService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        ChoreService { repo }
    }

    /// Creates an unassigned chore
    ///
    /// # Errors
    ///
    /// - `Validation` if a field is out of range or the name is taken
    pub async fn create_chore(
        &self,
        group_id: GroupId,
        actor: UserId,
        mut chore: NewChore,
    ) -> ServiceResult<Chore> {
        logged("create_chore", async move {
            chore.name = chore.name.trim().to_string();
            chore.validate()?;
            authorize(self.repo.as_ref(), group_id, actor, Permission::EditChores).await?;
            self.check_name(group_id, &chore.name, None).await?;

            let chore = self.repo.create_chore(group_id, &chore).await?;
            info!(group_id = %group_id, actor = %actor, chore_id = %chore.id, "Chore created");
            Ok(chore)
        })
        .await
    }

    /// Replaces a chore's name, description and duration
    ///
    /// The current assignment is kept.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the chore does not exist in this group
    /// - `Validation` if a field is out of range or the new name is taken
    pub async fn update_chore(
        &self,
        group_id: GroupId,
        actor: UserId,
        chore_id: ChoreId,
        mut update: ChoreUpdate,
    ) -> ServiceResult<Chore> {
        logged("update_chore", async move {
            update.name = update.name.trim().to_string();
            update.validate()?;
            authorize(self.repo.as_ref(), group_id, actor, Permission::EditChores).await?;
            self.group_chore(group_id, chore_id).await?;
            self.check_name(group_id, &update.name, Some(chore_id)).await?;

            let chore = self.repo.update_chore(chore_id, &update).await?;
            info!(group_id = %group_id, actor = %actor, chore_id = %chore_id, "Chore updated");
            Ok(chore)
        })
        .await
    }

    /// Deletes a chore and its assignment
    pub async fn delete_chore(
        &self,
        group_id: GroupId,
        actor: UserId,
        chore_id: ChoreId,
    ) -> ServiceResult<()> {
        logged("delete_chore", async move {
            authorize(self.repo.as_ref(), group_id, actor, Permission::EditChores).await?;
            self.group_chore(group_id, chore_id).await?;

            self.repo.delete_chore(chore_id).await?;
            info!(group_id = %group_id, actor = %actor, chore_id = %chore_id, "Chore deleted");
            Ok(())
        })
        .await
    }

    /// Marks a chore complete; only its current assignee may do this
    ///
    /// # Errors
    ///
    /// - `Authorization` if `actor` is not a member of the group
    /// - `NotFound` if the chore does not exist in this group
    /// - `Validation` if the chore is unassigned, assigned to someone else,
    ///   or already complete
    pub async fn complete_chore(
        &self,
        group_id: GroupId,
        actor: UserId,
        chore_id: ChoreId,
    ) -> ServiceResult<ChoreAssignment> {
        logged("complete_chore", async move {
            self.repo.get_group(group_id).await?;
            load_member(self.repo.as_ref(), group_id, actor).await?;

            let chore = self.group_chore(group_id, chore_id).await?;
            let mut assignment = chore
                .assignment
                .ok_or_else(|| ServiceError::validation("Chore is not assigned"))?;
            if assignment.user_id != actor {
                return Err(ServiceError::validation(
                    "Only the assigned member can complete this chore",
                ));
            }
            if assignment.complete {
                return Err(ServiceError::validation("Chore is already complete"));
            }

            assignment.mark_complete(Utc::now());
            self.repo.update_assignment(&assignment).await?;
            info!(group_id = %group_id, actor = %actor, chore_id = %chore_id, "Chore completed");
            Ok(assignment)
        })
        .await
    }

    /// Lists a group's chores with their current assignments
    pub async fn chores(&self, group_id: GroupId) -> ServiceResult<Vec<Chore>> {
        logged("chores", async move {
            self.repo.get_group(group_id).await?;
            Ok(self.repo.list_chores(group_id).await?)
        })
        .await
    }

    /// Lists every chore assigned to `user_id` across their groups
    pub async fn list_user_chores(&self, user_id: UserId) -> ServiceResult<Vec<ChoreListItem>> {
        logged("list_user_chores", async move {
            self.repo.get_user(user_id).await?;
            Ok(self.repo.list_user_chores(user_id).await?)
        })
        .await
    }

    /// Loads a chore and checks it belongs to `group_id`
    async fn group_chore(&self, group_id: GroupId, chore_id: ChoreId) -> ServiceResult<Chore> {
        let chore = self.repo.get_chore(chore_id).await?;
        if chore.group_id != group_id {
            return Err(ServiceError::NotFound("Chore not found".to_string()));
        }
        Ok(chore)
    }

    async fn check_name(
        &self,
        group_id: GroupId,
        name: &str,
        except: Option<ChoreId>,
    ) -> ServiceResult<()> {
        let taken = self
            .repo
            .list_chores(group_id)
            .await?
            .iter()
            .any(|chore| chore.name == name && Some(chore.id) != except);
        if taken {
            return Err(ServiceError::validation(format!(
                "A chore named {name} already exists"
            )));
        }
        Ok(())
    }
}
