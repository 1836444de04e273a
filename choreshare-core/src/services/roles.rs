/// Role service
///
/// Custom roles and role grants. Every operation requires `EditRoles`.
///
/// The reserved roles (`Owner`, `Admin`, `Default`) cannot be renamed,
/// edited or deleted, and no custom role may take a reserved name in any
/// capitalization. `Owner` is never granted or revoked after group
/// creation.

use std::sync::Arc;

use choreshare_shared::models::role::is_reserved_name;
use choreshare_shared::models::{GroupId, NewRole, Permission, Role, RoleId, RoleUpdate, UserId};
use choreshare_shared::repository::Repository;
use tracing::info;
use validator::Validate;

use super::{authorize, logged};
use crate::error::{ServiceError, ServiceResult};

/// Role management
#[derive(Clone)]
pub struct RoleService {
    repo: Arc<dyn Repository>,
}

impl RoleService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        RoleService { repo }
    }

    /// Creates a custom role
    ///
    /// # Errors
    ///
    /// - `Validation` if the name is empty, too long, reserved or taken
    pub async fn add_role(
        &self,
        group_id: GroupId,
        actor: UserId,
        mut role: NewRole,
    ) -> ServiceResult<Role> {
        logged("add_role", async move {
            role.name = role.name.trim().to_string();
            role.validate()?;
            authorize(self.repo.as_ref(), group_id, actor, Permission::EditRoles).await?;
            self.check_name(group_id, &role.name, None).await?;

            let role = self.repo.create_role(group_id, &role).await?;
            info!(group_id = %group_id, actor = %actor, role_id = %role.id, "Role created");
            Ok(role)
        })
        .await
    }

    /// Replaces a custom role's name, permissions and chore flag
    ///
    /// # Errors
    ///
    /// - `NotFound` if the role does not exist in this group
    /// - `Validation` if the role is reserved, or the new name is reserved
    ///   or taken
    pub async fn update_role(
        &self,
        group_id: GroupId,
        actor: UserId,
        role_id: RoleId,
        mut update: RoleUpdate,
    ) -> ServiceResult<Role> {
        logged("update_role", async move {
            update.name = update.name.trim().to_string();
            update.validate()?;
            authorize(self.repo.as_ref(), group_id, actor, Permission::EditRoles).await?;

            let role = self.group_role(group_id, role_id).await?;
            if role.is_reserved() {
                return Err(ServiceError::validation(format!(
                    "The {} role cannot be edited",
                    role.name
                )));
            }
            self.check_name(group_id, &update.name, Some(role_id)).await?;

            let role = self.repo.update_role(role_id, &update).await?;
            info!(group_id = %group_id, actor = %actor, role_id = %role_id, "Role updated");
            Ok(role)
        })
        .await
    }

    /// Deletes a custom role and every grant of it
    ///
    /// # Errors
    ///
    /// - `NotFound` if the role does not exist in this group
    /// - `Validation` if the role is reserved
    pub async fn delete_role(
        &self,
        group_id: GroupId,
        actor: UserId,
        role_id: RoleId,
    ) -> ServiceResult<()> {
        logged("delete_role", async move {
            authorize(self.repo.as_ref(), group_id, actor, Permission::EditRoles).await?;

            let role = self.group_role(group_id, role_id).await?;
            if role.is_reserved() {
                return Err(ServiceError::validation(format!(
                    "The {} role cannot be deleted",
                    role.name
                )));
            }

            self.repo.delete_role(role_id).await?;
            info!(group_id = %group_id, actor = %actor, role_id = %role_id, "Role deleted");
            Ok(())
        })
        .await
    }

    /// Grants a role to a member of the group
    ///
    /// # Errors
    ///
    /// - `NotFound` if the role does not exist in this group
    /// - `Validation` if the role is `Owner` or the user is not a member
    pub async fn grant_role(
        &self,
        group_id: GroupId,
        actor: UserId,
        role_id: RoleId,
        user_id: UserId,
    ) -> ServiceResult<()> {
        logged("grant_role", async move {
            authorize(self.repo.as_ref(), group_id, actor, Permission::EditRoles).await?;

            let role = self.group_role(group_id, role_id).await?;
            if role.is_owner() {
                return Err(ServiceError::validation("There can only be one owner"));
            }
            self.require_member(group_id, user_id).await?;

            self.repo.grant_role(role_id, user_id).await?;
            info!(
                group_id = %group_id,
                actor = %actor,
                role_id = %role_id,
                user_id = %user_id,
                "Role granted"
            );
            Ok(())
        })
        .await
    }

    /// Revokes a role from a member of the group
    ///
    /// # Errors
    ///
    /// - `NotFound` if the role does not exist in this group
    /// - `Validation` if the role is `Owner` or the user is not a member
    pub async fn revoke_role(
        &self,
        group_id: GroupId,
        actor: UserId,
        role_id: RoleId,
        user_id: UserId,
    ) -> ServiceResult<()> {
        logged("revoke_role", async move {
            authorize(self.repo.as_ref(), group_id, actor, Permission::EditRoles).await?;

            let role = self.group_role(group_id, role_id).await?;
            if role.is_owner() {
                return Err(ServiceError::validation("The owner role cannot be revoked"));
            }
            self.require_member(group_id, user_id).await?;

            self.repo.revoke_role(role_id, user_id).await?;
            info!(
                group_id = %group_id,
                actor = %actor,
                role_id = %role_id,
                user_id = %user_id,
                "Role revoked"
            );
            Ok(())
        })
        .await
    }

    /// Lists the group's roles
    pub async fn roles(&self, group_id: GroupId) -> ServiceResult<Vec<Role>> {
        logged("roles", async move {
            self.repo.get_group(group_id).await?;
            Ok(self.repo.list_roles(group_id).await?)
        })
        .await
    }

    /// Loads a role and checks it belongs to `group_id`
    async fn group_role(&self, group_id: GroupId, role_id: RoleId) -> ServiceResult<Role> {
        let role = self.repo.get_role(role_id).await?;
        if role.group_id != group_id {
            return Err(ServiceError::NotFound("Role not found".to_string()));
        }
        Ok(role)
    }

    async fn check_name(
        &self,
        group_id: GroupId,
        name: &str,
        except: Option<RoleId>,
    ) -> ServiceResult<()> {
        if is_reserved_name(name) {
            return Err(ServiceError::validation(format!(
                "{name} is a reserved role name"
            )));
        }
        let taken = self
            .repo
            .list_roles(group_id)
            .await?
            .iter()
            .any(|role| role.name == name && Some(role.id) != except);
        if taken {
            return Err(ServiceError::validation(format!(
                "A role named {name} already exists"
            )));
        }
        Ok(())
    }

    async fn require_member(&self, group_id: GroupId, user_id: UserId) -> ServiceResult<()> {
        match self.repo.get_membership(group_id, user_id).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Err(ServiceError::validation(
                "User is not a member of this group",
            )),
            Err(e) => Err(e.into()),
        }
    }
}
