/// Group, role and chore management services
///
/// Each service wraps a shared repository handle. Every mutating operation
/// takes the acting user, rebuilds that user's SuperRole from freshly
/// loaded roles and checks one granular permission before touching storage.
///
/// # Services
///
/// - `groups`: group creation, renaming and membership
/// - `roles`: custom roles and role grants
/// - `chores`: chore CRUD, completion and per-user chore lists
///
/// Public operations run inside [`logged`], so every failure is logged with
/// full detail under the operation name before the caller sees it.

use std::future::Future;

use choreshare_shared::auth::{require_permission, AuthzError};
use choreshare_shared::models::{GroupId, Membership, Permission, UserId};
use choreshare_shared::repository::Repository;

use crate::error::ServiceResult;

pub mod chores;
pub mod groups;
pub mod roles;

pub use chores::ChoreService;
pub use groups::GroupService;
pub use roles::RoleService;

/// Awaits `work` and logs its error, if any, under `operation`
pub(crate) async fn logged<T>(
    operation: &'static str,
    work: impl Future<Output = ServiceResult<T>>,
) -> ServiceResult<T> {
    let result = work.await;
    if let Err(e) = &result {
        e.log(operation);
    }
    result
}

/// Loads one membership with its current roles
///
/// A missing membership is reported as `AuthzError::NotMember`.
pub(crate) async fn load_member(
    repo: &dyn Repository,
    group_id: GroupId,
    user_id: UserId,
) -> ServiceResult<Membership> {
    let mut membership = match repo.get_membership(group_id, user_id).await {
        Ok(membership) => membership,
        Err(e) if e.is_not_found() => return Err(AuthzError::NotMember(group_id).into()),
        Err(e) => return Err(e.into()),
    };
    membership.roles = repo.list_member_roles(group_id, user_id).await?;
    Ok(membership)
}

/// Loads every membership of a group with its current roles
pub(crate) async fn load_memberships(
    repo: &dyn Repository,
    group_id: GroupId,
) -> ServiceResult<Vec<Membership>> {
    let mut memberships = repo.list_memberships(group_id).await?;
    for membership in &mut memberships {
        membership.roles = repo
            .list_member_roles(group_id, membership.user_id())
            .await?;
    }
    Ok(memberships)
}

/// Checks that `actor` is a member of `group_id` holding `permission`
///
/// The group itself must exist; otherwise the caller gets `NotFound`
/// rather than an authorization error.
pub(crate) async fn authorize(
    repo: &dyn Repository,
    group_id: GroupId,
    actor: UserId,
    permission: Permission,
) -> ServiceResult<Membership> {
    repo.get_group(group_id).await?;
    let membership = load_member(repo, group_id, actor).await?;
    require_permission(&membership, permission)?;
    Ok(membership)
}
