/// Repository traits for ChoreShare persistence
///
/// The services never talk to a database directly. They go through three
/// async traits:
///
/// - [`GroupRepository`]: users, groups and memberships
/// - [`RoleRepository`]: roles and role grants
/// - [`ChoreRepository`]: chores and chore assignments
///
/// [`Repository`] bundles all three and is implemented automatically for
/// any type that implements them.
///
/// # Implementations
///
/// - [`postgres::PgRepository`]: sqlx/PostgreSQL
/// - [`memory::MemoryRepository`]: in-process maps, used by tests
///
/// # Loading Conventions
///
/// Memberships come back with the user resolved but with empty `roles` and
/// `assignments`; callers load roles with
/// [`RoleRepository::list_member_roles`] every time they need a SuperRole.
/// Chores come back with their current assignment attached.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::models::{
    Chore, ChoreAssignment, ChoreId, ChoreListItem, ChoreUpdate, Group, GroupId, Membership,
    NewChore, NewGroup, NewRole, Role, RoleId, RoleUpdate, User, UserId,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

/// Users, groups and memberships
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Registers a user
    async fn create_user(&self, username: &str) -> StorageResult<User>;

    /// Finds a user. Returns `StorageError::NotFound` if absent.
    async fn get_user(&self, user_id: UserId) -> StorageResult<User>;

    /// Creates an empty group
    async fn create_group(&self, group: &NewGroup) -> StorageResult<Group>;

    /// Creates a group with `owner` as its only member, creates `roles` in
    /// it and grants every one of them to `owner`
    ///
    /// All or nothing: on error no group, membership or role is left
    /// behind. Returns `StorageError::NotFound` if `owner` does not exist
    /// and `StorageError::Conflict` if two of `roles` share a name.
    async fn create_group_with_owner(
        &self,
        group: &NewGroup,
        owner: UserId,
        roles: &[NewRole],
    ) -> StorageResult<Group>;

    /// Finds a group. Returns `StorageError::NotFound` if absent.
    async fn get_group(&self, group_id: GroupId) -> StorageResult<Group>;

    /// Renames a group and returns the updated row
    async fn rename_group(&self, group_id: GroupId, name: &str) -> StorageResult<Group>;

    /// Adds a user to a group. Returns `StorageError::Conflict` if the user
    /// is already a member.
    async fn create_membership(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> StorageResult<Membership>;

    /// Finds one membership. Returns `StorageError::NotFound` if absent.
    async fn get_membership(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> StorageResult<Membership>;

    /// Removes a member together with their role grants and current chore
    /// assignments in that group
    async fn delete_membership(&self, group_id: GroupId, user_id: UserId) -> StorageResult<()>;

    /// Lists a group's members, ordered by user ID
    async fn list_memberships(&self, group_id: GroupId) -> StorageResult<Vec<Membership>>;
}

/// Roles and role grants
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Creates a role. Returns `StorageError::Conflict` on a duplicate name.
    async fn create_role(&self, group_id: GroupId, role: &NewRole) -> StorageResult<Role>;

    /// Finds a role. Returns `StorageError::NotFound` if absent.
    async fn get_role(&self, role_id: RoleId) -> StorageResult<Role>;

    /// Replaces a role's name, permissions and chore flag
    async fn update_role(&self, role_id: RoleId, update: &RoleUpdate) -> StorageResult<Role>;

    /// Deletes a role and every grant of it
    async fn delete_role(&self, role_id: RoleId) -> StorageResult<()>;

    /// Lists a group's roles, ordered by ID
    async fn list_roles(&self, group_id: GroupId) -> StorageResult<Vec<Role>>;

    /// Lists the roles a user holds in a group, ordered by ID
    async fn list_member_roles(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> StorageResult<Vec<Role>>;

    /// Grants a role to a user. Granting a held role is a no-op.
    async fn grant_role(&self, role_id: RoleId, user_id: UserId) -> StorageResult<()>;

    /// Revokes a role from a user. Revoking a role that is not held is a
    /// no-op.
    async fn revoke_role(&self, role_id: RoleId, user_id: UserId) -> StorageResult<()>;
}

/// Chores and their current assignments
#[async_trait]
pub trait ChoreRepository: Send + Sync {
    /// Creates an unassigned chore. Returns `StorageError::Conflict` on a
    /// duplicate name.
    async fn create_chore(&self, group_id: GroupId, chore: &NewChore) -> StorageResult<Chore>;

    /// Finds a chore with its assignment. Returns `StorageError::NotFound`
    /// if absent.
    async fn get_chore(&self, chore_id: ChoreId) -> StorageResult<Chore>;

    /// Replaces a chore's name, description and duration
    async fn update_chore(&self, chore_id: ChoreId, update: &ChoreUpdate)
        -> StorageResult<Chore>;

    /// Deletes a chore and its assignment
    async fn delete_chore(&self, chore_id: ChoreId) -> StorageResult<()>;

    /// Lists a group's chores with their assignments, ordered by ID
    async fn list_chores(&self, group_id: GroupId) -> StorageResult<Vec<Chore>>;

    /// Overwrites the completion state of an existing assignment.
    /// Returns `StorageError::NotFound` if the chore has no assignment.
    async fn update_assignment(&self, assignment: &ChoreAssignment) -> StorageResult<()>;

    /// Lists every chore assigned to a user across all of their groups
    async fn list_user_chores(&self, user_id: UserId) -> StorageResult<Vec<ChoreListItem>>;

    /// Deletes the assignment rows of the given chores
    async fn delete_assignments(&self, assignments: &[ChoreAssignment]) -> StorageResult<()>;

    /// Inserts assignment rows
    async fn insert_assignments(&self, assignments: &[ChoreAssignment]) -> StorageResult<()>;

    /// Swaps `old` assignments for `new` ones
    ///
    /// The default runs [`delete_assignments`](Self::delete_assignments)
    /// then [`insert_assignments`](Self::insert_assignments). Backends that
    /// support transactions override this to make the swap atomic.
    async fn replace_assignments(
        &self,
        old: &[ChoreAssignment],
        new: &[ChoreAssignment],
    ) -> StorageResult<()> {
        self.delete_assignments(old).await?;
        self.insert_assignments(new).await
    }
}

/// Every storage capability the services need
pub trait Repository: GroupRepository + RoleRepository + ChoreRepository {}

impl<T> Repository for T where T: GroupRepository + RoleRepository + ChoreRepository {}
