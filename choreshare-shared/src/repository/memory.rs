/// In-memory repository
///
/// Implements every repository trait over `BTreeMap`s behind one
/// `std::sync::Mutex`. It enforces the same uniqueness and foreign-key rules
/// as the PostgreSQL schema, so the services behave the same on both
/// backends.
///
/// Two hooks exist for tests:
///
/// - [`MemoryRepository::mutation_count`] counts every call to a mutating
///   method, successful or not
/// - [`MemoryRepository::set_unavailable`] and
///   [`MemoryRepository::set_fail_writes`] make calls fail with
///   `StorageError::Unavailable`
///
/// # Example
///
/// ```
/// use choreshare_shared::models::NewGroup;
/// use choreshare_shared::repository::{GroupRepository, MemoryRepository};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let repo = MemoryRepository::new();
/// let group = repo.create_group(&NewGroup::new("Flat 4B")).await?;
/// assert_eq!(repo.get_group(group.id).await?.name, "Flat 4B");
/// # Ok(())
/// # }
/// ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{ChoreRepository, GroupRepository, RoleRepository};
use crate::error::{StorageError, StorageResult};
use crate::models::{
    Chore, ChoreAssignment, ChoreId, ChoreListItem, ChoreUpdate, Group, GroupId, Membership,
    NewChore, NewGroup, NewRole, Role, RoleId, RoleUpdate, User, UserId,
};

#[derive(Debug, Default)]
struct State {
    last_id: i64,
    users: BTreeMap<UserId, User>,
    groups: BTreeMap<GroupId, Group>,
    memberships: BTreeMap<(GroupId, UserId), DateTime<Utc>>,
    roles: BTreeMap<RoleId, Role>,
    grants: BTreeSet<(RoleId, UserId)>,
    chores: BTreeMap<ChoreId, Chore>,
    assignments: BTreeMap<ChoreId, ChoreAssignment>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn user(&self, user_id: UserId) -> StorageResult<&User> {
        self.users
            .get(&user_id)
            .ok_or_else(|| StorageError::not_found("User", user_id))
    }

    fn group(&self, group_id: GroupId) -> StorageResult<&Group> {
        self.groups
            .get(&group_id)
            .ok_or_else(|| StorageError::not_found("Group", group_id))
    }

    fn membership(&self, group_id: GroupId, user_id: UserId) -> StorageResult<Membership> {
        let joined_at = self
            .memberships
            .get(&(group_id, user_id))
            .ok_or_else(|| StorageError::not_found("Membership", user_id))?;
        Ok(Membership::new(group_id, self.user(user_id)?.clone(), *joined_at))
    }

    fn role(&self, role_id: RoleId) -> StorageResult<&Role> {
        self.roles
            .get(&role_id)
            .ok_or_else(|| StorageError::not_found("Role", role_id))
    }

    fn role_name_taken(&self, group_id: GroupId, name: &str, except: Option<RoleId>) -> bool {
        self.roles
            .values()
            .any(|r| r.group_id == group_id && r.name == name && Some(r.id) != except)
    }

    fn chore(&self, chore_id: ChoreId) -> StorageResult<Chore> {
        let mut chore = self
            .chores
            .get(&chore_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Chore", chore_id))?;
        chore.assignment = self.assignments.get(&chore_id).cloned();
        Ok(chore)
    }

    fn chore_name_taken(&self, group_id: GroupId, name: &str, except: Option<ChoreId>) -> bool {
        self.chores
            .values()
            .any(|c| c.group_id == group_id && c.name == name && Some(c.id) != except)
    }
}

/// Repository backed by process memory
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
    mutations: AtomicUsize,
    unavailable: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutating calls made so far, including failed ones
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Makes every call fail with `StorageError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes mutating calls fail with `StorageError::Unavailable`
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn read(&self) -> StorageResult<MutexGuard<'_, State>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "memory repository is offline".to_string(),
            ));
        }
        self.state
            .lock()
            .map_err(|_| StorageError::Unavailable("memory repository lock poisoned".to_string()))
    }

    fn write(&self) -> StorageResult<MutexGuard<'_, State>> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "memory repository rejects writes".to_string(),
            ));
        }
        self.read()
    }
}

fn delete_assignment_rows(state: &mut State, assignments: &[ChoreAssignment]) {
    for assignment in assignments {
        state.assignments.remove(&assignment.chore_id);
    }
}

fn insert_assignment_rows(
    state: &mut State,
    assignments: &[ChoreAssignment],
) -> StorageResult<()> {
    for assignment in assignments {
        if !state.chores.contains_key(&assignment.chore_id) {
            return Err(StorageError::not_found("Chore", assignment.chore_id));
        }
        state.user(assignment.user_id)?;
        if state.assignments.contains_key(&assignment.chore_id) {
            return Err(StorageError::AlreadyAssigned(assignment.chore_id));
        }
    }

    for assignment in assignments {
        state
            .assignments
            .insert(assignment.chore_id, assignment.clone());
    }
    Ok(())
}

#[async_trait]
impl GroupRepository for MemoryRepository {
    async fn create_user(&self, username: &str) -> StorageResult<User> {
        let mut state = self.write()?;
        if state.users.values().any(|u| u.username == username) {
            return Err(StorageError::Conflict(format!(
                "username {username} is taken"
            )));
        }
        let user = User::new(UserId(state.next_id()), username);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: UserId) -> StorageResult<User> {
        self.read()?.user(user_id).cloned()
    }

    async fn create_group(&self, group: &NewGroup) -> StorageResult<Group> {
        let mut state = self.write()?;
        let group = Group {
            id: GroupId(state.next_id()),
            name: group.name.clone(),
            created_at: Utc::now(),
        };
        state.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn create_group_with_owner(
        &self,
        group: &NewGroup,
        owner: UserId,
        roles: &[NewRole],
    ) -> StorageResult<Group> {
        let mut state = self.write()?;
        state.user(owner)?;
        let mut names = BTreeSet::new();
        if let Some(role) = roles.iter().find(|r| !names.insert(r.name.as_str())) {
            return Err(StorageError::Conflict(format!(
                "role {} already exists",
                role.name
            )));
        }

        let group = Group {
            id: GroupId(state.next_id()),
            name: group.name.clone(),
            created_at: Utc::now(),
        };
        state.groups.insert(group.id, group.clone());
        state.memberships.insert((group.id, owner), group.created_at);
        for new_role in roles {
            let role = Role {
                id: RoleId(state.next_id()),
                group_id: group.id,
                name: new_role.name.clone(),
                permissions: new_role.permissions,
                gets_chores: new_role.gets_chores,
            };
            state.grants.insert((role.id, owner));
            state.roles.insert(role.id, role);
        }
        Ok(group)
    }

    async fn get_group(&self, group_id: GroupId) -> StorageResult<Group> {
        self.read()?.group(group_id).cloned()
    }

    async fn rename_group(&self, group_id: GroupId, name: &str) -> StorageResult<Group> {
        let mut state = self.write()?;
        let group = state
            .groups
            .get_mut(&group_id)
            .ok_or_else(|| StorageError::not_found("Group", group_id))?;
        group.name = name.to_string();
        Ok(group.clone())
    }

    async fn create_membership(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> StorageResult<Membership> {
        let mut state = self.write()?;
        state.group(group_id)?;
        let user = state.user(user_id)?.clone();
        if state.memberships.contains_key(&(group_id, user_id)) {
            return Err(StorageError::Conflict(format!(
                "user {user_id} is already a member of group {group_id}"
            )));
        }
        let joined_at = Utc::now();
        state.memberships.insert((group_id, user_id), joined_at);
        Ok(Membership::new(group_id, user, joined_at))
    }

    async fn get_membership(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> StorageResult<Membership> {
        self.read()?.membership(group_id, user_id)
    }

    async fn delete_membership(&self, group_id: GroupId, user_id: UserId) -> StorageResult<()> {
        let mut state = self.write()?;
        if state.memberships.remove(&(group_id, user_id)).is_none() {
            return Err(StorageError::not_found("Membership", user_id));
        }

        let State {
            roles,
            grants,
            chores,
            assignments,
            ..
        } = &mut *state;
        grants.retain(|(role_id, holder)| {
            *holder != user_id || roles.get(role_id).map(|r| r.group_id) != Some(group_id)
        });
        assignments.retain(|chore_id, a| {
            a.user_id != user_id || chores.get(chore_id).map(|c| c.group_id) != Some(group_id)
        });
        Ok(())
    }

    async fn list_memberships(&self, group_id: GroupId) -> StorageResult<Vec<Membership>> {
        let state = self.read()?;
        state
            .memberships
            .keys()
            .filter(|(group, _)| *group == group_id)
            .map(|(group, user)| state.membership(*group, *user))
            .collect()
    }
}

#[async_trait]
impl RoleRepository for MemoryRepository {
    async fn create_role(&self, group_id: GroupId, role: &NewRole) -> StorageResult<Role> {
        let mut state = self.write()?;
        state.group(group_id)?;
        if state.role_name_taken(group_id, &role.name, None) {
            return Err(StorageError::Conflict(format!(
                "role {} already exists",
                role.name
            )));
        }
        let role = Role {
            id: RoleId(state.next_id()),
            group_id,
            name: role.name.clone(),
            permissions: role.permissions,
            gets_chores: role.gets_chores,
        };
        state.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn get_role(&self, role_id: RoleId) -> StorageResult<Role> {
        self.read()?.role(role_id).cloned()
    }

    async fn update_role(&self, role_id: RoleId, update: &RoleUpdate) -> StorageResult<Role> {
        let mut state = self.write()?;
        let group_id = state.role(role_id)?.group_id;
        if state.role_name_taken(group_id, &update.name, Some(role_id)) {
            return Err(StorageError::Conflict(format!(
                "role {} already exists",
                update.name
            )));
        }
        let role = state
            .roles
            .get_mut(&role_id)
            .ok_or_else(|| StorageError::not_found("Role", role_id))?;
        role.name = update.name.clone();
        role.permissions = update.permissions;
        role.gets_chores = update.gets_chores;
        Ok(role.clone())
    }

    async fn delete_role(&self, role_id: RoleId) -> StorageResult<()> {
        let mut state = self.write()?;
        if state.roles.remove(&role_id).is_none() {
            return Err(StorageError::not_found("Role", role_id));
        }
        state.grants.retain(|(role, _)| *role != role_id);
        Ok(())
    }

    async fn list_roles(&self, group_id: GroupId) -> StorageResult<Vec<Role>> {
        let state = self.read()?;
        Ok(state
            .roles
            .values()
            .filter(|r| r.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn list_member_roles(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> StorageResult<Vec<Role>> {
        let state = self.read()?;
        Ok(state
            .roles
            .values()
            .filter(|r| r.group_id == group_id && state.grants.contains(&(r.id, user_id)))
            .cloned()
            .collect())
    }

    async fn grant_role(&self, role_id: RoleId, user_id: UserId) -> StorageResult<()> {
        let mut state = self.write()?;
        state.role(role_id)?;
        state.user(user_id)?;
        state.grants.insert((role_id, user_id));
        Ok(())
    }

    async fn revoke_role(&self, role_id: RoleId, user_id: UserId) -> StorageResult<()> {
        let mut state = self.write()?;
        state.grants.remove(&(role_id, user_id));
        Ok(())
    }
}

#[async_trait]
impl ChoreRepository for MemoryRepository {
    async fn create_chore(&self, group_id: GroupId, chore: &NewChore) -> StorageResult<Chore> {
        let mut state = self.write()?;
        state.group(group_id)?;
        if state.chore_name_taken(group_id, &chore.name, None) {
            return Err(StorageError::Conflict(format!(
                "chore {} already exists",
                chore.name
            )));
        }
        let chore = Chore {
            id: ChoreId(state.next_id()),
            group_id,
            name: chore.name.clone(),
            description: chore.description.clone(),
            duration_minutes: chore.duration_minutes,
            assignment: None,
        };
        state.chores.insert(chore.id, chore.clone());
        Ok(chore)
    }

    async fn get_chore(&self, chore_id: ChoreId) -> StorageResult<Chore> {
        self.read()?.chore(chore_id)
    }

    async fn update_chore(
        &self,
        chore_id: ChoreId,
        update: &ChoreUpdate,
    ) -> StorageResult<Chore> {
        let mut state = self.write()?;
        let group_id = state.chore(chore_id)?.group_id;
        if state.chore_name_taken(group_id, &update.name, Some(chore_id)) {
            return Err(StorageError::Conflict(format!(
                "chore {} already exists",
                update.name
            )));
        }
        if let Some(chore) = state.chores.get_mut(&chore_id) {
            chore.name = update.name.clone();
            chore.description = update.description.clone();
            chore.duration_minutes = update.duration_minutes;
        }
        state.chore(chore_id)
    }

    async fn delete_chore(&self, chore_id: ChoreId) -> StorageResult<()> {
        let mut state = self.write()?;
        if state.chores.remove(&chore_id).is_none() {
            return Err(StorageError::not_found("Chore", chore_id));
        }
        state.assignments.remove(&chore_id);
        Ok(())
    }

    async fn list_chores(&self, group_id: GroupId) -> StorageResult<Vec<Chore>> {
        let state = self.read()?;
        state
            .chores
            .values()
            .filter(|c| c.group_id == group_id)
            .map(|c| state.chore(c.id))
            .collect()
    }

    async fn update_assignment(&self, assignment: &ChoreAssignment) -> StorageResult<()> {
        let mut state = self.write()?;
        let existing = state
            .assignments
            .get_mut(&assignment.chore_id)
            .ok_or_else(|| StorageError::not_found("ChoreAssignment", assignment.chore_id))?;
        existing.complete = assignment.complete;
        existing.date_complete = assignment.date_complete;
        Ok(())
    }

    async fn list_user_chores(&self, user_id: UserId) -> StorageResult<Vec<ChoreListItem>> {
        let state = self.read()?;
        let mut items = Vec::new();
        for assignment in state.assignments.values().filter(|a| a.user_id == user_id) {
            let chore = state
                .chores
                .get(&assignment.chore_id)
                .ok_or_else(|| StorageError::not_found("Chore", assignment.chore_id))?;
            let group = state.group(chore.group_id)?;
            items.push(ChoreListItem {
                group_id: group.id,
                group_name: group.name.clone(),
                chore_id: chore.id,
                chore_name: chore.name.clone(),
                date_due: assignment.date_due,
                complete: assignment.complete,
            });
        }
        items.sort_by_key(|item| (item.group_id, item.chore_id));
        Ok(items)
    }

    async fn delete_assignments(&self, assignments: &[ChoreAssignment]) -> StorageResult<()> {
        let mut state = self.write()?;
        delete_assignment_rows(&mut state, assignments);
        Ok(())
    }

    async fn insert_assignments(&self, assignments: &[ChoreAssignment]) -> StorageResult<()> {
        let mut state = self.write()?;
        insert_assignment_rows(&mut state, assignments)
    }

    async fn replace_assignments(
        &self,
        old: &[ChoreAssignment],
        new: &[ChoreAssignment],
    ) -> StorageResult<()> {
        let mut state = self.write()?;
        let snapshot = state.assignments.clone();
        delete_assignment_rows(&mut state, old);
        if let Err(e) = insert_assignment_rows(&mut state, new) {
            state.assignments = snapshot;
            return Err(e);
        }
        Ok(())
    }
}
