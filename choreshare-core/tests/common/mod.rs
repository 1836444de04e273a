//! Common test utilities for integration tests
//!
//! Builds a group on top of `MemoryRepository` with services and a
//! distributor wired to the same store. `GatedRepository` wraps the store
//! to expose how distribution runs interleave.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use choreshare_core::engine::RandomSource;
use choreshare_core::orchestrator::{ChoreDistributor, DistributorConfig};
use choreshare_core::services::{ChoreService, GroupService, RoleService};
use choreshare_shared::error::StorageResult;
use choreshare_shared::models::{
    Chore, ChoreAssignment, ChoreId, ChoreListItem, ChoreUpdate, Group, GroupId, Membership,
    NewChore, NewGroup, NewRole, Permissions, Role, RoleId, RoleUpdate, User, UserId,
};
use choreshare_shared::repository::{
    ChoreRepository, GroupRepository, MemoryRepository, Repository, RoleRepository,
};

/// Random source that never swaps, so chores keep their ID order
pub struct NoShuffle;

impl RandomSource for NoShuffle {
    fn next_below(&mut self, bound: usize) -> usize {
        bound - 1
    }
}

/// Test context: one group owned by `owner`
pub struct TestContext {
    pub memory: Arc<MemoryRepository>,
    pub repo: Arc<dyn Repository>,
    pub groups: GroupService,
    pub roles: RoleService,
    pub chores: ChoreService,
    pub owner: User,
    pub group: Group,
}

impl TestContext {
    pub async fn new() -> Self {
        let memory = Arc::new(MemoryRepository::new());
        Self::with_repo(memory.clone(), memory).await
    }

    /// Context whose services and distributors go through a `GatedRepository`
    pub async fn gated() -> (Self, Arc<GatedRepository>) {
        let memory = Arc::new(MemoryRepository::new());
        let gated = Arc::new(GatedRepository::new(memory.clone()));
        (Self::with_repo(memory, gated.clone()).await, gated)
    }

    /// Context over `repo`, with `memory` as the store underneath it
    pub async fn with_repo(memory: Arc<MemoryRepository>, repo: Arc<dyn Repository>) -> Self {
        let groups = GroupService::new(repo.clone());
        let roles = RoleService::new(repo.clone());
        let chores = ChoreService::new(repo.clone());

        let owner = repo.create_user("owner").await.unwrap();
        let group = groups.create_group("Flat 4B", owner.id).await.unwrap();

        TestContext {
            memory,
            repo,
            groups,
            roles,
            chores,
            owner,
            group,
        }
    }

    /// Distributor with default configuration and the given random source
    pub fn distributor(&self, rng: impl RandomSource + 'static) -> ChoreDistributor {
        self.distributor_with(DistributorConfig::default(), rng)
    }

    pub fn distributor_with(
        &self,
        config: DistributorConfig,
        rng: impl RandomSource + 'static,
    ) -> ChoreDistributor {
        ChoreDistributor::with_config(self.repo.clone(), config, Box::new(rng))
    }

    /// Registers a user and adds them to the group (with `Default`)
    pub async fn add_member(&self, username: &str) -> User {
        let user = self.repo.create_user(username).await.unwrap();
        self.groups
            .add_member(self.group.id, self.owner.id, user.id)
            .await
            .unwrap();
        user
    }

    /// Registers a user who is not in the group
    pub async fn outsider(&self, username: &str) -> User {
        self.repo.create_user(username).await.unwrap()
    }

    pub async fn add_chore(&self, name: &str, duration_minutes: i32) -> Chore {
        self.chores
            .create_chore(
                self.group.id,
                self.owner.id,
                NewChore::new(name, duration_minutes),
            )
            .await
            .unwrap()
    }

    pub async fn add_role(&self, name: &str, permissions: Permissions, gets_chores: bool) -> Role {
        self.roles
            .add_role(
                self.group.id,
                self.owner.id,
                NewRole {
                    name: name.to_string(),
                    permissions,
                    gets_chores,
                },
            )
            .await
            .unwrap()
    }

    /// Looks up one of the group's roles by name
    pub async fn role(&self, name: &str) -> Role {
        self.roles
            .roles(self.group.id)
            .await
            .unwrap()
            .into_iter()
            .find(|role| role.name == name)
            .unwrap()
    }

    pub async fn group_chores(&self) -> Vec<Chore> {
        self.chores.chores(self.group.id).await.unwrap()
    }
}

/// Wraps a `MemoryRepository` and, once armed, yields to the scheduler
/// between a distribution run's chore read and its assignment write
///
/// A run counts as in flight from `list_chores` until `replace_assignments`
/// returns. Only distribution runs should execute while armed, because
/// other callers of `list_chores` never leave the window.
pub struct GatedRepository {
    inner: Arc<MemoryRepository>,
    armed: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    competing: Mutex<Option<ChoreAssignment>>,
}

impl GatedRepository {
    pub fn new(inner: Arc<MemoryRepository>) -> Self {
        GatedRepository {
            inner,
            armed: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            competing: Mutex::new(None),
        }
    }

    /// Starts counting and yielding
    pub fn arm(&self) {
        self.in_flight.store(0, Ordering::SeqCst);
        self.max_in_flight.store(0, Ordering::SeqCst);
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Most runs seen between their read and write at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Writes `assignment` just before the next `replace_assignments`, as
    /// another writer would
    pub fn compete_with(&self, assignment: ChoreAssignment) {
        *self.competing.lock().unwrap() = Some(assignment);
    }

    fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GroupRepository for GatedRepository {
    async fn create_user(&self, username: &str) -> StorageResult<User> {
        self.inner.create_user(username).await
    }

    async fn get_user(&self, user_id: UserId) -> StorageResult<User> {
        self.inner.get_user(user_id).await
    }

    async fn create_group(&self, group: &NewGroup) -> StorageResult<Group> {
        self.inner.create_group(group).await
    }

    async fn create_group_with_owner(
        &self,
        group: &NewGroup,
        owner: UserId,
        roles: &[NewRole],
    ) -> StorageResult<Group> {
        self.inner.create_group_with_owner(group, owner, roles).await
    }

    async fn get_group(&self, group_id: GroupId) -> StorageResult<Group> {
        self.inner.get_group(group_id).await
    }

    async fn rename_group(&self, group_id: GroupId, name: &str) -> StorageResult<Group> {
        self.inner.rename_group(group_id, name).await
    }

    async fn create_membership(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> StorageResult<Membership> {
        self.inner.create_membership(group_id, user_id).await
    }

    async fn get_membership(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> StorageResult<Membership> {
        self.inner.get_membership(group_id, user_id).await
    }

    async fn delete_membership(&self, group_id: GroupId, user_id: UserId) -> StorageResult<()> {
        self.inner.delete_membership(group_id, user_id).await
    }

    async fn list_memberships(&self, group_id: GroupId) -> StorageResult<Vec<Membership>> {
        self.inner.list_memberships(group_id).await
    }
}

#[async_trait]
impl RoleRepository for GatedRepository {
    async fn create_role(&self, group_id: GroupId, role: &NewRole) -> StorageResult<Role> {
        self.inner.create_role(group_id, role).await
    }

    async fn get_role(&self, role_id: RoleId) -> StorageResult<Role> {
        self.inner.get_role(role_id).await
    }

    async fn update_role(&self, role_id: RoleId, update: &RoleUpdate) -> StorageResult<Role> {
        self.inner.update_role(role_id, update).await
    }

    async fn delete_role(&self, role_id: RoleId) -> StorageResult<()> {
        self.inner.delete_role(role_id).await
    }

    async fn list_roles(&self, group_id: GroupId) -> StorageResult<Vec<Role>> {
        self.inner.list_roles(group_id).await
    }

    async fn list_member_roles(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> StorageResult<Vec<Role>> {
        self.inner.list_member_roles(group_id, user_id).await
    }

    async fn grant_role(&self, role_id: RoleId, user_id: UserId) -> StorageResult<()> {
        self.inner.grant_role(role_id, user_id).await
    }

    async fn revoke_role(&self, role_id: RoleId, user_id: UserId) -> StorageResult<()> {
        self.inner.revoke_role(role_id, user_id).await
    }
}

#[async_trait]
impl ChoreRepository for GatedRepository {
    async fn create_chore(&self, group_id: GroupId, chore: &NewChore) -> StorageResult<Chore> {
        self.inner.create_chore(group_id, chore).await
    }

    async fn get_chore(&self, chore_id: ChoreId) -> StorageResult<Chore> {
        self.inner.get_chore(chore_id).await
    }

    async fn update_chore(
        &self,
        chore_id: ChoreId,
        update: &ChoreUpdate,
    ) -> StorageResult<Chore> {
        self.inner.update_chore(chore_id, update).await
    }

    async fn delete_chore(&self, chore_id: ChoreId) -> StorageResult<()> {
        self.inner.delete_chore(chore_id).await
    }

    async fn list_chores(&self, group_id: GroupId) -> StorageResult<Vec<Chore>> {
        if self.is_armed() {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
        }
        self.inner.list_chores(group_id).await
    }

    async fn update_assignment(&self, assignment: &ChoreAssignment) -> StorageResult<()> {
        self.inner.update_assignment(assignment).await
    }

    async fn list_user_chores(&self, user_id: UserId) -> StorageResult<Vec<ChoreListItem>> {
        self.inner.list_user_chores(user_id).await
    }

    async fn delete_assignments(&self, assignments: &[ChoreAssignment]) -> StorageResult<()> {
        self.inner.delete_assignments(assignments).await
    }

    async fn insert_assignments(&self, assignments: &[ChoreAssignment]) -> StorageResult<()> {
        self.inner.insert_assignments(assignments).await
    }

    async fn replace_assignments(
        &self,
        old: &[ChoreAssignment],
        new: &[ChoreAssignment],
    ) -> StorageResult<()> {
        let competing = self.competing.lock().unwrap().take();
        if let Some(assignment) = competing {
            self.inner.insert_assignments(&[assignment]).await?;
        }
        if !self.is_armed() {
            return self.inner.replace_assignments(old, new).await;
        }

        tokio::task::yield_now().await;
        let result = self.inner.replace_assignments(old, new).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
