/// PostgreSQL repository
///
/// Implements the repository traits with runtime-checked sqlx queries
/// against the schema in `migrations/`. Unique-key violations surface as
/// `StorageError::Conflict`; missing rows as `StorageError::NotFound`.
///
/// Multi-statement writes (`create_group_with_owner`, `delete_membership`,
/// `replace_assignments`) run in a single transaction.
///
/// # Example
///
/// ```no_run
/// use choreshare_shared::db::pool::{create_pool, DatabaseConfig};
/// use choreshare_shared::repository::{ChoreRepository, PgRepository};
/// use choreshare_shared::models::GroupId;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// let repo = PgRepository::new(pool);
/// let chores = repo.list_chores(GroupId(1)).await?;
/// println!("{} chores", chores.len());
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use super::{ChoreRepository, GroupRepository, RoleRepository};
use crate::error::{StorageError, StorageResult};
use crate::models::{
    Chore, ChoreAssignment, ChoreId, ChoreListItem, ChoreUpdate, Group, GroupId, Membership,
    NewChore, NewGroup, NewRole, Role, RoleId, RoleUpdate, User, UserId,
};

const UNIQUE_VIOLATION: &str = "23505";

/// Repository backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        PgRepository { pool }
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps a unique-key violation to `Conflict`, everything else to `Database`
fn map_write_error(e: sqlx::Error, conflict: impl FnOnce() -> String) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StorageError::Conflict(conflict());
        }
    }
    StorageError::Database(e)
}

#[derive(sqlx::FromRow)]
struct MembershipRow {
    group_id: GroupId,
    joined_at: DateTime<Utc>,
    user_id: UserId,
    username: String,
    user_created_at: DateTime<Utc>,
}

impl From<MembershipRow> for Membership {
    fn from(row: MembershipRow) -> Self {
        let user = User {
            id: row.user_id,
            username: row.username,
            created_at: row.user_created_at,
        };
        Membership::new(row.group_id, user, row.joined_at)
    }
}

const MEMBERSHIP_SELECT: &str = r#"
    SELECT m.group_id, m.joined_at, u.id AS user_id, u.username,
           u.created_at AS user_created_at
    FROM memberships m
    JOIN users u ON u.id = m.user_id
"#;

/// Chore joined with its optional assignment
#[derive(sqlx::FromRow)]
struct ChoreRow {
    id: ChoreId,
    group_id: GroupId,
    name: String,
    description: String,
    duration_minutes: i32,
    assignee: Option<UserId>,
    complete: Option<bool>,
    date_assigned: Option<DateTime<Utc>>,
    date_due: Option<DateTime<Utc>>,
    date_complete: Option<DateTime<Utc>>,
}

impl From<ChoreRow> for Chore {
    fn from(row: ChoreRow) -> Self {
        let assignment = match (row.assignee, row.date_assigned) {
            (Some(user_id), Some(date_assigned)) => Some(ChoreAssignment {
                chore_id: row.id,
                user_id,
                complete: row.complete.unwrap_or(false),
                date_assigned,
                date_due: row.date_due,
                date_complete: row.date_complete,
            }),
            _ => None,
        };

        Chore {
            id: row.id,
            group_id: row.group_id,
            name: row.name,
            description: row.description,
            duration_minutes: row.duration_minutes,
            assignment,
        }
    }
}

const CHORE_SELECT: &str = r#"
    SELECT c.id, c.group_id, c.name, c.description, c.duration_minutes,
           a.user_id AS assignee, a.complete, a.date_assigned, a.date_due,
           a.date_complete
    FROM chores c
    LEFT JOIN chore_assignments a ON a.chore_id = c.id
"#;

#[async_trait]
impl GroupRepository for PgRepository {
    async fn create_user(&self, username: &str) -> StorageResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username)
            VALUES ($1)
            RETURNING id, username, created_at
            "#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, || format!("username {username} is taken")))
    }

    async fn get_user(&self, user_id: UserId) -> StorageResult<User> {
        sqlx::query_as::<_, User>("SELECT id, username, created_at FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("User", user_id))
    }

    async fn create_group(&self, group: &NewGroup) -> StorageResult<Group> {
        let group = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (name)
            VALUES ($1)
            RETURNING id, name, created_at
            "#,
        )
        .bind(&group.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(group)
    }

    async fn create_group_with_owner(
        &self,
        group: &NewGroup,
        owner: UserId,
        roles: &[NewRole],
    ) -> StorageResult<Group> {
        self.get_user(owner).await?;

        let mut tx = self.pool.begin().await?;

        let group = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (name)
            VALUES ($1)
            RETURNING id, name, created_at
            "#,
        )
        .bind(&group.name)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO memberships (group_id, user_id) VALUES ($1, $2)")
            .bind(group.id)
            .bind(owner)
            .execute(&mut *tx)
            .await?;

        for role in roles {
            let (role_id,): (RoleId,) = sqlx::query_as(
                r#"
                INSERT INTO roles (group_id, name, permissions, gets_chores)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(group.id)
            .bind(&role.name)
            .bind(role.permissions)
            .bind(role.gets_chores)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_write_error(e, || format!("role {} already exists", role.name)))?;

            sqlx::query("INSERT INTO role_assignments (role_id, user_id) VALUES ($1, $2)")
                .bind(role_id)
                .bind(owner)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!(group_id = %group.id, roles = roles.len(), "Group created with owner");
        Ok(group)
    }

    async fn get_group(&self, group_id: GroupId) -> StorageResult<Group> {
        sqlx::query_as::<_, Group>("SELECT id, name, created_at FROM groups WHERE id = $1")
            .bind(group_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("Group", group_id))
    }

    async fn rename_group(&self, group_id: GroupId, name: &str) -> StorageResult<Group> {
        sqlx::query_as::<_, Group>(
            r#"
            UPDATE groups SET name = $2
            WHERE id = $1
            RETURNING id, name, created_at
            "#,
        )
        .bind(group_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::not_found("Group", group_id))
    }

    async fn create_membership(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> StorageResult<Membership> {
        self.get_group(group_id).await?;
        let user = self.get_user(user_id).await?;

        let (joined_at,): (DateTime<Utc>,) = sqlx::query_as(
            r#"
            INSERT INTO memberships (group_id, user_id)
            VALUES ($1, $2)
            RETURNING joined_at
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_write_error(e, || {
                format!("user {user_id} is already a member of group {group_id}")
            })
        })?;

        Ok(Membership::new(group_id, user, joined_at))
    }

    async fn get_membership(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> StorageResult<Membership> {
        let query = format!("{MEMBERSHIP_SELECT} WHERE m.group_id = $1 AND m.user_id = $2");
        let row = sqlx::query_as::<_, MembershipRow>(&query)
            .bind(group_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("Membership", user_id))?;

        Ok(row.into())
    }

    async fn delete_membership(&self, group_id: GroupId, user_id: UserId) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM role_assignments
            WHERE user_id = $2
              AND role_id IN (SELECT id FROM roles WHERE group_id = $1)
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            DELETE FROM chore_assignments
            WHERE user_id = $2
              AND chore_id IN (SELECT id FROM chores WHERE group_id = $1)
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM memberships WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Membership", user_id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_memberships(&self, group_id: GroupId) -> StorageResult<Vec<Membership>> {
        let query = format!("{MEMBERSHIP_SELECT} WHERE m.group_id = $1 ORDER BY m.user_id ASC");
        let rows = sqlx::query_as::<_, MembershipRow>(&query)
            .bind(group_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Membership::from).collect())
    }
}

#[async_trait]
impl RoleRepository for PgRepository {
    async fn create_role(&self, group_id: GroupId, role: &NewRole) -> StorageResult<Role> {
        sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (group_id, name, permissions, gets_chores)
            VALUES ($1, $2, $3, $4)
            RETURNING id, group_id, name, permissions, gets_chores
            "#,
        )
        .bind(group_id)
        .bind(&role.name)
        .bind(role.permissions)
        .bind(role.gets_chores)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, || format!("role {} already exists", role.name)))
    }

    async fn get_role(&self, role_id: RoleId) -> StorageResult<Role> {
        sqlx::query_as::<_, Role>(
            "SELECT id, group_id, name, permissions, gets_chores FROM roles WHERE id = $1",
        )
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::not_found("Role", role_id))
    }

    async fn update_role(&self, role_id: RoleId, update: &RoleUpdate) -> StorageResult<Role> {
        sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
            SET name = $2, permissions = $3, gets_chores = $4
            WHERE id = $1
            RETURNING id, group_id, name, permissions, gets_chores
            "#,
        )
        .bind(role_id)
        .bind(&update.name)
        .bind(update.permissions)
        .bind(update.gets_chores)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, || format!("role {} already exists", update.name)))?
        .ok_or_else(|| StorageError::not_found("Role", role_id))
    }

    async fn delete_role(&self, role_id: RoleId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Role", role_id));
        }
        Ok(())
    }

    async fn list_roles(&self, group_id: GroupId) -> StorageResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, group_id, name, permissions, gets_chores
            FROM roles
            WHERE group_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    async fn list_member_roles(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> StorageResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT r.id, r.group_id, r.name, r.permissions, r.gets_chores
            FROM roles r
            JOIN role_assignments ra ON ra.role_id = r.id
            WHERE r.group_id = $1 AND ra.user_id = $2
            ORDER BY r.id ASC
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    async fn grant_role(&self, role_id: RoleId, user_id: UserId) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO role_assignments (role_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn revoke_role(&self, role_id: RoleId, user_id: UserId) -> StorageResult<()> {
        sqlx::query("DELETE FROM role_assignments WHERE role_id = $1 AND user_id = $2")
            .bind(role_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl ChoreRepository for PgRepository {
    async fn create_chore(&self, group_id: GroupId, chore: &NewChore) -> StorageResult<Chore> {
        let (id,): (ChoreId,) = sqlx::query_as(
            r#"
            INSERT INTO chores (group_id, name, description, duration_minutes)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(group_id)
        .bind(&chore.name)
        .bind(&chore.description)
        .bind(chore.duration_minutes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, || format!("chore {} already exists", chore.name)))?;

        Ok(Chore {
            id,
            group_id,
            name: chore.name.clone(),
            description: chore.description.clone(),
            duration_minutes: chore.duration_minutes,
            assignment: None,
        })
    }

    async fn get_chore(&self, chore_id: ChoreId) -> StorageResult<Chore> {
        let query = format!("{CHORE_SELECT} WHERE c.id = $1");
        let row = sqlx::query_as::<_, ChoreRow>(&query)
            .bind(chore_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("Chore", chore_id))?;

        Ok(row.into())
    }

    async fn update_chore(
        &self,
        chore_id: ChoreId,
        update: &ChoreUpdate,
    ) -> StorageResult<Chore> {
        let result = sqlx::query(
            r#"
            UPDATE chores
            SET name = $2, description = $3, duration_minutes = $4
            WHERE id = $1
            "#,
        )
        .bind(chore_id)
        .bind(&update.name)
        .bind(&update.description)
        .bind(update.duration_minutes)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, || format!("chore {} already exists", update.name)))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Chore", chore_id));
        }
        self.get_chore(chore_id).await
    }

    async fn delete_chore(&self, chore_id: ChoreId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM chores WHERE id = $1")
            .bind(chore_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Chore", chore_id));
        }
        Ok(())
    }

    async fn list_chores(&self, group_id: GroupId) -> StorageResult<Vec<Chore>> {
        let query = format!("{CHORE_SELECT} WHERE c.group_id = $1 ORDER BY c.id ASC");
        let rows = sqlx::query_as::<_, ChoreRow>(&query)
            .bind(group_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Chore::from).collect())
    }

    async fn update_assignment(&self, assignment: &ChoreAssignment) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE chore_assignments
            SET complete = $2, date_complete = $3
            WHERE chore_id = $1
            "#,
        )
        .bind(assignment.chore_id)
        .bind(assignment.complete)
        .bind(assignment.date_complete)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(
                "ChoreAssignment",
                assignment.chore_id,
            ));
        }
        Ok(())
    }

    async fn list_user_chores(&self, user_id: UserId) -> StorageResult<Vec<ChoreListItem>> {
        let items = sqlx::query_as::<_, ChoreListItem>(
            r#"
            SELECT g.id AS group_id, g.name AS group_name,
                   c.id AS chore_id, c.name AS chore_name,
                   a.date_due, a.complete
            FROM chore_assignments a
            JOIN chores c ON c.id = a.chore_id
            JOIN groups g ON g.id = c.group_id
            WHERE a.user_id = $1
            ORDER BY g.id ASC, c.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn delete_assignments(&self, assignments: &[ChoreAssignment]) -> StorageResult<()> {
        let chore_ids: Vec<i64> = assignments.iter().map(|a| a.chore_id.0).collect();
        sqlx::query("DELETE FROM chore_assignments WHERE chore_id = ANY($1)")
            .bind(chore_ids)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_assignments(&self, assignments: &[ChoreAssignment]) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;
        for assignment in assignments {
            insert_assignment(&mut tx, assignment).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn replace_assignments(
        &self,
        old: &[ChoreAssignment],
        new: &[ChoreAssignment],
    ) -> StorageResult<()> {
        debug!(
            removed = old.len(),
            inserted = new.len(),
            "Replacing chore assignments"
        );

        let mut tx = self.pool.begin().await?;

        let chore_ids: Vec<i64> = old.iter().map(|a| a.chore_id.0).collect();
        sqlx::query("DELETE FROM chore_assignments WHERE chore_id = ANY($1)")
            .bind(chore_ids)
            .execute(&mut *tx)
            .await?;

        for assignment in new {
            insert_assignment(&mut tx, assignment).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

async fn insert_assignment(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    assignment: &ChoreAssignment,
) -> StorageResult<()> {
    sqlx::query(
        r#"
        INSERT INTO chore_assignments
            (chore_id, user_id, complete, date_assigned, date_due, date_complete)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(assignment.chore_id)
    .bind(assignment.user_id)
    .bind(assignment.complete)
    .bind(assignment.date_assigned)
    .bind(assignment.date_due)
    .bind(assignment.date_complete)
    .execute(&mut **tx)
    .await
    .map_err(|e| match map_write_error(e, String::new) {
        StorageError::Conflict(_) => StorageError::AlreadyAssigned(assignment.chore_id),
        other => other,
    })?;

    Ok(())
}
