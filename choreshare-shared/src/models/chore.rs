/// Chore and chore assignment models
///
/// # Schema
///
/// ```sql
/// CREATE TABLE chores (
///     id BIGSERIAL PRIMARY KEY,
///     group_id BIGINT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
///     name VARCHAR(64) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
///     UNIQUE (group_id, name)
/// );
///
/// CREATE TABLE chore_assignments (
///     chore_id BIGINT PRIMARY KEY REFERENCES chores(id) ON DELETE CASCADE,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     complete BOOLEAN NOT NULL DEFAULT FALSE,
///     date_assigned TIMESTAMPTZ NOT NULL,
///     date_due TIMESTAMPTZ,
///     date_complete TIMESTAMPTZ
/// );
/// ```
///
/// A chore has at most one current assignment, so `chore_assignments` is
/// keyed by `chore_id`. Redistribution deletes the old rows and inserts new
/// ones; no assignment history is kept.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{ChoreId, GroupId, UserId};

/// Minutes per unit of fairness weight
pub const MINUTES_PER_WEIGHT: i32 = 5;

/// Chore belonging to a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Chore {
    /// Unique chore ID
    pub id: ChoreId,

    /// Group the chore belongs to
    pub group_id: GroupId,

    /// Chore name, unique within the group
    pub name: String,

    /// Free-form description
    pub description: String,

    /// Expected time to complete, in minutes
    pub duration_minutes: i32,

    /// Current assignment, if the chore has been distributed
    #[sqlx(skip)]
    pub assignment: Option<ChoreAssignment>,
}

impl Chore {
    /// Fairness weight: duration in minutes divided by 5, truncated
    pub fn weight(&self) -> u32 {
        (self.duration_minutes.max(0) / MINUTES_PER_WEIGHT) as u32
    }

    /// User the chore is currently assigned to
    pub fn assignee(&self) -> Option<UserId> {
        self.assignment.as_ref().map(|a| a.user_id)
    }
}

/// Current assignment of one chore to one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChoreAssignment {
    /// Assigned chore
    pub chore_id: ChoreId,

    /// Assigned user
    pub user_id: UserId,

    /// Whether the assignee has finished the chore
    pub complete: bool,

    /// When the chore was assigned (UTC)
    pub date_assigned: DateTime<Utc>,

    /// When the chore is due, if due dates are enabled
    pub date_due: Option<DateTime<Utc>>,

    /// When the assignee finished the chore
    pub date_complete: Option<DateTime<Utc>>,
}

impl ChoreAssignment {
    /// Creates an open assignment
    ///
    /// `due_after` sets `date_due` relative to `assigned_at`; `None` leaves
    /// the assignment without a due date.
    pub fn new(
        chore_id: ChoreId,
        user_id: UserId,
        assigned_at: DateTime<Utc>,
        due_after: Option<Duration>,
    ) -> Self {
        ChoreAssignment {
            chore_id,
            user_id,
            complete: false,
            date_assigned: assigned_at,
            date_due: due_after.map(|d| assigned_at + d),
            date_complete: None,
        }
    }

    /// Marks the assignment complete at `at`
    pub fn mark_complete(&mut self, at: DateTime<Utc>) {
        self.complete = true;
        self.date_complete = Some(at);
    }
}

/// One row of a user's chore list across all of their groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChoreListItem {
    /// Group the chore belongs to
    pub group_id: GroupId,

    /// Name of that group
    pub group_name: String,

    /// Assigned chore
    pub chore_id: ChoreId,

    /// Name of the chore
    pub chore_name: String,

    /// When the chore is due
    pub date_due: Option<DateTime<Utc>>,

    /// Whether the chore is done
    pub complete: bool,
}

/// Input for creating a new chore
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewChore {
    /// Chore name (1-64 characters)
    #[validate(length(min = 1, max = 64, message = "Chore name must be 1-64 characters"))]
    pub name: String,

    /// Description (up to 1024 characters)
    #[serde(default)]
    #[validate(length(max = 1024, message = "Description must be at most 1024 characters"))]
    pub description: String,

    /// Expected duration in minutes (1-1440)
    #[validate(range(min = 1, max = 1440, message = "Duration must be 1-1440 minutes"))]
    pub duration_minutes: i32,
}

impl NewChore {
    pub fn new(name: impl Into<String>, duration_minutes: i32) -> Self {
        NewChore {
            name: name.into(),
            description: String::new(),
            duration_minutes,
        }
    }
}

/// Replacement values for an existing chore
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChoreUpdate {
    /// New chore name (1-64 characters)
    #[validate(length(min = 1, max = 64, message = "Chore name must be 1-64 characters"))]
    pub name: String,

    /// New description
    #[validate(length(max = 1024, message = "Description must be at most 1024 characters"))]
    pub description: String,

    /// New expected duration in minutes (1-1440)
    #[validate(range(min = 1, max = 1440, message = "Duration must be 1-1440 minutes"))]
    pub duration_minutes: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chore(duration_minutes: i32) -> Chore {
        Chore {
            id: ChoreId(1),
            group_id: GroupId(1),
            name: "Dishes".to_string(),
            description: String::new(),
            duration_minutes,
            assignment: None,
        }
    }

    #[test]
    fn test_weight_truncates() {
        assert_eq!(chore(20).weight(), 4);
        assert_eq!(chore(14).weight(), 2);
        assert_eq!(chore(4).weight(), 0);
        assert_eq!(chore(-10).weight(), 0);
    }

    #[test]
    fn test_new_assignment_due_date() {
        let now = Utc::now();
        let open = ChoreAssignment::new(ChoreId(1), UserId(2), now, None);
        assert_eq!(open.date_due, None);
        assert!(!open.complete);

        let weekly = ChoreAssignment::new(ChoreId(1), UserId(2), now, Some(Duration::days(7)));
        assert_eq!(weekly.date_due, Some(now + Duration::days(7)));
    }

    #[test]
    fn test_mark_complete() {
        let now = Utc::now();
        let mut assignment = ChoreAssignment::new(ChoreId(1), UserId(2), now, None);
        assignment.mark_complete(now);
        assert!(assignment.complete);
        assert_eq!(assignment.date_complete, Some(now));
    }

    #[test]
    fn test_new_chore_validation() {
        assert!(NewChore::new("Trash", 10).validate().is_ok());
        assert!(NewChore::new("", 10).validate().is_err());
        assert!(NewChore::new("Trash", 0).validate().is_err());
        assert!(NewChore::new("Trash", 1441).validate().is_err());
    }
}
