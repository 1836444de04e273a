/// Role model and permission bitmask
///
/// Every role belongs to exactly one group and carries an integer bitmask of
/// capabilities plus a flag saying whether holders of the role receive
/// chores.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE roles (
///     id BIGSERIAL PRIMARY KEY,
///     group_id BIGINT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
///     name VARCHAR(32) NOT NULL,
///     permissions INTEGER NOT NULL DEFAULT 0,
///     gets_chores BOOLEAN NOT NULL DEFAULT FALSE,
///     UNIQUE (group_id, name)
/// );
/// ```
///
/// # Permission Bits
///
/// | Bit | Permission    |
/// |-----|---------------|
/// | 0   | `EditMembers` |
/// | 1   | `EditChores`  |
/// | 2   | `EditGroup`   |
/// | 3   | `EditRoles`   |
///
/// # Reserved Roles
///
/// `Owner`, `Admin` and `Default` are created with every group and can never
/// be renamed, edited or deleted. Owner and Admin hold every permission;
/// Default holds none and is the role that makes members chore-eligible.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use validator::Validate;

use super::{GroupId, RoleId};

/// Name of the reserved role held by the group creator
pub const OWNER_ROLE: &str = "Owner";

/// Name of the reserved administrator role
pub const ADMIN_ROLE: &str = "Admin";

/// Name of the reserved role granted to every member
pub const DEFAULT_ROLE: &str = "Default";

/// Roles that exist in every group and are immutable
pub const RESERVED_ROLE_NAMES: [&str; 3] = [OWNER_ROLE, ADMIN_ROLE, DEFAULT_ROLE];

/// Returns true if `name` collides with a reserved role name
///
/// The comparison ignores case and surrounding whitespace so that a custom
/// role cannot shadow a reserved one as "owner" or " Admin ".
pub fn is_reserved_name(name: &str) -> bool {
    let name = name.trim();
    RESERVED_ROLE_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// Capabilities a role can grant within its group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Add and remove members
    EditMembers,

    /// Create, edit and delete chores; trigger distribution and rotation
    EditChores,

    /// Rename the group
    EditGroup,

    /// Create, edit, delete, grant and revoke roles
    EditRoles,
}

impl Permission {
    /// Every permission, in bit order
    pub const ALL: [Permission; 4] = [
        Permission::EditMembers,
        Permission::EditChores,
        Permission::EditGroup,
        Permission::EditRoles,
    ];

    /// Bit position of this permission in the role bitmask
    pub fn bit(self) -> u32 {
        match self {
            Permission::EditMembers => 0,
            Permission::EditChores => 1,
            Permission::EditGroup => 2,
            Permission::EditRoles => 3,
        }
    }

    /// Looks up the permission stored at a bit position
    pub fn from_bit(bit: u32) -> Option<Self> {
        match bit {
            0 => Some(Permission::EditMembers),
            1 => Some(Permission::EditChores),
            2 => Some(Permission::EditGroup),
            3 => Some(Permission::EditRoles),
            _ => None,
        }
    }

    /// Converts permission to string for display and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::EditMembers => "edit_members",
            Permission::EditChores => "edit_chores",
            Permission::EditGroup => "edit_group",
            Permission::EditRoles => "edit_roles",
        }
    }

    fn mask(self) -> i32 {
        1 << self.bit()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bitmask of [`Permission`]s as stored in the `roles.permissions` column
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Permissions(i32);

impl Permissions {
    /// No capabilities
    pub const NONE: Permissions = Permissions(0);

    /// Every known capability
    pub fn all() -> Self {
        Permission::ALL.into_iter().collect()
    }

    /// Wraps a raw bitmask; bits above `EditRoles` are dropped
    pub fn from_bits(bits: i32) -> Self {
        Permissions(bits & Self::all().0)
    }

    /// Raw bitmask value
    pub fn bits(self) -> i32 {
        self.0
    }

    /// Tests one capability
    pub fn can(self, permission: Permission) -> bool {
        self.0 & permission.mask() != 0
    }

    /// Sets or clears one capability
    pub fn set(&mut self, permission: Permission, value: bool) {
        if value {
            self.0 |= permission.mask();
        } else {
            self.0 &= !permission.mask();
        }
    }

    /// Sets every capability (`true`) or clears them all (`false`)
    pub fn set_all(&mut self, value: bool) {
        *self = if value { Self::all() } else { Self::NONE };
    }

    /// True if any of `EditMembers`, `EditChores` or `EditGroup` is set
    ///
    /// This is a coarse "has some editing capability" predicate, useful for
    /// deciding whether to show management controls at all. It does not
    /// authorize any specific action; gate actions with [`Permissions::can`].
    pub fn can_edit(self) -> bool {
        self.can(Permission::EditMembers)
            || self.can(Permission::EditChores)
            || self.can(Permission::EditGroup)
    }

    /// Iterates the capabilities that are set, in bit order
    pub fn iter(self) -> impl Iterator<Item = Permission> {
        Permission::ALL.into_iter().filter(move |p| self.can(*p))
    }
}

impl BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Permissions) -> Permissions {
        Permissions(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Permissions) {
        self.0 |= rhs.0;
    }
}

impl From<Permission> for Permissions {
    fn from(permission: Permission) -> Self {
        Permissions(permission.mask())
    }
}

impl FromIterator<Permission> for Permissions {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Permissions::NONE, |acc, p| acc | Permissions::from(p))
    }
}

/// Role within a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    /// Unique role ID
    pub id: RoleId,

    /// Group the role belongs to
    pub group_id: GroupId,

    /// Role name, unique within the group
    pub name: String,

    /// Capabilities granted to holders
    pub permissions: Permissions,

    /// Whether holders receive chores
    pub gets_chores: bool,
}

impl Role {
    /// Tests one capability
    pub fn can(&self, permission: Permission) -> bool {
        self.permissions.can(permission)
    }

    /// Sets or clears one capability
    pub fn set(&mut self, permission: Permission, value: bool) {
        self.permissions.set(permission, value);
    }

    /// Sets or clears every capability
    pub fn set_all(&mut self, value: bool) {
        self.permissions.set_all(value);
    }

    /// See [`Permissions::can_edit`]
    pub fn can_edit(&self) -> bool {
        self.permissions.can_edit()
    }

    /// True for `Owner`, `Admin` and `Default`
    pub fn is_reserved(&self) -> bool {
        RESERVED_ROLE_NAMES.contains(&self.name.as_str())
    }

    /// True for the group's `Owner` role
    pub fn is_owner(&self) -> bool {
        self.name == OWNER_ROLE
    }
}

/// Input for creating a new role
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewRole {
    /// Role name (1-32 characters)
    #[validate(length(min = 1, max = 32, message = "Role name must be 1-32 characters"))]
    pub name: String,

    /// Capabilities to grant
    #[serde(default)]
    pub permissions: Permissions,

    /// Whether holders receive chores
    #[serde(default)]
    pub gets_chores: bool,
}

impl NewRole {
    /// The three roles every group starts with, in creation order
    pub fn reserved() -> [NewRole; 3] {
        [
            NewRole {
                name: OWNER_ROLE.to_string(),
                permissions: Permissions::all(),
                gets_chores: false,
            },
            NewRole {
                name: ADMIN_ROLE.to_string(),
                permissions: Permissions::all(),
                gets_chores: false,
            },
            NewRole {
                name: DEFAULT_ROLE.to_string(),
                permissions: Permissions::NONE,
                gets_chores: true,
            },
        ]
    }
}

/// Replacement values for an existing role
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoleUpdate {
    /// New role name (1-32 characters)
    #[validate(length(min = 1, max = 32, message = "Role name must be 1-32 characters"))]
    pub name: String,

    /// New capabilities
    pub permissions: Permissions,

    /// New chore eligibility
    pub gets_chores: bool,
}
