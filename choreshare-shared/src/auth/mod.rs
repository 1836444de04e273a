/// Authorization for group-mutating actions
///
/// Authentication (sessions, passwords) belongs to the web layer that embeds
/// this crate. This module only answers "may this member do that".

pub mod authorization;

pub use authorization::{require_membership, require_permission, AuthzError};
