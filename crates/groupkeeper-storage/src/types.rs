//! Storage types for the group storage abstraction layer.
//!
//! Typed records for groups, users and memberships, plus the parameter
//! structs the storage traits accept.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::StorageError;

/// System-assigned group identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i64);

/// User identifier, referencing the users table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Role classifier attached to a (group, user) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipType {
    Member,
    Owner,
}

impl MembershipType {
    /// Returns the stored text form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Owner => "owner",
        }
    }
}

impl fmt::Display for MembershipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Self::Member),
            "owner" => Ok(Self::Owner),
            other => Err(StorageError::invalid_data(format!(
                "unknown membership type '{other}'"
            ))),
        }
    }
}

/// A group as stored in the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    /// Unique across all groups.
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Actor that created the group.
    pub created_by: String,
}

/// Parameters for creating a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
}

impl NewGroup {
    /// Creates group parameters without a description.
    #[must_use]
    pub fn new(name: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            created_by: created_by.into(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The mutable fields of a group. Both fields replace the stored values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupChanges {
    pub name: String,
    pub description: Option<String>,
}

/// A row of the users table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A row of the group membership table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupUserAssociation {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub membership_type: MembershipType,
    pub created_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl GroupUserAssociation {
    /// Returns the (group, user) key of this association.
    #[must_use]
    pub fn key(&self) -> MembershipKey {
        MembershipKey::new(self.group_id, self.user_id)
    }
}

/// A user to add to a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewMember {
    pub user_id: UserId,
    pub membership_type: MembershipType,
}

impl NewMember {
    #[must_use]
    pub fn new(user_id: UserId, membership_type: MembershipType) -> Self {
        Self {
            user_id,
            membership_type,
        }
    }

    #[must_use]
    pub fn member(user_id: UserId) -> Self {
        Self::new(user_id, MembershipType::Member)
    }

    #[must_use]
    pub fn owner(user_id: UserId) -> Self {
        Self::new(user_id, MembershipType::Owner)
    }
}

/// Identifies one membership row by its (group, user) primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MembershipKey {
    pub group_id: GroupId,
    pub user_id: UserId,
}

impl MembershipKey {
    #[must_use]
    pub fn new(group_id: GroupId, user_id: UserId) -> Self {
        Self { group_id, user_id }
    }
}

/// A (group, user, membership type) triple joined with the user's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub membership_type: MembershipType,
    pub username: String,
}

impl GroupMembership {
    #[must_use]
    pub fn key(&self) -> MembershipKey {
        MembershipKey::new(self.group_id, self.user_id)
    }
}
