//! # groupkeeper-storage
//!
//! Storage abstraction layer for groupkeeper.
//!
//! This crate defines the traits and types that all group storage backends
//! implement, and the [`GroupMembershipReconciler`] that applies membership
//! changes atomically on top of them. Backends live in separate crates.
//!
//! ## Example
//!
//! ```ignore
//! use groupkeeper_storage::{
//!     GroupId, GroupMembershipReconciler, MembershipKey, NewMember, StorageError, UserId,
//! };
//!
//! async fn promote(reconciler: &GroupMembershipReconciler) -> Result<(), StorageError> {
//!     reconciler
//!         .reconcile(
//!             GroupId(1),
//!             &[NewMember::owner(UserId(11))],
//!             &[MembershipKey::new(GroupId(1), UserId(10))],
//!             "sys",
//!         )
//!         .await
//! }
//! ```
//!
//! ## Storage Backends
//!
//! To implement a backend, implement [`GroupStorage`] and hand out a
//! [`GroupTransaction`] from `begin_transaction`.

mod delta;
mod error;
mod reconcile;
mod traits;
mod types;

pub use delta::MembershipDelta;
pub use error::{ErrorCategory, StorageError};
pub use reconcile::{GroupMembershipReconciler, reconcile_within};
pub use traits::{GroupStorage, GroupTransaction};
pub use types::{
    Group, GroupChanges, GroupId, GroupMembership, GroupUserAssociation, MembershipKey,
    MembershipType, NewGroup, NewMember, User, UserId,
};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shareable storage trait object.
pub type DynGroupStorage = std::sync::Arc<dyn GroupStorage>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use groupkeeper_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::delta::MembershipDelta;
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::reconcile::{GroupMembershipReconciler, reconcile_within};
    pub use crate::traits::{GroupStorage, GroupTransaction};
    pub use crate::types::{
        Group, GroupChanges, GroupId, GroupMembership, GroupUserAssociation, MembershipKey,
        MembershipType, NewGroup, NewMember, User, UserId,
    };
    pub use crate::{DynGroupStorage, StorageResult};
}
