//! SQL statements for the PostgreSQL storage backend.
//!
//! Every function takes a plain `&mut PgConnection` so the same statement
//! runs against a pooled connection or inside an open transaction.

pub mod groups;
pub mod memberships;
pub mod users;
