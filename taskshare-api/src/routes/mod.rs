/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration and login
/// - `users`: Profile, email search and membership reconciliation
/// - `tasks`: Task CRUD scoped by ownership and collaboration
/// - `groups`: Group creation, lookup and membership

pub mod auth;
pub mod groups;
pub mod health;
pub mod tasks;
pub mod users;
