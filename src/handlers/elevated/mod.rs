// handlers/elevated/mod.rs - Elevated handlers (admin privilege required)
//
// Security Level: admin role claim or admin grant
// Middleware: jwt_auth_middleware, then require_admin_middleware

pub mod admin;

pub use admin::{admin_check, list_grants};
