// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None
// Middleware: None

pub mod auth;

pub use auth::*;
