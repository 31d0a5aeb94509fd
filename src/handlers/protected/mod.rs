// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Security Level: any valid token
// Middleware: jwt_auth_middleware (AuthUser in request extensions)

pub mod auth;
