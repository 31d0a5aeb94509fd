// handlers/public/auth/mod.rs - Token acquisition endpoints (no authentication)

pub mod signin; // POST /api/auth/signin - verify credentials and issue a token
pub mod signup; // POST /api/auth/signup - create a principal

pub use signin::signin_post;
pub use signup::signup_post;
