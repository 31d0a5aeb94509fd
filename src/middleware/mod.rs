pub mod auth;
pub mod cookie;
pub mod gate;
pub mod response;

pub use auth::{jwt_auth_middleware, require_admin_middleware, AuthUser};
pub use gate::{admin_gate_middleware, evaluate_gate, DenyReason, GateDecision, TokenCarrier};
pub use response::{ApiResponse, ApiResult};
