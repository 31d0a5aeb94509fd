pub mod admin_grant;
pub mod principal;

pub use admin_grant::AdminGrant;
pub use principal::{normalize_email, Principal};
