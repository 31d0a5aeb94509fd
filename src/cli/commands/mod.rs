pub mod grant;
pub mod session;
pub mod token;
