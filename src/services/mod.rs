pub mod account_service;

pub use account_service::{AccountError, AccountService, SigninOutcome, SigninRequest, SignupRequest};
