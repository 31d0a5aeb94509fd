// handlers/mod.rs - handlers grouped by security tier
//
// Public (no auth) → Protected (JWT auth) → Elevated (admin privilege),
// plus the HTML pages that sit behind the page gate.

pub mod elevated;
pub mod pages;
pub mod protected;
pub mod public;
