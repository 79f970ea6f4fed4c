pub mod accounts;
pub mod handlers;
pub mod session;
