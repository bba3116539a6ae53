pub mod common;
pub mod discovery;
pub mod executor;
pub mod password_session;
pub mod ssh_session;
