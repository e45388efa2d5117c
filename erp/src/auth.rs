pub mod dispatch;
pub mod guard;
pub mod profile;
pub mod provider;
pub mod session;
