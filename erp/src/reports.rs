pub mod layout;
pub mod money;
pub mod summary;
pub mod templates;
