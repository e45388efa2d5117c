pub mod traits;

pub use async_trait;
