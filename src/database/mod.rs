pub mod entity;
pub mod models;
pub mod pool;
pub mod query;
pub mod repository;
pub mod service;

pub use entity::Entity;
pub use pool::DatabaseError;
pub use query::{OrderBy, SelectQuery};
pub use repository::Repository;
