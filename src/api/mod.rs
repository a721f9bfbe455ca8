pub mod pagination;

pub use pagination::{PaginatedData, PaginationParams};
