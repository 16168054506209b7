pub mod operations;
pub mod schema;

#[cfg(test)]
mod tests;

pub use operations::{Database, DbError};
pub use schema::{initialize_schema, run_migrations};
