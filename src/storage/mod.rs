pub mod db;
pub mod error;
pub mod filter;
pub mod operations;
pub(crate) mod schema;
