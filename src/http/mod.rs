pub mod error;
pub(crate) mod render;
pub mod server;
