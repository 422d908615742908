pub mod track;
pub mod validate;
