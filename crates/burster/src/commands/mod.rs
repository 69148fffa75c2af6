pub mod generate;
pub mod provision;
pub mod search;
pub mod validate;
