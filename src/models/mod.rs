pub mod documents;
pub mod finance;
pub mod inventory;
pub mod operations;
