pub mod command;
pub mod param;
pub mod row;
