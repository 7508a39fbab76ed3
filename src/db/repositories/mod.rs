pub mod page;
pub mod processed_search;
pub mod user;
