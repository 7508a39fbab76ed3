pub mod prelude;

pub mod pages;
pub mod processed_searches;
pub mod reset_tokens;
pub mod users;
