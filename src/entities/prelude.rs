pub use super::pages::Entity as Pages;
pub use super::processed_searches::Entity as ProcessedSearches;
pub use super::reset_tokens::Entity as ResetTokens;
pub use super::users::Entity as Users;
