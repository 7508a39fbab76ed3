use sea_orm::entity::prelude::*;

/// Ledger of search terms the scraper has already handled.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "processed_searches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub search_term: String,

    pub processed_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
