use sea_orm_migration::prelude::*;

mod m20250301_create_users_and_pages;
mod m20250302_create_processed_searches;
mod m20250303_add_search_indexes;
mod m20250304_password_reset;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_create_users_and_pages::Migration),
            Box::new(m20250302_create_processed_searches::Migration),
            Box::new(m20250303_add_search_indexes::Migration),
            Box::new(m20250304_password_reset::Migration),
        ]
    }
}
