use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if !manager.has_column("users", "password_changed").await? {
            manager
                .alter_table(
                    Table::alter()
                        .table(Users::Table)
                        .add_column(
                            ColumnDef::new(Users::PasswordChanged)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .to_owned(),
                )
                .await?;

            // Accounts that predate the flag were never rotated by their owner
            let update = Query::update()
                .table(Users::Table)
                .value(Users::PasswordChanged, false)
                .to_owned();
            manager.exec_stmt(update).await?;
        }

        if !manager.has_table("reset_tokens").await? {
            manager
                .create_table(
                    Table::create()
                        .table(ResetTokens::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ResetTokens::UserId)
                                .integer()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ResetTokens::Token).string().not_null())
                        .col(ColumnDef::new(ResetTokens::ExpiresAt).string().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_reset_tokens_user")
                                .from(ResetTokens::Table, ResetTokens::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(ResetTokens::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(Users::Table)
                    .drop_column(Users::PasswordChanged)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    PasswordChanged,
}

#[derive(DeriveIden)]
enum ResetTokens {
    Table,
    UserId,
    Token,
    ExpiresAt,
}
