use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash (PHC string)
    #[sea_orm(column_name = "password")]
    pub password_hash: String,

    /// False until the user has replaced an administratively set password.
    pub password_changed: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::reset_tokens::Entity")]
    ResetToken,
}

impl Related<super::reset_tokens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ResetToken.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
