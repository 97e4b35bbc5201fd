use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Categories a seller may file a product under.
pub const MARINE_CATEGORIES: [&str; 8] = [
    "Fresh Fish",
    "Shellfish",
    "Crustaceans",
    "Dried Seafood",
    "Frozen Seafood",
    "Canned Seafood",
    "Marine Equipment",
    "Fishing Gear",
];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(indexed)]
    pub category: String,
    pub price: f64,
    pub quantity: i32,
    pub image_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub hygiene_notes: Option<String>,
    #[sea_orm(indexed)]
    pub seller_id: i32,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::entities::user::Entity",
        from = "Column::SellerId",
        to = "crate::entities::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Seller,
    #[sea_orm(has_many = "crate::entities::order::Entity")]
    Order,
}

impl Related<crate::entities::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
