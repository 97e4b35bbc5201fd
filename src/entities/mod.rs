pub mod awareness;
pub mod order;
pub mod product;
pub mod profile;
pub mod session;
pub mod user;
pub mod user_role;

use chrono::Utc;
use sea_orm::{
    sea_query::Index, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    Schema, Set, TransactionTrait,
};
use tracing::info;

use crate::middleware::auth::hash_password;

use crate::entities::{
    awareness::ContentType, order::Entity as Order, product::Entity as Product,
    profile::Entity as Profile, session::Entity as Session, user::Entity as User,
    user_role::{Entity as UserRole, Role},
};

pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let tables = [
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(Session),
        schema.create_table_from_entity(Profile),
        schema.create_table_from_entity(UserRole),
        schema.create_table_from_entity(Product),
        schema.create_table_from_entity(Order),
        schema.create_table_from_entity(awareness::Entity),
    ];
    for mut table in tables {
        table.if_not_exists();
        db.execute(backend.build(&table)).await?;
    }

    let indexes = [
        schema.create_index_from_entity(Session),
        schema.create_index_from_entity(Product),
        schema.create_index_from_entity(Order),
    ];
    for mut index in indexes.into_iter().flatten() {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }

    //One order per buyer and key; rows without a key are never equal under SQL NULL rules.
    let idempotency = Index::create()
        .name("idx-orders-buyer-idempotency-key")
        .table(Order)
        .col(order::Column::BuyerId)
        .col(order::Column::IdempotencyKey)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&idempotency)).await?;

    Ok(())
}

const DEMO_PASSWORD: &str = "Secret15";

/// Fills an empty database with an admin, a seller, a buyer, a few listings and
/// some published awareness content. Does nothing once any user exists.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    if User::find().count(db).await? > 0 {
        return Ok(());
    }

    let password = hash_password(DEMO_PASSWORD)
        .map_err(|err| DbErr::Custom(format!("Failed to hash demo password: {err}")))?;
    let now = Utc::now();

    let txn = db.begin().await?;

    let mut seller_id = 0;
    for (email, full_name, role) in [
        ("admin@marine.local", "Admin", Role::Admin),
        ("seller@marine.local", "Harbour Fresh", Role::Seller),
        ("buyer@marine.local", "Demo Buyer", Role::Buyer),
    ] {
        let inserted = User::insert(user::ActiveModel {
            email: Set(email.to_owned()),
            password: Set(password.clone()),
            created_at: Set(now),
            ..Default::default()
        })
        .exec(&txn)
        .await?;
        let user_id = inserted.last_insert_id;

        Profile::insert(profile::ActiveModel {
            id: Set(user_id),
            email: Set(email.to_owned()),
            full_name: Set(Some(full_name.to_owned())),
            phone: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        })
        .exec(&txn)
        .await?;

        UserRole::insert(user_role::ActiveModel {
            user_id: Set(user_id),
            role: Set(role),
            created_at: Set(now),
            ..Default::default()
        })
        .exec(&txn)
        .await?;

        if role == Role::Seller {
            seller_id = user_id;
        }
    }

    let products = [
        ("Atlantic Salmon Fillet", "Fresh Fish", 250.0, 40, "Skin-on fillet, line caught."),
        ("Tiger Prawns", "Crustaceans", 480.0, 25, "Large, deveined, shell on."),
        ("Dried Anchovies", "Dried Seafood", 120.0, 0, "Sun dried, lightly salted."),
        ("Cast Net 6ft", "Fishing Gear", 899.0, 8, "Nylon monofilament cast net."),
    ];
    let product_rows = products
        .into_iter()
        .map(|(name, category, price, quantity, description)| product::ActiveModel {
            name: Set(name.to_owned()),
            category: Set(category.to_owned()),
            price: Set(price),
            quantity: Set(quantity),
            image_url: Set(None),
            description: Set(Some(description.to_owned())),
            hygiene_notes: Set(Some("FSSAI certified cold chain".to_owned())),
            seller_id: Set(seller_id),
            is_active: Set(true),
            created_at: Set(now),
            ..Default::default()
        });
    Product::insert_many(product_rows).exec(&txn).await?;

    let content = [
        (
            "Choosing fresh fish",
            "Clear eyes, red gills and firm flesh are the first things to check.",
            ContentType::Article,
        ),
        (
            "Garlic butter prawns",
            "A ten minute pan recipe for shell-on prawns.",
            ContentType::Recipe,
        ),
        (
            "Keeping the cold chain",
            "Seafood should stay below 4°C from catch to kitchen.",
            ContentType::Hygiene,
        ),
    ];
    let content_rows = content
        .into_iter()
        .map(|(title, description, content_type)| awareness::ActiveModel {
            title: Set(title.to_owned()),
            description: Set(description.to_owned()),
            content_type: Set(content_type),
            image_url: Set(None),
            is_published: Set(true),
            created_at: Set(now),
            ..Default::default()
        });
    awareness::Entity::insert_many(content_rows).exec(&txn).await?;

    txn.commit().await?;
    info!("Seeded demo accounts, products and awareness content");

    Ok(())
}
