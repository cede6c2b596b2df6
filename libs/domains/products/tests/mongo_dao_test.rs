//! DAO tests against a real MongoDB. Run with `cargo test -- --ignored`.

use chrono::Utc;
use domain_products::{
    models::NewProduct,
    query::{PriceRange, SortDirection, SortField, SortSpec},
    CategoryLookup, MongoCategoryLookup, MongoProductDao, PageOptions, Product, ProductDao,
    ProductError, ProductPatch, ProductQuery,
};
use mongodb::bson::{doc, oid::ObjectId, Document};
use test_utils::{
    assertions::{assert_some, assert_uuid_eq},
    TestMongo,
};

fn product(title: &str, price: f64, category: &str) -> Product {
    Product::new(
        NewProduct {
            title: title.to_string(),
            description: format!("{title} for the living room"),
            price,
            stock: 3,
            code: format!("code-{title}"),
            category_id: category.to_string(),
            supplier_id: "acme".to_string(),
        },
        None,
    )
}

async fn dao(mongo: &TestMongo) -> MongoProductDao {
    let dao = MongoProductDao::new(&mongo.database());
    dao.init_indexes().await.unwrap();
    dao
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_unique_title_index() {
    let mongo = TestMongo::new().await;
    let dao = dao(&mongo).await;

    dao.insert_one(product("Desk", 120.0, "office")).await.unwrap();
    let err = dao
        .insert_one(product("Desk", 99.0, "office"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProductError::DuplicateTitle(title) if title == "Desk"));
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_insert_many_rolls_back_on_duplicate() {
    let mongo = TestMongo::new().await;
    let dao = dao(&mongo).await;
    dao.insert_one(product("Lamp", 20.0, "office")).await.unwrap();

    let err = dao
        .insert_many(vec![
            product("Chair", 40.0, "office"),
            product("Shelf", 60.0, "office"),
            product("Lamp", 25.0, "office"),
            product("Stool", 15.0, "office"),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, ProductError::DuplicateTitle(title) if title == "Lamp"));

    let chair = dao
        .find_one(ProductQuery::new().with_title("Chair"))
        .await
        .unwrap();
    assert!(chair.is_none());

    let count = dao.collection().count_documents(doc! {}).await.unwrap();
    assert_eq!(count, 1);
    let remaining = dao.find(ProductQuery::new(), None).await.unwrap();
    assert_eq!(remaining[0].price, 20.0);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_paginate_with_filters_and_sort() {
    let mongo = TestMongo::new().await;
    let dao = dao(&mongo).await;

    let products = (1..=6)
        .map(|i| product(&format!("Shelf {i}"), 10.0 * i as f64, "office"))
        .chain([product("Rug", 35.0, "home")])
        .collect();
    dao.insert_many(products).await.unwrap();

    let query = ProductQuery::new()
        .active()
        .with_category("office")
        .with_price_range(PriceRange {
            min: Some(20.0),
            max: Some(50.0),
        });
    let options = PageOptions {
        limit: 2,
        page: 1,
        sort: Some(SortSpec::new(SortField::Price, SortDirection::Desc)),
    };

    let page = dao.paginate(query, options).await.unwrap();

    assert_eq!(page.total_docs, 4);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.next_page, Some(2));
    let prices: Vec<f64> = page.payload.iter().map(|p| p.price).collect();
    assert_eq!(prices, vec![50.0, 40.0]);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_text_search_escapes_regex() {
    let mongo = TestMongo::new().await;
    let dao = dao(&mongo).await;

    dao.insert_many(vec![
        product("Cable (USB-C)", 9.0, "tech"),
        product("Cable USB-A", 7.0, "tech"),
    ])
    .await
    .unwrap();

    let found = dao
        .find(ProductQuery::new().active().with_text("(usb-c)"), Some(15))
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Cable (USB-C)");
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_update_and_delete() {
    let mongo = TestMongo::new().await;
    let dao = dao(&mongo).await;
    let created = dao.insert_one(product("Sofa", 400.0, "home")).await.unwrap();

    let patch = ProductPatch {
        status: Some(false),
        deleted_at: Some(Utc::now()),
        updated_at: Some(Utc::now()),
        ..Default::default()
    };
    let updated = assert_some(
        dao.find_by_id_and_update(created.id, patch).await.unwrap(),
        "soft delete patch",
    );
    assert!(!updated.status);
    assert!(updated.deleted_at.is_some());
    assert_eq!(updated.price, 400.0);

    let active = dao
        .find(ProductQuery::new().active(), None)
        .await
        .unwrap();
    assert!(active.is_empty());

    let deleted = assert_some(
        dao.find_by_id_and_delete(created.id).await.unwrap(),
        "hard delete",
    );
    assert_uuid_eq(deleted.id, created.id, "deleted product");
    assert!(dao.find_by_id(created.id).await.unwrap().is_none());
    assert!(dao.find_by_id_and_delete(created.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_category_lookup() {
    let mongo = TestMongo::new().await;
    let db = mongo.database();
    let oid = ObjectId::new();

    db.collection::<Document>("categories")
        .insert_many(vec![
            doc! { "_id": oid, "name": "Office" },
            doc! { "_id": "home", "name": "Home" },
        ])
        .await
        .unwrap();

    let lookup = MongoCategoryLookup::new(&db);
    assert!(lookup.exists(&oid.to_hex()).await.unwrap());
    assert!(lookup.exists("home").await.unwrap());
    assert!(!lookup.exists("garden").await.unwrap());
}
