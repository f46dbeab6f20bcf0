//! Runs against a real Postgres. Ignored by default:
//! `DATABASE_URL=postgres://... cargo test -- --ignored`

use restaurant_service::{
    models::{NewDish, NewRestaurant},
    repository::{PostgresRepository, Repository, RepositoryError},
};
use serial_test::serial;
use sqlx::PgPool;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        let ctx = DbTestContext { pool };
        ctx.repository()
            .migrate()
            .await
            .expect("Failed to run database migrations.");

        sqlx::query("TRUNCATE dishes, restaurants RESTART IDENTITY")
            .execute(&ctx.pool)
            .await
            .expect("Failed to reset tables.");
        ctx
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

fn new_restaurant(name: &str, cuisine: &str) -> NewRestaurant {
    NewRestaurant {
        name: name.to_string(),
        cuisine: cuisine.to_string(),
        address: "1 Main St".to_string(),
    }
}

fn new_dish(name: &str) -> NewDish {
    NewDish {
        name: name.to_string(),
        description: "house special".to_string(),
        price: 1000,
        image_url: "https://img.example/dish.png".to_string(),
    }
}

// --- Tests ---
// Every test truncates the tables, so they share one lock.

#[tokio::test]
#[ignore]
#[serial]
async fn unique_name_maps_to_unique_violation() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    repo.insert_restaurant(&new_restaurant("Luigi's", "Italian"))
        .await
        .unwrap();
    let err = repo
        .insert_restaurant(&new_restaurant("Luigi's", "Pizza"))
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::UniqueViolation(_)));
    assert!(repo.restaurant_exists_by_name("Luigi's").await.unwrap());
}

#[tokio::test]
#[ignore]
#[serial]
async fn delete_restaurant_removes_dishes_in_one_transaction() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let restaurant = repo
        .insert_restaurant(&new_restaurant("Sakura", "Japanese"))
        .await
        .unwrap();
    let dish = repo
        .insert_dish(restaurant.id, &new_dish("Ramen"))
        .await
        .unwrap()
        .expect("restaurant exists");

    assert!(repo.delete_restaurant(restaurant.id).await.unwrap());
    assert!(repo.find_restaurant(restaurant.id).await.unwrap().is_none());
    assert!(repo.find_dish(dish.id).await.unwrap().is_none());
    assert!(!repo.delete_restaurant(restaurant.id).await.unwrap());
}

#[tokio::test]
#[ignore]
#[serial]
async fn listing_paginates_and_search_ignores_case() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    for (name, cuisine) in [("A", "Italian"), ("B", "Thai"), ("C", "italian")] {
        repo.insert_restaurant(&new_restaurant(name, cuisine))
            .await
            .unwrap();
    }

    assert_eq!(repo.count_restaurants().await.unwrap(), 3);
    let page = repo.list_restaurants(2, 2).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].name, "C");

    let found = repo.find_restaurants_by_cuisine("ITALIAN").await.unwrap();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
#[ignore]
#[serial]
async fn dish_insert_for_missing_restaurant_returns_none() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let inserted = repo.insert_dish(999, &new_dish("Orphan")).await.unwrap();

    assert!(inserted.is_none());
    assert!(repo.dishes_for_restaurant(999).await.unwrap().is_empty());
}
