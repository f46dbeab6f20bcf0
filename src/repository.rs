use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{Dish, NewDish, NewRestaurant, Restaurant};

/// RepositoryError
///
/// Storage failures as seen by the service layer. Unique-constraint violations
/// are singled out so a lost "check then insert" race still reports a duplicate.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0}")]
    UniqueViolation(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                RepositoryError::UniqueViolation("Resource already exists".to_string())
            }
            _ => RepositoryError::Database(err),
        }
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The storage collaborator behind the entity services. Handlers never talk to
/// it directly; the services add the existence and uniqueness rules on top.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across
/// Axum's request tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Restaurants ---
    async fn find_restaurant(&self, id: i64) -> RepoResult<Option<Restaurant>>;
    // Ordered by id.
    async fn list_restaurants(&self, offset: i64, limit: i64) -> RepoResult<Vec<Restaurant>>;
    async fn count_restaurants(&self) -> RepoResult<i64>;
    // Case-insensitive exact match on cuisine.
    async fn find_restaurants_by_cuisine(&self, cuisine: &str) -> RepoResult<Vec<Restaurant>>;
    async fn restaurant_exists_by_name(&self, name: &str) -> RepoResult<bool>;
    async fn insert_restaurant(&self, new: &NewRestaurant) -> RepoResult<Restaurant>;
    async fn update_restaurant(&self, id: i64, new: &NewRestaurant)
    -> RepoResult<Option<Restaurant>>;
    /// Deletes the restaurant and all of its dishes atomically.
    /// Returns false when no restaurant had that id.
    async fn delete_restaurant(&self, id: i64) -> RepoResult<bool>;

    // --- Dishes ---
    async fn find_dish(&self, id: i64) -> RepoResult<Option<Dish>>;
    async fn dishes_for_restaurants(&self, restaurant_ids: &[i64]) -> RepoResult<Vec<Dish>>;
    /// Returns `None`, and inserts nothing, when the restaurant does not exist.
    async fn insert_dish(&self, restaurant_id: i64, new: &NewDish) -> RepoResult<Option<Dish>>;
    async fn update_dish(&self, id: i64, new: &NewDish) -> RepoResult<Option<Dish>>;
    async fn delete_dish(&self, id: i64) -> RepoResult<bool>;

    async fn dishes_for_restaurant(&self, restaurant_id: i64) -> RepoResult<Vec<Dish>> {
        self.dishes_for_restaurants(&[restaurant_id]).await
    }
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Postgres ---

const RESTAURANT_COLUMNS: &str = "id, name, cuisine, address";
const DISH_COLUMNS: &str = "id, name, description, price, image_url, restaurant_id";

/// PostgresRepository
///
/// The production implementation, backed by PostgreSQL. Schema lives in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_restaurant(&self, id: i64) -> RepoResult<Option<Restaurant>> {
        let sql = format!("SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE id = $1");
        Ok(sqlx::query_as::<_, Restaurant>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_restaurants(&self, offset: i64, limit: i64) -> RepoResult<Vec<Restaurant>> {
        let sql = format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurants ORDER BY id LIMIT $1 OFFSET $2"
        );
        Ok(sqlx::query_as::<_, Restaurant>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_restaurants(&self) -> RepoResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM restaurants")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_restaurants_by_cuisine(&self, cuisine: &str) -> RepoResult<Vec<Restaurant>> {
        let sql = format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE LOWER(cuisine) = LOWER($1) ORDER BY id"
        );
        Ok(sqlx::query_as::<_, Restaurant>(&sql)
            .bind(cuisine)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn restaurant_exists_by_name(&self, name: &str) -> RepoResult<bool> {
        Ok(
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM restaurants WHERE name = $1)")
                .bind(name)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn insert_restaurant(&self, new: &NewRestaurant) -> RepoResult<Restaurant> {
        let sql = format!(
            "INSERT INTO restaurants (name, cuisine, address) VALUES ($1, $2, $3) RETURNING {RESTAURANT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Restaurant>(&sql)
            .bind(&new.name)
            .bind(&new.cuisine)
            .bind(&new.address)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_restaurant(
        &self,
        id: i64,
        new: &NewRestaurant,
    ) -> RepoResult<Option<Restaurant>> {
        let sql = format!(
            "UPDATE restaurants SET name = $2, cuisine = $3, address = $4 WHERE id = $1 RETURNING {RESTAURANT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Restaurant>(&sql)
            .bind(id)
            .bind(&new.name)
            .bind(&new.cuisine)
            .bind(&new.address)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Children first, then the parent, in one transaction. The schema has no
    /// `ON DELETE CASCADE`; the two-step delete is the only cascade path.
    async fn delete_restaurant(&self, id: i64) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM dishes WHERE restaurant_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM restaurants WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn find_dish(&self, id: i64) -> RepoResult<Option<Dish>> {
        let sql = format!("SELECT {DISH_COLUMNS} FROM dishes WHERE id = $1");
        Ok(sqlx::query_as::<_, Dish>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn dishes_for_restaurants(&self, restaurant_ids: &[i64]) -> RepoResult<Vec<Dish>> {
        if restaurant_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {DISH_COLUMNS} FROM dishes WHERE restaurant_id = ANY($1) ORDER BY id"
        );
        Ok(sqlx::query_as::<_, Dish>(&sql)
            .bind(restaurant_ids)
            .fetch_all(&self.pool)
            .await?)
    }

    // Parent check and insert run as one statement.
    async fn insert_dish(&self, restaurant_id: i64, new: &NewDish) -> RepoResult<Option<Dish>> {
        let sql = format!(
            "INSERT INTO dishes (name, description, price, image_url, restaurant_id) \
             SELECT $1, $2, $3, $4, $5 WHERE EXISTS (SELECT 1 FROM restaurants WHERE id = $5) \
             RETURNING {DISH_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Dish>(&sql)
            .bind(&new.name)
            .bind(&new.description)
            .bind(new.price)
            .bind(&new.image_url)
            .bind(restaurant_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_dish(&self, id: i64, new: &NewDish) -> RepoResult<Option<Dish>> {
        let sql = format!(
            "UPDATE dishes SET name = $2, description = $3, price = $4, image_url = $5 WHERE id = $1 RETURNING {DISH_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Dish>(&sql)
            .bind(id)
            .bind(&new.name)
            .bind(&new.description)
            .bind(new.price)
            .bind(&new.image_url)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_dish(&self, id: i64) -> RepoResult<bool> {
        let deleted = sqlx::query("DELETE FROM dishes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }
}

// --- In-memory ---

#[derive(Default)]
struct Tables {
    restaurants: BTreeMap<i64, Restaurant>,
    dishes: BTreeMap<i64, Dish>,
    next_restaurant_id: i64,
    next_dish_id: i64,
}

/// MemoryRepository
///
/// An in-process implementation with the same observable behaviour as the
/// Postgres one (id ordering, unique names, case-insensitive cuisine search,
/// atomic cascade delete). Used for local runs without `DATABASE_URL` and by
/// the test suites.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_restaurant(&self, id: i64) -> RepoResult<Option<Restaurant>> {
        Ok(self.tables.read().await.restaurants.get(&id).cloned())
    }

    async fn list_restaurants(&self, offset: i64, limit: i64) -> RepoResult<Vec<Restaurant>> {
        let tables = self.tables.read().await;
        Ok(tables
            .restaurants
            .values()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn count_restaurants(&self) -> RepoResult<i64> {
        Ok(self.tables.read().await.restaurants.len() as i64)
    }

    async fn find_restaurants_by_cuisine(&self, cuisine: &str) -> RepoResult<Vec<Restaurant>> {
        let cuisine = cuisine.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .restaurants
            .values()
            .filter(|r| r.cuisine.to_lowercase() == cuisine)
            .cloned()
            .collect())
    }

    async fn restaurant_exists_by_name(&self, name: &str) -> RepoResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.restaurants.values().any(|r| r.name == name))
    }

    async fn insert_restaurant(&self, new: &NewRestaurant) -> RepoResult<Restaurant> {
        let mut tables = self.tables.write().await;
        if tables.restaurants.values().any(|r| r.name == new.name) {
            return Err(name_taken());
        }

        tables.next_restaurant_id += 1;
        let restaurant = Restaurant {
            id: tables.next_restaurant_id,
            name: new.name.clone(),
            cuisine: new.cuisine.clone(),
            address: new.address.clone(),
        };
        tables.restaurants.insert(restaurant.id, restaurant.clone());
        Ok(restaurant)
    }

    async fn update_restaurant(
        &self,
        id: i64,
        new: &NewRestaurant,
    ) -> RepoResult<Option<Restaurant>> {
        let mut tables = self.tables.write().await;
        if tables
            .restaurants
            .values()
            .any(|r| r.id != id && r.name == new.name)
        {
            return Err(name_taken());
        }

        Ok(tables.restaurants.get_mut(&id).map(|restaurant| {
            restaurant.name = new.name.clone();
            restaurant.cuisine = new.cuisine.clone();
            restaurant.address = new.address.clone();
            restaurant.clone()
        }))
    }

    async fn delete_restaurant(&self, id: i64) -> RepoResult<bool> {
        // One write guard covers both steps, so no reader sees orphaned dishes.
        let mut tables = self.tables.write().await;
        if tables.restaurants.remove(&id).is_none() {
            return Ok(false);
        }
        tables.dishes.retain(|_, dish| dish.restaurant_id != id);
        Ok(true)
    }

    async fn find_dish(&self, id: i64) -> RepoResult<Option<Dish>> {
        Ok(self.tables.read().await.dishes.get(&id).cloned())
    }

    async fn dishes_for_restaurants(&self, restaurant_ids: &[i64]) -> RepoResult<Vec<Dish>> {
        let tables = self.tables.read().await;
        Ok(tables
            .dishes
            .values()
            .filter(|dish| restaurant_ids.contains(&dish.restaurant_id))
            .cloned()
            .collect())
    }

    async fn insert_dish(&self, restaurant_id: i64, new: &NewDish) -> RepoResult<Option<Dish>> {
        let mut tables = self.tables.write().await;
        if !tables.restaurants.contains_key(&restaurant_id) {
            return Ok(None);
        }
        tables.next_dish_id += 1;
        let dish = Dish {
            id: tables.next_dish_id,
            name: new.name.clone(),
            description: new.description.clone(),
            price: new.price,
            image_url: new.image_url.clone(),
            restaurant_id,
        };
        tables.dishes.insert(dish.id, dish.clone());
        Ok(Some(dish))
    }

    async fn update_dish(&self, id: i64, new: &NewDish) -> RepoResult<Option<Dish>> {
        let mut tables = self.tables.write().await;
        Ok(tables.dishes.get_mut(&id).map(|dish| {
            dish.name = new.name.clone();
            dish.description = new.description.clone();
            dish.price = new.price;
            dish.image_url = new.image_url.clone();
            dish.clone()
        }))
    }

    async fn delete_dish(&self, id: i64) -> RepoResult<bool> {
        Ok(self.tables.write().await.dishes.remove(&id).is_some())
    }
}

fn name_taken() -> RepositoryError {
    RepositoryError::UniqueViolation("Restaurant name already exists".to_string())
}
