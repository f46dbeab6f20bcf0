use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;

// --- Storage Records (Mapped to Database) ---

/// Restaurant
///
/// A row of the `restaurants` table. The restaurant owns its dishes: deleting
/// it removes every dish that references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, Default)]
pub struct Restaurant {
    pub id: i64,
    // Globally unique.
    pub name: String,
    pub cuisine: String,
    pub address: String,
}

/// Dish
///
/// A row of the `dishes` table. `restaurant_id` is a lookup reference to the
/// owning restaurant, not an ownership edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, Default)]
pub struct Dish {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: i32,
    pub image_url: String,
    pub restaurant_id: i64,
}

/// NewRestaurant
///
/// Validated, normalised input for inserting or replacing a restaurant row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRestaurant {
    pub name: String,
    pub cuisine: String,
    pub address: String,
}

/// NewDish
///
/// Validated, normalised input for inserting or replacing a dish row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDish {
    pub name: String,
    pub description: String,
    pub price: i32,
    pub image_url: String,
}

// --- Request Payloads (Input Schemas) ---

/// RestaurantRequest
///
/// Body of `POST /restaurants` and `PUT /restaurants/{id}`. `PUT` replaces every field.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct RestaurantRequest {
    #[schema(example = "Luigi's")]
    pub name: String,
    #[serde(default)]
    #[schema(example = "Italian")]
    pub cuisine: String,
    #[serde(default)]
    #[schema(example = "1 Main St")]
    pub address: String,
}

impl RestaurantRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require("name", &self.name)?;
        require("cuisine", &self.cuisine)?;
        require("address", &self.address)
    }
}

/// DishRequest
///
/// Body of `POST /restaurants/{id}/dishes` and `PUT /restaurants/{id}/dishes/{dish_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DishRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Price in minor currency units. Must not be negative.
    pub price: i32,
    #[serde(default)]
    pub image_url: String,
}

impl DishRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require("name", &self.name)?;
        require("description", &self.description)?;
        require("imageUrl", &self.image_url)?;
        if self.price < 0 {
            return Err(AppError::Validation("price must not be negative".to_string()));
        }
        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

// --- Response Schemas (Output) ---

/// DishDto
///
/// Transport representation of a dish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, TS, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DishDto {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: i32,
    pub image_url: String,
    pub restaurant_id: i64,
}

/// RestaurantDto
///
/// Transport representation of a restaurant with its dishes nested, ordered by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct RestaurantDto {
    pub id: i64,
    pub name: String,
    pub cuisine: String,
    pub address: String,
    pub dishes: Vec<DishDto>,
}

/// RestaurantPage
///
/// One page of `GET /restaurants`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RestaurantPage {
    pub content: Vec<RestaurantDto>,
    /// Zero-based page index.
    pub page: u32,
    pub size: u32,
    pub total_elements: i64,
    pub total_pages: i64,
}

// --- Query Parameters ---

/// PageParams
///
/// Pagination query parameters. Pages are zero-based; `size` defaults to 20 and
/// is capped at 100.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Zero-based page index (default 0).
    pub page: Option<u32>,
    /// Page size (default 20, max 100).
    pub size: Option<u32>,
}

impl PageParams {
    pub const DEFAULT_SIZE: u32 = 20;
    pub const MAX_SIZE: u32 = 100;

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(0)
    }

    pub fn size(&self) -> u32 {
        self.size
            .unwrap_or(Self::DEFAULT_SIZE)
            .clamp(1, Self::MAX_SIZE)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page()) * i64::from(self.size())
    }
}

/// CuisineFilter
///
/// Query parameters for `GET /restaurants/search`. Matching is case-insensitive.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CuisineFilter {
    pub cuisine: String,
}
