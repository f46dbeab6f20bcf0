//! Conversions between storage records and transport representations.

use std::collections::HashMap;

use crate::models::{
    Dish, DishDto, DishRequest, NewDish, NewRestaurant, Restaurant, RestaurantDto,
    RestaurantRequest,
};

impl From<&RestaurantRequest> for NewRestaurant {
    fn from(request: &RestaurantRequest) -> Self {
        Self {
            name: request.name.trim().to_string(),
            cuisine: request.cuisine.trim().to_string(),
            address: request.address.trim().to_string(),
        }
    }
}

impl From<&DishRequest> for NewDish {
    fn from(request: &DishRequest) -> Self {
        Self {
            name: request.name.trim().to_string(),
            description: request.description.trim().to_string(),
            price: request.price,
            image_url: request.image_url.trim().to_string(),
        }
    }
}

impl From<Dish> for DishDto {
    fn from(dish: Dish) -> Self {
        Self {
            id: dish.id,
            name: dish.name,
            description: dish.description,
            price: dish.price,
            image_url: dish.image_url,
            restaurant_id: dish.restaurant_id,
        }
    }
}

/// Builds the restaurant representation with its dishes sorted by id.
pub fn restaurant_dto(restaurant: Restaurant, mut dishes: Vec<Dish>) -> RestaurantDto {
    dishes.sort_by_key(|dish| dish.id);
    RestaurantDto {
        id: restaurant.id,
        name: restaurant.name,
        cuisine: restaurant.cuisine,
        address: restaurant.address,
        dishes: dishes.into_iter().map(DishDto::from).collect(),
    }
}

/// Attaches a batch of dishes to their restaurants, preserving restaurant order.
/// Dishes whose restaurant is not in `restaurants` are ignored.
pub fn restaurant_dtos(restaurants: Vec<Restaurant>, dishes: Vec<Dish>) -> Vec<RestaurantDto> {
    let mut by_restaurant: HashMap<i64, Vec<Dish>> = HashMap::new();
    for dish in dishes {
        by_restaurant.entry(dish.restaurant_id).or_default().push(dish);
    }

    restaurants
        .into_iter()
        .map(|restaurant| {
            let dishes = by_restaurant.remove(&restaurant.id).unwrap_or_default();
            restaurant_dto(restaurant, dishes)
        })
        .collect()
}
