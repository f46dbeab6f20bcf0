use crate::{
    error::AppError,
    mapper,
    models::{
        Dish, DishDto, DishRequest, NewDish, NewRestaurant, PageParams, Restaurant,
        RestaurantDto, RestaurantPage, RestaurantRequest,
    },
    repository::{RepositoryError, RepositoryState},
};

/// RestaurantService
///
/// CRUD orchestration for restaurants: existence checks before mutation and the
/// unique-name rule. Authorization has already happened by the time any of
/// these methods runs; the service never looks at the caller.
#[derive(Clone)]
pub struct RestaurantService {
    repo: RepositoryState,
}

impl RestaurantService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    pub async fn list(&self, params: PageParams) -> Result<RestaurantPage, AppError> {
        let (page, size) = (params.page(), params.size());
        tracing::debug!(page, size, "listing restaurants");

        let restaurants = self
            .repo
            .list_restaurants(params.offset(), i64::from(size))
            .await?;
        let total_elements = self.repo.count_restaurants().await?;
        let content = self.with_dishes(restaurants).await?;

        Ok(RestaurantPage {
            content,
            page,
            size,
            total_elements,
            total_pages: (total_elements + i64::from(size) - 1) / i64::from(size),
        })
    }

    pub async fn search(&self, cuisine: &str) -> Result<Vec<RestaurantDto>, AppError> {
        tracing::debug!(cuisine, "searching restaurants by cuisine");
        let restaurants = self.repo.find_restaurants_by_cuisine(cuisine.trim()).await?;
        self.with_dishes(restaurants).await
    }

    pub async fn get(&self, id: i64) -> Result<RestaurantDto, AppError> {
        tracing::debug!(id, "fetching restaurant");
        let restaurant = self.find_or_not_found(id).await?;
        let dishes = self.repo.dishes_for_restaurant(id).await?;
        Ok(mapper::restaurant_dto(restaurant, dishes))
    }

    pub async fn create(&self, request: &RestaurantRequest) -> Result<RestaurantDto, AppError> {
        request.validate()?;
        let new = NewRestaurant::from(request);
        tracing::info!(name = %new.name, "creating restaurant");

        if self.repo.restaurant_exists_by_name(&new.name).await? {
            return Err(duplicate_name(&new.name));
        }

        let saved = self
            .repo
            .insert_restaurant(&new)
            .await
            .map_err(|e| map_unique(e, &new.name))?;
        tracing::info!(id = saved.id, "restaurant created");

        Ok(mapper::restaurant_dto(saved, Vec::new()))
    }

    pub async fn update(
        &self,
        id: i64,
        request: &RestaurantRequest,
    ) -> Result<RestaurantDto, AppError> {
        request.validate()?;
        let new = NewRestaurant::from(request);
        tracing::info!(id, "updating restaurant");

        let current = self.find_or_not_found(id).await?;
        if current.name != new.name && self.repo.restaurant_exists_by_name(&new.name).await? {
            return Err(duplicate_name(&new.name));
        }

        let updated = self
            .repo
            .update_restaurant(id, &new)
            .await
            .map_err(|e| map_unique(e, &new.name))?
            .ok_or_else(|| restaurant_not_found(id))?;
        let dishes = self.repo.dishes_for_restaurant(id).await?;
        tracing::info!(id, "restaurant updated");

        Ok(mapper::restaurant_dto(updated, dishes))
    }

    /// Deletes the restaurant together with all of its dishes.
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        tracing::info!(id, "deleting restaurant");
        if !self.repo.delete_restaurant(id).await? {
            return Err(restaurant_not_found(id));
        }
        tracing::info!(id, "restaurant deleted");
        Ok(())
    }

    async fn find_or_not_found(&self, id: i64) -> Result<Restaurant, AppError> {
        self.repo
            .find_restaurant(id)
            .await?
            .ok_or_else(|| restaurant_not_found(id))
    }

    async fn with_dishes(&self, restaurants: Vec<Restaurant>) -> Result<Vec<RestaurantDto>, AppError> {
        let ids: Vec<i64> = restaurants.iter().map(|r| r.id).collect();
        let dishes = self.repo.dishes_for_restaurants(&ids).await?;
        Ok(mapper::restaurant_dtos(restaurants, dishes))
    }
}

/// DishService
///
/// CRUD orchestration for dishes. Every dish operation is addressed through its
/// restaurant: the restaurant must exist, and a dish that belongs to a different
/// restaurant is reported as not found.
#[derive(Clone)]
pub struct DishService {
    repo: RepositoryState,
}

impl DishService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    pub async fn list(&self, restaurant_id: i64) -> Result<Vec<DishDto>, AppError> {
        tracing::debug!(restaurant_id, "listing dishes");
        self.ensure_restaurant(restaurant_id).await?;
        let dishes = self.repo.dishes_for_restaurant(restaurant_id).await?;
        Ok(dishes.into_iter().map(DishDto::from).collect())
    }

    pub async fn get(&self, restaurant_id: i64, dish_id: i64) -> Result<DishDto, AppError> {
        tracing::debug!(restaurant_id, dish_id, "fetching dish");
        self.find_scoped(restaurant_id, dish_id).await.map(DishDto::from)
    }

    pub async fn create(
        &self,
        restaurant_id: i64,
        request: &DishRequest,
    ) -> Result<DishDto, AppError> {
        request.validate()?;
        let new = NewDish::from(request);
        tracing::info!(restaurant_id, name = %new.name, "creating dish");

        self.ensure_restaurant(restaurant_id).await?;
        // The restaurant can still vanish between the check and the insert.
        let saved = self
            .repo
            .insert_dish(restaurant_id, &new)
            .await?
            .ok_or_else(|| restaurant_not_found(restaurant_id))?;
        tracing::info!(restaurant_id, id = saved.id, "dish created");

        Ok(saved.into())
    }

    pub async fn update(
        &self,
        restaurant_id: i64,
        dish_id: i64,
        request: &DishRequest,
    ) -> Result<DishDto, AppError> {
        request.validate()?;
        let new = NewDish::from(request);
        tracing::info!(restaurant_id, dish_id, "updating dish");

        self.find_scoped(restaurant_id, dish_id).await?;
        let updated = self
            .repo
            .update_dish(dish_id, &new)
            .await?
            .ok_or_else(|| dish_not_found(dish_id))?;
        tracing::info!(restaurant_id, dish_id, "dish updated");

        Ok(updated.into())
    }

    pub async fn delete(&self, restaurant_id: i64, dish_id: i64) -> Result<(), AppError> {
        tracing::info!(restaurant_id, dish_id, "deleting dish");
        self.find_scoped(restaurant_id, dish_id).await?;
        if !self.repo.delete_dish(dish_id).await? {
            return Err(dish_not_found(dish_id));
        }
        tracing::info!(restaurant_id, dish_id, "dish deleted");
        Ok(())
    }

    async fn ensure_restaurant(&self, restaurant_id: i64) -> Result<(), AppError> {
        match self.repo.find_restaurant(restaurant_id).await? {
            Some(_) => Ok(()),
            None => Err(restaurant_not_found(restaurant_id)),
        }
    }

    async fn find_scoped(&self, restaurant_id: i64, dish_id: i64) -> Result<Dish, AppError> {
        self.ensure_restaurant(restaurant_id).await?;
        self.repo
            .find_dish(dish_id)
            .await?
            .filter(|dish| dish.restaurant_id == restaurant_id)
            .ok_or_else(|| dish_not_found(dish_id))
    }
}

fn restaurant_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Restaurant not found with id: {id}"))
}

fn dish_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Dish not found with id: {id}"))
}

fn duplicate_name(name: &str) -> AppError {
    AppError::Duplicate(format!("Restaurant with name '{name}' already exists"))
}

fn map_unique(err: RepositoryError, name: &str) -> AppError {
    match err {
        RepositoryError::UniqueViolation(_) => duplicate_name(name),
        other => other.into(),
    }
}
