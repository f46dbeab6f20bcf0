use restaurant_service::{
    AppConfig, AppState, MemoryRepository, auth::ADMIN, create_router,
    repository::RepositoryState,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub admin_token: String,
}

async fn spawn_app() -> TestApp {
    let repo = Arc::new(MemoryRepository::new()) as RepositoryState;
    let state = AppState::new(repo, AppConfig::default()).expect("Failed to build state");
    let admin_token = state
        .codec
        .issue("admin", [ADMIN])
        .expect("Failed to issue admin token");
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        admin_token,
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(&format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_restaurant_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Create
    let created: Value = client
        .post(&format!("{}/restaurants", app.address))
        .bearer_auth(&app.admin_token)
        .json(&json!({ "name": "Luigi's", "cuisine": "Italian", "address": "1 Main St" }))
        .send()
        .await
        .expect("create fail")
        .error_for_status()
        .expect("create status")
        .json()
        .await
        .unwrap();
    let id = created["id"].as_i64().unwrap();

    // Add a dish
    let res = client
        .post(&format!("{}/restaurants/{}/dishes", app.address, id))
        .bearer_auth(&app.admin_token)
        .json(&json!({
            "name": "Lasagne",
            "description": "Layered pasta",
            "price": 1250,
            "imageUrl": "https://img.example/lasagne.png"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    let dish: Value = res.json().await.unwrap();
    let dish_id = dish["id"].as_i64().unwrap();

    // Update the dish
    let res = client
        .put(&format!("{}/restaurants/{}/dishes/{}", app.address, id, dish_id))
        .bearer_auth(&app.admin_token)
        .json(&json!({
            "name": "Lasagne",
            "description": "Layered pasta, extra cheese",
            "price": 1350,
            "imageUrl": "https://img.example/lasagne.png"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    // Read back anonymously
    let restaurant: Value = client
        .get(&format!("{}/restaurants/{}", app.address, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(restaurant["dishes"][0]["price"], 1350);

    // Rename
    let res = client
        .put(&format!("{}/restaurants/{}", app.address, id))
        .bearer_auth(&app.admin_token)
        .json(&json!({ "name": "Luigi's Trattoria", "cuisine": "Italian", "address": "1 Main St" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let renamed: Value = res.json().await.unwrap();
    assert_eq!(renamed["name"], "Luigi's Trattoria");

    // Delete the dish, then the restaurant
    let res = client
        .delete(&format!("{}/restaurants/{}/dishes/{}", app.address, id, dish_id))
        .bearer_auth(&app.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);

    let res = client
        .delete(&format!("{}/restaurants/{}", app.address, id))
        .bearer_auth(&app.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);

    let res = client
        .get(&format!("{}/restaurants/{}", app.address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn test_write_without_token_is_rejected() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let res = client
        .delete(&format!("{}/restaurants/1", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "FORBIDDEN");
}
