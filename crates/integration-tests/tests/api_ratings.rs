mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn average_tracks_every_new_rating() {
    let app = TestApp::new();
    let staff = app.staff_token().await;
    let plant = app.create_plant(&staff, "Orchid").await;
    let detail = format!("/api/verdespace/plants/{plant}");

    let (_, body) = app.get(&detail, Some(&staff)).await;
    assert!(body["average_rating"].is_null());

    let mut expected = Vec::new();
    for (i, value) in [5, 4, 4].into_iter().enumerate() {
        let token = app.user_token(&format!("rater{i}@example.com")).await;
        let (status, _) = app
            .post("/api/verdespace/ratings", Some(&token), json!({ "plant": plant, "rating": value }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, body) = app.get(&detail, Some(&staff)).await;
        expected.push(body["average_rating"].as_f64().unwrap());
    }
    assert_eq!(expected, [5.0, 4.5, 4.33]);

    let (_, list) = app.get("/api/verdespace/plants", Some(&staff)).await;
    assert_eq!(list[0]["average_rating"], 4.33);
}

#[tokio::test]
async fn second_rating_of_the_same_plant_is_rejected() {
    let app = TestApp::new();
    let staff = app.staff_token().await;
    let user = app.user_token("user@example.com").await;
    let plant = app.create_plant(&staff, "Orchid").await;

    let body = json!({ "plant": plant, "rating": 3 });
    assert_eq!(app.post("/api/verdespace/ratings", Some(&user), body.clone()).await.0, StatusCode::CREATED);
    let (status, err) = app.post("/api/verdespace/ratings", Some(&user), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["field"], "plant");
}

#[tokio::test]
async fn out_of_range_values_are_rejected() {
    let app = TestApp::new();
    let staff = app.staff_token().await;
    let plant = app.create_plant(&staff, "Orchid").await;

    for value in [0, 6, -1] {
        let (status, err) = app
            .post("/api/verdespace/ratings", Some(&staff), json!({ "plant": plant, "rating": value }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["field"], "rating");
    }
}

#[tokio::test]
async fn ratings_can_only_be_changed_by_their_owner() {
    let app = TestApp::new();
    let staff = app.staff_token().await;
    let owner = app.user_token("owner@example.com").await;
    let plant = app.create_plant(&staff, "Orchid").await;

    let (_, rating) = app
        .post("/api/verdespace/ratings", Some(&owner), json!({ "plant": plant, "rating": 2 }))
        .await;
    let path = format!("/api/verdespace/ratings/{}", rating["id"].as_str().unwrap());

    assert_eq!(app.put(&path, Some(&staff), json!({ "rating": 5 })).await.0, StatusCode::NOT_FOUND);
    let (status, body) = app.put(&path, Some(&owner), json!({ "rating": 5 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rating"], 5);

    let (_, filtered) = app.get(&format!("/api/verdespace/ratings?plant={plant}"), Some(&staff)).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);

    assert_eq!(app.delete(&path, Some(&staff)).await.0, StatusCode::NOT_FOUND);
    assert_eq!(app.delete(&path, Some(&owner)).await.0, StatusCode::NO_CONTENT);
}
