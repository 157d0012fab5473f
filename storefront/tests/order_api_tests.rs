// tests/order_api_tests.rs
mod common;
use common::*;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use rust_decimal::Decimal;
use serde_json::json;
use serial_test::serial;
use storefront::db::Store;
use storefront::models::ContactMessage;

#[actix_web::test]
#[serial]
async fn customers_see_only_their_orders_and_staff_see_all() {
  let (state, store) = test_state();
  let nemo = seed_user(&store, "nemo", false).await;
  let dory = seed_user(&store, "dory", false).await;
  let staff = seed_user(&store, "admin", true).await;
  let tuna = seed_product(&store, "Tuna", "Fish", Decimal::new(1500, 2)).await;
  let app = init_app!(state);

  let mut order_ids = Vec::new();
  for customer in [&nemo, &dory] {
    let req = TestRequest::post()
      .uri("/api/orders/")
      .insert_header(bearer(&state, customer))
      .set_json(json!({
        "delivery_address": "42 Wallaby Way",
        "total_amount": "30.00",
        "status": "delivered",
        "items": [{ "product": tuna.id, "quantity": 2 }]
      }))
      .to_request();
    let (status, body) = read_json(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["user_name"], customer.username.as_str());
    assert_eq!(body["items"][0]["product_name"], "Tuna");
    order_ids.push(body["id"].as_str().unwrap().to_string());
  }

  let req = TestRequest::get().uri("/api/orders/").insert_header(bearer(&state, &nemo)).to_request();
  let (_, body) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(body["count"], 1);
  assert_eq!(body["results"][0]["id"], order_ids[0].as_str());

  let req = TestRequest::get().uri("/api/orders/my-orders/").insert_header(bearer(&state, &dory)).to_request();
  let (_, body) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(body.as_array().unwrap().len(), 1);

  let req = TestRequest::get()
    .uri(&format!("/api/orders/{}/", order_ids[1]))
    .insert_header(bearer(&state, &nemo))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

  let req = TestRequest::get().uri("/api/orders/").insert_header(bearer(&state, &staff)).to_request();
  let (_, body) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(body["count"], 2);

  let req = TestRequest::get().uri("/api/orders/").to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
#[serial]
async fn price_at_purchase_survives_price_changes() {
  let (state, store) = test_state();
  let nemo = seed_user(&store, "nemo", false).await;
  let staff = seed_user(&store, "admin", true).await;
  let prawn = seed_product(&store, "Prawn", "Shellfish", Decimal::new(1200, 2)).await;
  let app = init_app!(state);

  let req = TestRequest::post()
    .uri("/api/orders/")
    .insert_header(bearer(&state, &nemo))
    .set_json(json!({
      "delivery_address": "P. Sherman",
      "total_amount": "12.00",
      "items": [{ "product": prawn.id, "quantity": 1, "price_at_purchase": "0.01" }]
    }))
    .to_request();
  let (status, body) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["items"][0]["price_at_purchase"], "12.00");
  let order_id = body["id"].as_str().unwrap().to_string();

  let req = TestRequest::patch()
    .uri(&format!("/api/products/{}/", prawn.id))
    .insert_header(bearer(&state, &staff))
    .set_json(json!({ "price": "99.00" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

  let req = TestRequest::get()
    .uri(&format!("/api/orders/{}/", order_id))
    .insert_header(bearer(&state, &nemo))
    .to_request();
  let (_, body) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(body["items"][0]["price_at_purchase"], "12.00");
}

#[actix_web::test]
#[serial]
async fn order_validation_rejects_bad_items() {
  let (state, store) = test_state();
  let nemo = seed_user(&store, "nemo", false).await;
  let app = init_app!(state);

  let req = TestRequest::post()
    .uri("/api/orders/")
    .insert_header(bearer(&state, &nemo))
    .set_json(json!({
      "delivery_address": "Reef",
      "total_amount": "5.00",
      "items": [{ "product": uuid::Uuid::new_v4(), "quantity": 1 }]
    }))
    .to_request();
  let (status, body) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["items[0].product"][0].as_str().unwrap().contains("does not exist"));

  let req = TestRequest::post()
    .uri("/api/orders/")
    .insert_header(bearer(&state, &nemo))
    .set_json(json!({ "delivery_address": "Reef", "total_amount": "5.00", "items": [] }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
  assert_eq!(store.count_orders().await.unwrap(), 0);
}

#[actix_web::test]
#[serial]
async fn status_updates_stats_and_analytics_are_staff_only() {
  let (state, store) = test_state();
  let nemo = seed_user(&store, "nemo", false).await;
  let staff = seed_user(&store, "admin", true).await;
  let mut cod = seed_product(&store, "Cod", "Fish", Decimal::new(1000, 2)).await;
  cod.stock_quantity = 2;
  store.update_product(&cod).await.unwrap();
  let app = init_app!(state);

  let req = TestRequest::post()
    .uri("/api/orders/")
    .insert_header(bearer(&state, &nemo))
    .set_json(json!({
      "delivery_address": "Drop-off",
      "total_amount": "20.50",
      "items": [{ "product": cod.id, "quantity": 2 }]
    }))
    .to_request();
  let (_, body) = read_json(test::call_service(&app, req).await).await;
  let status_uri = format!("/api/orders/{}/status/", body["id"].as_str().unwrap());

  let req = TestRequest::put()
    .uri(&status_uri)
    .insert_header(bearer(&state, &nemo))
    .set_json(json!({ "status": "shipped" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

  let req = TestRequest::put()
    .uri(&status_uri)
    .insert_header(bearer(&state, &staff))
    .set_json(json!({}))
    .to_request();
  let (status, body) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body, json!({ "error": "status is required" }));

  let req = TestRequest::put()
    .uri(&status_uri)
    .insert_header(bearer(&state, &staff))
    .set_json(json!({ "status": "lost-at-sea" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

  let req = TestRequest::put()
    .uri(&status_uri)
    .insert_header(bearer(&state, &staff))
    .set_json(json!({ "status": "shipped" }))
    .to_request();
  let (status, body) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "status": "order status updated", "new_status": "shipped" }));

  let req = TestRequest::get().uri("/api/orders/stats/").insert_header(bearer(&state, &staff)).to_request();
  let (status, body) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["total_revenue"], 20.5);
  assert_eq!(body["total_orders"], 1);
  assert_eq!(body["total_products"], 1);
  assert_eq!(body["total_users"], 2);
  assert_eq!(body["recent_orders"].as_array().unwrap().len(), 1);
  assert_eq!(body["low_stock_products"], json!([{ "id": cod.id, "name": "Cod", "stock_quantity": 2 }]));

  let req = TestRequest::get().uri("/api/orders/analytics/").insert_header(bearer(&state, &staff)).to_request();
  let (status, body) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(status, StatusCode::OK);
  let points = body.as_array().unwrap();
  assert_eq!(points.len(), 1);
  assert_eq!(points[0]["revenue"], 20.5);
  assert!(points[0]["displayDate"].is_string());

  let req = TestRequest::get().uri("/api/orders/stats/").insert_header(bearer(&state, &nemo)).to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
#[serial]
async fn deletes_cascade_and_orphan_as_declared() {
  let (state, store) = test_state();
  let nemo = seed_user(&store, "nemo", false).await;
  let staff = seed_user(&store, "admin", true).await;
  let tuna = seed_product(&store, "Tuna", "Fish", Decimal::new(1500, 2)).await;
  let app = init_app!(state);

  let place = || {
    TestRequest::post()
      .uri("/api/orders/")
      .insert_header(bearer(&state, &nemo))
      .set_json(json!({
        "delivery_address": "Reef",
        "total_amount": "15.00",
        "items": [{ "product": tuna.id, "quantity": 1 }]
      }))
      .to_request()
  };
  let (_, first) = read_json(test::call_service(&app, place()).await).await;
  read_json(test::call_service(&app, place()).await).await;
  assert_eq!(store.order_item_count(), 2);

  let req = TestRequest::delete()
    .uri(&format!("/api/orders/{}/", first["id"].as_str().unwrap()))
    .insert_header(bearer(&state, &staff))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
  assert_eq!(store.order_item_count(), 1);

  let mut message = ContactMessage::draft(Some(nemo.id));
  message.name = "Nemo".to_string();
  message.email = "nemo@harbour.example".to_string();
  message.message = "Where is my tuna?".to_string();
  store.insert_message(&message).await.unwrap();

  let req = TestRequest::delete()
    .uri(&format!("/api/users/{}/", nemo.id))
    .insert_header(bearer(&state, &staff))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

  assert_eq!(store.count_orders().await.unwrap(), 0);
  assert_eq!(store.order_item_count(), 0);
  let kept = store.get_message(message.id).await.unwrap().unwrap();
  assert_eq!(kept.user, None);
}
