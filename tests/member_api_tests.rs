//! HTTP tests for the member and position routes.

mod common;

use std::sync::Arc;

use actix_web::{http::StatusCode, test, web, App};
use common::{bearer, setup_bearer, test_state, MockStorage};
use serde_json::{json, Value};

fn member_info(name: &str) -> Value {
    json!({
        "imageUrl": format!("/uploads/members/{}.png", name.to_lowercase()),
        "birthDate": "1975-03-01",
        "email": format!("{}@portal.example", name.to_lowercase()),
        "nationality": "Cambodian",
        "name": name,
        "placeOfBirth": {
            "houseNumber": "12",
            "street": "Street 271",
            "district": "Chamkarmon",
            "city": "Phnom Penh",
            "country": "Cambodia"
        }
    })
}

fn position_body(title: &str, level: i32) -> Value {
    json!({
        "en": {"title": title, "level": level},
        "kh": {"title": format!("{} (kh)", title), "level": level}
    })
}

macro_rules! app {
    () => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(Arc::new(MockStorage::new()))))
                .service(web::scope("/api").configure(gov_portal_server::api_config)),
        )
        .await
    };
}

#[actix_web::test]
async fn test_writes_require_token() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/positions")
        .set_json(position_body("Minister", 1))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["message"], "Missing authorization token");
}

#[actix_web::test]
async fn test_setup_session_cannot_write() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/positions")
        .insert_header(setup_bearer())
        .set_json(position_body("Minister", 1))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Setup session cannot access this resource");

    let req = test::TestRequest::get().uri("/api/positions").to_request();
    let positions: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(positions, json!([]));
}

#[actix_web::test]
async fn test_grouped_members_refresh_after_write() {
    let app = app!();

    let req = test::TestRequest::get().uri("/api/members/grouped").to_request();
    let empty: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(empty["list"], json!([]));
    assert_eq!(empty["currentGeneration"], Value::Null);

    let req = test::TestRequest::post()
        .uri("/api/positions")
        .insert_header(bearer())
        .set_json(position_body("Minister", 1))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let position: Value = test::read_body_json(resp).await;

    let req = test::TestRequest::post()
        .uri("/api/members")
        .insert_header(bearer())
        .set_json(json!({
            "en": member_info("Sokha"),
            "kh": member_info("Sokha"),
            "position": position["_id"],
            "generation": 7
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let member: Value = test::read_body_json(resp).await;
    assert_eq!(member["en"]["placeOfBirth"]["city"], "Phnom Penh");

    // The cached empty view must not survive the write.
    let req = test::TestRequest::get().uri("/api/members/grouped").to_request();
    let grouped: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(grouped["currentGeneration"], 7);
    assert_eq!(grouped["generations"], json!([7]));
    assert_eq!(grouped["list"][0]["position"]["_id"], position["_id"]);
    assert_eq!(grouped["list"][0]["members"][0]["_id"], member["_id"]);
    assert_eq!(grouped["list"][0]["members"][0]["name_en"], "Sokha");
}

#[actix_web::test]
async fn test_member_tree_and_delete() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/positions")
        .insert_header(bearer())
        .set_json(position_body("Director", 2))
        .to_request();
    let position: Value = test::call_and_read_body_json(&app, req).await;

    let create = |name: &str, parent: Option<&Value>| {
        let mut body = json!({
            "en": member_info(name),
            "kh": member_info(name),
            "position": position["_id"],
            "generation": 1
        });
        if let Some(parent) = parent {
            body["parent"] = parent.clone();
        }
        test::TestRequest::post()
            .uri("/api/members")
            .insert_header(bearer())
            .set_json(body)
            .to_request()
    };

    let root: Value = test::call_and_read_body_json(&app, create("Root", None)).await;
    let child: Value = test::call_and_read_body_json(&app, create("Child", Some(&root["_id"]))).await;

    let req = test::TestRequest::get().uri("/api/members/tree").to_request();
    let tree: Value = test::call_and_read_body_json(&app, req).await;
    let nodes = tree.as_array().unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0]["_id"], root["_id"]);
    assert_eq!(nodes[0]["position"], "Director");
    assert_eq!(nodes[0]["descendants"][0]["_id"], child["_id"]);
    assert_eq!(nodes[0]["descendants"][0]["level"], 1);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/members/{}", child["_id"].as_str().unwrap()))
        .insert_header(bearer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/members/{}", child["_id"].as_str().unwrap()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/api/members/tree").to_request();
    let tree: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(tree[0]["descendants"], json!([]));
}

#[actix_web::test]
async fn test_position_with_mismatched_levels_is_rejected() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/positions")
        .insert_header(bearer())
        .set_json(json!({
            "en": {"title": "Advisor", "level": 3},
            "kh": {"title": "Advisor (kh)", "level": 4}
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "UnprocessableEntity");
}

#[actix_web::test]
async fn test_member_with_unknown_position_is_not_found() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/members")
        .insert_header(bearer())
        .set_json(json!({
            "en": member_info("Dara"),
            "kh": member_info("Dara"),
            "position": "missing",
            "generation": 1
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
