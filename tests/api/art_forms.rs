use serde_json::{json, Value};

use crate::helpers::TestApp;

#[tokio::test]
async fn the_seven_classic_art_forms_are_seeded() {
    let test_app = TestApp::spawn_app().await;

    let art_forms = test_app.store.list_active_art_forms().await.unwrap();

    let mut names: Vec<&str> = art_forms.iter().map(|art_form| art_form.name.as_ref()).collect();
    names.sort();
    assert_eq!(
        names,
        vec!["Architecture", "Dance", "Music", "Painting", "Poetry", "Sculpture", "Theater"]
    );
}

#[tokio::test]
async fn add_art_form_returns_201_and_splits_keywords() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .post_art_form(&json!({
            "name": "Photography",
            "description": "Images made with light",
            "keywords": "photography, photo exhibition , ,camera"
        }))
        .await;

    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["name"], "Photography");
    assert_eq!(
        body["keywords"],
        json!(["photography", "photo exhibition", "camera"])
    );
    assert_eq!(body["active"], true);
}

#[tokio::test]
async fn new_art_forms_can_be_chosen_by_subscribers() {
    let test_app = TestApp::spawn_app().await;
    test_app
        .post_art_form(&json!({ "name": "Photography", "keywords": "photography" }))
        .await;

    let response = test_app
        .post_subscription(&json!({
            "email": "ansel@test.com",
            "art_forms": ["Photography"]
        }))
        .await;

    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn add_art_form_returns_400_for_invalid_or_duplicate_names() {
    let test_app = TestApp::spawn_app().await;

    let test_cases = vec![
        (json!({ "name": "" }), "empty name"),
        (json!({ "name": "   " }), "blank name"),
        (json!({ "name": "Painting" }), "duplicate name"),
    ];

    for (body, description) in test_cases {
        let response = test_app.post_art_form(&body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not return a 400 Bad Request for a {}.",
            description
        );
    }
}

#[tokio::test]
async fn deactivated_art_forms_are_no_longer_offered() {
    let test_app = TestApp::spawn_app().await;
    let painting = test_app
        .store
        .list_active_art_forms()
        .await
        .unwrap()
        .into_iter()
        .find(|art_form| art_form.name.as_ref() == "Painting")
        .unwrap();

    let response = reqwest::Client::new()
        .delete(format!("{}/art_forms/{}", test_app.address, painting.id))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let active = test_app.store.list_active_art_forms().await.unwrap();
    assert_eq!(active.len(), 6);
    assert!(active.iter().all(|art_form| art_form.id != painting.id));

    let response = test_app
        .post_subscription(&json!({
            "email": "frank@test.com",
            "art_forms": ["Painting"]
        }))
        .await;
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn deactivate_art_form_returns_404_for_an_unknown_id() {
    let test_app = TestApp::spawn_app().await;

    let response = reqwest::Client::new()
        .delete(format!(
            "{}/art_forms/{}",
            test_app.address,
            uuid::Uuid::new_v4()
        ))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn settings_lists_active_subscribers_and_all_art_forms() {
    let test_app = TestApp::spawn_app().await;
    test_app.add_subscriber("frank@test.com", Some("Frank")).await;
    test_app.add_subscriber("ada@test.com", None).await;
    test_app.get("/unsubscribe/ada@test.com").await;

    let response = test_app.get("/settings").await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let subscribers = body["subscribers"].as_array().unwrap();
    assert_eq!(subscribers.len(), 1);
    assert_eq!(subscribers[0]["email"], "frank@test.com");
    assert_eq!(body["art_forms"].as_array().unwrap().len(), 7);
}
