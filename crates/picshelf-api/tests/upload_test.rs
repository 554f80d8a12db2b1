//! Profile picture upload integration tests.
//!
//! Run with: `cargo test -p picshelf-api --test upload_test`

mod helpers;

use helpers::{api_path, create_user, profile_pic_form, setup_test_app, setup_test_app_with};

#[tokio::test]
async fn test_upload_png_stores_under_timestamped_name() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/user/profilePic"))
        .multipart(profile_pic_form("cat.png", "image/png", vec![1u8; 5 * 1024]))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["msg"], "file uploaded successfully!");
    assert_eq!(body["storageName"], "1700000000000-cat.png");

    let stored = app.storage_root().join("1700000000000-cat.png");
    assert_eq!(std::fs::metadata(stored).unwrap().len(), 5 * 1024);
}

#[tokio::test]
async fn test_upload_sets_user_profile_pic() {
    let app = setup_test_app().await;
    let user_id = create_user(app.client(), "Ada", "ada@example.com").await;

    let response = app
        .client()
        .post(&api_path(&format!("/user/profilePic/{}", user_id)))
        .multipart(profile_pic_form("me.jpg", "image/jpeg", vec![9u8; 64]))
        .await;
    assert_eq!(response.status_code(), 200);

    let user: serde_json::Value = app
        .client()
        .get(&api_path(&format!("/user/{}", user_id)))
        .await
        .json();
    assert_eq!(user["profilePic"], "1700000000000-me.jpg");
}

#[tokio::test]
async fn test_non_image_rejected_without_writing() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/user/profilePic"))
        .multipart(profile_pic_form("notes.txt", "text/plain", b"hello".to_vec()))
        .await;

    assert_eq!(response.status_code(), 415);
    let body: serde_json::Value = response.json();
    assert_eq!(body["err"], "file is not an image");
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_missing_field_rejected() {
    let app = setup_test_app().await;

    let form = axum_test::multipart::MultipartForm::new().add_text("other", "value");
    let response = app
        .client()
        .post(&api_path("/user/profilePic"))
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 400);
    let body: serde_json::Value = response.json();
    assert_eq!(body["err"], "error retrieving the file");
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let app = setup_test_app_with(|config| config.upload_max_bytes = 1024).await;

    // not an image either: size is checked first
    let response = app
        .client()
        .post(&api_path("/user/profilePic"))
        .multipart(profile_pic_form("big.txt", "text/plain", vec![0u8; 8 * 1024]))
        .await;

    assert_eq!(response.status_code(), 413);
    let body: serde_json::Value = response.json();
    assert_eq!(
        body["err"],
        "failed to parse form data, make sure it's less than 10Mb"
    );
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_same_millisecond_same_name_keeps_both_files() {
    let app = setup_test_app().await;

    for len in [10usize, 20] {
        let response = app
            .client()
            .post(&api_path("/user/profilePic"))
            .multipart(profile_pic_form("a.jpg", "image/jpeg", vec![3u8; len]))
            .await;
        assert_eq!(response.status_code(), 200);
    }

    let files = app.stored_files();
    assert_eq!(files.len(), 2);
    assert!(files.contains(&"1700000000000-a.jpg".to_string()));
    assert!(files
        .iter()
        .all(|f| f.starts_with("1700000000000-") && f.ends_with("a.jpg")));
}

#[tokio::test]
async fn test_unsafe_file_name_is_sanitized() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/user/profilePic"))
        .multipart(profile_pic_form("../../evil pic.png", "image/png", vec![1u8; 8]))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["storageName"], "1700000000000-evil_pic.png");
    assert_eq!(app.stored_files(), vec!["1700000000000-evil_pic.png"]);
}

#[tokio::test]
async fn test_upload_for_missing_user_keeps_file_for_reconciler() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/user/profilePic/999"))
        .multipart(profile_pic_form("cat.png", "image/png", vec![1u8; 8]))
        .await;

    assert_eq!(response.status_code(), 404);
    let body: serde_json::Value = response.json();
    assert_eq!(body["err"], "user not found!");
    assert_eq!(app.stored_files(), vec!["1700000000000-cat.png"]);

    let reconciler = app.state.reconciler.clone().unwrap();
    let report = reconciler.run_once().await.unwrap();
    assert_eq!(report.deleted, vec!["1700000000000-cat.png".to_string()]);
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_invalid_user_id_rejected_before_upload() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/user/profilePic/abc"))
        .multipart(profile_pic_form("cat.png", "image/png", vec![1u8; 8]))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: serde_json::Value = response.json();
    assert_eq!(body["err"], "invalid userId provided!");
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_reconciler_keeps_referenced_upload() {
    let app = setup_test_app().await;
    let user_id = create_user(app.client(), "Ada", "ada@example.com").await;

    app.client()
        .post(&api_path(&format!("/user/profilePic/{}", user_id)))
        .multipart(profile_pic_form("keep.png", "image/png", vec![1u8; 8]))
        .await;
    app.client()
        .post(&api_path("/user/profilePic"))
        .multipart(profile_pic_form("drop.png", "image/png", vec![1u8; 8]))
        .await;

    let reconciler = app.state.reconciler.clone().unwrap();
    let report = reconciler.run_once().await.unwrap();

    assert_eq!(report.scanned, 2);
    assert_eq!(report.referenced, 1);
    assert_eq!(app.stored_files(), vec!["1700000000000-keep.png"]);
}

#[tokio::test]
async fn test_non_multipart_body_gets_error_envelope() {
    let app = setup_test_app().await;

    let json_body = app
        .client()
        .post(&api_path("/user/profilePic"))
        .json(&serde_json::json!({ "profilePic": "cat.png" }))
        .await;
    let empty_body = app.client().post(&api_path("/user/profilePic")).await;

    for response in [json_body, empty_body] {
        assert_eq!(response.status_code(), 400);
        let body: serde_json::Value = response.json();
        assert_eq!(body["err"], "error retrieving the file");
        assert_eq!(body["code"], "INVALID_UPLOAD");
    }
    assert!(app.stored_files().is_empty());
}
