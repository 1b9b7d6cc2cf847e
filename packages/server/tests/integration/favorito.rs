use serde_json::json;

use crate::common::{TestApp, routes};

async fn seed_material(app: &TestApp, token: &str, titulo: &str) -> i32 {
    app.create_material(
        token,
        &json!({
            "titulo": titulo,
            "tipo": "ficha",
            "video_url": "https://videos.example.org/x",
        }),
    )
    .await
}

#[tokio::test]
async fn bookmark_and_list() {
    let app = TestApp::spawn().await;
    let token = app
        .create_verified_user("marcar@example.org", "password123")
        .await;
    let id = seed_material(&app, &token, "Material favorito").await;

    let res = app
        .post_with_token(routes::FAVORITES, &json!({"material": id}), &token)
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["material"], id);
    assert_eq!(res.body["material_titulo"], "Material favorito");

    let list = app.get_with_token(routes::FAVORITES, &token).await;
    assert_eq!(list.status, 200, "{}", list.text);
    assert_eq!(list.body["total"], 1);
    assert_eq!(list.body["favoritos"][0]["material"], id);
}

#[tokio::test]
async fn the_listing_is_private_to_the_caller() {
    let app = TestApp::spawn().await;
    let alice = app
        .create_verified_user("alicia@example.org", "password123")
        .await;
    let bob = app
        .create_verified_user("beto@example.org", "password123")
        .await;
    let id = seed_material(&app, &alice, "Material compartido").await;

    app.post_with_token(routes::FAVORITES, &json!({"material": id}), &alice)
        .await;

    let bobs = app.get_with_token(routes::FAVORITES, &bob).await;
    assert_eq!(bobs.body["total"], 0);
}

#[tokio::test]
async fn double_bookmark_conflicts() {
    let app = TestApp::spawn().await;
    let token = app
        .create_verified_user("doble@example.org", "password123")
        .await;
    let id = seed_material(&app, &token, "Material único").await;

    let first = app
        .post_with_token(routes::FAVORITES, &json!({"material": id}), &token)
        .await;
    assert_eq!(first.status, 201, "{}", first.text);

    let second = app
        .post_with_token(routes::FAVORITES, &json!({"material": id}), &token)
        .await;
    assert_eq!(second.status, 409);
    assert_eq!(second.error_code(), "CONFLICT");
}

#[tokio::test]
async fn bookmarking_a_missing_material_fails() {
    let app = TestApp::spawn().await;
    let token = app
        .create_verified_user("perdido@example.org", "password123")
        .await;

    let res = app
        .post_with_token(routes::FAVORITES, &json!({"material": 999_999}), &token)
        .await;
    assert_eq!(res.status, 404);
    assert_eq!(res.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn only_the_owner_can_remove_a_favorite() {
    let app = TestApp::spawn().await;
    let alice = app
        .create_verified_user("ana@example.org", "password123")
        .await;
    let bob = app
        .create_verified_user("bruno@example.org", "password123")
        .await;
    let id = seed_material(&app, &alice, "Material de Ana").await;

    let fav = app
        .post_with_token(routes::FAVORITES, &json!({"material": id}), &alice)
        .await;
    let fav_id = fav.id();

    let forbidden = app.delete_with_token(&routes::favorite(fav_id), &bob).await;
    assert_eq!(forbidden.status, 403);

    let removed = app.delete_with_token(&routes::favorite(fav_id), &alice).await;
    assert_eq!(removed.status, 204);

    let list = app.get_with_token(routes::FAVORITES, &alice).await;
    assert_eq!(list.body["total"], 0);
}

#[tokio::test]
async fn favorites_require_authentication() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token(routes::FAVORITES).await;
    assert_eq!(res.status, 401);
}
