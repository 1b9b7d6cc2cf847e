use serde_json::json;

use crate::common::{TestApp, routes};

async fn seed_material(app: &TestApp, token: &str) -> i32 {
    app.create_material(
        token,
        &json!({
            "titulo": "Material comentado",
            "tipo": "ficha",
            "video_url": "https://videos.example.org/x",
        }),
    )
    .await
}

#[tokio::test]
async fn comment_and_list_oldest_first() {
    let app = TestApp::spawn().await;
    let token = app
        .create_verified_user("charla@example.org", "password123")
        .await;
    let id = seed_material(&app, &token).await;

    for texto in ["Primer comentario", "Segundo comentario"] {
        let res = app
            .post_with_token(
                routes::COMMENTS,
                &json!({"material": id, "texto": texto}),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
    }

    // Listing is open.
    let list = app
        .get_without_token(&format!("{}?material={id}", routes::COMMENTS))
        .await;
    assert_eq!(list.status, 200, "{}", list.text);
    assert_eq!(list.body["total"], 2);
    assert_eq!(list.body["comentarios"][0]["texto"], "Primer comentario");
    assert_eq!(
        list.body["comentarios"][0]["usuario_email"],
        "charla@example.org"
    );
}

#[tokio::test]
async fn empty_text_is_rejected() {
    let app = TestApp::spawn().await;
    let token = app
        .create_verified_user("mudo@example.org", "password123")
        .await;
    let id = seed_material(&app, &token).await;

    let res = app
        .post_with_token(
            routes::COMMENTS,
            &json!({"material": id, "texto": "   "}),
            &token,
        )
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn commenting_requires_authentication() {
    let app = TestApp::spawn().await;

    let res = app
        .post_without_token(routes::COMMENTS, &json!({"material": 1, "texto": "hola"}))
        .await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn commenting_on_a_missing_material_fails() {
    let app = TestApp::spawn().await;
    let token = app
        .create_verified_user("nada@example.org", "password123")
        .await;

    let res = app
        .post_with_token(
            routes::COMMENTS,
            &json!({"material": 999_999, "texto": "hola"}),
            &token,
        )
        .await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn only_the_author_can_edit_or_delete() {
    let app = TestApp::spawn().await;
    let author = app
        .create_verified_user("autora@example.org", "password123")
        .await;
    let other = app
        .create_verified_user("otra@example.org", "password123")
        .await;
    let id = seed_material(&app, &author).await;

    let created = app
        .post_with_token(
            routes::COMMENTS,
            &json!({"material": id, "texto": "Original"}),
            &author,
        )
        .await;
    let comment_id = created.id();

    let forbidden = app
        .patch_with_token(
            &routes::comment(comment_id),
            &json!({"texto": "Secuestrado"}),
            &other,
        )
        .await;
    assert_eq!(forbidden.status, 403);
    assert_eq!(forbidden.error_code(), "PERMISSION_DENIED");

    let edited = app
        .patch_with_token(
            &routes::comment(comment_id),
            &json!({"texto": "Corregido"}),
            &author,
        )
        .await;
    assert_eq!(edited.status, 200, "{}", edited.text);
    assert_eq!(edited.body["texto"], "Corregido");

    let forbidden = app
        .delete_with_token(&routes::comment(comment_id), &other)
        .await;
    assert_eq!(forbidden.status, 403);

    let deleted = app
        .delete_with_token(&routes::comment(comment_id), &author)
        .await;
    assert_eq!(deleted.status, 204);
}
