use serde_json::json;

use crate::common::{TestApp, routes};

async fn seed_material(app: &TestApp, token: &str) -> i32 {
    app.create_material(
        token,
        &json!({
            "titulo": "Material valorado",
            "tipo": "ficha",
            "video_url": "https://videos.example.org/x",
        }),
    )
    .await
}

#[tokio::test]
async fn rate_and_list() {
    let app = TestApp::spawn().await;
    let token = app
        .create_verified_user("estrella@example.org", "password123")
        .await;
    let id = seed_material(&app, &token).await;

    let res = app
        .post_with_token(routes::RATINGS, &json!({"material": id, "puntaje": 4}), &token)
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["puntaje"], 4);

    // Listing is open.
    let list = app
        .get_without_token(&format!("{}?material={id}", routes::RATINGS))
        .await;
    assert_eq!(list.status, 200, "{}", list.text);
    assert_eq!(list.body["total"], 1);
}

#[tokio::test]
async fn puntaje_outside_one_to_five_is_rejected() {
    let app = TestApp::spawn().await;
    let token = app
        .create_verified_user("fuera@example.org", "password123")
        .await;
    let id = seed_material(&app, &token).await;

    for puntaje in [0, 6, -1] {
        let res = app
            .post_with_token(
                routes::RATINGS,
                &json!({"material": id, "puntaje": puntaje}),
                &token,
            )
            .await;
        assert_eq!(res.status, 400, "puntaje {puntaje}: {}", res.text);
    }
}

#[tokio::test]
async fn one_rating_per_user_per_material() {
    let app = TestApp::spawn().await;
    let token = app
        .create_verified_user("unica@example.org", "password123")
        .await;
    let id = seed_material(&app, &token).await;

    let first = app
        .post_with_token(routes::RATINGS, &json!({"material": id, "puntaje": 3}), &token)
        .await;
    assert_eq!(first.status, 201, "{}", first.text);

    let second = app
        .post_with_token(routes::RATINGS, &json!({"material": id, "puntaje": 5}), &token)
        .await;
    assert_eq!(second.status, 409);
    assert_eq!(second.error_code(), "CONFLICT");
}

#[tokio::test]
async fn a_rating_can_be_changed_by_its_author() {
    let app = TestApp::spawn().await;
    let author = app
        .create_verified_user("cambio@example.org", "password123")
        .await;
    let other = app
        .create_verified_user("ajena@example.org", "password123")
        .await;
    let id = seed_material(&app, &author).await;

    let created = app
        .post_with_token(routes::RATINGS, &json!({"material": id, "puntaje": 2}), &author)
        .await;
    let rating_id = created.id();

    let forbidden = app
        .patch_with_token(&routes::rating(rating_id), &json!({"puntaje": 1}), &other)
        .await;
    assert_eq!(forbidden.status, 403);

    let updated = app
        .patch_with_token(&routes::rating(rating_id), &json!({"puntaje": 5}), &author)
        .await;
    assert_eq!(updated.status, 200, "{}", updated.text);
    assert_eq!(updated.body["puntaje"], 5);

    // The aggregate follows the new score.
    let material = app.get_without_token(&routes::material(id)).await;
    assert_eq!(material.body["calificacion_promedio"], 5.0);
}

#[tokio::test]
async fn a_withdrawn_rating_leaves_the_aggregate() {
    let app = TestApp::spawn().await;
    let token = app
        .create_verified_user("retiro@example.org", "password123")
        .await;
    let id = seed_material(&app, &token).await;

    let created = app
        .post_with_token(routes::RATINGS, &json!({"material": id, "puntaje": 4}), &token)
        .await;
    let rating_id = created.id();

    let deleted = app.delete_with_token(&routes::rating(rating_id), &token).await;
    assert_eq!(deleted.status, 204);

    let material = app.get_without_token(&routes::material(id)).await;
    assert!(material.body["calificacion_promedio"].is_null());
    assert_eq!(material.body["total_calificaciones"], 0);
}

#[tokio::test]
async fn rating_requires_authentication() {
    let app = TestApp::spawn().await;

    let res = app
        .post_without_token(routes::RATINGS, &json!({"material": 1, "puntaje": 5}))
        .await;
    assert_eq!(res.status, 401);
}
