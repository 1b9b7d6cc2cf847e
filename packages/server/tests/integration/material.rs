use serde_json::json;

use crate::common::{TestApp, b64, pdf_bytes, png_base64, png_bytes, routes};

mod creation {
    use super::*;

    #[tokio::test]
    async fn image_upload_derives_a_thumbnail() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("subir@example.org", "password123")
            .await;

        let res = app
            .post_with_token(
                routes::MATERIALS,
                &json!({
                    "titulo": "Vocabulario kichwa: la familia",
                    "descripcion": "Láminas ilustradas",
                    "tipo": "ficha",
                    "archivo_blob": png_base64(800, 600),
                    "archivo_nombre": "familia.png",
                    "archivo_tipo": "image/png",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        let id = res.id();
        assert_eq!(
            res.body["archivo_url"],
            format!("/api/v1/materials/{id}/download/")
        );
        assert_eq!(
            res.body["thumbnail_url"],
            format!("/api/v1/materials/{id}/thumbnail/")
        );
        assert_eq!(res.body["usuario"], "subir@example.org");
    }

    #[tokio::test]
    async fn corrupt_image_still_creates_the_material() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("roto@example.org", "password123")
            .await;

        let res = app
            .post_with_token(
                routes::MATERIALS,
                &json!({
                    "titulo": "Imagen rota",
                    "tipo": "ficha",
                    "archivo_blob": b64(b"definitely not a png"),
                    "archivo_nombre": "rota.png",
                    "archivo_tipo": "image/png",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.body["thumbnail_url"].is_null());

        let thumb = app
            .get_without_token(&routes::material_thumbnail(res.id()))
            .await;
        assert_eq!(thumb.status, 404);
        assert_eq!(thumb.error_code(), "NO_CONTENT");
    }

    #[tokio::test]
    async fn video_url_alone_is_enough() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("video@example.org", "password123")
            .await;

        let res = app
            .post_with_token(
                routes::MATERIALS,
                &json!({
                    "titulo": "Canción de los números",
                    "tipo": "video",
                    "video_url": "https://videos.example.org/numeros",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.body["archivo_url"].is_null());
        assert!(res.body["thumbnail_url"].is_null());

        let id = res.id();
        let download = app.get_without_token(&routes::material_download(id)).await;
        assert_eq!(download.status, 404);
        assert_eq!(download.error_code(), "NO_CONTENT");

        let thumb = app.get_without_token(&routes::material_thumbnail(id)).await;
        assert_eq!(thumb.status, 404);
        assert_eq!(thumb.error_code(), "NO_CONTENT");
    }

    #[tokio::test]
    async fn file_or_video_url_is_required() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("vacio@example.org", "password123")
            .await;

        let res = app
            .post_with_token(
                routes::MATERIALS,
                &json!({"titulo": "Sin contenido", "tipo": "ficha"}),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.error_code(), "VALIDATION_ERROR");

        // A whitespace-only video URL counts as absent.
        let res = app
            .post_with_token(
                routes::MATERIALS,
                &json!({"titulo": "Sin contenido", "tipo": "video", "video_url": "   "}),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn malformed_base64_fails_the_whole_request() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("base64@example.org", "password123")
            .await;

        let res = app
            .post_with_token(
                routes::MATERIALS,
                &json!({
                    "titulo": "Payload roto",
                    "tipo": "ficha",
                    "archivo_blob": "!!!not-base64!!!",
                    "archivo_tipo": "image/png",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 400, "{}", res.text);
        assert_eq!(res.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn video_files_get_no_thumbnail() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("mp4@example.org", "password123")
            .await;

        let res = app
            .post_with_token(
                routes::MATERIALS,
                &json!({
                    "titulo": "Clip corto",
                    "tipo": "video",
                    "archivo_blob": b64(&[0u8; 256]),
                    "archivo_nombre": "clip.mp4",
                    "archivo_tipo": "video/mp4",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.body["thumbnail_url"].is_null());
    }

    #[tokio::test]
    async fn unknown_tipo_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("tipo@example.org", "password123")
            .await;

        let res = app
            .post_with_token(
                routes::MATERIALS,
                &json!({
                    "titulo": "Tipo raro",
                    "tipo": "cartel",
                    "video_url": "https://videos.example.org/x",
                }),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn anonymous_upload_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::MATERIALS,
                &json!({
                    "titulo": "Anónimo",
                    "tipo": "ficha",
                    "video_url": "https://videos.example.org/x",
                }),
            )
            .await;
        assert_eq!(res.status, 401);
    }

    #[tokio::test]
    async fn responses_never_expose_blob_fields() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("oculto@example.org", "password123")
            .await;

        let res = app
            .post_with_token(
                routes::MATERIALS,
                &json!({
                    "titulo": "Sin fugas",
                    "tipo": "ficha",
                    "archivo_blob": png_base64(64, 64),
                    "archivo_nombre": "fuga.png",
                    "archivo_tipo": "image/png",
                }),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);

        for response in [
            &res,
            &app.get_without_token(&routes::material(res.id())).await,
            &app.get_without_token(routes::MATERIALS).await,
        ] {
            assert!(
                !response.text.contains("archivo_blob")
                    && !response.text.contains("thumbnail_blob"),
                "blob key leaked: {}",
                response.text
            );
        }
    }
}

mod retrieval {
    use super::*;

    #[tokio::test]
    async fn download_round_trips_bytes_and_headers() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("bajar@example.org", "password123")
            .await;

        let original = pdf_bytes();
        let id = app
            .create_material(
                &token,
                &json!({
                    "titulo": "Guía del docente",
                    "tipo": "ficha",
                    "archivo_blob": b64(&original),
                    "archivo_nombre": "guia.pdf",
                    "archivo_tipo": "application/pdf",
                }),
            )
            .await;

        let res = app.get_raw(&routes::material_download(id)).await;
        assert_eq!(res.status(), 200);
        assert_eq!(
            res.headers()["content-type"].to_str().unwrap(),
            "application/pdf"
        );
        let disposition = res.headers()["content-disposition"].to_str().unwrap();
        assert!(
            disposition.starts_with("attachment; filename=\"guia.pdf\""),
            "{disposition}"
        );
        assert_eq!(res.bytes().await.unwrap().as_ref(), original.as_slice());
    }

    #[tokio::test]
    async fn download_defaults_the_content_type_and_filename() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("sintipo@example.org", "password123")
            .await;

        let id = app
            .create_material(
                &token,
                &json!({
                    "titulo": "Bytes anónimos",
                    "tipo": "ficha",
                    "archivo_blob": b64(&[1u8, 2, 3, 4]),
                }),
            )
            .await;

        let res = app.get_raw(&routes::material_download(id)).await;
        assert_eq!(res.status(), 200);
        assert_eq!(
            res.headers()["content-type"].to_str().unwrap(),
            "application/octet-stream"
        );
        let disposition = res.headers()["content-disposition"].to_str().unwrap();
        assert!(
            disposition.starts_with(&format!("attachment; filename=\"material_{id}\"")),
            "{disposition}"
        );
    }

    #[tokio::test]
    async fn thumbnail_is_a_bounded_png_served_inline() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("miniatura@example.org", "password123")
            .await;

        let id = app
            .create_material(
                &token,
                &json!({
                    "titulo": "Paisaje andino",
                    "tipo": "ficha",
                    "archivo_blob": png_base64(800, 600),
                    "archivo_nombre": "paisaje.png",
                    "archivo_tipo": "image/png",
                }),
            )
            .await;

        let res = app.get_raw(&routes::material_thumbnail(id)).await;
        assert_eq!(res.status(), 200);
        assert_eq!(res.headers()["content-type"].to_str().unwrap(), "image/png");
        let disposition = res.headers()["content-disposition"].to_str().unwrap();
        assert!(
            disposition.starts_with(&format!("inline; filename=\"thumbnail_{id}.png\"")),
            "{disposition}"
        );

        let bytes = res.bytes().await.unwrap();
        let img = image::load_from_memory(&bytes).expect("thumbnail should decode");
        assert_eq!(img.width(), 400);
        assert_eq!(img.height(), 300);
    }

    #[tokio::test]
    async fn missing_material_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(&routes::material(999_999)).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.error_code(), "NOT_FOUND");

        // Distinct from a material that exists but has no artifact.
        let res = app
            .get_without_token(&routes::material_download(999_999))
            .await;
        assert_eq!(res.error_code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn declared_mime_type_is_served_as_is() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("confiado@example.org", "password123")
            .await;

        // The declared type is trusted even when it doesn't match the bytes.
        let id = app
            .create_material(
                &token,
                &json!({
                    "titulo": "Etiqueta engañosa",
                    "tipo": "ficha",
                    "archivo_blob": b64(b"plain text"),
                    "archivo_nombre": "texto.csv",
                    "archivo_tipo": "text/csv",
                }),
            )
            .await;

        let res = app.get_raw(&routes::material_download(id)).await;
        assert_eq!(res.headers()["content-type"].to_str().unwrap(), "text/csv");
    }
}

mod listing {
    use super::*;

    async fn seed_materials(app: &TestApp, token: &str) {
        for (titulo, tipo) in [
            ("Ficha de saludos", "ficha"),
            ("Presentación de números", "presentacion"),
            ("Video de la familia", "video"),
        ] {
            app.create_material(
                token,
                &json!({
                    "titulo": titulo,
                    "tipo": tipo,
                    "video_url": "https://videos.example.org/x",
                }),
            )
            .await;
        }
    }

    #[tokio::test]
    async fn listing_is_open_and_paginated() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("lista@example.org", "password123")
            .await;
        seed_materials(&app, &token).await;

        let res = app
            .get_without_token(&format!("{}?page=1&per_page=2", routes::MATERIALS))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 2);
        assert_eq!(res.body["pagination"]["total"], 3);
        assert_eq!(res.body["pagination"]["total_pages"], 2);
    }

    #[tokio::test]
    async fn authenticated_listing_shows_only_own_materials() {
        let app = TestApp::spawn().await;
        let uploader = app
            .create_verified_user("subida@example.org", "password123")
            .await;
        let viewer = app
            .create_verified_user("visita@example.org", "password123")
            .await;
        seed_materials(&app, &uploader).await;

        let own = app.get_with_token(routes::MATERIALS, &uploader).await;
        assert_eq!(own.body["pagination"]["total"], 3);

        let others = app.get_with_token(routes::MATERIALS, &viewer).await;
        assert_eq!(others.body["pagination"]["total"], 0);

        // Anonymous callers still see everything.
        let anon = app.get_without_token(routes::MATERIALS).await;
        assert_eq!(anon.body["pagination"]["total"], 3);
    }

    #[tokio::test]
    async fn tipo_filter_narrows_the_listing() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("filtro@example.org", "password123")
            .await;
        seed_materials(&app, &token).await;

        let res = app
            .get_without_token(&format!("{}?tipo=video", routes::MATERIALS))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["tipo"], "video");
    }

    #[tokio::test]
    async fn search_matches_title_and_description() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("buscar@example.org", "password123")
            .await;
        seed_materials(&app, &token).await;
        app.create_material(
            &token,
            &json!({
                "titulo": "Otro recurso",
                "descripcion": "incluye saludos formales",
                "tipo": "ficha",
                "video_url": "https://videos.example.org/x",
            }),
        )
        .await;

        let res = app
            .get_without_token(&format!("{}?search=saludos", routes::MATERIALS))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn sorting_by_title_ascending() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("orden@example.org", "password123")
            .await;
        seed_materials(&app, &token).await;

        let res = app
            .get_without_token(&format!(
                "{}?sort_by=titulo&sort_order=asc",
                routes::MATERIALS
            ))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let titles: Vec<&str> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["titulo"].as_str().unwrap())
            .collect();
        let mut sorted = titles.clone();
        sorted.sort();
        assert_eq!(titles, sorted);
    }

    #[tokio::test]
    async fn invalid_sort_key_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .get_without_token(&format!("{}?sort_by=descripcion", routes::MATERIALS))
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn ratings_summary_appears_in_listings() {
        let app = TestApp::spawn().await;
        let owner = app
            .create_verified_user("autor@example.org", "password123")
            .await;
        let rater_a = app
            .create_verified_user("a@example.org", "password123")
            .await;
        let rater_b = app
            .create_verified_user("b@example.org", "password123")
            .await;

        let id = app
            .create_material(
                &owner,
                &json!({
                    "titulo": "Material valorado",
                    "tipo": "ficha",
                    "video_url": "https://videos.example.org/x",
                }),
            )
            .await;

        for (token, puntaje) in [(&rater_a, 4), (&rater_b, 5)] {
            let res = app
                .post_with_token(
                    routes::RATINGS,
                    &json!({"material": id, "puntaje": puntaje}),
                    token,
                )
                .await;
            assert_eq!(res.status, 201, "{}", res.text);
        }

        // Anonymous view: aggregate only.
        let anon = app.get_without_token(&routes::material(id)).await;
        assert_eq!(anon.body["calificacion_promedio"], 4.5);
        assert_eq!(anon.body["total_calificaciones"], 2);
        assert!(anon.body["mi_calificacion"].is_null());

        // A rater sees their own score.
        let mine = app.get_with_token(&routes::material(id), &rater_a).await;
        assert_eq!(mine.body["mi_calificacion"], 4);
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn owner_can_update_metadata() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("editar@example.org", "password123")
            .await;
        let id = app
            .create_material(
                &token,
                &json!({
                    "titulo": "Título provisional",
                    "tipo": "ficha",
                    "video_url": "https://videos.example.org/x",
                }),
            )
            .await;

        let res = app
            .patch_with_token(
                &routes::material(id),
                &json!({"titulo": "Título definitivo"}),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["titulo"], "Título definitivo");
    }

    #[tokio::test]
    async fn non_owner_cannot_touch_the_material() {
        let app = TestApp::spawn().await;
        let owner = app
            .create_verified_user("duena@example.org", "password123")
            .await;
        let intruder = app
            .create_verified_user("intrusa@example.org", "password123")
            .await;
        let id = app
            .create_material(
                &owner,
                &json!({
                    "titulo": "Material ajeno",
                    "tipo": "ficha",
                    "video_url": "https://videos.example.org/x",
                }),
            )
            .await;

        let patch = app
            .patch_with_token(&routes::material(id), &json!({"titulo": "Mío"}), &intruder)
            .await;
        assert_eq!(patch.status, 403);
        assert_eq!(patch.error_code(), "PERMISSION_DENIED");

        let delete = app.delete_with_token(&routes::material(id), &intruder).await;
        assert_eq!(delete.status, 403);
    }

    #[tokio::test]
    async fn clearing_the_last_content_source_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("borrar@example.org", "password123")
            .await;

        let id = app
            .create_material(
                &token,
                &json!({
                    "titulo": "Solo archivo",
                    "tipo": "ficha",
                    "archivo_blob": png_base64(32, 32),
                    "archivo_nombre": "f.png",
                    "archivo_tipo": "image/png",
                }),
            )
            .await;

        let res = app
            .patch_with_token(&routes::material(id), &json!({"archivo_blob": null}), &token)
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.error_code(), "VALIDATION_ERROR");

        // Swapping the file for a video URL in the same request is fine.
        let res = app
            .patch_with_token(
                &routes::material(id),
                &json!({"archivo_blob": null, "video_url": "https://videos.example.org/x"}),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["archivo_url"].is_null());
        assert!(res.body["archivo_nombre"].is_null());
    }

    #[tokio::test]
    async fn replacing_the_file_keeps_the_old_thumbnail() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("estable@example.org", "password123")
            .await;

        let id = app
            .create_material(
                &token,
                &json!({
                    "titulo": "Miniatura congelada",
                    "tipo": "ficha",
                    "archivo_blob": png_base64(800, 600),
                    "archivo_nombre": "v1.png",
                    "archivo_tipo": "image/png",
                }),
            )
            .await;

        let before = app
            .get_raw(&routes::material_thumbnail(id))
            .await
            .bytes()
            .await
            .unwrap();

        let res = app
            .patch_with_token(
                &routes::material(id),
                &json!({"archivo_blob": png_base64(600, 800), "archivo_nombre": "v2.png"}),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let after = app
            .get_raw(&routes::material_thumbnail(id))
            .await
            .bytes()
            .await
            .unwrap();
        assert_eq!(before, after);
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn delete_cascades_to_dependents() {
        let app = TestApp::spawn().await;
        let owner = app
            .create_verified_user("cascada@example.org", "password123")
            .await;
        let fan = app
            .create_verified_user("fan@example.org", "password123")
            .await;

        let id = app
            .create_material(
                &owner,
                &json!({
                    "titulo": "Material popular",
                    "tipo": "ficha",
                    "video_url": "https://videos.example.org/x",
                }),
            )
            .await;

        let fav = app
            .post_with_token(routes::FAVORITES, &json!({"material": id}), &fan)
            .await;
        assert_eq!(fav.status, 201, "{}", fav.text);
        let comment = app
            .post_with_token(
                routes::COMMENTS,
                &json!({"material": id, "texto": "¡Muy útil!"}),
                &fan,
            )
            .await;
        assert_eq!(comment.status, 201, "{}", comment.text);
        let rating = app
            .post_with_token(routes::RATINGS, &json!({"material": id, "puntaje": 5}), &fan)
            .await;
        assert_eq!(rating.status, 201, "{}", rating.text);

        let res = app.delete_with_token(&routes::material(id), &owner).await;
        assert_eq!(res.status, 204);

        let favorites = app.get_with_token(routes::FAVORITES, &fan).await;
        assert_eq!(favorites.body["total"], 0);

        let comments = app
            .get_without_token(&format!("{}?material={id}", routes::COMMENTS))
            .await;
        assert_eq!(comments.body["total"], 0);

        let ratings = app
            .get_without_token(&format!("{}?material={id}", routes::RATINGS))
            .await;
        assert_eq!(ratings.body["total"], 0);
    }
}

mod backfill {
    use super::*;
    use sea_orm::EntityTrait;
    use server::entity::material;

    #[tokio::test]
    async fn backfill_is_idempotent_and_absorbs_unsupported_pdfs() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("pdf@example.org", "password123")
            .await;

        let id = app
            .create_material(
                &token,
                &json!({
                    "titulo": "Guía en PDF",
                    "tipo": "ficha",
                    "archivo_blob": b64(&pdf_bytes()),
                    "archivo_nombre": "guia.pdf",
                    "archivo_tipo": "application/pdf",
                }),
            )
            .await;

        // Without a PDF rasterizer the hook has nothing to produce; running it
        // repeatedly must neither fail nor alter the record.
        let thumbnailer = media::Thumbnailer::new(400, media::pdf::default_rasterizer());
        server::ingest::backfill_pdf_thumbnail(&app.db, &thumbnailer, id).await;
        server::ingest::backfill_pdf_thumbnail(&app.db, &thumbnailer, id).await;

        let model = material::Entity::find_by_id(id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert!(model.thumbnail_blob.is_none());

        let thumb = app.get_without_token(&routes::material_thumbnail(id)).await;
        assert_eq!(thumb.status, 404);
        assert_eq!(thumb.error_code(), "NO_CONTENT");
    }

    #[tokio::test]
    async fn backfill_never_touches_an_existing_thumbnail() {
        let app = TestApp::spawn().await;
        let token = app
            .create_verified_user("intacta@example.org", "password123")
            .await;

        let id = app
            .create_material(
                &token,
                &json!({
                    "titulo": "Imagen con miniatura",
                    "tipo": "ficha",
                    "archivo_blob": png_base64(100, 100),
                    "archivo_nombre": "img.png",
                    "archivo_tipo": "image/png",
                }),
            )
            .await;

        let before = material::Entity::find_by_id(id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert!(before.thumbnail_blob.is_some());

        let thumbnailer = media::Thumbnailer::new(400, media::pdf::default_rasterizer());
        server::ingest::backfill_pdf_thumbnail(&app.db, &thumbnailer, id).await;

        let after = material::Entity::find_by_id(id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(before.thumbnail_blob, after.thumbnail_blob);
    }

    #[tokio::test]
    async fn backfill_ignores_missing_materials() {
        let app = TestApp::spawn().await;

        let thumbnailer = media::Thumbnailer::new(400, media::pdf::default_rasterizer());
        server::ingest::backfill_pdf_thumbnail(&app.db, &thumbnailer, 424242).await;
    }
}
