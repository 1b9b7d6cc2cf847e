use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/materials", material_routes())
        .nest("/favorites", favorito_routes())
        .nest("/comments", comentario_routes())
        .nest("/ratings", calificacion_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::verify_email))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
        .routes(routes!(
            handlers::auth::get_profile,
            handlers::auth::update_profile
        ))
        .routes(routes!(handlers::auth::password_reset))
        .routes(routes!(handlers::auth::password_reset_confirm))
}

fn material_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::material::list_materials,
            handlers::material::create_material
        ))
        .routes(routes!(
            handlers::material::get_material,
            handlers::material::update_material,
            handlers::material::delete_material
        ))
        .routes(routes!(handlers::material::download_material))
        .routes(routes!(handlers::material::material_thumbnail))
}

fn favorito_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::favorito::list_favoritos,
            handlers::favorito::create_favorito
        ))
        .routes(routes!(handlers::favorito::delete_favorito))
}

fn comentario_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::comentario::list_comentarios,
            handlers::comentario::create_comentario
        ))
        .routes(routes!(
            handlers::comentario::update_comentario,
            handlers::comentario::delete_comentario
        ))
}

fn calificacion_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::calificacion::list_calificaciones,
            handlers::calificacion::create_calificacion
        ))
        .routes(routes!(
            handlers::calificacion::update_calificacion,
            handlers::calificacion::delete_calificacion
        ))
}
