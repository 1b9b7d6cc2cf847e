use std::collections::HashMap;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{calificacion, comentario, favorito, material, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, OptionalAuthUser};
use crate::extractors::json::AppJson;
use crate::ingest;
use crate::models::material::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Materials",
    operation_id = "createMaterial",
    summary = "Upload a new material",
    description = "Creates a material from a base64-encoded file and/or a video URL; \
        at least one of the two is required. A preview thumbnail is derived \
        best-effort from image and PDF files and never blocks the upload.",
    request_body = CreateMaterialRequest,
    responses(
        (status = 201, description = "Material created", body = MaterialResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, titulo = %payload.titulo))]
pub async fn create_material(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateMaterialRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_material(&payload)?;

    let content = ingest::resolve_new_content(
        payload.archivo_blob.as_deref(),
        payload.archivo_nombre,
        payload.archivo_tipo,
        payload.video_url,
        state.config.media.max_file_size,
    )?;

    let thumbnail = ingest::derive_thumbnail(&state.thumbnailer, &content);
    let (thumbnail_blob, thumbnail_tipo) = match thumbnail {
        Some(t) => (Some(t.data), Some(t.content_type.to_string())),
        None => (None, None),
    };

    let new_material = material::ActiveModel {
        titulo: Set(payload.titulo.trim().to_string()),
        descripcion: Set(payload.descripcion),
        tipo: Set(payload.tipo),
        archivo_blob: Set(content.archivo_blob),
        archivo_nombre: Set(content.archivo_nombre),
        archivo_tipo: Set(content.archivo_tipo),
        video_url: Set(content.video_url),
        thumbnail_blob: Set(thumbnail_blob),
        thumbnail_tipo: Set(thumbnail_tipo),
        usuario_id: Set(auth_user.user_id),
        fecha_creacion: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let model = new_material.insert(&state.db).await?;

    // Post-commit: catch PDFs whose thumbnail was not produced inline. Gates
    // itself and never fails the request.
    ingest::backfill_pdf_thumbnail(&state.db, &state.thumbnailer, model.id).await;

    let model = find_material(&state.db, model.id).await?;
    let owner = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MaterialResponse::build(model, owner.as_ref(), None, None)),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Materials",
    operation_id = "listMaterials",
    summary = "List materials with pagination, search and filters",
    description = "Open endpoint. Supports case-insensitive search over title and \
        description, filtering by kind and owner, and sorting by `fecha_creacion` \
        (default, desc) or `titulo`. Anonymous callers see every material; an \
        authenticated caller sees only their own, with their rating in \
        `mi_calificacion`.",
    params(MaterialListQuery),
    responses(
        (status = 200, description = "Material list", body = MaterialListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth, query))]
pub async fn list_materials(
    OptionalAuthUser(auth): OptionalAuthUser,
    State(state): State<AppState>,
    Query(query): Query<MaterialListQuery>,
) -> Result<Json<MaterialListResponse>, AppError> {
    let page = Ord::max(query.page.unwrap_or(1), 1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let mut select = material::Entity::find();

    // The listing doubles as "my materials" for authenticated callers.
    if let Some(ref auth_user) = auth {
        select = select.filter(material::Column::UsuarioId.eq(auth_user.user_id));
    }

    if let Some(ref tipo) = query.tipo {
        validate_tipo(tipo)?;
        select = select.filter(material::Column::Tipo.eq(tipo));
    }
    if let Some(usuario) = query.usuario {
        select = select.filter(material::Column::UsuarioId.eq(usuario));
    }

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            let pattern = format!("%{}%", term.to_lowercase());
            select = select.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(material::Column::Titulo)))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(material::Column::Descripcion)))
                            .like(LikeExpr::new(pattern).escape('\\')),
                    ),
            );
        }
    }

    let sort_by = query.sort_by.as_deref().unwrap_or("fecha_creacion");
    let sort_order = if query.sort_order.as_deref() == Some("asc") {
        Order::Asc
    } else {
        Order::Desc
    };
    let sort_column = match sort_by {
        "fecha_creacion" => material::Column::FechaCreacion,
        "titulo" => material::Column::Titulo,
        _ => {
            return Err(AppError::Validation(
                "sort_by must be one of: fecha_creacion, titulo".into(),
            ));
        }
    };

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;
    let total_pages = total.div_ceil(per_page);

    let rows = select
        .order_by(sort_column, sort_order)
        .select_only()
        .column(material::Column::Id)
        .column(material::Column::Titulo)
        .column(material::Column::Descripcion)
        .column(material::Column::Tipo)
        .column(material::Column::ArchivoNombre)
        .column(material::Column::ArchivoTipo)
        .column(material::Column::VideoUrl)
        .column(material::Column::UsuarioId)
        .column(material::Column::FechaCreacion)
        .expr_as(
            Expr::col(material::Column::ArchivoBlob).is_not_null(),
            "has_archivo",
        )
        .expr_as(
            Expr::col(material::Column::ThumbnailBlob).is_not_null(),
            "has_thumbnail",
        )
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .into_model::<MaterialListRow>()
        .all(&state.db)
        .await?;

    let material_ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
    let owner_ids: Vec<i32> = rows.iter().map(|r| r.usuario_id).collect();

    let owners = load_owners(&state.db, &owner_ids).await?;
    let aggregates = rating_aggregates(&state.db, &material_ids).await?;
    let my_ratings = match auth {
        Some(ref auth_user) => load_my_ratings(&state.db, auth_user.user_id, &material_ids).await?,
        None => HashMap::new(),
    };

    let data = rows
        .into_iter()
        .map(|row| {
            let owner = owners.get(&row.usuario_id);
            let aggregate = aggregates.get(&row.id);
            let mine = my_ratings.get(&row.id).copied();
            MaterialResponse::from_row(row, owner, aggregate, mine)
        })
        .collect();

    Ok(Json(MaterialListResponse {
        data,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages,
        },
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Materials",
    operation_id = "getMaterial",
    summary = "Get one material",
    description = "Open endpoint. Binary content is referenced by URL, never inlined.",
    params(("id" = i32, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Material details", body = MaterialResponse),
        (status = 404, description = "Material not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth), fields(id))]
pub async fn get_material(
    OptionalAuthUser(auth): OptionalAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MaterialResponse>, AppError> {
    let model = find_material(&state.db, id).await?;
    build_single_response(&state, model, auth.as_ref().map(|a| a.user_id)).await
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Materials",
    operation_id = "updateMaterial",
    summary = "Update a material",
    description = "Owner only. PATCH semantics: absent fields are untouched, null \
        clears a nullable field, values replace. The merged state must still hold \
        a file or a video URL. Replacing the file does not regenerate the thumbnail.",
    params(("id" = i32, Path, description = "Material ID")),
    request_body = UpdateMaterialRequest,
    responses(
        (status = 200, description = "Material updated", body = MaterialResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Material not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, user_id = auth_user.user_id))]
pub async fn update_material(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateMaterialRequest>,
) -> Result<Json<MaterialResponse>, AppError> {
    validate_update_material(&payload)?;

    if payload == UpdateMaterialRequest::default() {
        let existing = find_material(&state.db, id).await?;
        require_owner(&existing, auth_user.user_id)?;
        return build_single_response(&state, existing, Some(auth_user.user_id)).await;
    }

    let txn = state.db.begin().await?;

    let existing = find_material(&txn, id).await?;
    require_owner(&existing, auth_user.user_id)?;

    let content = ingest::resolve_updated_content(
        &existing,
        payload.archivo_blob,
        payload.archivo_nombre,
        payload.archivo_tipo,
        payload.video_url,
        state.config.media.max_file_size,
    )?;

    let mut active: material::ActiveModel = existing.into();
    if let Some(ref titulo) = payload.titulo {
        active.titulo = Set(titulo.trim().to_string());
    }
    if let Some(descripcion) = payload.descripcion {
        active.descripcion = Set(descripcion);
    }
    if let Some(tipo) = payload.tipo {
        active.tipo = Set(tipo);
    }
    active.archivo_blob = Set(content.archivo_blob);
    active.archivo_nombre = Set(content.archivo_nombre);
    active.archivo_tipo = Set(content.archivo_tipo);
    active.video_url = Set(content.video_url);

    let model = active.update(&txn).await?;
    txn.commit().await?;

    build_single_response(&state, model, Some(auth_user.user_id)).await
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Materials",
    operation_id = "deleteMaterial",
    summary = "Delete a material",
    description = "Owner only. Also removes the material's favorites, comments and ratings.",
    params(("id" = i32, Path, description = "Material ID")),
    responses(
        (status = 204, description = "Material deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Material not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn delete_material(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;

    let existing = find_material(&txn, id).await?;
    require_owner(&existing, auth_user.user_id)?;

    favorito::Entity::delete_many()
        .filter(favorito::Column::MaterialId.eq(id))
        .exec(&txn)
        .await?;
    comentario::Entity::delete_many()
        .filter(comentario::Column::MaterialId.eq(id))
        .exec(&txn)
        .await?;
    calificacion::Entity::delete_many()
        .filter(calificacion::Column::MaterialId.eq(id))
        .exec(&txn)
        .await?;
    material::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/{id}/download/",
    tag = "Materials",
    operation_id = "downloadMaterial",
    summary = "Download the stored file",
    description = "Open endpoint. Serves the original bytes with the declared MIME \
        type (falling back to application/octet-stream) as an attachment. Materials \
        without a stored file answer 404 with code NO_CONTENT.",
    params(("id" = i32, Path, description = "Material ID")),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "Material missing or has no file (NOT_FOUND, NO_CONTENT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn download_material(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let model = find_material(&state.db, id).await?;

    let Some(blob) = model.archivo_blob else {
        return Err(AppError::NoContent("Material has no stored file".into()));
    };
    let content_type = model
        .archivo_tipo
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let filename = model
        .archivo_nombre
        .unwrap_or_else(|| format!("material_{id}"));

    binary_response(blob, &content_type, "attachment", &filename)
}

#[utoipa::path(
    get,
    path = "/{id}/thumbnail/",
    tag = "Materials",
    operation_id = "materialThumbnail",
    summary = "Fetch the derived thumbnail",
    description = "Open endpoint. Serves the preview inline. Materials without a \
        derived thumbnail answer 404 with code NO_CONTENT.",
    params(("id" = i32, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Thumbnail image"),
        (status = 404, description = "Material missing or has no thumbnail (NOT_FOUND, NO_CONTENT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn material_thumbnail(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let model = find_material(&state.db, id).await?;

    let Some(blob) = model.thumbnail_blob else {
        return Err(AppError::NoContent("Material has no thumbnail".into()));
    };
    let content_type = model
        .thumbnail_tipo
        .unwrap_or_else(|| "image/png".to_string());
    let filename = format!("thumbnail_{id}.png");

    binary_response(blob, &content_type, "inline", &filename)
}

pub(crate) async fn find_material<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<material::Model, AppError> {
    material::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Material not found".into()))
}

fn require_owner(model: &material::Model, user_id: i32) -> Result<(), AppError> {
    if model.usuario_id == user_id {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

async fn build_single_response(
    state: &AppState,
    model: material::Model,
    caller: Option<i32>,
) -> Result<Json<MaterialResponse>, AppError> {
    let id = model.id;
    let owner = user::Entity::find_by_id(model.usuario_id)
        .one(&state.db)
        .await?;
    let aggregates = rating_aggregates(&state.db, &[id]).await?;
    let mine = match caller {
        Some(user_id) => load_my_ratings(&state.db, user_id, &[id])
            .await?
            .get(&id)
            .copied(),
        None => None,
    };

    Ok(Json(MaterialResponse::build(
        model,
        owner.as_ref(),
        aggregates.get(&id),
        mine,
    )))
}

/// Grouped rating average and count for a set of materials.
async fn rating_aggregates<C: ConnectionTrait>(
    db: &C,
    material_ids: &[i32],
) -> Result<HashMap<i32, RatingAggregate>, AppError> {
    if material_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = calificacion::Entity::find()
        .select_only()
        .column(calificacion::Column::MaterialId)
        .column_as(Expr::cust("AVG(puntaje)::double precision"), "promedio")
        .column_as(calificacion::Column::Id.count(), "total")
        .filter(calificacion::Column::MaterialId.is_in(material_ids.iter().copied()))
        .group_by(calificacion::Column::MaterialId)
        .into_model::<RatingAggregate>()
        .all(db)
        .await?;

    Ok(rows.into_iter().map(|r| (r.material_id, r)).collect())
}

async fn load_owners<C: ConnectionTrait>(
    db: &C,
    user_ids: &[i32],
) -> Result<HashMap<i32, user::Model>, AppError> {
    if user_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids.iter().copied()))
        .all(db)
        .await?;
    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

async fn load_my_ratings<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    material_ids: &[i32],
) -> Result<HashMap<i32, i16>, AppError> {
    if material_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let ratings = calificacion::Entity::find()
        .filter(calificacion::Column::UsuarioId.eq(user_id))
        .filter(calificacion::Column::MaterialId.is_in(material_ids.iter().copied()))
        .all(db)
        .await?;
    Ok(ratings
        .into_iter()
        .map(|r| (r.material_id, r.puntaje))
        .collect())
}

fn binary_response(
    blob: Vec<u8>,
    content_type: &str,
    disposition: &str,
    filename: &str,
) -> Result<Response, AppError> {
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, blob.len().to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(disposition, filename),
        )
        .body(Body::from(blob))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;

    Ok(response)
}

/// Build a safe `Content-Disposition` header value.
fn content_disposition_value(disposition: &str, filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("{disposition}; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
