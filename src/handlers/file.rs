use actix_web::{
    HttpRequest, HttpResponse,
    http::header::{self, ContentDisposition},
    web,
};
use futures_util::StreamExt;
use uuid::Uuid;

use crate::{
    Conn,
    auth::AuthUser,
    db, dtos,
    error::{ApiError, AppError},
    models::{NewStoredFile, StoredFile, User},
    storage, validation,
};

use super::AppState;
use super::response::validation_error_response;

async fn load_file<'a>(
    conn: &mut Conn<'a>,
    user: &User,
    file_id: Uuid,
) -> Result<StoredFile, ApiError> {
    match db::find_file(conn, file_id).await? {
        Some(f) if user.can_access(f.owner_id) => Ok(f),
        _ => Err(AppError::not_found("File", file_id).into()),
    }
}

/// Content type from the request, falling back to a guess from the file name.
fn content_type_for(req: &HttpRequest, filename: &str) -> String {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "application/octet-stream")
        .map(str::to_string)
        .unwrap_or_else(|| {
            mime_guess::from_path(filename)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        })
}

#[utoipa::path(
    post,
    path = "/files",
    summary = "Upload a file",
    description = "Stores the raw request body. The content type is taken from the `Content-Type` header, or guessed from `filename` when the header is missing or generic. Bodies above `MAX_UPLOAD_BYTES` are rejected with 413.",
    params(dtos::UploadQueryDto),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "File stored", body = dtos::FileDto),
        (status = 400, description = "Invalid file name or empty body"),
        (status = 413, description = "File too large"),
    ),
    tag = "files"
)]
pub async fn upload_file(
    req: HttpRequest,
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    query: web::Query<dtos::UploadQueryDto>,
    mut payload: web::Payload,
) -> actix_web::Result<HttpResponse> {
    let filename = query.into_inner().filename.trim().to_string();
    if let Err(errors) = validation::validate_filename(&filename) {
        return Ok(validation_error_response(&errors));
    }

    let limit = state.config.storage.max_upload_bytes;
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk?;
        if body.len() + chunk.len() > limit {
            return Err(ApiError::PayloadTooLarge(format!(
                "Files cannot exceed {} bytes",
                limit
            ))
            .into());
        }
        body.extend_from_slice(&chunk);
    }
    if body.is_empty() {
        return Err(ApiError::BadRequest("Empty file".to_string()).into());
    }

    let file = persist_upload(
        &state,
        NewStoredFile {
            id: Uuid::new_v4(),
            owner_id: user.id,
            object_key: String::new(),
            content_type: content_type_for(&req, &filename),
            filename,
            size_bytes: body.len() as i64,
        },
        &body,
    )
    .await?;
    log::info!("File {} uploaded by {} ({} bytes)", file.id, user.id, file.size_bytes);
    Ok(HttpResponse::Created().json(dtos::FileDto::from(file)))
}

/// Write `data` to the object store and record it. The connection is taken
/// first; an object is only left behind once its row exists.
pub async fn persist_upload(
    state: &AppState,
    mut file: NewStoredFile,
    data: &[u8],
) -> actix_web::Result<StoredFile> {
    let mut conn = state.conn().await?;

    file.object_key = storage::object_key(file.owner_id, file.id);
    let key = file.object_key.clone();
    state.store.put(&key, data).await.map_err(ApiError::from)?;

    match db::insert_file(&mut conn, file).await {
        Ok(file) => Ok(file),
        Err(e) => {
            if let Err(cleanup) = state.store.delete(&key).await {
                log::error!("Failed to remove orphaned object {}: {}", key, cleanup);
            }
            Err(ApiError::from(e).into())
        }
    }
}

#[utoipa::path(
    get,
    path = "/files",
    summary = "List own files",
    params(dtos::PaginationDto),
    responses(
        (status = 200, description = "The caller's files, newest first", body = Vec<dtos::FileDto>),
        (status = 401, description = "Not signed in"),
    ),
    tag = "files"
)]
pub async fn list_files(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    pagination: web::Query<dtos::PaginationDto>,
) -> actix_web::Result<HttpResponse> {
    let mut conn = state.conn().await?;
    let pagination = pagination.into_inner().resolve(&state.config);
    let files = db::list_files(&mut conn, user.id, pagination)
        .await
        .map_err(ApiError::from)?;
    let body: Vec<dtos::FileDto> = files.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    get,
    path = "/files/{file_id}",
    summary = "Download a file",
    params(("file_id" = Uuid, Path, description = "The UUID of the file")),
    responses(
        (status = 200, description = "File contents with the stored content type"),
        (status = 404, description = "No file with this ID visible to the caller"),
    ),
    tag = "files"
)]
pub async fn download_file(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    file_id: web::Path<Uuid>,
) -> actix_web::Result<HttpResponse> {
    let file = {
        let mut conn = state.conn().await?;
        load_file(&mut conn, &user, *file_id).await?
    };

    let data = state
        .store
        .get(&file.object_key)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| {
            log::error!("Object {} of file {} is missing", file.object_key, file.id);
            ApiError::NotFound(format!("File {} has no contents", file.id))
        })?;

    Ok(HttpResponse::Ok()
        .content_type(file.content_type.as_str())
        .insert_header(ContentDisposition::attachment(file.filename.clone()))
        .body(data))
}

#[utoipa::path(
    delete,
    path = "/files/{file_id}",
    summary = "Delete a file",
    params(("file_id" = Uuid, Path, description = "The UUID of the file")),
    responses(
        (status = 204, description = "File deleted"),
        (status = 404, description = "No file with this ID visible to the caller"),
    ),
    tag = "files"
)]
pub async fn delete_file(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    file_id: web::Path<Uuid>,
) -> actix_web::Result<HttpResponse> {
    let mut conn = state.conn().await?;
    load_file(&mut conn, &user, *file_id).await?;

    if let Some(file) = db::delete_file(&mut conn, *file_id)
        .await
        .map_err(ApiError::from)?
    {
        state
            .store
            .delete(&file.object_key)
            .await
            .map_err(ApiError::from)?;
        log::info!("File {} deleted by {}", file.id, user.id);
    }
    Ok(HttpResponse::NoContent().finish())
}
