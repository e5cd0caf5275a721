use super::responders::Download;
use crate::error::ApiError;
use crate::models::{
    AuthenticatedUser, DeleteResponse, Reference, ReferenceEditForm, ReferenceForm,
    ReferenceListResponse, ReferenceUploadResponse,
};
use crate::services::ReferenceService;
use crate::state::AppState;
use rocket::form::{Form, FromForm};
use rocket::fs::{NamedFile, TempFile};
use rocket::http::ContentType;
use rocket::serde::json::Json;
use rocket::{State, delete, get, post, put};

#[derive(FromForm)]
pub struct ReferenceUpload<'r> {
    pub reference_file: Option<TempFile<'r>>,
}

#[get("/api/v1/references")]
pub async fn list_references(
    state: &State<AppState>,
) -> Result<Json<ReferenceListResponse>, ApiError> {
    let references = state.database.list_references()?;
    let total_count = references.len();

    Ok(Json(ReferenceListResponse {
        references,
        total_count,
    }))
}

#[post("/api/v1/references/upload", data = "<upload>")]
pub async fn upload_reference(
    mut upload: Form<ReferenceUpload<'_>>,
    _user: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<ReferenceUploadResponse>, ApiError> {
    let Some(file) = upload.reference_file.as_mut() else {
        return Err(ApiError::invalid("reference_file", "This field is required."));
    };

    let incoming = state.storage.incoming_path();
    file.copy_to(&incoming).await?;

    let state = state.inner().clone();
    let response =
        tokio::task::spawn_blocking(move || ReferenceService::stage_upload(&state, &incoming))
            .await
            .map_err(|e| ApiError::InternalServerError(format!("Upload task failed: {e}")))??;
    Ok(Json(response))
}

#[post("/api/v1/references/<digest>", data = "<form>")]
pub async fn record_reference(
    digest: &str,
    form: Json<ReferenceForm>,
    user: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<Reference>, ApiError> {
    let reference = ReferenceService::record(state, &user, digest, form.into_inner())?;
    Ok(Json(reference))
}

#[get("/api/v1/references/<id>")]
pub async fn get_reference(id: i32, state: &State<AppState>) -> Result<Json<Reference>, ApiError> {
    Ok(Json(ReferenceService::get_visible(state, id)?))
}

#[put("/api/v1/references/<id>", data = "<form>")]
pub async fn update_reference(
    id: i32,
    form: Json<ReferenceEditForm>,
    user: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<Reference>, ApiError> {
    let reference = ReferenceService::update(state, &user, id, form.into_inner())?;
    Ok(Json(reference))
}

#[get("/api/v1/references/<id>/download")]
pub async fn download_reference(id: i32, state: &State<AppState>) -> Result<Download, ApiError> {
    let reference = ReferenceService::get_visible(state, id)?;
    let file = NamedFile::open(&reference.reference_file_path)
        .await
        .map_err(|_| ApiError::NotFound(format!("Reference file of {id} is missing")))?;

    Ok(Download {
        file,
        filename: format!("{}.fa.gz", reference.name),
    })
}

/// One record as FASTA text, reverse complemented with `?reverse=true`.
#[get("/api/v1/references/<id>/sequence/<header>?<reverse>")]
pub async fn get_sequence(
    id: i32,
    header: &str,
    reverse: Option<bool>,
    state: &State<AppState>,
) -> Result<(ContentType, String), ApiError> {
    let reference = ReferenceService::get_visible(state, id)?;
    let text = ReferenceService::sequence(&reference, header, reverse.unwrap_or(false))?;
    Ok((ContentType::Plain, text))
}

#[delete("/api/v1/references/<id>")]
pub async fn delete_reference(
    id: i32,
    user: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let removed_files = ReferenceService::erase(state, &user, id)?;
    Ok(Json(DeleteResponse {
        ok: true,
        removed_files,
    }))
}
