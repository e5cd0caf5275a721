use crate::error::ApiError;
use crate::models::{
    AuthenticatedUser, ConfirmRiboForm, DeleteResponse, DescriptionForm, Experiment, Project,
    ProjectForm, ProjectListResponse, ProjectWithExperiments, RiboUploadResponse,
};
use crate::services::{ExperimentService, ProjectService};
use crate::state::AppState;
use rocket::form::{Form, FromForm};
use rocket::fs::TempFile;
use rocket::serde::json::Json;
use rocket::{State, delete, get, post, put};

#[derive(FromForm)]
pub struct RiboUpload<'r> {
    pub ribo_file: Option<TempFile<'r>>,
}

#[get("/api/v1/projects")]
pub async fn list_projects(
    user: Option<AuthenticatedUser>,
    state: &State<AppState>,
) -> Result<Json<ProjectListResponse>, ApiError> {
    let projects = state
        .database
        .list_projects_with_experiments(user.is_none())?;
    let total_count = projects.len();

    Ok(Json(ProjectListResponse {
        projects,
        total_count,
    }))
}

#[post("/api/v1/projects", data = "<form>")]
pub async fn create_project(
    form: Json<ProjectForm>,
    user: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<Project>, ApiError> {
    let project = ProjectService::create(state, &user, form.into_inner())?;
    Ok(Json(project))
}

#[get("/api/v1/projects/<id>")]
pub async fn get_project(
    id: i32,
    user: Option<AuthenticatedUser>,
    state: &State<AppState>,
) -> Result<Json<ProjectWithExperiments>, ApiError> {
    let project = ProjectService::get_visible(state, user.as_ref(), id)?;
    let experiments = state.database.list_project_experiments(project.id)?;

    Ok(Json(ProjectWithExperiments {
        project,
        experiments,
    }))
}

#[put("/api/v1/projects/<id>/description", data = "<form>")]
pub async fn update_project_description(
    id: i32,
    form: Json<DescriptionForm>,
    user: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<Project>, ApiError> {
    let project = ProjectService::update_description(state, &user, id, &form.description)?;
    Ok(Json(project))
}

#[delete("/api/v1/projects/<id>")]
pub async fn delete_project(
    id: i32,
    user: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let removed_files = ProjectService::erase(state, &user, id)?;
    Ok(Json(DeleteResponse {
        ok: true,
        removed_files,
    }))
}

/// First step of adding experiments: stage the ribo file and report the
/// experiments it contains.
#[post("/api/v1/projects/<id>/ribo", data = "<upload>")]
pub async fn upload_ribo(
    id: i32,
    mut upload: Form<RiboUpload<'_>>,
    user: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<RiboUploadResponse>, ApiError> {
    let project = ProjectService::get_modifiable(state, &user, id)?;
    let Some(file) = upload.ribo_file.as_mut() else {
        return Err(ApiError::invalid("ribo_file", "This field is required."));
    };

    let incoming = state.storage.incoming_path();
    file.copy_to(&incoming).await?;

    // Hashing and parsing a large file must not stall the async workers
    let state = state.inner().clone();
    let response = tokio::task::spawn_blocking(move || {
        ExperimentService::stage_upload(&state, &project, &incoming)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("Upload task failed: {e}")))??;
    Ok(Json(response))
}

/// Second step: create experiments for the selected names of a staged file.
#[post("/api/v1/projects/<id>/ribo/<digest>", data = "<form>")]
pub async fn confirm_ribo(
    id: i32,
    digest: &str,
    form: Json<ConfirmRiboForm>,
    user: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<Vec<Experiment>>, ApiError> {
    let project = ProjectService::get_modifiable(state, &user, id)?;
    let experiments =
        ExperimentService::confirm_upload(state, &project, digest, form.into_inner())?;
    Ok(Json(experiments))
}
