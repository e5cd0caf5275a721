use super::responders::Download;
use crate::error::ApiError;
use crate::models::{
    AuthenticatedUser, DeleteResponse, DescriptionForm, Experiment, ExperimentDetails,
    ExperimentReferenceForm,
};
use crate::services::ExperimentService;
use crate::state::AppState;
use rocket::fs::NamedFile;
use rocket::serde::json::Json;
use rocket::{State, delete, get, put};

#[get("/api/v1/experiments/<id>")]
pub async fn get_experiment(
    id: i32,
    user: Option<AuthenticatedUser>,
    state: &State<AppState>,
) -> Result<Json<ExperimentDetails>, ApiError> {
    let (experiment, project) = ExperimentService::get_visible(state, user.as_ref(), id)?;
    let reference = match experiment.reference_id {
        Some(reference_id) => state.database.get_reference(reference_id)?,
        None => None,
    };

    Ok(Json(ExperimentDetails {
        experiment,
        project,
        reference,
    }))
}

#[put("/api/v1/experiments/<id>/description", data = "<form>")]
pub async fn update_experiment_description(
    id: i32,
    form: Json<DescriptionForm>,
    user: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<Experiment>, ApiError> {
    ExperimentService::get_modifiable(state, &user, id)?;
    let experiment = state
        .database
        .update_experiment_description(id, &form.description)?;
    state.cache.invalidate_responses();
    Ok(Json(experiment))
}

#[put("/api/v1/experiments/<id>/reference", data = "<form>")]
pub async fn update_experiment_reference(
    id: i32,
    form: Json<ExperimentReferenceForm>,
    user: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<Experiment>, ApiError> {
    let (experiment, _project) = ExperimentService::get_modifiable(state, &user, id)?;
    let experiment = ExperimentService::link_reference(state, &experiment, form.reference_id)?;
    Ok(Json(experiment))
}

#[get("/api/v1/experiments/<id>/download")]
pub async fn download_experiment(
    id: i32,
    user: Option<AuthenticatedUser>,
    state: &State<AppState>,
) -> Result<Download, ApiError> {
    let (experiment, _project) = ExperimentService::get_visible(state, user.as_ref(), id)?;
    let file = NamedFile::open(&experiment.ribo_file_path)
        .await
        .map_err(|_| ApiError::NotFound(format!("Ribo file of experiment {id} is missing")))?;

    Ok(Download {
        file,
        filename: format!("{}.ribo", experiment.name),
    })
}

#[delete("/api/v1/experiments/<id>")]
pub async fn delete_experiment(
    id: i32,
    user: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let (experiment, _project) = ExperimentService::get_modifiable(state, &user, id)?;
    let removed_files = ExperimentService::erase(state, &experiment)?;
    Ok(Json(DeleteResponse {
        ok: true,
        removed_files,
    }))
}
