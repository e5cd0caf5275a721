use crate::error::ApiError;
use crate::fasta;
use crate::models::{
    AuthenticatedUser, ConfirmRiboForm, Experiment, NewExperiment, Project, RiboUploadResponse,
};
use crate::ribo::{self, RiboError, detect_transcript_regex, digest_ribo};
use crate::services::references::check_compatibility;
use crate::services::storage::UploadKind;
use crate::state::AppState;
use log::{info, warn};
use std::path::Path;

pub struct ExperimentService;

impl ExperimentService {
    /// Loads an experiment with its project for reading. Experiments of
    /// private projects are hidden from anonymous callers.
    pub fn get_visible(
        state: &AppState,
        user: Option<&AuthenticatedUser>,
        id: i32,
    ) -> Result<(Experiment, Project), ApiError> {
        state
            .database
            .get_experiment_with_project(id)?
            .filter(|(_, project)| project.is_visible_to(user.map(|u| u.user_id)))
            .ok_or_else(|| ApiError::NotFound(format!("Experiment {id} not found")))
    }

    pub fn get_modifiable(
        state: &AppState,
        user: &AuthenticatedUser,
        id: i32,
    ) -> Result<(Experiment, Project), ApiError> {
        state
            .database
            .get_experiment_with_project(id)?
            .filter(|(_, project)| user.can_modify(project.owner_id))
            .ok_or_else(|| ApiError::NotFound(format!("Experiment {id} not found")))
    }

    /// Stages an uploaded ribo file and lists the experiments it contains.
    pub fn stage_upload(
        state: &AppState,
        project: &Project,
        incoming: &Path,
    ) -> Result<RiboUploadResponse, ApiError> {
        let staged = state.storage.stage(incoming, UploadKind::Ribo)?;

        let experiments = match ribo::open(&staged.path) {
            Ok(file) => file.experiments(),
            Err(e) => {
                warn!("Rejected ribo upload {}: {e}", staged.digest);
                state.storage.remove(&staged.path)?;
                return Err(ApiError::invalid("ribo_file", "Invalid ribo file."));
            }
        };

        if experiments.is_empty() {
            state.storage.remove(&staged.path)?;
            return Err(ApiError::invalid(
                "ribo_file",
                "No experiments found in the ribo file.",
            ));
        }

        info!(
            "Staged ribo file {} for project '{}' with {} experiments",
            staged.digest,
            project.name,
            experiments.len()
        );
        Ok(RiboUploadResponse {
            digest: staged.digest,
            project_id: project.id,
            experiments,
        })
    }

    /// Turns the selected experiments of a staged ribo file into experiment
    /// records of `project`.
    pub fn confirm_upload(
        state: &AppState,
        project: &Project,
        digest: &str,
        form: ConfirmRiboForm,
    ) -> Result<Vec<Experiment>, ApiError> {
        let staged = state.storage.find_staged(digest, UploadKind::Ribo)?;
        let file = ribo::open(&staged.path)
            .map_err(|_| ApiError::invalid("ribo_file", "Invalid ribo file."))?;

        let mut selected: Vec<String> = Vec::new();
        for choice in form.experiments.into_iter().filter(|c| c.selected) {
            if !selected.contains(&choice.name) {
                selected.push(choice.name);
            }
        }
        if selected.is_empty() {
            return Err(ApiError::invalid(
                "experiments",
                "Select at least one experiment.",
            ));
        }

        let available = file.experiments();
        let unknown: Vec<&str> = selected
            .iter()
            .filter(|name| !available.contains(name))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(ApiError::invalid(
                "experiments",
                format!(
                    "The following experiments do not exist in the ribo file: {}",
                    unknown.join(", ")
                ),
            ));
        }

        let existing = state
            .database
            .existing_experiment_names(project.id, &selected)?;
        if !existing.is_empty() {
            return Err(ApiError::invalid(
                "experiments",
                format!(
                    "The following experiments already exist in this project: {}",
                    existing.join(", ")
                ),
            ));
        }

        let reference_digest = digest_ribo(file.as_ref());
        let transcript_regex = detect_transcript_regex(file.transcript_names());

        let destination = state.storage.ribo_destination(project.id, &staged.digest);
        let ribo_file_path = destination.to_string_lossy().to_string();

        let new_experiments: Vec<NewExperiment> = selected
            .into_iter()
            .map(|name| {
                NewExperiment::new(
                    name,
                    project.id,
                    ribo_file_path.clone(),
                    reference_digest.clone(),
                    transcript_regex.clone(),
                )
            })
            .collect();

        // The staged copy stays until the records referencing the stored
        // file are committed
        let experiments = {
            let _placement = state.storage.lock();
            let reused = state.storage.place(&staged, &destination)?;
            let experiments = state.database.create_experiments(&new_experiments)?;
            if reused {
                state.storage.remove(&staged.path)?;
            }
            experiments
        };
        state.cache.invalidate_responses();

        info!(
            "Added {} experiments to project '{}' from {}",
            experiments.len(),
            project.name,
            staged.digest
        );
        Ok(experiments)
    }

    /// Links or unlinks a reference. A reference must cover every transcript
    /// of the experiment's ribo file with matching lengths.
    pub fn link_reference(
        state: &AppState,
        experiment: &Experiment,
        reference_id: Option<i32>,
    ) -> Result<Experiment, ApiError> {
        if let Some(reference_id) = reference_id {
            let reference = state.database.get_reference(reference_id)?.ok_or_else(|| {
                ApiError::invalid(
                    "reference_id",
                    "Select a valid choice. That choice is not one of the available choices.",
                )
            })?;

            let handle = state
                .cache
                .ribo_handle(&experiment.ribo_file_path, &experiment.transcript_regex)?;
            let lengths = fasta::sequence_lengths(&reference.reference_file_path)?;
            check_compatibility(handle.file(), &lengths)
                .map_err(|message| ApiError::invalid("reference_id", message))?;
        }

        let experiment = state
            .database
            .set_experiment_reference(experiment.id, reference_id)?;
        state.cache.invalidate_responses();
        Ok(experiment)
    }

    /// Deletes an experiment and, when nothing else uses it, its ribo file.
    pub fn erase(state: &AppState, experiment: &Experiment) -> Result<Vec<String>, ApiError> {
        let placement = state.storage.lock();
        let removed: Vec<String> = state
            .database
            .delete_experiment(experiment.id)?
            .into_iter()
            .collect();
        for path in &removed {
            state.storage.remove(path)?;
        }
        drop(placement);
        state.cache.invalidate_responses();

        info!("Erased experiment '{}' ({})", experiment.name, experiment.id);
        Ok(removed)
    }

    /// Name of the experiment inside its ribo file, checked against the
    /// file's contents.
    pub fn ensure_in_file(
        handle: &ribo::RiboHandle,
        experiment: &Experiment,
    ) -> Result<(), RiboError> {
        if handle.file().experiments().contains(&experiment.name) {
            Ok(())
        } else {
            Err(RiboError::UnknownExperiment(experiment.name.clone()))
        }
    }
}
