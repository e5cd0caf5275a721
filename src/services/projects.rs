use crate::error::ApiError;
use crate::models::{
    AuthenticatedUser, FormErrors, NewProject, Project, ProjectForm, validate_name,
};
use crate::state::AppState;
use log::info;

pub struct ProjectService;

impl ProjectService {
    pub fn create(
        state: &AppState,
        user: &AuthenticatedUser,
        form: ProjectForm,
    ) -> Result<Project, ApiError> {
        let mut errors = FormErrors::default();
        validate_name(&mut errors, "name", &form.name);
        if errors.is_empty() && state.database.get_project_by_name(&form.name)?.is_some() {
            errors.add("name", "Project with this Name already exists.");
        }
        errors.into_result().map_err(ApiError::Validation)?;

        let project = state.database.create_project(&NewProject::new(
            form.name,
            form.description,
            form.public,
            user.user_id,
        ))?;
        state.cache.invalidate_responses();

        info!("Created project '{}' ({})", project.name, project.id);
        Ok(project)
    }

    /// Loads a project for reading. Private projects are hidden from
    /// anonymous callers.
    pub fn get_visible(
        state: &AppState,
        user: Option<&AuthenticatedUser>,
        id: i32,
    ) -> Result<Project, ApiError> {
        state
            .database
            .get_project(id)?
            .filter(|project| project.is_visible_to(user.map(|u| u.user_id)))
            .ok_or_else(|| ApiError::NotFound(format!("Project {id} not found")))
    }

    /// Loads a project the caller may modify; anything else looks missing.
    pub fn get_modifiable(
        state: &AppState,
        user: &AuthenticatedUser,
        id: i32,
    ) -> Result<Project, ApiError> {
        state
            .database
            .get_project(id)?
            .filter(|project| user.can_modify(project.owner_id))
            .ok_or_else(|| ApiError::NotFound(format!("Project {id} not found")))
    }

    pub fn update_description(
        state: &AppState,
        user: &AuthenticatedUser,
        id: i32,
        description: &str,
    ) -> Result<Project, ApiError> {
        Self::get_modifiable(state, user, id)?;
        let project = state.database.update_project_description(id, description)?;
        state.cache.invalidate_responses();
        Ok(project)
    }

    /// Deletes a project with all its experiments, removing ribo files no
    /// other experiment refers to.
    pub fn erase(
        state: &AppState,
        user: &AuthenticatedUser,
        id: i32,
    ) -> Result<Vec<String>, ApiError> {
        let project = Self::get_modifiable(state, user, id)?;

        let removed = {
            let _placement = state.storage.lock();
            let removed = state.database.delete_project(id)?;
            for path in &removed {
                state.storage.remove(path)?;
            }
            removed
        };
        state.cache.invalidate_responses();

        info!(
            "Erased project '{}' and {} ribo files",
            project.name,
            removed.len()
        );
        Ok(removed)
    }
}
