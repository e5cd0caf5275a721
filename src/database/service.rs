use super::connection::{DbConnection, DbPool, create_pool, get_connection_with_retry};
use super::experiments::ExperimentOperations;
use super::projects::ProjectOperations;
use super::references::ReferenceOperations;
use crate::models::experiment::*;
use crate::models::project::*;
use crate::models::reference::*;

/// Main database service that provides a unified interface to all database operations
#[derive(Debug)]
pub struct DatabaseService {
    pub pool: DbPool,
}

impl DatabaseService {
    /// Creates a new DatabaseService with an initialized connection pool
    pub fn new(database_url: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let pool = create_pool(database_url)?;
        Ok(Self { pool })
    }

    /// Gets a connection from the pool with retry logic
    pub fn get_connection(&self) -> Result<DbConnection, diesel::r2d2::Error> {
        get_connection_with_retry(&self.pool)
    }

    // Project operations
    pub fn create_project(&self, new_project: &NewProject) -> Result<Project, diesel::result::Error> {
        ProjectOperations::new(&self.pool).create_project(new_project)
    }

    pub fn get_project(&self, id: i32) -> Result<Option<Project>, diesel::result::Error> {
        ProjectOperations::new(&self.pool).get_project(id)
    }

    pub fn get_project_by_name(&self, name: &str) -> Result<Option<Project>, diesel::result::Error> {
        ProjectOperations::new(&self.pool).get_project_by_name(name)
    }

    pub fn list_projects_with_experiments(
        &self,
        public_only: bool,
    ) -> Result<Vec<ProjectWithExperiments>, diesel::result::Error> {
        ProjectOperations::new(&self.pool).list_projects_with_experiments(public_only)
    }

    pub fn update_project_description(
        &self,
        id: i32,
        description: &str,
    ) -> Result<Project, diesel::result::Error> {
        ProjectOperations::new(&self.pool).update_description(id, description)
    }

    pub fn delete_project(&self, id: i32) -> Result<Vec<String>, diesel::result::Error> {
        ProjectOperations::new(&self.pool).delete_project(id)
    }

    // Experiment operations
    pub fn create_experiments(
        &self,
        new_experiments: &[NewExperiment],
    ) -> Result<Vec<Experiment>, diesel::result::Error> {
        ExperimentOperations::new(&self.pool).create_experiments(new_experiments)
    }

    pub fn get_experiment_with_project(
        &self,
        id: i32,
    ) -> Result<Option<(Experiment, Project)>, diesel::result::Error> {
        ExperimentOperations::new(&self.pool).get_experiment_with_project(id)
    }

    pub fn list_project_experiments(
        &self,
        project_id: i32,
    ) -> Result<Vec<Experiment>, diesel::result::Error> {
        ExperimentOperations::new(&self.pool).list_for_project(project_id)
    }

    pub fn existing_experiment_names(
        &self,
        project_id: i32,
        names: &[String],
    ) -> Result<Vec<String>, diesel::result::Error> {
        ExperimentOperations::new(&self.pool).existing_names(project_id, names)
    }

    pub fn list_experiments_by_digest(
        &self,
        digest: &str,
        public_only: bool,
    ) -> Result<Vec<(Experiment, Project)>, diesel::result::Error> {
        ExperimentOperations::new(&self.pool).list_by_digest(digest, public_only)
    }

    pub fn update_experiment_description(
        &self,
        id: i32,
        description: &str,
    ) -> Result<Experiment, diesel::result::Error> {
        ExperimentOperations::new(&self.pool).update_description(id, description)
    }

    pub fn set_experiment_reference(
        &self,
        id: i32,
        reference_id: Option<i32>,
    ) -> Result<Experiment, diesel::result::Error> {
        ExperimentOperations::new(&self.pool).set_reference(id, reference_id)
    }

    pub fn delete_experiment(&self, id: i32) -> Result<Option<String>, diesel::result::Error> {
        ExperimentOperations::new(&self.pool).delete_experiment(id)
    }

    // Reference operations
    pub fn create_reference(
        &self,
        new_reference: &NewReference,
    ) -> Result<Reference, diesel::result::Error> {
        ReferenceOperations::new(&self.pool).create_reference(new_reference)
    }

    pub fn get_reference(&self, id: i32) -> Result<Option<Reference>, diesel::result::Error> {
        ReferenceOperations::new(&self.pool).get_reference(id)
    }

    pub fn get_reference_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Reference>, diesel::result::Error> {
        ReferenceOperations::new(&self.pool).get_reference_by_name(name)
    }

    pub fn list_references(&self) -> Result<Vec<Reference>, diesel::result::Error> {
        ReferenceOperations::new(&self.pool).list_references()
    }

    pub fn update_reference(
        &self,
        id: i32,
        changes: &UpdateReference,
    ) -> Result<Reference, diesel::result::Error> {
        ReferenceOperations::new(&self.pool).update_reference(id, changes)
    }

    pub fn delete_reference(&self, id: i32) -> Result<Option<String>, diesel::result::Error> {
        ReferenceOperations::new(&self.pool).delete_reference(id)
    }
}
