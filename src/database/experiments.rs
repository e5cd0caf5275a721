use super::connection::{DbPool, checkout};
use crate::models::experiment::*;
use crate::models::project::Project;
use crate::schema::{experiments, projects};
use diesel::prelude::*;

/// Experiment-related database operations
pub struct ExperimentOperations<'a> {
    pool: &'a DbPool,
}

impl<'a> ExperimentOperations<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Inserts all experiments of one confirmed upload atomically.
    pub fn create_experiments(
        &self,
        new_experiments: &[NewExperiment],
    ) -> Result<Vec<Experiment>, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        conn.transaction(|conn| {
            new_experiments
                .iter()
                .map(|new_experiment| {
                    diesel::insert_into(experiments::table)
                        .values(new_experiment)
                        .returning(Experiment::as_returning())
                        .get_result(conn)
                })
                .collect()
        })
    }

    pub fn get_experiment_with_project(
        &self,
        id: i32,
    ) -> Result<Option<(Experiment, Project)>, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        experiments::table
            .inner_join(projects::table)
            .filter(experiments::id.eq(id))
            .select((Experiment::as_select(), Project::as_select()))
            .first(&mut conn)
            .optional()
    }

    pub fn list_for_project(&self, project_id: i32) -> Result<Vec<Experiment>, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        experiments::table
            .filter(experiments::project_id.eq(project_id))
            .order(experiments::name.asc())
            .select(Experiment::as_select())
            .load(&mut conn)
    }

    /// Names from `names` that already exist in the project.
    pub fn existing_names(
        &self,
        project_id: i32,
        names: &[String],
    ) -> Result<Vec<String>, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        experiments::table
            .filter(experiments::project_id.eq(project_id))
            .filter(experiments::name.eq_any(names))
            .order(experiments::name.asc())
            .select(experiments::name)
            .load(&mut conn)
    }

    /// Experiments sharing a reference digest, with their projects. With
    /// `public_only` only experiments of public projects are returned.
    pub fn list_by_digest(
        &self,
        digest: &str,
        public_only: bool,
    ) -> Result<Vec<(Experiment, Project)>, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        let mut query = experiments::table
            .inner_join(projects::table)
            .filter(experiments::reference_digest.eq(digest))
            .into_boxed();
        if public_only {
            query = query.filter(projects::public.eq(true));
        }

        query
            .order((projects::name.asc(), experiments::name.asc()))
            .select((Experiment::as_select(), Project::as_select()))
            .load(&mut conn)
    }

    pub fn update_description(
        &self,
        id: i32,
        description: &str,
    ) -> Result<Experiment, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        diesel::update(experiments::table.find(id))
            .set(experiments::description.eq(description))
            .returning(Experiment::as_returning())
            .get_result(&mut conn)
    }

    pub fn set_reference(
        &self,
        id: i32,
        reference_id: Option<i32>,
    ) -> Result<Experiment, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        diesel::update(experiments::table.find(id))
            .set(experiments::reference_id.eq(reference_id))
            .returning(Experiment::as_returning())
            .get_result(&mut conn)
    }

    /// Deletes an experiment and returns its ribo file path when no other
    /// experiment refers to it anymore.
    pub fn delete_experiment(&self, id: i32) -> Result<Option<String>, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        conn.transaction(|conn| {
            let path: String = experiments::table
                .find(id)
                .select(experiments::ribo_file_path)
                .first(conn)?;

            diesel::delete(experiments::table.find(id)).execute(conn)?;

            let remaining: i64 = experiments::table
                .filter(experiments::ribo_file_path.eq(&path))
                .count()
                .get_result(conn)?;

            Ok((remaining == 0).then_some(path))
        })
    }
}
