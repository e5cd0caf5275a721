use super::connection::{DbPool, checkout};
use crate::models::experiment::Experiment;
use crate::models::project::*;
use crate::schema::{experiments, projects};
use diesel::prelude::*;
use std::collections::HashMap;

/// Project-related database operations
pub struct ProjectOperations<'a> {
    pool: &'a DbPool,
}

impl<'a> ProjectOperations<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    pub fn create_project(&self, new_project: &NewProject) -> Result<Project, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        diesel::insert_into(projects::table)
            .values(new_project)
            .returning(Project::as_returning())
            .get_result(&mut conn)
    }

    pub fn get_project(&self, id: i32) -> Result<Option<Project>, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        projects::table
            .find(id)
            .select(Project::as_select())
            .first(&mut conn)
            .optional()
    }

    pub fn get_project_by_name(&self, name: &str) -> Result<Option<Project>, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        projects::table
            .filter(projects::name.eq(name))
            .select(Project::as_select())
            .first(&mut conn)
            .optional()
    }

    /// Lists projects by name, each with its experiments. With
    /// `public_only` the private projects are left out.
    pub fn list_projects_with_experiments(
        &self,
        public_only: bool,
    ) -> Result<Vec<ProjectWithExperiments>, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        let mut query = projects::table.into_boxed();
        if public_only {
            query = query.filter(projects::public.eq(true));
        }
        let project_list: Vec<Project> = query
            .order(projects::name.asc())
            .select(Project::as_select())
            .load(&mut conn)?;

        let ids: Vec<i32> = project_list.iter().map(|p| p.id).collect();
        let mut grouped: HashMap<i32, Vec<Experiment>> = HashMap::new();
        for experiment in experiments::table
            .filter(experiments::project_id.eq_any(&ids))
            .order(experiments::name.asc())
            .select(Experiment::as_select())
            .load::<Experiment>(&mut conn)?
        {
            grouped.entry(experiment.project_id).or_default().push(experiment);
        }

        Ok(project_list
            .into_iter()
            .map(|project| {
                let experiments = grouped.remove(&project.id).unwrap_or_default();
                ProjectWithExperiments {
                    project,
                    experiments,
                }
            })
            .collect())
    }

    pub fn update_description(
        &self,
        id: i32,
        description: &str,
    ) -> Result<Project, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        diesel::update(projects::table.find(id))
            .set(projects::description.eq(description))
            .returning(Project::as_returning())
            .get_result(&mut conn)
    }

    /// Deletes a project together with its experiments and returns the ribo
    /// file paths that no remaining experiment refers to.
    pub fn delete_project(&self, id: i32) -> Result<Vec<String>, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        conn.transaction(|conn| {
            let mut paths: Vec<String> = experiments::table
                .filter(experiments::project_id.eq(id))
                .select(experiments::ribo_file_path)
                .load(conn)?;
            paths.sort();
            paths.dedup();

            diesel::delete(experiments::table.filter(experiments::project_id.eq(id)))
                .execute(conn)?;
            diesel::delete(projects::table.find(id)).execute(conn)?;

            let mut orphaned = Vec::with_capacity(paths.len());
            for path in paths {
                let remaining: i64 = experiments::table
                    .filter(experiments::ribo_file_path.eq(&path))
                    .count()
                    .get_result(conn)?;
                if remaining == 0 {
                    orphaned.push(path);
                }
            }
            Ok(orphaned)
        })
    }
}
