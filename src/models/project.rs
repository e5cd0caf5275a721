use crate::models::experiment::Experiment;
use crate::schema::projects;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use rocket::serde::{Deserialize, Serialize};

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = projects)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Project {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub public: bool,
    pub owner_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = projects)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub public: bool,
    pub owner_id: i32,
    pub created_at: NaiveDateTime,
}

impl NewProject {
    pub fn new(name: String, description: String, public: bool, owner_id: i32) -> Self {
        Self {
            name,
            description,
            public,
            owner_id,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct ProjectForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub public: bool,
}

#[derive(Deserialize, Debug)]
pub struct DescriptionForm {
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize, Debug)]
pub struct ProjectWithExperiments {
    pub project: Project,
    pub experiments: Vec<Experiment>,
}

#[derive(Serialize, Debug)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectWithExperiments>,
    pub total_count: usize,
}

impl Project {
    /// Public projects are readable by anyone, the rest only by signed-in
    /// users.
    pub fn is_visible_to(&self, user_id: Option<i32>) -> bool {
        self.public || user_id.is_some()
    }
}
