use crate::schema::sequence_references;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use rocket::serde::{Deserialize, Serialize};

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = sequence_references)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Reference {
    pub id: i32,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing)]
    pub reference_file_path: String,
    pub organism: String,
    pub owner_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = sequence_references)]
pub struct NewReference {
    pub name: String,
    pub description: String,
    pub reference_file_path: String,
    pub organism: String,
    pub owner_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = sequence_references)]
pub struct UpdateReference {
    pub organism: String,
    pub description: String,
}

impl NewReference {
    pub fn new(
        name: String,
        description: String,
        organism: String,
        reference_file_path: String,
        owner_id: i32,
    ) -> Self {
        Self {
            name,
            description,
            reference_file_path,
            organism,
            owner_id,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct ReferenceForm {
    pub name: String,
    #[serde(default)]
    pub organism: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize, Debug)]
pub struct ReferenceEditForm {
    #[serde(default)]
    pub organism: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize, Debug)]
pub struct ReferenceUploadResponse {
    pub digest: String,
    pub records: usize,
}

#[derive(Serialize, Debug)]
pub struct ReferenceListResponse {
    pub references: Vec<Reference>,
    pub total_count: usize,
}
