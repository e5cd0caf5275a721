use super::connection::{DbPool, checkout};
use crate::models::reference::*;
use crate::schema::{experiments, sequence_references};
use diesel::prelude::*;

/// Reference-related database operations
pub struct ReferenceOperations<'a> {
    pool: &'a DbPool,
}

impl<'a> ReferenceOperations<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    pub fn create_reference(
        &self,
        new_reference: &NewReference,
    ) -> Result<Reference, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        diesel::insert_into(sequence_references::table)
            .values(new_reference)
            .returning(Reference::as_returning())
            .get_result(&mut conn)
    }

    pub fn get_reference(&self, id: i32) -> Result<Option<Reference>, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        sequence_references::table
            .find(id)
            .select(Reference::as_select())
            .first(&mut conn)
            .optional()
    }

    pub fn get_reference_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Reference>, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        sequence_references::table
            .filter(sequence_references::name.eq(name))
            .select(Reference::as_select())
            .first(&mut conn)
            .optional()
    }

    pub fn list_references(&self) -> Result<Vec<Reference>, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        sequence_references::table
            .order(sequence_references::name.asc())
            .select(Reference::as_select())
            .load(&mut conn)
    }

    pub fn update_reference(
        &self,
        id: i32,
        changes: &UpdateReference,
    ) -> Result<Reference, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        diesel::update(sequence_references::table.find(id))
            .set(changes)
            .returning(Reference::as_returning())
            .get_result(&mut conn)
    }

    /// Deletes a reference, unlinking its experiments, and returns the FASTA
    /// path when no other reference points at it.
    pub fn delete_reference(&self, id: i32) -> Result<Option<String>, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        conn.transaction(|conn| {
            let path: String = sequence_references::table
                .find(id)
                .select(sequence_references::reference_file_path)
                .first(conn)?;

            diesel::update(experiments::table.filter(experiments::reference_id.eq(id)))
                .set(experiments::reference_id.eq(None::<i32>))
                .execute(conn)?;
            diesel::delete(sequence_references::table.find(id)).execute(conn)?;

            let remaining: i64 = sequence_references::table
                .filter(sequence_references::reference_file_path.eq(&path))
                .count()
                .get_result(conn)?;

            Ok((remaining == 0).then_some(path))
        })
    }
}
