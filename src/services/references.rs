use crate::error::ApiError;
use crate::fasta::{self, FastaError, FastaReader};
use crate::models::{
    AuthenticatedUser, FormErrors, NewReference, Reference, ReferenceEditForm, ReferenceForm,
    ReferenceUploadResponse, UpdateReference, validate_name,
};
use crate::ribo::{RiboFile, RiboHandle};
use crate::services::cache::SequenceMap;
use crate::services::storage::UploadKind;
use crate::state::AppState;
use log::{info, warn};
use std::collections::HashMap;
use std::path::Path;

pub struct ReferenceService;

impl ReferenceService {
    /// Stages an uploaded FASTA file after checking it holds at least one
    /// record.
    pub fn stage_upload(
        state: &AppState,
        incoming: &Path,
    ) -> Result<ReferenceUploadResponse, ApiError> {
        let staged = state.storage.stage(incoming, UploadKind::Reference)?;

        let records = FastaReader::open(&staged.path)
            .map_err(|e| e.to_string())
            .and_then(|reader| {
                reader
                    .map(|entry| entry.map(|e| !e.header.is_empty()))
                    .collect::<Result<Vec<bool>, _>>()
                    .map(|named| named.into_iter().filter(|&n| n).count())
                    .map_err(|e| e.to_string())
            });

        match records {
            Ok(0) => {
                state.storage.remove(&staged.path)?;
                Err(ApiError::invalid(
                    "reference_file",
                    "No sequences found in the reference file.",
                ))
            }
            Ok(records) => {
                info!("Staged reference {} with {records} records", staged.digest);
                Ok(ReferenceUploadResponse {
                    digest: staged.digest,
                    records,
                })
            }
            Err(e) => {
                warn!("Rejected reference upload {}: {e}", staged.digest);
                state.storage.remove(&staged.path)?;
                Err(ApiError::invalid("reference_file", "Invalid reference file."))
            }
        }
    }

    /// Creates the reference record for a staged upload and moves the file
    /// into permanent storage.
    pub fn record(
        state: &AppState,
        user: &AuthenticatedUser,
        digest: &str,
        form: ReferenceForm,
    ) -> Result<Reference, ApiError> {
        let staged = state.storage.find_staged(digest, UploadKind::Reference)?;

        let mut errors = FormErrors::default();
        validate_name(&mut errors, "name", &form.name);
        if errors.is_empty() && state.database.get_reference_by_name(&form.name)?.is_some() {
            errors.add("name", "Reference with this Name already exists.");
        }
        errors.into_result().map_err(ApiError::Validation)?;

        let destination = state.storage.reference_destination(&staged.digest);
        let reference = {
            let _placement = state.storage.lock();
            let reused = state.storage.place(&staged, &destination)?;
            let reference = state.database.create_reference(&NewReference::new(
                form.name,
                form.description,
                form.organism,
                destination.to_string_lossy().to_string(),
                user.user_id,
            ))?;
            if reused {
                state.storage.remove(&staged.path)?;
            }
            reference
        };
        state.cache.invalidate_responses();

        info!("Recorded reference '{}' ({})", reference.name, staged.digest);
        Ok(reference)
    }

    pub fn get_visible(state: &AppState, id: i32) -> Result<Reference, ApiError> {
        state
            .database
            .get_reference(id)?
            .ok_or_else(|| ApiError::NotFound(format!("Reference {id} not found")))
    }

    fn get_modifiable(
        state: &AppState,
        user: &AuthenticatedUser,
        id: i32,
    ) -> Result<Reference, ApiError> {
        let reference = Self::get_visible(state, id)?;
        if !user.can_modify(reference.owner_id) {
            return Err(ApiError::NotFound(format!("Reference {id} not found")));
        }
        Ok(reference)
    }

    pub fn update(
        state: &AppState,
        user: &AuthenticatedUser,
        id: i32,
        form: ReferenceEditForm,
    ) -> Result<Reference, ApiError> {
        Self::get_modifiable(state, user, id)?;
        let reference = state.database.update_reference(
            id,
            &UpdateReference {
                organism: form.organism,
                description: form.description,
            },
        )?;
        state.cache.invalidate_responses();
        Ok(reference)
    }

    /// Deletes a reference, unlinking its experiments. The FASTA file goes
    /// too unless another reference shares it.
    pub fn erase(state: &AppState, user: &AuthenticatedUser, id: i32) -> Result<Vec<String>, ApiError> {
        Self::get_modifiable(state, user, id)?;

        let removed: Vec<String> = {
            let _placement = state.storage.lock();
            let removed: Vec<String> = state.database.delete_reference(id)?.into_iter().collect();
            for path in &removed {
                state.storage.remove(path)?;
            }
            removed
        };
        state.cache.invalidate_responses();

        info!("Erased reference {id}");
        Ok(removed)
    }

    /// One record of the reference as FASTA text, optionally reverse
    /// complemented.
    pub fn sequence(reference: &Reference, header: &str, reverse: bool) -> Result<String, ApiError> {
        for entry in FastaReader::open(&reference.reference_file_path)? {
            let mut entry = entry?;
            if entry.header == header {
                if reverse {
                    entry.reverse_complement()?;
                }
                return Ok(entry.to_string());
            }
        }

        Err(ApiError::NotFound(format!(
            "Sequence '{header}' not found in reference '{}'",
            reference.name
        )))
    }

    /// Sequences of `reference` keyed by the display names of `handle`.
    pub fn aliased_sequences(
        reference: &Reference,
        handle: &RiboHandle,
    ) -> Result<SequenceMap, FastaError> {
        let mut by_header = fasta::read_sequences(&reference.reference_file_path)?;

        Ok(handle
            .file()
            .transcript_names()
            .iter()
            .zip(handle.display_names())
            .filter_map(|(raw, display)| {
                by_header
                    .remove(raw)
                    .map(|sequence| (display.clone(), sequence))
            })
            .collect())
    }
}

/// Checks that every transcript of the ribo file exists in the reference
/// with the same length.
pub fn check_compatibility(
    ribo: &dyn RiboFile,
    reference_lengths: &HashMap<String, u64>,
) -> Result<(), String> {
    for (name, length) in ribo.transcript_names().iter().zip(ribo.transcript_lengths()) {
        match reference_lengths.get(name) {
            None => {
                return Err(format!(
                    "Incompatible reference:The transcript in the experiment (ribo file) does not exist in reference: {name}"
                ));
            }
            Some(reference_length) if reference_length != length => {
                return Err(format!(
                    "Incompatible reference:The lengths of the transcript {name} do not match {length} vs {reference_length}"
                ));
            }
            Some(_) => {}
        }
    }
    Ok(())
}
