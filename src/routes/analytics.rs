//! The analytic API read by the front end's plots. Responses are rendered
//! once per request path and served from the response cache afterwards.

use super::responders::{AcceptsGzip, JsonBody};
use crate::error::ApiError;
use crate::models::{AuthenticatedUser, Experiment, ExperimentSummary, Project};
use crate::ribo::Site;
use crate::services::{ExperimentService, ProjectService, ReferenceService, analytics};
use crate::state::AppState;
use log::debug;
use rocket::http::uri::Origin;
use rocket::{State, get};
use serde_json::{Value, json};
use std::sync::Arc;

fn render(
    state: &AppState,
    key: String,
    generation: u64,
    value: &Value,
) -> Result<Arc<Vec<u8>>, ApiError> {
    let body = serde_json::to_vec(value)
        .map_err(|e| ApiError::InternalServerError(format!("Failed to render response: {e}")))?;
    let body = Arc::new(body);
    state.cache.insert_response(key, Arc::clone(&body), generation);
    Ok(body)
}

/// Responses that list experiments depend on whether the caller is signed
/// in, so the viewer is part of the key.
fn cache_key(uri: &Origin<'_>, user: Option<&AuthenticatedUser>) -> String {
    let viewer = if user.is_some() { "user" } else { "anonymous" };
    format!("{viewer}:{uri}")
}

fn summaries(rows: Vec<(Experiment, Project)>) -> Vec<ExperimentSummary> {
    rows.into_iter()
        .map(|(experiment, project)| ExperimentSummary {
            id: experiment.id,
            name: experiment.name,
            project: project.name,
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
#[get("/api/experiment/<id>/<endpoint>?<site>&<gene>")]
pub async fn experiment_api(
    id: i32,
    endpoint: &str,
    site: Option<&str>,
    gene: Option<&str>,
    uri: &Origin<'_>,
    gzip: AcceptsGzip,
    user: Option<AuthenticatedUser>,
    state: &State<AppState>,
) -> Result<JsonBody, ApiError> {
    let (experiment, _project) = ExperimentService::get_visible(state, user.as_ref(), id)?;

    let key = cache_key(uri, user.as_ref());
    let generation = state.cache.response_generation();
    if let Some(body) = state.cache.get_response(&key) {
        debug!("Serving {key} from the response cache");
        return Ok(JsonBody { body, gzip: gzip.0 });
    }

    let handle = state
        .cache
        .ribo_handle(&experiment.ribo_file_path, &experiment.transcript_regex)?;
    ExperimentService::ensure_in_file(&handle, &experiment)?;
    let name = experiment.name.as_str();

    let mut value = match endpoint {
        "getMetadata" => analytics::metadata(&handle),
        "getRegionPercentages" => analytics::region_counts(&handle, name)?,
        "getLengthDistribution" => analytics::length_distribution(&handle, name)?,
        "getMetageneCounts" => {
            let site = site.ok_or_else(|| {
                ApiError::BadRequest("Missing required parameter 'site'".to_string())
            })?;
            let site = Site::parse(site).ok_or_else(|| {
                ApiError::BadRequest(format!("Unknown site '{site}', expected start or stop"))
            })?;
            analytics::metagene(&handle, name, site)?
        }
        "listGenes" => analytics::list_genes(&handle, name)?,
        "getCoverage" => {
            let gene = gene.ok_or_else(|| {
                ApiError::BadRequest("Missing required parameter 'gene'".to_string())
            })?;
            handle.transcript_index(gene)?;

            let reference = match experiment.reference_id {
                Some(reference_id) => state.database.get_reference(reference_id)?,
                None => None,
            };
            let sequences = match &reference {
                Some(reference) => Some(state.cache.sequences(
                    reference.id,
                    &experiment.ribo_file_path,
                    &experiment.transcript_regex,
                    || ReferenceService::aliased_sequences(reference, &handle),
                )?),
                None => None,
            };
            analytics::coverage(&handle, name, gene, sequences.as_deref())?
        }
        "listExperiments" => {
            let rows = state
                .database
                .list_experiments_by_digest(&experiment.reference_digest, user.is_none())?;
            json!({ "experiments": summaries(rows) })
        }
        other => return Err(ApiError::NotFound(format!("Unknown endpoint '{other}'"))),
    };

    analytics::inject_metadata(&mut value, &handle, name)?;
    let body = render(state, key, generation, &value)?;
    Ok(JsonBody { body, gzip: gzip.0 })
}

#[get("/api/project/<id>/<endpoint>?<reference>")]
pub async fn project_api(
    id: i32,
    endpoint: &str,
    reference: Option<&str>,
    uri: &Origin<'_>,
    gzip: AcceptsGzip,
    user: Option<AuthenticatedUser>,
    state: &State<AppState>,
) -> Result<JsonBody, ApiError> {
    let project = ProjectService::get_visible(state, user.as_ref(), id)?;

    let key = cache_key(uri, user.as_ref());
    let generation = state.cache.response_generation();
    if let Some(body) = state.cache.get_response(&key) {
        debug!("Serving {key} from the response cache");
        return Ok(JsonBody { body, gzip: gzip.0 });
    }

    let experiments = state.database.list_project_experiments(project.id)?;

    let value = match endpoint {
        "getReferenceGroups" => {
            let mut groups: Vec<(String, Vec<ExperimentSummary>)> = Vec::new();
            for experiment in experiments {
                let summary = ExperimentSummary {
                    id: experiment.id,
                    name: experiment.name,
                    project: project.name.clone(),
                };
                match groups
                    .iter_mut()
                    .find(|(digest, _)| *digest == experiment.reference_digest)
                {
                    Some((_, members)) => members.push(summary),
                    None => groups.push((experiment.reference_digest, vec![summary])),
                }
            }

            let groups: Vec<Value> = groups
                .into_iter()
                .map(|(digest, members)| json!({ "digest": digest, "experiments": members }))
                .collect();
            json!({ "project": project.name, "groups": groups })
        }
        "getGeneCorrelations" => {
            let digest = reference.ok_or_else(|| {
                ApiError::BadRequest("Missing required parameter 'reference'".to_string())
            })?;

            let mut handles = Vec::new();
            for experiment in experiments
                .into_iter()
                .filter(|e| e.reference_digest == digest)
            {
                let handle = state
                    .cache
                    .ribo_handle(&experiment.ribo_file_path, &experiment.transcript_regex)?;
                ExperimentService::ensure_in_file(&handle, &experiment)?;
                handles.push((experiment.name, handle));
            }
            if handles.is_empty() {
                return Err(ApiError::NotFound(format!(
                    "No experiments with reference '{digest}' in project {id}"
                )));
            }

            let inputs: Vec<(String, &crate::ribo::RiboHandle, String)> = handles
                .iter()
                .map(|(name, handle)| (name.clone(), handle.as_ref(), name.clone()))
                .collect();
            let mut value = analytics::gene_correlations(&inputs)?;
            if let Value::Object(map) = &mut value {
                map.insert("reference".to_string(), json!(digest));
            }
            value
        }
        other => return Err(ApiError::NotFound(format!("Unknown endpoint '{other}'"))),
    };

    let body = render(state, key, generation, &value)?;
    Ok(JsonBody { body, gzip: gzip.0 })
}
