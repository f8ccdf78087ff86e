use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use sroi_core::project::record::ProjectRecord;
use sroi_core::sroi::engine::EvaluationOptions;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn evaluate_sroi(input_json: String) -> NapiResult<String> {
    let input: sroi_core::sroi::engine::SroiInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = sroi_core::sroi::engine::calculate_sroi(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn present_value_stream(input_json: String) -> NapiResult<String> {
    let input: sroi_core::valuation::outcome::OutcomeValuationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        sroi_core::valuation::outcome::calculate_outcome_value(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[napi]
pub fn sroi_sensitivity(input_json: String) -> NapiResult<String> {
    let input: sroi_core::scenarios::sensitivity::SroiSensitivityInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        sroi_core::scenarios::sensitivity::sroi_sensitivity(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CompleteProjectInput {
    project: ProjectRecord,
    #[serde(default)]
    options: EvaluationOptions,
}

#[napi]
pub fn complete_project(input_json: String) -> NapiResult<String> {
    let input: CompleteProjectInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = sroi_core::project::record::complete_project(&input.project, &input.options)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn summarize_projects(input_json: String) -> NapiResult<String> {
    let projects: Vec<ProjectRecord> =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        sroi_core::project::summary::summarize_projects(&projects).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
