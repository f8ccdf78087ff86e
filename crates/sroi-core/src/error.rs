use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SroiError {
    #[error("Invalid cost: total cost must be positive (got {total_cost})")]
    InvalidCost { total_cost: Decimal },

    #[error("No outcomes: at least one outcome is required for an SROI valuation")]
    NoOutcomes,

    #[error("Incomplete outcome at index {index}: {field} must be positive")]
    IncompleteOutcome { index: usize, field: String },

    #[error("Degenerate extrapolation: average annual benefit is {average_annual_benefit}, payback cannot be extrapolated")]
    DegenerateExtrapolation { average_annual_benefit: Decimal },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for SroiError {
    fn from(e: serde_json::Error) -> Self {
        SroiError::SerializationError(e.to_string())
    }
}
