pub mod routes;

use serde::Serialize;

use crate::evaluation::{Evaluation, Reason};

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub flag: String,
    pub enabled: bool,
    pub reason: Reason,
    pub message: String,
}

impl EvaluateResponse {
    pub fn new(flag: &str, evaluation: Evaluation) -> Self {
        Self {
            flag: flag.to_string(),
            enabled: evaluation.enabled,
            message: evaluation.reason.to_string(),
            reason: evaluation.reason,
        }
    }
}
