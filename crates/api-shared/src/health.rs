use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of the health check response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Simple health service shared by every outer surface.
///
/// The intake handler keeps no in-process state worth probing, so a running process is a
/// healthy one.
pub struct HealthService;

impl HealthService {
    /// Static method to check health without creating an instance
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Intake is alive".into(),
        }
    }
}
