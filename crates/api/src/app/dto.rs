use serde::{Deserialize, Serialize};

use usersync_core::UserRecord;
use usersync_infra::SyncOutcome;

// -------------------------
// Request DTOs
// -------------------------

/// Query string accepted by `/users`. Every field is optional; handlers decide
/// which ones matter.
#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub domain: Option<String>,
    pub email: Option<String>,
}

/// JSON body accepted by `POST`/`PUT /users`.
#[derive(Debug, Default, Deserialize)]
pub struct UserBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub domain: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResponse {
    pub success: bool,
    pub primary_id: String,
    /// `null` when the mirror write failed or found nothing to update.
    pub secondary_id: Option<String>,
    pub message: &'static str,
}

impl From<&SyncOutcome> for WriteResponse {
    fn from(outcome: &SyncOutcome) -> Self {
        Self {
            success: true,
            primary_id: outcome.primary_id().to_string(),
            secondary_id: outcome.secondary_id().map(ToString::to_string),
            message: outcome.message(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub data: Vec<UserRecord>,
}
