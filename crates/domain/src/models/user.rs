//! User identity as seen by this service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity provided by the external identity provider.
///
/// Only the fields needed for ownership checks and notifications are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}
