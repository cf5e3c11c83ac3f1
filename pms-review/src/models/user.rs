//! Directory user

use uuid::Uuid;

/// Tenant user as seen by the review service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: String,
    pub name: String,
    /// Side-channel address; users without one are only reachable in-app
    pub email: Option<String>,
}
