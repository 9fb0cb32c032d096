//! Request builders for the backend's public widget functions.
//!
//! Functions are called through the deployment's HTTP function API:
//! `POST {deployment}/api/{query|mutation|action}` with
//! `{"path": "<module>:<export>", "args": {...}, "format": "json"}`.

use serde_json::{Value, json};
use widget_core::contact::{ContactDetails, ContactMetadata};
use widget_core::types::{ContactSessionId, OrganizationId};

use crate::request::{HttpRequest, join_url};

pub const VALIDATE_ORGANIZATION: &str = "public/organizations:validate";
pub const VALIDATE_CONTACT_SESSION: &str = "public/contactSessions:validate";
pub const CREATE_CONTACT_SESSION: &str = "public/contactSessions:create";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Query,
    Mutation,
    Action,
}

impl FunctionKind {
    pub fn endpoint(self) -> &'static str {
        match self {
            FunctionKind::Query => "/api/query",
            FunctionKind::Mutation => "/api/mutation",
            FunctionKind::Action => "/api/action",
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ConvexConfig {
    pub deployment_url: String,

    // Widget visitors are anonymous; a token is only sent when the host has one.
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for ConvexConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvexConfig")
            .field("deployment_url", &self.deployment_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ConvexConfig {
    pub fn new(deployment_url: impl Into<String>) -> Self {
        Self {
            deployment_url: deployment_url.into(),
            auth_token: None,
        }
    }
}

pub fn build_function_request(
    cfg: &ConvexConfig,
    kind: FunctionKind,
    function_path: &str,
    args: Value,
) -> HttpRequest {
    let url = join_url(&cfg.deployment_url, kind.endpoint());
    let payload = json!({
        "path": function_path,
        "args": args,
        "format": "json",
    });

    let req = HttpRequest::post_json(url, &payload);
    match &cfg.auth_token {
        Some(token) => req.with_bearer(token),
        None => req,
    }
}

pub fn build_validate_organization_request(
    cfg: &ConvexConfig,
    organization_id: &OrganizationId,
) -> HttpRequest {
    build_function_request(
        cfg,
        FunctionKind::Action,
        VALIDATE_ORGANIZATION,
        json!({ "organizationId": organization_id.as_str() }),
    )
}

pub fn build_validate_contact_session_request(
    cfg: &ConvexConfig,
    contact_session_id: &ContactSessionId,
) -> HttpRequest {
    build_function_request(
        cfg,
        FunctionKind::Mutation,
        VALIDATE_CONTACT_SESSION,
        json!({ "contactSessionId": contact_session_id.as_str() }),
    )
}

pub fn build_create_contact_session_request(
    cfg: &ConvexConfig,
    organization_id: &OrganizationId,
    contact: &ContactDetails,
    metadata: &ContactMetadata,
) -> HttpRequest {
    build_function_request(
        cfg,
        FunctionKind::Mutation,
        CREATE_CONTACT_SESSION,
        json!({
            "name": contact.name,
            "email": contact.email,
            "organizationId": organization_id.as_str(),
            "metadata": metadata,
        }),
    )
}
