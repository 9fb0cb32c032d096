use serde::de::DeserializeOwned;
use widget_core::contact::{ContactDetails, ContactMetadata};
use widget_core::types::{ContactSessionId, OrganizationId};
use widget_engine::traits::{
    ContactSessionCreator, ContactSessionValidator, OrganizationValidator, ValidationOutcome,
};
use widget_providers::convex::{
    ConvexConfig, build_create_contact_session_request, build_validate_contact_session_request,
    build_validate_organization_request,
};
use widget_providers::parse::{ValidationResponse, parse_function_response};
use widget_providers::request::HttpRequest;
use widget_providers::runtime::{Timeouts, execute_with};

/// The widget's public backend functions over HTTP.
#[derive(Debug, Clone)]
pub struct ConvexBackend {
    cfg: ConvexConfig,
    timeouts: Timeouts,
}

impl ConvexBackend {
    pub fn new(cfg: ConvexConfig) -> Self {
        Self {
            cfg,
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    // Function errors are returned as-is so their message reaches the error
    // screen unchanged.
    async fn call<T: DeserializeOwned>(&self, req: HttpRequest) -> anyhow::Result<T> {
        log::debug!("backend call: {req:?}");
        let resp = execute_with(&req, self.timeouts).await?;
        let value = parse_function_response(&resp)?;
        Ok(value)
    }
}

fn outcome(resp: ValidationResponse) -> ValidationOutcome {
    ValidationOutcome {
        valid: resp.valid,
        reason: resp.reason,
    }
}

#[async_trait::async_trait]
impl OrganizationValidator for ConvexBackend {
    async fn validate(&self, organization_id: &OrganizationId) -> anyhow::Result<ValidationOutcome> {
        let req = build_validate_organization_request(&self.cfg, organization_id);
        Ok(outcome(self.call(req).await?))
    }
}

#[async_trait::async_trait]
impl ContactSessionValidator for ConvexBackend {
    async fn validate(
        &self,
        contact_session_id: &ContactSessionId,
    ) -> anyhow::Result<ValidationOutcome> {
        let req = build_validate_contact_session_request(&self.cfg, contact_session_id);
        Ok(outcome(self.call(req).await?))
    }
}

#[async_trait::async_trait]
impl ContactSessionCreator for ConvexBackend {
    async fn create(
        &self,
        organization_id: &OrganizationId,
        contact: &ContactDetails,
        metadata: &ContactMetadata,
    ) -> anyhow::Result<ContactSessionId> {
        let req = build_create_contact_session_request(&self.cfg, organization_id, contact, metadata);
        let id: String = self.call(req).await?;
        Ok(ContactSessionId::new(id))
    }
}
