use std::sync::Arc;

use thiserror::Error;
use widget_core::contact::{ContactForm, ContactFormError, ContactMetadata};
use widget_core::screen::Screen;
use widget_core::types::ContactSessionId;

use crate::router::RouterStore;
use crate::traits::ContactSessionCreator;

#[derive(Debug, Error)]
pub enum SignInError {
    #[error(transparent)]
    Form(#[from] ContactFormError),
    #[error("create contact session failed: {0:#}")]
    Backend(anyhow::Error),
}

/// Contact sign-in for the auth screen.
#[derive(Clone)]
pub struct ContactSignIn {
    router: RouterStore,
    creator: Arc<dyn ContactSessionCreator>,
}

impl ContactSignIn {
    pub fn new(router: RouterStore, creator: Arc<dyn ContactSessionCreator>) -> Self {
        Self { router, creator }
    }

    /// Validates `form`, creates a contact session and moves on to selection.
    ///
    /// Returns `Ok(None)` without touching the backend when no organization is
    /// set. Form and backend failures leave the router untouched.
    pub async fn submit(
        &self,
        form: &ContactForm,
        metadata: &ContactMetadata,
    ) -> Result<Option<ContactSessionId>, SignInError> {
        let contact = form.validate()?;

        let Some(organization_id) = self.router.state().organization_id else {
            log::debug!("sign-in submitted without an organization; ignoring");
            return Ok(None);
        };

        let contact_session_id = self
            .creator
            .create(&organization_id, &contact, metadata)
            .await
            .map_err(SignInError::Backend)?;

        log::info!("contact session created for {organization_id}");
        self.router.set_contact_session_id(contact_session_id.clone());
        self.router.navigate(Screen::Selection);
        Ok(Some(contact_session_id))
    }
}
