use std::sync::Arc;

use widget_core::types::OrganizationId;

use crate::auth::ContactSignIn;
use crate::bootstrap::{BootstrapOutcome, BootstrapSequencer};
use crate::call::CallSessionMachine;
use crate::persistence::SessionPersistence;
use crate::router::RouterStore;
use crate::screens::{WidgetView, select_view};
use crate::traits::{
    ContactSessionCreator, ContactSessionValidator, KeyValueStorage, OrganizationValidator,
};

/// Backend and storage collaborators for one widget mount.
#[derive(Clone)]
pub struct WidgetServices {
    pub organizations: Arc<dyn OrganizationValidator>,
    pub sessions: Arc<dyn ContactSessionValidator>,
    pub contact_sessions: Arc<dyn ContactSessionCreator>,
    pub storage: Option<Arc<dyn KeyValueStorage>>,
}

/// Everything one widget mount owns. Create one per mount and drop it (after
/// [`WidgetContext::unmount`]) when the widget goes away.
#[derive(Clone)]
pub struct WidgetContext {
    pub router: RouterStore,
    pub call: CallSessionMachine,
    pub bootstrap: BootstrapSequencer,
    pub sign_in: ContactSignIn,
}

impl WidgetContext {
    pub fn new(
        organization_id: Option<OrganizationId>,
        assistant_id: impl Into<String>,
        services: WidgetServices,
    ) -> Self {
        let persistence = match services.storage {
            Some(storage) => SessionPersistence::new(storage),
            None => SessionPersistence::unavailable(),
        };
        let router = RouterStore::new(persistence);
        let bootstrap = BootstrapSequencer::new(
            router.clone(),
            organization_id,
            services.organizations,
            services.sessions,
        );
        let sign_in = ContactSignIn::new(router.clone(), services.contact_sessions);

        Self {
            router,
            call: CallSessionMachine::new(assistant_id),
            bootstrap,
            sign_in,
        }
    }

    /// Runs start-up until the widget routes, fails or has to wait.
    pub async fn start(&self) -> BootstrapOutcome {
        let outcome = self.bootstrap.run().await;
        log::info!("widget bootstrap: {outcome:?}");
        outcome
    }

    pub async fn view(&self) -> WidgetView {
        let loading = self.bootstrap.snapshot().await;
        select_view(&self.router.state(), loading.loading_message())
    }

    /// Stops any live call and detaches from the voice session.
    pub async fn unmount(&self) {
        self.call.shutdown().await;
    }
}
