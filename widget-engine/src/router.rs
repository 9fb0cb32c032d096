use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use widget_core::screen::Screen;
use widget_core::types::{ContactSessionId, OrganizationId};

use crate::persistence::SessionPersistence;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterState {
    pub screen: Screen,
    pub error_message: Option<String>,
    pub organization_id: Option<OrganizationId>,
    pub contact_session_id: Option<ContactSessionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterAction {
    Navigate(Screen),
    SetError(String),
    ClearError,
    SetOrganizationId(OrganizationId),
    SetContactSessionId(ContactSessionId),
}

impl RouterState {
    // Applies one action. Storage reads and writes happen here so they see the
    // same organization the state ends up with. Returns whether anything
    // should be published.
    fn reduce(&mut self, action: RouterAction, persistence: &SessionPersistence) -> bool {
        match action {
            RouterAction::Navigate(screen) => {
                if self.screen != screen {
                    log::info!("widget screen: {} -> {}", self.screen.label(), screen.label());
                }
                self.screen = screen;
                // The error message only lives alongside the error screen.
                if screen != Screen::Error {
                    self.error_message = None;
                }
            }
            RouterAction::SetError(message) => {
                log::warn!("widget error: {message}");
                self.error_message = Some(message);
            }
            RouterAction::ClearError => self.error_message = None,
            RouterAction::SetOrganizationId(organization_id) => {
                self.contact_session_id = persistence.get(&organization_id);
                self.organization_id = Some(organization_id);
            }
            RouterAction::SetContactSessionId(id) => {
                let Some(organization_id) = self.organization_id.as_ref() else {
                    log::debug!("ignoring contact session {id}: no organization set");
                    return false;
                };
                persistence.set(organization_id, &id);
                self.contact_session_id = Some(id);
            }
        }
        true
    }
}

/// Navigation state for one widget mount.
///
/// Cheap to clone; all clones share the same state. Observers get change
/// notifications through [`RouterStore::subscribe`].
#[derive(Debug, Clone)]
pub struct RouterStore {
    state: Arc<watch::Sender<RouterState>>,
    persistence: SessionPersistence,
}

impl RouterStore {
    pub fn new(persistence: SessionPersistence) -> Self {
        let (tx, _rx) = watch::channel(RouterState::default());
        Self {
            state: Arc::new(tx),
            persistence,
        }
    }

    pub fn state(&self) -> RouterState {
        self.state.borrow().clone()
    }

    pub fn screen(&self) -> Screen {
        self.state.borrow().screen
    }

    pub fn subscribe(&self) -> watch::Receiver<RouterState> {
        self.state.subscribe()
    }

    /// Whether contact sessions can be read back from durable storage.
    pub fn storage_available(&self) -> bool {
        self.persistence.is_available()
    }

    pub fn dispatch(&self, action: RouterAction) {
        let persistence = &self.persistence;
        self.state
            .send_if_modified(|state| state.reduce(action, persistence));
    }

    pub fn navigate(&self, screen: Screen) {
        self.dispatch(RouterAction::Navigate(screen));
    }

    pub fn set_error(&self, message: impl Into<String>) {
        self.dispatch(RouterAction::SetError(message.into()));
    }

    pub fn clear_error(&self) {
        self.dispatch(RouterAction::ClearError);
    }

    pub fn set_organization_id(&self, organization_id: OrganizationId) {
        self.dispatch(RouterAction::SetOrganizationId(organization_id));
    }

    pub fn set_contact_session_id(&self, contact_session_id: ContactSessionId) {
        self.dispatch(RouterAction::SetContactSessionId(contact_session_id));
    }

    /// Records `message` and shows the error screen.
    pub fn fail(&self, message: impl Into<String>) {
        self.set_error(message);
        self.navigate(Screen::Error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStorage;

    fn store() -> RouterStore {
        RouterStore::new(SessionPersistence::new(Arc::new(MemoryStorage::new())))
    }

    #[test]
    fn starts_on_loading_without_error() {
        let state = store().state();
        assert_eq!(state.screen, Screen::Loading);
        assert_eq!(state.error_message, None);
    }

    #[test]
    fn error_message_is_set_before_error_screen_and_cleared_after() {
        let router = store();
        router.fail("Organization ID is required");
        let state = router.state();
        assert_eq!(state.screen, Screen::Error);
        assert_eq!(
            state.error_message.as_deref(),
            Some("Organization ID is required")
        );

        router.navigate(Screen::Auth);
        assert_eq!(router.state().error_message, None);

        router.set_error("boom");
        router.clear_error();
        assert_eq!(router.state().error_message, None);
    }

    #[test]
    fn contact_session_round_trips_through_persistence() {
        let storage = Arc::new(MemoryStorage::new());
        let org = OrganizationId::new("org_x");

        let router = RouterStore::new(SessionPersistence::new(storage.clone()));
        router.set_organization_id(org.clone());
        assert_eq!(router.state().contact_session_id, None);
        router.set_contact_session_id(ContactSessionId::new("cs_y"));

        // A fresh mount sharing the same storage restores the id.
        let fresh = RouterStore::new(SessionPersistence::new(storage));
        fresh.set_organization_id(org);
        assert_eq!(
            fresh.state().contact_session_id,
            Some(ContactSessionId::new("cs_y"))
        );
    }

    #[test]
    fn contact_session_without_organization_is_ignored() {
        let storage = Arc::new(MemoryStorage::new());
        let router = RouterStore::new(SessionPersistence::new(storage.clone()));
        router.set_contact_session_id(ContactSessionId::new("cs_y"));
        assert_eq!(router.state().contact_session_id, None);
        assert!(storage.is_empty());
    }

    #[test]
    fn switching_organization_replaces_restored_session() {
        let router = store();
        let org_a = OrganizationId::new("org_a");
        router.set_organization_id(org_a.clone());
        router.set_contact_session_id(ContactSessionId::new("cs_a"));

        router.set_organization_id(OrganizationId::new("org_b"));
        assert_eq!(router.state().contact_session_id, None);

        router.set_organization_id(org_a);
        assert_eq!(
            router.state().contact_session_id,
            Some(ContactSessionId::new("cs_a"))
        );
    }

    #[test]
    fn contact_session_is_stored_under_current_organization() {
        let storage = Arc::new(MemoryStorage::new());
        let persistence = SessionPersistence::new(storage.clone());
        let router = RouterStore::new(persistence.clone());
        let org_a = OrganizationId::new("org_a");
        let org_b = OrganizationId::new("org_b");

        router.set_organization_id(org_a.clone());
        router.set_contact_session_id(ContactSessionId::new("cs_a"));
        router.set_organization_id(org_b.clone());
        router.set_contact_session_id(ContactSessionId::new("cs_b"));

        assert_eq!(persistence.get(&org_a), Some(ContactSessionId::new("cs_a")));
        assert_eq!(persistence.get(&org_b), Some(ContactSessionId::new("cs_b")));
    }

    #[test]
    fn concurrent_writers_keep_state_and_storage_in_step() {
        let storage = Arc::new(MemoryStorage::new());
        let persistence = SessionPersistence::new(storage);
        let router = RouterStore::new(persistence.clone());
        router.set_organization_id(OrganizationId::new("org_a"));

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..500 {
                    let org = if i % 2 == 0 { "org_a" } else { "org_b" };
                    router.set_organization_id(OrganizationId::new(org));
                }
            });
            s.spawn(|| {
                for i in 0..500 {
                    router.set_contact_session_id(ContactSessionId::new(format!("cs_{i}")));
                }
            });
        });

        // Whatever interleaving happened, the session in state is the one
        // stored for the organization in state.
        let state = router.state();
        let organization_id = state.organization_id.clone().unwrap();
        assert_eq!(persistence.get(&organization_id), state.contact_session_id);
    }

    #[tokio::test]
    async fn subscribers_observe_navigation() {
        let router = store();
        let mut rx = router.subscribe();
        router.navigate(Screen::Selection);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().screen, Screen::Selection);
    }
}
