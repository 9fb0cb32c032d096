use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use widget_core::types::{ContactSessionId, OrganizationId};

use crate::traits::KeyValueStorage;

/// Storage keys are namespaced per organization so a visitor can hold one
/// contact session for each organization that embeds the widget.
pub const CONTACT_SESSION_KEY_PREFIX: &str = "echo_contact_session_";

pub fn contact_session_key(organization_id: &OrganizationId) -> String {
    format!("{CONTACT_SESSION_KEY_PREFIX}{}", organization_id.as_str())
}

/// Maps an organization to its persisted contact session id.
///
/// Storage is optional: without it every read is empty and every write is a
/// no-op. Storage failures are logged and treated the same way.
#[derive(Clone, Default)]
pub struct SessionPersistence {
    storage: Option<Arc<dyn KeyValueStorage>>,
}

impl std::fmt::Debug for SessionPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPersistence")
            .field("available", &self.is_available())
            .finish()
    }
}

impl SessionPersistence {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage: Some(storage),
        }
    }

    pub fn unavailable() -> Self {
        Self { storage: None }
    }

    pub fn is_available(&self) -> bool {
        self.storage.is_some()
    }

    pub fn get(&self, organization_id: &OrganizationId) -> Option<ContactSessionId> {
        let storage = self.storage.as_ref()?;
        let key = contact_session_key(organization_id);
        match storage.get_item(&key) {
            Ok(value) => value.filter(|v| !v.is_empty()).map(ContactSessionId::new),
            Err(e) => {
                log::warn!("read contact session for {organization_id} failed: {e:#}");
                None
            }
        }
    }

    pub fn set(&self, organization_id: &OrganizationId, contact_session_id: &ContactSessionId) {
        let Some(storage) = self.storage.as_ref() else {
            return;
        };
        let key = contact_session_key(organization_id);
        if let Err(e) = storage.set_item(&key, contact_session_id.as_str()) {
            log::warn!("persist contact session for {organization_id} failed: {e:#}");
        }
    }
}

/// Process-local storage. Useful for hosts without a durable store and in tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        let items = self
            .items
            .lock()
            .map_err(|_| anyhow!("memory storage lock poisoned"))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| anyhow!("memory storage lock poisoned"))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
