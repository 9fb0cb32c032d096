use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceSettings {
    // Public (browser-safe) key for the voice provider.
    pub public_key: String,
    pub assistant_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetConfig {
    pub voice: VoiceSettings,

    // Deployment URL of the backend that hosts the public widget functions.
    pub backend_url: String,

    // Where contact session ids are persisted. `None` means no durable storage
    // is available and the widget always starts signed out.
    #[serde(default)]
    pub storage_path: Option<String>,
}
