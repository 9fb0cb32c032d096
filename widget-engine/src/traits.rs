use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use widget_core::contact::{ContactDetails, ContactMetadata};
use widget_core::transcript::{Speaker, TranscriptMessage};
use widget_core::types::{ContactSessionId, OrganizationId};

/// Events a voice session can emit, by subscription name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceEventName {
    CallStart,
    CallEnd,
    SpeechStart,
    SpeechEnd,
    Error,
    Message,
}

impl VoiceEventName {
    pub const ALL: [VoiceEventName; 6] = [
        VoiceEventName::CallStart,
        VoiceEventName::CallEnd,
        VoiceEventName::SpeechStart,
        VoiceEventName::SpeechEnd,
        VoiceEventName::Error,
        VoiceEventName::Message,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VoiceEventName::CallStart => "call-start",
            VoiceEventName::CallEnd => "call-end",
            VoiceEventName::SpeechStart => "speech-start",
            VoiceEventName::SpeechEnd => "speech-end",
            VoiceEventName::Error => "error",
            VoiceEventName::Message => "message",
        }
    }
}

/// A `message` payload as delivered by the voice provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub transcript_type: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
}

impl VoiceMessage {
    pub fn transcript(
        role: impl Into<String>,
        transcript_type: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            kind: "transcript".into(),
            transcript_type: Some(transcript_type.into()),
            role: Some(role.into()),
            transcript: Some(text.into()),
        }
    }

    /// Returns the transcript turn if this is a finalized transcript segment.
    /// Partial segments and non-transcript messages yield `None`.
    pub fn final_transcript(&self) -> Option<TranscriptMessage> {
        if self.kind != "transcript" || self.transcript_type.as_deref() != Some("final") {
            return None;
        }

        let role = Speaker::from_role(self.role.as_deref().unwrap_or_default());
        Some(TranscriptMessage::new(
            role,
            self.transcript.clone().unwrap_or_default(),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    CallStart,
    CallEnd,
    SpeechStart,
    SpeechEnd,
    Error(String),
    Message(VoiceMessage),
}

impl VoiceEvent {
    pub fn name(&self) -> VoiceEventName {
        match self {
            VoiceEvent::CallStart => VoiceEventName::CallStart,
            VoiceEvent::CallEnd => VoiceEventName::CallEnd,
            VoiceEvent::SpeechStart => VoiceEventName::SpeechStart,
            VoiceEvent::SpeechEnd => VoiceEventName::SpeechEnd,
            VoiceEvent::Error(_) => VoiceEventName::Error,
            VoiceEvent::Message(_) => VoiceEventName::Message,
        }
    }
}

/// Listener registered on a voice session. Sessions remove listeners by
/// identity (`Arc::ptr_eq`), so callers must hand back the same value.
pub type VoiceHandler = Arc<dyn Fn(VoiceEvent) + Send + Sync>;

/// The external real-time voice session (one per widget mount).
///
/// `start` only kicks off the connection; progress is reported through the
/// registered listeners.
pub trait VoiceSession: Send {
    fn on(&mut self, event: VoiceEventName, handler: VoiceHandler);
    fn off(&mut self, event: VoiceEventName, handler: &VoiceHandler);
    fn start(&mut self, assistant_id: &str) -> anyhow::Result<()>;
    fn stop(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

#[async_trait]
pub trait OrganizationValidator: Send + Sync {
    async fn validate(&self, organization_id: &OrganizationId) -> anyhow::Result<ValidationOutcome>;
}

#[async_trait]
pub trait ContactSessionValidator: Send + Sync {
    async fn validate(
        &self,
        contact_session_id: &ContactSessionId,
    ) -> anyhow::Result<ValidationOutcome>;
}

#[async_trait]
pub trait ContactSessionCreator: Send + Sync {
    async fn create(
        &self,
        organization_id: &OrganizationId,
        contact: &ContactDetails,
        metadata: &ContactMetadata,
    ) -> anyhow::Result<ContactSessionId>;
}

/// Durable string key-value storage (browser local storage or a native stand-in).
pub trait KeyValueStorage: Send + Sync {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()>;
}
