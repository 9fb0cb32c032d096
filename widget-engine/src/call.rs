use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc, watch};
use widget_core::transcript::{TranscriptLog, TranscriptMessage};

use crate::traits::{VoiceEvent, VoiceEventName, VoiceHandler, VoiceSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectedPhase {
    Listening,
    Speaking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "phase")]
pub enum CallStatus {
    Uninitialized,
    Idle,
    Connecting,
    Connected(ConnectedPhase),
    Error,
}

impl Default for CallStatus {
    fn default() -> Self {
        Self::Uninitialized
    }
}

impl CallStatus {
    /// Connecting or connected: a call owns the voice session.
    pub fn is_live(self) -> bool {
        matches!(self, CallStatus::Connecting | CallStatus::Connected(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("{0}")]
    Voice(String),
    #[error("failed to start call: {0}")]
    StartFailed(String),
}

/// Inputs to the call state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    StartCall,
    StopCall,
    CallStarted,
    CallEnded,
    SpeechStarted,
    SpeechEnded,
    TranscriptReceived(TranscriptMessage),
    ErrorOccurred(CallError),
}

impl CallEvent {
    /// Translates a raw voice session event. Messages that are not finalized
    /// transcript segments are dropped here.
    pub fn from_voice(event: VoiceEvent) -> Option<Self> {
        match event {
            VoiceEvent::CallStart => Some(CallEvent::CallStarted),
            VoiceEvent::CallEnd => Some(CallEvent::CallEnded),
            VoiceEvent::SpeechStart => Some(CallEvent::SpeechStarted),
            VoiceEvent::SpeechEnd => Some(CallEvent::SpeechEnded),
            VoiceEvent::Error(message) => Some(CallEvent::ErrorOccurred(CallError::Voice(message))),
            VoiceEvent::Message(message) => message
                .final_transcript()
                .map(CallEvent::TranscriptReceived),
        }
    }
}

/// Side effects of a transition, applied in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEffect {
    ClearError,
    StartVoice,
    ClearTranscript,
    AppendTranscript(TranscriptMessage),
    SetError(CallError),
    // Unregister all listeners and stop the voice session.
    Teardown,
}

/// The transition table, keyed on (status, event). `None` means the event is
/// ignored in that status.
pub fn transition(status: CallStatus, event: &CallEvent) -> Option<(CallStatus, Vec<CallEffect>)> {
    use CallEvent as E;
    use CallStatus as S;
    use ConnectedPhase as P;

    let next = match (status, event) {
        (S::Idle, E::StartCall) => (S::Connecting, vec![CallEffect::StartVoice]),
        (S::Error, E::StartCall) => (
            S::Connecting,
            vec![CallEffect::ClearError, CallEffect::StartVoice],
        ),

        (S::Connecting, E::CallStarted) => (
            S::Connected(P::Listening),
            vec![CallEffect::ClearTranscript],
        ),

        (S::Connected(P::Listening), E::SpeechStarted) => (S::Connected(P::Speaking), vec![]),
        (S::Connected(P::Speaking), E::SpeechEnded) => (S::Connected(P::Listening), vec![]),
        (S::Connected(phase), E::TranscriptReceived(message)) => (
            S::Connected(phase),
            vec![CallEffect::AppendTranscript(message.clone())],
        ),

        (S::Connecting | S::Connected(_), E::CallEnded | E::StopCall) => {
            (S::Idle, vec![CallEffect::Teardown])
        }
        (S::Connecting | S::Connected(_), E::ErrorOccurred(e)) => (
            S::Error,
            vec![CallEffect::SetError(e.clone()), CallEffect::Teardown],
        ),

        _ => return None,
    };
    Some(next)
}

/// What the presentation layer sees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallSnapshot {
    pub status: CallStatus,
    pub is_connected: bool,
    pub is_connecting: bool,
    pub is_speaking: bool,
    pub transcript: Vec<TranscriptMessage>,
    pub error: Option<String>,
}

struct QueuedEvent {
    epoch: u64,
    event: CallEvent,
}

#[derive(Default)]
struct Inner {
    status: CallStatus,
    transcript: TranscriptLog,
    error: Option<CallError>,
    voice: Option<Box<dyn VoiceSession>>,

    // Built once when the voice session is attached and reused for every
    // registration, so `off` receives the exact values passed to `on`.
    handlers: HashMap<VoiceEventName, VoiceHandler>,
    listening: bool,
}

/// Serializes voice session callbacks into one authoritative call state.
///
/// Cheap to clone; clones share the machine. Voice callbacks only enqueue
/// events; they are applied one at a time by [`CallSessionMachine::pump`] or
/// [`CallSessionMachine::process_next`].
#[derive(Clone)]
pub struct CallSessionMachine {
    inner: Arc<Mutex<Inner>>,
    snapshot: Arc<watch::Sender<CallSnapshot>>,
    events_tx: mpsc::UnboundedSender<QueuedEvent>,
    events_rx: Arc<Mutex<mpsc::UnboundedReceiver<QueuedEvent>>>,

    // Bumped whenever listeners are attached or detached. Callbacks tag events
    // with the epoch they observed; events from an older epoch are dropped.
    epoch: Arc<AtomicU64>,
    assistant_id: Arc<str>,
}

impl CallSessionMachine {
    pub fn new(assistant_id: impl Into<String>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshot, _rx) = watch::channel(CallSnapshot::default());
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            snapshot: Arc::new(snapshot),
            events_tx,
            events_rx: Arc::new(Mutex::new(events_rx)),
            epoch: Arc::new(AtomicU64::new(0)),
            assistant_id: Arc::from(assistant_id.into()),
        }
    }

    /// Takes ownership of the voice session and moves `Uninitialized -> Idle`.
    ///
    /// A session attached while one is already held replaces it; the old one
    /// is torn down first.
    pub async fn attach(&self, voice: Box<dyn VoiceSession>) {
        let mut inner = self.inner.lock().await;
        if inner.voice.is_some() {
            self.teardown_locked(&mut inner);
        }

        inner.handlers = self.build_handlers();
        inner.voice = Some(voice);
        self.listen_locked(&mut inner);

        let prev = inner.status;
        inner.status = CallStatus::Idle;
        inner.transcript.clear();
        inner.error = None;
        log::info!("call status: {:?} -> {:?}", prev, inner.status);
        self.publish(&inner);
    }

    /// Releases the voice session (widget unmount). Any live call is stopped
    /// and the machine returns to `Uninitialized`.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        if inner.voice.is_none() && inner.status == CallStatus::Uninitialized {
            return;
        }

        if inner.status.is_live() {
            log::info!("stopping live call on release");
        }
        self.teardown_locked(&mut inner);
        inner.voice = None;
        inner.handlers.clear();
        inner.status = CallStatus::Uninitialized;
        inner.transcript.clear();
        inner.error = None;
        log::info!("call session released");
        self.publish(&inner);
    }

    pub async fn start_call(&self) {
        self.dispatch(CallEvent::StartCall).await;
    }

    pub async fn stop_call(&self) {
        self.dispatch(CallEvent::StopCall).await;
    }

    /// Applies one event synchronously with respect to every other transition.
    pub async fn dispatch(&self, event: CallEvent) {
        let mut inner = self.inner.lock().await;
        self.apply_locked(&mut inner, event);
    }

    /// Applies every queued voice event without waiting. Returns how many
    /// events were taken off the queue (stale ones included).
    ///
    /// Returns 0 immediately while a [`process_next`](Self::process_next)
    /// driver owns the queue; that driver applies the events instead.
    pub async fn pump(&self) -> usize {
        let Ok(mut rx) = self.events_rx.try_lock() else {
            log::debug!("voice events are being driven elsewhere; skipping pump");
            return 0;
        };
        let mut taken = 0;
        while let Ok(queued) = rx.try_recv() {
            taken += 1;
            self.apply_queued(queued).await;
        }
        taken
    }

    /// Waits for the next voice event and applies it.
    pub async fn process_next(&self) {
        let mut rx = self.events_rx.lock().await;
        // The machine holds a sender, so the channel never closes.
        if let Some(queued) = rx.recv().await {
            self.apply_queued(queued).await;
        }
    }

    pub async fn status(&self) -> CallStatus {
        self.inner.lock().await.status
    }

    pub async fn snapshot(&self) -> CallSnapshot {
        let inner = self.inner.lock().await;
        Self::project(&inner)
    }

    pub fn subscribe(&self) -> watch::Receiver<CallSnapshot> {
        self.snapshot.subscribe()
    }

    async fn apply_queued(&self, queued: QueuedEvent) {
        let mut inner = self.inner.lock().await;
        if !inner.listening || queued.epoch != self.epoch.load(Ordering::SeqCst) {
            log::debug!("dropping stale voice event: {:?}", queued.event);
            return;
        }
        self.apply_locked(&mut inner, queued.event);
    }

    fn apply_locked(&self, inner: &mut Inner, event: CallEvent) {
        if inner.voice.is_none() {
            log::debug!("call event before voice session is attached: {event:?}");
            return;
        }

        let Some((next, effects)) = transition(inner.status, &event) else {
            log::debug!("ignoring {:?} in {:?}", event, inner.status);
            return;
        };

        let prev = inner.status;
        inner.status = next;
        for effect in effects {
            self.run_effect(inner, effect);
        }

        if prev != inner.status {
            log::info!("call status: {:?} -> {:?}", prev, inner.status);
        }
        self.publish(inner);
    }

    fn run_effect(&self, inner: &mut Inner, effect: CallEffect) {
        match effect {
            CallEffect::ClearError => inner.error = None,
            CallEffect::StartVoice => {
                if !inner.listening {
                    self.listen_locked(inner);
                }
                let result = match inner.voice.as_mut() {
                    Some(voice) => voice.start(&self.assistant_id),
                    None => return,
                };
                if let Err(e) = result {
                    log::error!("voice start failed: {e:#}");
                    inner.status = CallStatus::Error;
                    inner.error = Some(CallError::StartFailed(format!("{e:#}")));
                    self.teardown_locked(inner);
                }
            }
            CallEffect::ClearTranscript => inner.transcript.clear(),
            CallEffect::AppendTranscript(message) => inner.transcript.push(message),
            CallEffect::SetError(e) => {
                log::error!("call error: {e}");
                inner.error = Some(e);
            }
            CallEffect::Teardown => self.teardown_locked(inner),
        }
    }

    fn build_handlers(&self) -> HashMap<VoiceEventName, VoiceHandler> {
        VoiceEventName::ALL
            .into_iter()
            .map(|name| {
                let tx = self.events_tx.clone();
                let epoch = self.epoch.clone();
                let handler: VoiceHandler = Arc::new(move |event: VoiceEvent| {
                    if let Some(event) = CallEvent::from_voice(event) {
                        let queued = QueuedEvent {
                            epoch: epoch.load(Ordering::SeqCst),
                            event,
                        };
                        // Best-effort: a closed channel means the machine is gone.
                        let _ = tx.send(queued);
                    }
                });
                (name, handler)
            })
            .collect()
    }

    fn listen_locked(&self, inner: &mut Inner) {
        let Inner {
            voice, handlers, ..
        } = &mut *inner;
        let Some(voice) = voice.as_mut() else {
            return;
        };

        self.epoch.fetch_add(1, Ordering::SeqCst);
        for name in VoiceEventName::ALL {
            if let Some(handler) = handlers.get(&name) {
                voice.on(name, handler.clone());
            }
        }
        inner.listening = true;
    }

    fn teardown_locked(&self, inner: &mut Inner) {
        let Inner {
            voice,
            handlers,
            listening,
            ..
        } = &mut *inner;
        let Some(voice) = voice.as_mut() else {
            return;
        };

        if *listening {
            for name in VoiceEventName::ALL {
                if let Some(handler) = handlers.get(&name) {
                    voice.off(name, handler);
                }
            }
            *listening = false;
            // Anything already queued by the old registration is now stale.
            self.epoch.fetch_add(1, Ordering::SeqCst);
        }
        voice.stop();
    }

    fn project(inner: &Inner) -> CallSnapshot {
        CallSnapshot {
            status: inner.status,
            is_connected: matches!(inner.status, CallStatus::Connected(_)),
            is_connecting: inner.status == CallStatus::Connecting,
            is_speaking: inner.status == CallStatus::Connected(ConnectedPhase::Speaking),
            transcript: inner.transcript.messages().to_vec(),
            error: inner.error.as_ref().map(|e| e.to_string()),
        }
    }

    fn publish(&self, inner: &Inner) {
        let next = Self::project(inner);
        self.snapshot.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::FakeVoiceSession;
    use crate::traits::VoiceMessage;
    use widget_core::transcript::Speaker;

    async fn attached() -> (CallSessionMachine, FakeVoiceSession) {
        let machine = CallSessionMachine::new("asst_123");
        let voice = FakeVoiceSession::new();
        machine.attach(Box::new(voice.clone())).await;
        (machine, voice)
    }

    async fn emit(machine: &CallSessionMachine, voice: &FakeVoiceSession, event: VoiceEvent) {
        voice.emit(event);
        machine.pump().await;
    }

    #[test]
    fn table_ignores_duplicate_start() {
        assert!(transition(CallStatus::Connecting, &CallEvent::StartCall).is_none());
        assert!(
            transition(
                CallStatus::Connected(ConnectedPhase::Speaking),
                &CallEvent::StartCall
            )
            .is_none()
        );
        assert!(transition(CallStatus::Idle, &CallEvent::StopCall).is_none());
        assert!(transition(CallStatus::Uninitialized, &CallEvent::StartCall).is_none());
    }

    #[test]
    fn table_keeps_sub_phase_on_transcript() {
        let msg = TranscriptMessage::new(Speaker::User, "hi");
        let (next, effects) = transition(
            CallStatus::Connected(ConnectedPhase::Speaking),
            &CallEvent::TranscriptReceived(msg.clone()),
        )
        .unwrap();
        assert_eq!(next, CallStatus::Connected(ConnectedPhase::Speaking));
        assert_eq!(effects, vec![CallEffect::AppendTranscript(msg)]);
    }

    #[tokio::test]
    async fn attach_registers_all_listeners_and_goes_idle() {
        let machine = CallSessionMachine::new("asst_123");
        assert_eq!(machine.status().await, CallStatus::Uninitialized);

        let voice = FakeVoiceSession::new();
        machine.attach(Box::new(voice.clone())).await;
        assert_eq!(machine.status().await, CallStatus::Idle);
        assert_eq!(voice.listener_count(), 6);
        for name in VoiceEventName::ALL {
            assert!(voice.has_listener(name), "missing {}", name.as_str());
        }
    }

    #[tokio::test]
    async fn start_call_uses_configured_assistant() {
        let (machine, voice) = attached().await;
        machine.start_call().await;
        assert_eq!(machine.status().await, CallStatus::Connecting);
        assert_eq!(voice.started_with(), vec!["asst_123".to_string()]);

        let snap = machine.snapshot().await;
        assert!(snap.is_connecting);
        assert!(!snap.is_connected);
    }

    #[tokio::test]
    async fn start_while_live_is_ignored() {
        let (machine, voice) = attached().await;
        machine.start_call().await;
        machine.start_call().await;
        emit(&machine, &voice, VoiceEvent::CallStart).await;
        machine.start_call().await;

        assert_eq!(voice.started_with().len(), 1);
        assert_eq!(
            machine.status().await,
            CallStatus::Connected(ConnectedPhase::Listening)
        );
    }

    #[tokio::test]
    async fn call_start_clears_previous_transcript() {
        let (machine, voice) = attached().await;
        machine.start_call().await;
        emit(&machine, &voice, VoiceEvent::CallStart).await;
        emit(
            &machine,
            &voice,
            VoiceEvent::Message(VoiceMessage::transcript("user", "final", "first call")),
        )
        .await;
        emit(&machine, &voice, VoiceEvent::CallEnd).await;
        assert_eq!(machine.snapshot().await.transcript.len(), 1);

        machine.start_call().await;
        emit(&machine, &voice, VoiceEvent::CallStart).await;
        assert!(machine.snapshot().await.transcript.is_empty());
    }

    #[tokio::test]
    async fn partial_transcripts_never_append() {
        let (machine, voice) = attached().await;
        machine.start_call().await;
        emit(&machine, &voice, VoiceEvent::CallStart).await;
        emit(
            &machine,
            &voice,
            VoiceEvent::Message(VoiceMessage::transcript("user", "partial", "hel")),
        )
        .await;
        assert!(machine.snapshot().await.transcript.is_empty());

        emit(
            &machine,
            &voice,
            VoiceEvent::Message(VoiceMessage::transcript("user", "final", "hello")),
        )
        .await;
        assert_eq!(
            machine.snapshot().await.transcript,
            vec![TranscriptMessage::new(Speaker::User, "hello")]
        );
    }

    #[tokio::test]
    async fn transcript_before_connect_is_ignored() {
        let (machine, voice) = attached().await;
        machine.start_call().await;
        emit(
            &machine,
            &voice,
            VoiceEvent::Message(VoiceMessage::transcript("user", "final", "early")),
        )
        .await;
        assert!(machine.snapshot().await.transcript.is_empty());
    }

    #[tokio::test]
    async fn stop_from_every_live_state_detaches_listeners() {
        for prelude in [
            vec![],
            vec![VoiceEvent::CallStart],
            vec![VoiceEvent::CallStart, VoiceEvent::SpeechStart],
        ] {
            let (machine, voice) = attached().await;
            machine.start_call().await;
            for event in prelude.clone() {
                emit(&machine, &voice, event).await;
            }

            machine.stop_call().await;
            assert_eq!(machine.status().await, CallStatus::Idle, "{prelude:?}");
            assert_eq!(voice.listener_count(), 0);
            let stops = voice.stop_count();
            assert!(stops >= 1);

            // Second stop is a no-op.
            machine.stop_call().await;
            assert_eq!(machine.status().await, CallStatus::Idle);
            assert_eq!(voice.stop_count(), stops);
        }
    }

    #[tokio::test]
    async fn voice_error_moves_to_error_and_restart_clears_it() {
        let (machine, voice) = attached().await;
        machine.start_call().await;
        emit(&machine, &voice, VoiceEvent::CallStart).await;
        emit(&machine, &voice, VoiceEvent::Error("mic lost".into())).await;

        let snap = machine.snapshot().await;
        assert_eq!(snap.status, CallStatus::Error);
        assert_eq!(snap.error.as_deref(), Some("mic lost"));
        assert_eq!(voice.listener_count(), 0);

        machine.start_call().await;
        let snap = machine.snapshot().await;
        assert_eq!(snap.status, CallStatus::Connecting);
        assert_eq!(snap.error, None);
        assert_eq!(voice.listener_count(), 6);
        assert_eq!(voice.started_with().len(), 2);
    }

    #[tokio::test]
    async fn failed_start_surfaces_error() {
        let (machine, voice) = attached().await;
        voice.fail_next_start("no microphone");
        machine.start_call().await;

        let snap = machine.snapshot().await;
        assert_eq!(snap.status, CallStatus::Error);
        assert!(snap.error.unwrap().contains("no microphone"));
        assert_eq!(voice.listener_count(), 0);
    }

    #[tokio::test]
    async fn events_queued_before_stop_are_dropped() {
        let (machine, voice) = attached().await;
        machine.start_call().await;
        emit(&machine, &voice, VoiceEvent::CallStart).await;

        // Delivered by the SDK but not yet applied when the user hits stop.
        voice.emit(VoiceEvent::SpeechStart);
        voice.emit(VoiceEvent::Message(VoiceMessage::transcript(
            "assistant",
            "final",
            "late",
        )));
        machine.stop_call().await;
        assert_eq!(machine.pump().await, 2);

        let snap = machine.snapshot().await;
        assert_eq!(snap.status, CallStatus::Idle);
        assert!(!snap.is_speaking);
        assert!(snap.transcript.is_empty());
    }

    #[tokio::test]
    async fn speaking_implies_connected_for_any_sequence() {
        let events = [
            VoiceEvent::SpeechStart,
            VoiceEvent::CallStart,
            VoiceEvent::SpeechStart,
            VoiceEvent::SpeechStart,
            VoiceEvent::CallEnd,
            VoiceEvent::SpeechEnd,
            VoiceEvent::Error("x".into()),
            VoiceEvent::SpeechStart,
        ];

        let (machine, voice) = attached().await;
        let mut rx = machine.subscribe();
        for (i, event) in events.iter().cycle().take(40).enumerate() {
            if i % 5 == 0 {
                machine.start_call().await;
            }
            if i % 7 == 0 {
                machine.stop_call().await;
            }
            emit(&machine, &voice, event.clone()).await;

            let snap = machine.snapshot().await;
            assert!(!snap.is_speaking || snap.is_connected, "step {i}: {snap:?}");
            let seen = rx.borrow_and_update().clone();
            assert!(!seen.is_speaking || seen.is_connected);
        }
    }

    #[tokio::test]
    async fn shutdown_releases_voice_session() {
        let (machine, voice) = attached().await;
        machine.start_call().await;
        emit(&machine, &voice, VoiceEvent::CallStart).await;

        machine.shutdown().await;
        assert_eq!(machine.status().await, CallStatus::Uninitialized);
        assert_eq!(voice.listener_count(), 0);
        assert!(voice.stop_count() >= 1);

        // Nothing is reachable once released.
        machine.start_call().await;
        assert_eq!(machine.status().await, CallStatus::Uninitialized);
        assert_eq!(voice.started_with().len(), 1);
    }

    #[tokio::test]
    async fn shutdown_after_error_clears_error_and_transcript() {
        let (machine, voice) = attached().await;
        machine.start_call().await;
        emit(&machine, &voice, VoiceEvent::CallStart).await;
        emit(
            &machine,
            &voice,
            VoiceEvent::Message(VoiceMessage::transcript("user", "final", "hello")),
        )
        .await;
        emit(&machine, &voice, VoiceEvent::Error("boom".into())).await;
        assert_eq!(machine.snapshot().await.error.as_deref(), Some("boom"));

        machine.shutdown().await;
        let snap = machine.snapshot().await;
        assert_eq!(snap.status, CallStatus::Uninitialized);
        assert_eq!(snap.error, None);
        assert!(snap.transcript.is_empty());
        assert_eq!(*machine.subscribe().borrow(), snap);
    }

    #[tokio::test]
    async fn scripted_call_ends_idle_with_final_transcript() {
        let (machine, voice) = attached().await;
        machine.start_call().await;

        for event in [
            VoiceEvent::CallStart,
            VoiceEvent::SpeechStart,
            VoiceEvent::Message(VoiceMessage::transcript("user", "final", "hi")),
            VoiceEvent::SpeechEnd,
            VoiceEvent::CallEnd,
        ] {
            voice.emit(event);
        }
        assert_eq!(machine.pump().await, 5);

        let snap = machine.snapshot().await;
        assert_eq!(snap.status, CallStatus::Idle);
        assert_eq!(
            snap.transcript,
            vec![TranscriptMessage::new(Speaker::User, "hi")]
        );
        assert_eq!(voice.listener_count(), 0);
    }

    #[tokio::test]
    async fn pump_does_not_wait_on_a_background_driver() {
        let (machine, voice) = attached().await;

        let driver = tokio::spawn({
            let machine = machine.clone();
            async move {
                loop {
                    machine.process_next().await;
                }
            }
        });
        // Let the driver take the queue and park on it.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        let taken = tokio::time::timeout(std::time::Duration::from_millis(500), machine.pump())
            .await
            .expect("pump returned while the driver waits");
        assert_eq!(taken, 0);

        // The driver still applies events.
        machine.start_call().await;
        voice.emit(VoiceEvent::CallStart);
        for _ in 0..10 {
            if machine.status().await == CallStatus::Connected(ConnectedPhase::Listening) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(
            machine.status().await,
            CallStatus::Connected(ConnectedPhase::Listening)
        );
        driver.abort();
    }
}
