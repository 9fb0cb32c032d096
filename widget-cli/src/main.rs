use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use tracing_subscriber::EnvFilter;
use widget_core::config::{VoiceSettings, WidgetConfig};
use widget_core::contact::{ContactForm, ContactMetadata};
use widget_core::types::OrganizationId;
use widget_engine::call::{CallSessionMachine, CallSnapshot, CallStatus};
use widget_engine::context::WidgetContext;
use widget_engine::traits::{VoiceEvent, VoiceEventName, VoiceHandler, VoiceMessage, VoiceSession};
use widget_runtime::config_store::ConfigStore;
use widget_runtime::defaults::CONFIG_FILE_NAME;
use widget_runtime::widget::build_widget_from_config;

const USAGE: &str = "usage:
  widget-cli bootstrap <organization-id>
  widget-cli sign-in <organization-id> <name> <email>
  widget-cli call-demo

env:
  WIDGET_CONFIG       config file (default: ./widget.json)
  WIDGET_BACKEND_URL  overrides backend_url from the config
  RUST_LOG            log filter (default: info)";

type Listeners = Arc<Mutex<Vec<(VoiceEventName, VoiceHandler)>>>;

/// Plays back a canned conversation instead of talking to a voice provider.
struct ScriptedVoiceSession {
    // A provider client is constructed with the public key; the script only
    // reports it.
    public_key: String,
    listeners: Listeners,
}

impl ScriptedVoiceSession {
    fn new(voice: &VoiceSettings) -> Self {
        Self {
            public_key: voice.public_key.clone(),
            listeners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn script() -> Vec<VoiceEvent> {
        vec![
            VoiceEvent::CallStart,
            VoiceEvent::SpeechStart,
            VoiceEvent::Message(VoiceMessage::transcript("user", "partial", "Hi, I")),
            VoiceEvent::Message(VoiceMessage::transcript(
                "user",
                "final",
                "Hi, I can't log in to my account.",
            )),
            VoiceEvent::SpeechEnd,
            VoiceEvent::Message(VoiceMessage::transcript(
                "assistant",
                "final",
                "Sorry to hear that. Let's reset your password.",
            )),
            VoiceEvent::CallEnd,
        ]
    }
}

fn emit(listeners: &Listeners, event: VoiceEvent) {
    let handlers: Vec<VoiceHandler> = match listeners.lock() {
        Ok(l) => l
            .iter()
            .filter(|(name, _)| *name == event.name())
            .map(|(_, h)| h.clone())
            .collect(),
        Err(_) => return,
    };
    for handler in handlers {
        handler(event.clone());
    }
}

impl VoiceSession for ScriptedVoiceSession {
    fn on(&mut self, event: VoiceEventName, handler: VoiceHandler) {
        if let Ok(mut l) = self.listeners.lock() {
            l.push((event, handler));
        }
    }

    fn off(&mut self, event: VoiceEventName, handler: &VoiceHandler) {
        if let Ok(mut l) = self.listeners.lock() {
            l.retain(|(name, h)| !(*name == event && Arc::ptr_eq(h, handler)));
        }
    }

    fn start(&mut self, assistant_id: &str) -> anyhow::Result<()> {
        if self.public_key.trim().is_empty() {
            log::warn!("voice.public_key is not configured; a real provider would reject this call");
        }
        println!(
            "[voice] start assistant={assistant_id} public_key={}",
            self.public_key
        );
        let listeners = self.listeners.clone();
        tokio::spawn(async move {
            for event in Self::script() {
                tokio::time::sleep(Duration::from_millis(200)).await;
                emit(&listeners, event);
            }
        });
        Ok(())
    }

    fn stop(&mut self) {
        println!("[voice] stop");
    }
}

fn config_path() -> PathBuf {
    std::env::var("WIDGET_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE_NAME))
}

fn load_config(path: &Path) -> anyhow::Result<WidgetConfig> {
    let mut cfg = ConfigStore::at_path(path).load_or_default()?;
    if let Ok(url) = std::env::var("WIDGET_BACKEND_URL") {
        if !url.trim().is_empty() {
            log::info!("backend_url overridden by WIDGET_BACKEND_URL: {url}");
            cfg.backend_url = url;
        }
    }
    Ok(cfg)
}

fn mount(organization_id: Option<&str>) -> anyhow::Result<WidgetContext> {
    let path = config_path();
    let cfg = load_config(&path)?;
    build_widget_from_config(&cfg, &path, OrganizationId::parse(organization_id))
}

fn metadata() -> ContactMetadata {
    let language = std::env::var("LANG")
        .ok()
        .and_then(|l| l.split('.').next().map(|s| s.replace('_', "-")))
        .filter(|l| !l.is_empty());
    ContactMetadata {
        user_agent: Some(format!("widget-cli/{}", env!("CARGO_PKG_VERSION"))),
        languages: language.clone().map(|l| vec![l]),
        language,
        platform: Some(std::env::consts::OS.to_string()),
        timezone: std::env::var("TZ").ok(),
        ..ContactMetadata::default()
    }
}

async fn print_view(widget: &WidgetContext) -> anyhow::Result<()> {
    let view = widget.view().await;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

async fn bootstrap(organization_id: Option<&str>) -> anyhow::Result<()> {
    let widget = mount(organization_id)?;
    let outcome = widget.start().await;
    for line in widget.bootstrap.snapshot().await.loading_messages {
        println!("[loading] {line}");
    }
    println!("outcome={outcome:?}");
    print_view(&widget).await
}

async fn sign_in(organization_id: &str, name: &str, email: &str) -> anyhow::Result<()> {
    let widget = mount(Some(organization_id))?;
    widget.start().await;

    let form = ContactForm::new(name, email);
    match widget.sign_in.submit(&form, &metadata()).await? {
        Some(id) => println!("contact_session_id={id}"),
        None => println!("not signed in (no valid organization)"),
    }
    print_view(&widget).await
}

fn print_snapshot(snap: &CallSnapshot) {
    let last = snap
        .transcript
        .last()
        .map(|m| format!(" last={:?}:{:?}", m.role, m.text))
        .unwrap_or_default();
    println!(
        "[call] status={:?} connected={} connecting={} speaking={} transcript={}{}",
        snap.status,
        snap.is_connected,
        snap.is_connecting,
        snap.is_speaking,
        snap.transcript.len(),
        last
    );
}

async fn call_demo() -> anyhow::Result<()> {
    let path = config_path();
    let cfg = load_config(&path)?;
    let assistant_id = if cfg.voice.assistant_id.trim().is_empty() {
        "demo-assistant".to_string()
    } else {
        cfg.voice.assistant_id.clone()
    };

    let call = CallSessionMachine::new(assistant_id);
    call.attach(Box::new(ScriptedVoiceSession::new(&cfg.voice))).await;
    call.start_call().await;
    print_snapshot(&call.snapshot().await);

    let run = async {
        let mut was_live = false;
        loop {
            call.process_next().await;
            let snap = call.snapshot().await;
            print_snapshot(&snap);
            was_live |= snap.status.is_live();
            if was_live && matches!(snap.status, CallStatus::Idle | CallStatus::Error) {
                return snap;
            }
        }
    };

    let snap = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .context("scripted call did not finish")?;
    call.shutdown().await;
    log::info!(
        "scripted call finished: status={:?} turns={}",
        snap.status,
        snap.transcript.len()
    );

    for msg in &snap.transcript {
        println!("{:?}: {}", msg.role, msg.text);
    }
    if let Some(err) = snap.error {
        bail!("call failed: {err}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        ["bootstrap"] => bootstrap(None).await,
        ["bootstrap", organization_id] => bootstrap(Some(*organization_id)).await,
        ["sign-in", organization_id, name, email] => sign_in(organization_id, name, email).await,
        ["call-demo"] => call_demo().await,
        _ => Err(anyhow!("{USAGE}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_session_carries_public_key_and_plays_a_full_call() {
        let voice = VoiceSettings {
            public_key: "pk_test".into(),
            assistant_id: "asst_1".into(),
        };
        let session = ScriptedVoiceSession::new(&voice);
        assert_eq!(session.public_key, "pk_test");

        let call = CallSessionMachine::new(voice.assistant_id.clone());
        call.attach(Box::new(session)).await;
        call.start_call().await;

        let snap = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                call.process_next().await;
                let snap = call.snapshot().await;
                if snap.status == CallStatus::Idle {
                    return snap;
                }
            }
        })
        .await
        .unwrap();

        let texts: Vec<&str> = snap.transcript.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Hi, I can't log in to my account.",
                "Sorry to hear that. Let's reset your password.",
            ]
        );
        assert_eq!(snap.error, None);
    }
}
