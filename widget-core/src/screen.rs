use serde::{Deserialize, Serialize};

/// The screens the widget can show. Exactly one is visible at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Loading,
    Auth,
    Error,
    Selection,
    Voice,
    Inbox,
    Chat,
    Contact,
}

impl Default for Screen {
    fn default() -> Self {
        Self::Loading
    }
}

impl Screen {
    // A stable string label for logs and the CLI; not derived from `Debug`.
    pub fn label(self) -> &'static str {
        match self {
            Screen::Loading => "loading",
            Screen::Auth => "auth",
            Screen::Error => "error",
            Screen::Selection => "selection",
            Screen::Voice => "voice",
            Screen::Inbox => "inbox",
            Screen::Chat => "chat",
            Screen::Contact => "contact",
        }
    }
}
