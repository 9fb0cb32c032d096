use serde::{Deserialize, Serialize};
use widget_core::screen::Screen;

use crate::bootstrap::MSG_STARTING;
use crate::router::RouterState;

pub const DEFAULT_ERROR_MESSAGE: &str = "Invalid configuration";

/// What the host should render for the current router state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum WidgetView {
    Loading { message: String },
    Auth,
    Error { message: String },
    Selection,
    Voice,
    Inbox,
    Chat,
    Contact,
}

impl WidgetView {
    pub fn screen(&self) -> Screen {
        match self {
            WidgetView::Loading { .. } => Screen::Loading,
            WidgetView::Auth => Screen::Auth,
            WidgetView::Error { .. } => Screen::Error,
            WidgetView::Selection => Screen::Selection,
            WidgetView::Voice => Screen::Voice,
            WidgetView::Inbox => Screen::Inbox,
            WidgetView::Chat => Screen::Chat,
            WidgetView::Contact => Screen::Contact,
        }
    }
}

/// Maps router state to a view. `loading_message` is the bootstrap status
/// line, if start-up is still running.
pub fn select_view(state: &RouterState, loading_message: Option<&str>) -> WidgetView {
    match state.screen {
        Screen::Loading => WidgetView::Loading {
            message: loading_message.unwrap_or(MSG_STARTING).to_string(),
        },
        Screen::Auth => WidgetView::Auth,
        Screen::Error => WidgetView::Error {
            message: state
                .error_message
                .clone()
                .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
        },
        Screen::Selection => WidgetView::Selection,
        Screen::Voice => WidgetView::Voice,
        Screen::Inbox => WidgetView::Inbox,
        Screen::Chat => WidgetView::Chat,
        Screen::Contact => WidgetView::Contact,
    }
}
