//! Page lifecycle states and the visible UI model.

/// Whether the page has a push subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// The worker is active but the subscription has not been queried yet.
    Unknown,
    /// A push subscription exists.
    Subscribed,
    /// No push subscription exists.
    Unsubscribed,
}

/// Page controller lifecycle.
///
/// ```text
/// Unregistered → Registering → Registered(Unknown) → Registered(Subscribed | Unsubscribed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// No worker registered (initial state, or registration failed).
    Unregistered,
    /// Worker registration in flight.
    Registering,
    /// Worker registered.
    Registered(SubscriptionState),
}

impl PageState {
    /// Whether a worker is registered.
    pub fn is_registered(self) -> bool {
        matches!(self, Self::Registered(_))
    }

    /// Whether the page is known to be subscribed.
    pub fn is_subscribed(self) -> bool {
        self == Self::Registered(SubscriptionState::Subscribed)
    }
}

impl std::fmt::Display for PageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unregistered => write!(f, "unregistered"),
            Self::Registering => write!(f, "registering"),
            Self::Registered(SubscriptionState::Unknown) => write!(f, "registered"),
            Self::Registered(SubscriptionState::Subscribed) => write!(f, "subscribed"),
            Self::Registered(SubscriptionState::Unsubscribed) => write!(f, "unsubscribed"),
        }
    }
}

/// Page visibility as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// The page is on screen.
    Visible,
    /// The page is in the background.
    Hidden,
}

/// What the user sees: two buttons, a status line and the unread badge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiState {
    /// Subscribe button enabled.
    pub subscribe_enabled: bool,
    /// Unsubscribe button enabled.
    pub unsubscribe_enabled: bool,
    /// Status message area.
    pub status_message: String,
    /// In-memory mirror of the worker's counter.
    pub notification_count: u64,
}

impl UiState {
    /// Badge text, shown only when there is something unread.
    pub fn badge_text(&self) -> Option<String> {
        (self.notification_count > 0).then(|| self.notification_count.to_string())
    }

    /// Enable exactly one of the two buttons.
    pub(crate) fn show_subscribed(&mut self, subscribed: bool) {
        self.subscribe_enabled = !subscribed;
        self.unsubscribe_enabled = subscribed;
    }
}

impl std::fmt::Display for UiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let button = |enabled: bool, label: &str| {
            if enabled {
                format!("[{label}]")
            } else {
                format!("({label})")
            }
        };
        write!(
            f,
            "{} {}",
            button(self.subscribe_enabled, "Subscribe"),
            button(self.unsubscribe_enabled, "Unsubscribe")
        )?;
        if !self.status_message.is_empty() {
            write!(f, "  {}", self.status_message)?;
        }
        if let Some(badge) = self.badge_text() {
            write!(f, "  ({badge})")?;
        }
        Ok(())
    }
}
