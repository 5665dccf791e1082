//! Short user-facing notifications ("toasts").

use std::cell::RefCell;
use std::time::Duration;

use crate::error::LookupError;
use crate::product::NormalizedProduct;

const TOAST_DURATION: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            kind: NotificationKind::Info,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            kind: NotificationKind::Error,
        }
    }

    /// Notification for a finished lookup.
    pub fn for_lookup(result: &Result<NormalizedProduct, LookupError>) -> Self {
        match result {
            Ok(product) => Notification::info(
                "Product Found!",
                format!("Displaying information for {}.", product.name),
            ),
            Err(LookupError::NotFound { barcode, .. }) => Notification::error(
                "Product Not Found",
                format!("Could not find information for barcode {}.", barcode),
            ),
            Err(LookupError::Network(_)) => Notification::error(
                "API Error",
                "There was a problem fetching product information.",
            ),
        }
    }
}

pub trait Notifier {
    fn notify(&self, notification: Notification);
}

/// Keeps every notification in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    seen: RefCell<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.borrow_mut().push(notification);
    }
}

/// Shows notifications as a toast in the main window.
pub struct ToastNotifier {
    ui_handle: slint::Weak<crate::ui::MainWindow>,
}

impl ToastNotifier {
    pub fn new(ui_handle: slint::Weak<crate::ui::MainWindow>) -> Self {
        Self { ui_handle }
    }
}

impl Notifier for ToastNotifier {
    fn notify(&self, notification: Notification) {
        tracing::info!(title = %notification.title, "{}", notification.description);
        let Some(ui) = self.ui_handle.upgrade() else {
            return;
        };
        ui.set_toast_title(notification.title.into());
        ui.set_toast_message(notification.description.into());
        ui.set_toast_is_error(notification.kind == NotificationKind::Error);
        ui.set_toast_visible(true);

        // A newer toast restarts the countdown; only the latest one hides it.
        let serial = ui.get_toast_serial() + 1;
        ui.set_toast_serial(serial);
        let ui_handle = self.ui_handle.clone();
        slint::Timer::single_shot(TOAST_DURATION, move || {
            if let Some(ui) = ui_handle.upgrade() {
                if ui.get_toast_serial() == serial {
                    ui.set_toast_visible(false);
                }
            }
        });
    }
}
