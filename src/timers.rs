use std::rc::Rc;

use crate::event_handlers::handle_scan_event;
use crate::state::AppState;

/// Start the UI timers. The returned timers stop when dropped.
pub fn setup_timers(state: Rc<AppState>, ui_handle: slint::Weak<crate::ui::MainWindow>) -> Vec<slint::Timer> {
    // Poll the camera decoder at the configured frame rate
    let interval = state.config.scanner.poll_interval();
    let scanner_timer = slint::Timer::default();
    scanner_timer.start(slint::TimerMode::Repeated, interval, move || {
        let event = state.scan.borrow_mut().pump();
        if let Some(event) = event {
            handle_scan_event(&state, &ui_handle, event);
        }
    });

    vec![scanner_timer]
}
