use std::rc::Rc;

use slint::ComponentHandle;

use crate::error::LookupError;
use crate::lookup;
use crate::notify::{Notification, Notifier, ToastNotifier};
use crate::product_display::{refresh_screen, to_slint_image};
use crate::scanner::{ScanEvent, ScanOrigin};
use crate::state::AppState;

pub fn setup_event_handlers(state: Rc<AppState>, ui: &crate::ui::MainWindow) {
    let ui_handle = ui.as_weak();

    let state_toggle = state.clone();
    let ui_handle_toggle = ui_handle.clone();
    ui.on_toggle_scan(move || {
        let event = {
            let mut scan = state_toggle.scan.borrow_mut();
            if !scan.is_scanning() {
                state_toggle.scan_error.replace(None);
            }
            scan.toggle()
        };
        match event {
            Some(event) => handle_scan_event(&state_toggle, &ui_handle_toggle, event),
            None => refresh_screen(&state_toggle, &ui_handle_toggle),
        }
    });

    let state_manual = state.clone();
    let ui_handle_manual = ui_handle.clone();
    ui.on_manual_submit(move |text| {
        let event = state_manual.scan.borrow_mut().submit_manual(&text);
        match event {
            Some(event) => {
                if let Some(ui) = ui_handle_manual.upgrade() {
                    ui.set_manual_barcode("".into());
                }
                handle_scan_event(&state_manual, &ui_handle_manual, event);
            }
            None => tracing::debug!("empty manual entry ignored"),
        }
    });

    // Keyboard-wedge scanners type the code followed by Enter.
    let state_wedge = state.clone();
    let ui_handle_wedge = ui_handle.clone();
    ui.on_barcode_scanned(move |barcode_str| {
        tracing::debug!("barcode scanned callback triggered with: {:?}", barcode_str.as_str());
        let barcode = crate::barcode::normalize(&barcode_str);
        if barcode.is_empty() {
            return;
        }
        if !state_wedge
            .debouncer
            .borrow_mut()
            .accept(&barcode, chrono::Utc::now())
        {
            return;
        }
        state_wedge.scan.borrow_mut().set_scanning(false);
        handle_scan_event(
            &state_wedge,
            &ui_handle_wedge,
            ScanEvent::Barcode {
                code: barcode,
                origin: ScanOrigin::Keyboard,
            },
        );
    });

    let state_another = state.clone();
    let ui_handle_another = ui_handle.clone();
    ui.on_scan_another(move || {
        state_another.lookup.borrow_mut().reset();
        state_another.scan_error.replace(None);
        state_another.product_image.replace(None);
        refresh_screen(&state_another, &ui_handle_another);
    });

    let state_dismiss = state;
    let ui_handle_dismiss = ui_handle;
    ui.on_dismiss_error(move || {
        state_dismiss.lookup.borrow_mut().dismiss_error();
        state_dismiss.scan_error.replace(None);
        refresh_screen(&state_dismiss, &ui_handle_dismiss);
    });
}

/// Act on a barcode or a scanner failure, whichever input produced it.
pub fn handle_scan_event(
    state: &Rc<AppState>,
    ui_handle: &slint::Weak<crate::ui::MainWindow>,
    event: ScanEvent,
) {
    match event {
        ScanEvent::Barcode { code, origin } => {
            tracing::info!(%code, ?origin, "barcode received");
            start_lookup(state, ui_handle, &code);
        }
        ScanEvent::Failed(error) => {
            if !error.is_camera_unavailable() {
                ToastNotifier::new(ui_handle.clone())
                    .notify(Notification::error("Scan Error", error.to_string()));
            }
            state.scan_error.replace(Some(error));
            refresh_screen(state, ui_handle);
        }
    }
}

/// Begin a lookup for `barcode`. The result is applied on the UI thread and
/// only if no newer lookup has started in the meantime.
pub fn start_lookup(
    state: &Rc<AppState>,
    ui_handle: &slint::Weak<crate::ui::MainWindow>,
    barcode: &str,
) {
    let ticket = state.lookup.borrow_mut().begin(barcode);
    state.scan_error.replace(None);
    state.product_image.replace(None);
    refresh_screen(state, ui_handle);

    let source = state.source.clone();
    let code = ticket.barcode().to_string();
    let handle = state
        .runtime
        .spawn(async move { lookup::lookup(source.as_ref(), &code).await });

    let state = state.clone();
    let ui_handle = ui_handle.clone();
    let spawned = slint::spawn_local(async move {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(LookupError::Network(format!("lookup task failed: {}", e))),
        };
        let seq = ticket.seq();
        let notifier = ToastNotifier::new(ui_handle.clone());
        if !state.lookup.borrow_mut().complete(ticket, result, &notifier) {
            return;
        }
        refresh_screen(&state, &ui_handle);

        let image_url = state
            .lookup
            .borrow()
            .product()
            .and_then(|p| p.image_url.clone());
        if let Some(url) = image_url {
            load_product_image(&state, &ui_handle, seq, url);
        }
    });
    if let Err(e) = spawned {
        tracing::error!(error = %e, "failed to schedule lookup completion");
    }
}

fn load_product_image(
    state: &Rc<AppState>,
    ui_handle: &slint::Weak<crate::ui::MainWindow>,
    seq: u64,
    url: String,
) {
    let images = state.images.clone();
    let handle = state
        .runtime
        .spawn(async move { images.fetch(&url).await });

    let state = state.clone();
    let ui_handle = ui_handle.clone();
    let spawned = slint::spawn_local(async move {
        let decoded = match handle.await {
            Ok(Ok(decoded)) => decoded,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "product image unavailable");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "image task failed");
                return;
            }
        };
        if !state.lookup.borrow().is_current(seq) {
            tracing::debug!(seq, "discarding image for a replaced product");
            return;
        }
        state.product_image.replace(Some(to_slint_image(&decoded)));
        refresh_screen(&state, &ui_handle);
    });
    if let Err(e) = spawned {
        tracing::error!(error = %e, "failed to schedule image load");
    }
}
