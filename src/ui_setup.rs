use chrono::Datelike;
use std::rc::Rc;

use crate::product_display::refresh_screen;
use crate::state::AppState;

pub fn initialize_ui(
    ui: &crate::ui::MainWindow,
    state: &Rc<AppState>,
    ui_handle: &slint::Weak<crate::ui::MainWindow>,
) {
    let year = chrono::Local::now().year();
    ui.set_footer_text(format!("© {} VeganWise. All rights reserved.", year).into());

    // Initial screen: nothing scanned yet
    refresh_screen(state, ui_handle);
}
