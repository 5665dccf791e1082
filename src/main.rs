use slint::ComponentHandle;
use std::path::PathBuf;
use std::rc::Rc;

use veganwise::config::AppConfig;
use veganwise::state::AppState;

fn main() -> anyhow::Result<()> {
    veganwise::telemetry::init();

    let config_file = std::env::args_os().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_file)?;
    let state = Rc::new(AppState::new(config)?);

    let ui = veganwise::ui::MainWindow::new()?;

    let ui_handle = ui.as_weak();
    veganwise::ui_setup::initialize_ui(&ui, &state, &ui_handle);

    veganwise::event_handlers::setup_event_handlers(state.clone(), &ui);

    let _timers = veganwise::timers::setup_timers(state.clone(), ui_handle);

    ui.run()?;

    // Release the camera before the window goes away.
    state.scan.borrow_mut().set_scanning(false);
    Ok(())
}
