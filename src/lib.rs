pub mod barcode;
pub mod classifier;
pub mod config;
pub mod error;
pub mod event_handlers;
pub mod image_fetch;
pub mod keywords;
pub mod lookup;
pub mod notify;
pub mod product;
pub mod product_display;
pub mod scanner;
pub mod state;
pub mod telemetry;
pub mod timers;
pub mod types;
pub mod ui_setup;

pub mod ui {
    slint::include_modules!();
}
