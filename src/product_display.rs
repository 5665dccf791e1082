use slint::{Rgba8Pixel, SharedPixelBuffer, SharedString};
use std::rc::Rc;

use crate::image_fetch::DecodedImage;
use crate::state::AppState;
use crate::types::{ErrorKind, IngredientsVerdict, ScreenDisplay};
use crate::ui::{self, IngredientChip};

const SCANNING_STATUS: &str = "Point your camera at a product barcode.";
const IDLE_STATUS: &str = "Scan a product's barcode or enter it manually to check its ingredients.";

pub fn to_slint_image(image: &DecodedImage) -> slint::Image {
    let buffer = SharedPixelBuffer::<Rgba8Pixel>::clone_from_slice(&image.rgba, image.width, image.height);
    slint::Image::from_rgba8(buffer)
}

fn ui_verdict(verdict: IngredientsVerdict) -> ui::IngredientsVerdict {
    match verdict {
        IngredientsVerdict::Missing => ui::IngredientsVerdict::Missing,
        IngredientsVerdict::Unparseable => ui::IngredientsVerdict::Unparseable,
        IngredientsVerdict::VeganFriendly => ui::IngredientsVerdict::VeganFriendly,
        IngredientsVerdict::NonVegan => ui::IngredientsVerdict::NonVegan,
    }
}

fn ui_error_kind(kind: ErrorKind) -> ui::ErrorKind {
    match kind {
        ErrorKind::Fetch => ui::ErrorKind::Fetch,
        ErrorKind::NotFound => ui::ErrorKind::NotFound,
        ErrorKind::Camera => ui::ErrorKind::Camera,
        ErrorKind::Scan => ui::ErrorKind::Scan,
    }
}

/// Push the current application state into the main window.
pub fn refresh_screen(state: &AppState, ui_handle: &slint::Weak<crate::ui::MainWindow>) {
    let Some(ui) = ui_handle.upgrade() else {
        return;
    };

    let is_scanning = state.scan.borrow().is_scanning();
    let screen = {
        let lookup = state.lookup.borrow();
        let scan_error = state.scan_error.borrow();
        ScreenDisplay::build(lookup.state(), scan_error.as_ref(), is_scanning, &state.keywords)
    };

    ui.set_is_scanning(is_scanning);
    let status = if is_scanning { SCANNING_STATUS } else { IDLE_STATUS };
    ui.set_scanner_status(status.into());
    ui.set_show_scanner(screen.show_scanner);
    ui.set_show_welcome(screen.show_welcome);

    ui.set_is_loading(screen.loading_barcode.is_some());
    ui.set_loading_barcode(screen.loading_barcode.unwrap_or_default().into());

    match screen.error {
        Some(error) => {
            ui.set_error_kind(ui_error_kind(error.kind));
            ui.set_error_title(error.title.into());
            ui.set_error_message(error.message.into());
        }
        None => {
            ui.set_error_kind(ui::ErrorKind::None);
            ui.set_error_title(SharedString::new());
            ui.set_error_message(SharedString::new());
        }
    }

    match screen.product {
        Some(product) => {
            ui.set_has_product(true);
            ui.set_product_name(product.name.into());
            ui.set_product_barcode(product.barcode.into());
            ui.set_verdict(ui_verdict(product.verdict));

            let chips: Vec<IngredientChip> = product
                .segments
                .into_iter()
                .map(|segment| IngredientChip {
                    hint: SharedString::from(
                        segment
                            .matched_keyword
                            .map(|k| format!("Potential non-vegan: {}", k))
                            .unwrap_or_default(),
                    ),
                    text: SharedString::from(segment.display_text),
                    flagged: segment.flagged,
                })
                .collect();
            ui.set_ingredients(Rc::new(slint::VecModel::from(chips)).into());
        }
        None => {
            ui.set_has_product(false);
            ui.set_product_name(SharedString::new());
            ui.set_product_barcode(SharedString::new());
            ui.set_ingredients(Rc::new(slint::VecModel::<IngredientChip>::default()).into());
        }
    }

    match state.product_image.borrow().as_ref() {
        Some(image) => {
            ui.set_product_image(image.clone());
            ui.set_has_product_image(true);
        }
        None => {
            ui.set_product_image(slint::Image::default());
            ui.set_has_product_image(false);
        }
    }
}
