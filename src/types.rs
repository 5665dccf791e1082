use crate::classifier::{self, Classification, IngredientSegment};
use crate::error::{LookupError, ScanError};
use crate::keywords::KeywordSet;
use crate::lookup::LookupState;
use crate::product::NormalizedProduct;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngredientsVerdict {
    /// No ingredient text at all.
    Missing,
    /// Text present but no segments came out of it.
    Unparseable,
    VeganFriendly,
    NonVegan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Fetch,
    NotFound,
    Camera,
    Scan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDisplay {
    pub kind: ErrorKind,
    pub title: String,
    pub message: String,
}

impl ErrorDisplay {
    pub fn from_lookup(error: &LookupError) -> Self {
        let kind = match error {
            LookupError::NotFound { .. } => ErrorKind::NotFound,
            LookupError::Network(_) => ErrorKind::Fetch,
        };
        Self {
            kind,
            title: "Error".to_string(),
            message: error.to_string(),
        }
    }

    pub fn from_scan(error: &ScanError) -> Self {
        if error.is_camera_unavailable() {
            Self {
                kind: ErrorKind::Camera,
                title: "Camera Access Problem".to_string(),
                message: error.to_string(),
            }
        } else {
            Self {
                kind: ErrorKind::Scan,
                title: "Scan Error".to_string(),
                message: error.to_string(),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDisplay {
    pub name: String,
    pub barcode: String,
    pub image_url: Option<String>,
    pub verdict: IngredientsVerdict,
    pub segments: Vec<IngredientSegment>,
}

impl ProductDisplay {
    pub fn new(product: &NormalizedProduct, keywords: &KeywordSet) -> Self {
        let text = product.ingredients_text.as_deref();
        let classification = classifier::classify(text, keywords);
        let verdict = match &classification {
            Classification::Unparseable if text.is_none_or(|t| t.trim().is_empty()) => {
                IngredientsVerdict::Missing
            }
            Classification::Unparseable => IngredientsVerdict::Unparseable,
            c if c.is_potentially_non_vegan() => IngredientsVerdict::NonVegan,
            _ => IngredientsVerdict::VeganFriendly,
        };
        Self {
            name: product.name.clone(),
            barcode: product.id.clone(),
            image_url: product.image_url.clone(),
            verdict,
            segments: classification.segments().to_vec(),
        }
    }
}

/// Everything the main window shows, derived from application state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenDisplay {
    pub loading_barcode: Option<String>,
    pub error: Option<ErrorDisplay>,
    pub product: Option<ProductDisplay>,
    pub show_scanner: bool,
    pub show_welcome: bool,
}

impl ScreenDisplay {
    pub fn build(
        state: &LookupState,
        scan_error: Option<&ScanError>,
        is_scanning: bool,
        keywords: &KeywordSet,
    ) -> Self {
        let (loading_barcode, lookup_error, product) = match state {
            LookupState::Idle => (None, None, None),
            LookupState::Loading { barcode } => (Some(barcode.clone()), None, None),
            LookupState::Success(product) => (None, None, Some(ProductDisplay::new(product, keywords))),
            LookupState::Failed(error) => (None, Some(ErrorDisplay::from_lookup(error)), None),
        };
        let loading = loading_barcode.is_some();

        // A camera problem is more recent than a failed lookup shown behind it.
        let error = if loading {
            None
        } else {
            scan_error.map(ErrorDisplay::from_scan).or(lookup_error)
        };

        let show_scanner = product.is_none() && !loading;
        let show_welcome = show_scanner && error.is_none() && !is_scanning;
        Self {
            loading_barcode,
            error,
            product,
            show_scanner,
            show_welcome,
        }
    }
}
