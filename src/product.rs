//! Open Food Facts product records and normalization into display data.

use serde::{Deserialize, Serialize};

pub const UNKNOWN_PRODUCT_NAME: &str = "Unknown Product";

/// Fields requested from the product endpoint.
pub const REQUESTED_FIELDS: &[&str] = &[
    "product_name",
    "product_name_en",
    "image_front_url",
    "image_url",
    "selected_images",
    "ingredients_text",
    "ingredients_text_en",
    "ingredients_text_with_allergens",
    "ingredients_text_with_allergens_en",
];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProductImage {
    #[serde(default)]
    pub display_url: Option<String>,
    #[serde(default)]
    pub thumb_url: Option<String>,
    #[serde(default)]
    pub small_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SelectedImages {
    #[serde(default)]
    pub front: Option<ProductImage>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawProduct {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_name_en: Option<String>,
    #[serde(default)]
    pub image_front_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub selected_images: Option<SelectedImages>,
    #[serde(default)]
    pub ingredients_text: Option<String>,
    #[serde(default)]
    pub ingredients_text_en: Option<String>,
    #[serde(default)]
    pub ingredients_text_with_allergens: Option<String>,
    #[serde(default)]
    pub ingredients_text_with_allergens_en: Option<String>,
}

/// Response body of `GET /api/v2/product/{code}.json`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawProductRecord {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub product: Option<RawProduct>,
    /// 1 when found, 0 when not.
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub status_verbose: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedProduct {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub ingredients_text: Option<String>,
}

/// The record says there is no product for the requested code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound {
    pub status_verbose: String,
}

type Extractor = fn(&RawProduct) -> Option<&str>;

fn name_en(p: &RawProduct) -> Option<&str> {
    p.product_name_en.as_deref()
}

fn name(p: &RawProduct) -> Option<&str> {
    p.product_name.as_deref()
}

fn front_image(p: &RawProduct) -> Option<&str> {
    p.image_front_url.as_deref()
}

fn generic_image(p: &RawProduct) -> Option<&str> {
    p.image_url.as_deref()
}

fn front_display_image(p: &RawProduct) -> Option<&str> {
    p.selected_images
        .as_ref()
        .and_then(|s| s.front.as_ref())
        .and_then(|f| f.display_url.as_deref())
}

fn ingredients_en(p: &RawProduct) -> Option<&str> {
    p.ingredients_text_en.as_deref()
}

fn ingredients(p: &RawProduct) -> Option<&str> {
    p.ingredients_text.as_deref()
}

fn ingredients_with_allergens_en(p: &RawProduct) -> Option<&str> {
    p.ingredients_text_with_allergens_en.as_deref()
}

fn ingredients_with_allergens(p: &RawProduct) -> Option<&str> {
    p.ingredients_text_with_allergens.as_deref()
}

const NAME_SOURCES: &[Extractor] = &[name_en, name];

const IMAGE_SOURCES: &[Extractor] = &[front_image, generic_image, front_display_image];

const INGREDIENT_SOURCES: &[Extractor] = &[
    ingredients_en,
    ingredients,
    ingredients_with_allergens_en,
    ingredients_with_allergens,
];

/// First extractor that yields a non-blank value.
fn first_present(product: &RawProduct, sources: &[Extractor]) -> Option<String> {
    sources
        .iter()
        .filter_map(|extract| extract(product))
        .find(|value| !value.trim().is_empty())
        .map(str::to_string)
}

/// Stable stand-in image for products without one.
pub fn placeholder_image_url(barcode: &str) -> String {
    format!("https://picsum.photos/400/300?random={}", barcode)
}

pub fn normalize(raw: &RawProductRecord, requested_code: &str) -> Result<NormalizedProduct, NotFound> {
    let product = match (&raw.product, raw.status) {
        (Some(product), 1) => product,
        _ => {
            return Err(NotFound {
                status_verbose: raw.status_verbose.clone(),
            });
        }
    };

    let id = if raw.code.trim().is_empty() {
        requested_code.to_string()
    } else {
        raw.code.clone()
    };

    Ok(NormalizedProduct {
        name: first_present(product, NAME_SOURCES)
            .unwrap_or_else(|| UNKNOWN_PRODUCT_NAME.to_string()),
        image_url: Some(
            first_present(product, IMAGE_SOURCES)
                .unwrap_or_else(|| placeholder_image_url(requested_code)),
        ),
        ingredients_text: first_present(product, INGREDIENT_SOURCES),
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(product: RawProduct) -> RawProductRecord {
        RawProductRecord {
            code: "123".to_string(),
            product: Some(product),
            status: 1,
            status_verbose: "product found".to_string(),
        }
    }

    #[test]
    fn test_name_precedence() {
        let generic_only = RawProduct {
            product_name: Some("Choco".into()),
            ..Default::default()
        };
        assert_eq!(normalize(&found(generic_only), "123").unwrap().name, "Choco");

        let both = RawProduct {
            product_name: Some("Choco".into()),
            product_name_en: Some("Chocolate".into()),
            ..Default::default()
        };
        assert_eq!(normalize(&found(both), "123").unwrap().name, "Chocolate");

        let neither = RawProduct::default();
        assert_eq!(normalize(&found(neither), "123").unwrap().name, UNKNOWN_PRODUCT_NAME);
    }

    #[test]
    fn test_blank_name_falls_through() {
        let p = RawProduct {
            product_name_en: Some("  ".into()),
            product_name: Some("Choco".into()),
            ..Default::default()
        };
        assert_eq!(normalize(&found(p), "123").unwrap().name, "Choco");
    }

    #[test]
    fn test_ingredients_each_source_alone() {
        let cases: [(RawProduct, &str); 4] = [
            (
                RawProduct {
                    ingredients_text_en: Some("a".into()),
                    ..Default::default()
                },
                "a",
            ),
            (
                RawProduct {
                    ingredients_text: Some("b".into()),
                    ..Default::default()
                },
                "b",
            ),
            (
                RawProduct {
                    ingredients_text_with_allergens_en: Some("c".into()),
                    ..Default::default()
                },
                "c",
            ),
            (
                RawProduct {
                    ingredients_text_with_allergens: Some("d".into()),
                    ..Default::default()
                },
                "d",
            ),
        ];
        for (product, expected) in cases {
            let normalized = normalize(&found(product), "123").unwrap();
            assert_eq!(normalized.ingredients_text.as_deref(), Some(expected));
        }
        let none = normalize(&found(RawProduct::default()), "123").unwrap();
        assert_eq!(none.ingredients_text, None);
    }

    #[test]
    fn test_ingredients_precedence_order() {
        let all = RawProduct {
            ingredients_text_en: Some("a".into()),
            ingredients_text: Some("b".into()),
            ingredients_text_with_allergens_en: Some("c".into()),
            ingredients_text_with_allergens: Some("d".into()),
            ..Default::default()
        };
        assert_eq!(normalize(&found(all), "1").unwrap().ingredients_text.as_deref(), Some("a"));

        let no_plain = RawProduct {
            ingredients_text_with_allergens_en: Some("c".into()),
            ingredients_text_with_allergens: Some("d".into()),
            ..Default::default()
        };
        assert_eq!(
            normalize(&found(no_plain), "1").unwrap().ingredients_text.as_deref(),
            Some("c")
        );
    }

    #[test]
    fn test_image_precedence() {
        let nested = RawProduct {
            selected_images: Some(SelectedImages {
                front: Some(ProductImage {
                    display_url: Some("https://img/display.jpg".into()),
                    ..Default::default()
                }),
            }),
            ..Default::default()
        };
        let mut generic = nested.clone();
        generic.image_url = Some("https://img/generic.jpg".into());
        let mut front = generic.clone();
        front.image_front_url = Some("https://img/front.jpg".into());

        let url = |p: RawProduct| normalize(&found(p), "123").unwrap().image_url.unwrap();
        assert_eq!(url(front), "https://img/front.jpg");
        assert_eq!(url(generic), "https://img/generic.jpg");
        assert_eq!(url(nested), "https://img/display.jpg");
        assert_eq!(url(RawProduct::default()), placeholder_image_url("123"));
    }

    #[test]
    fn test_placeholder_is_stable() {
        let a = normalize(&found(RawProduct::default()), "4006381333931").unwrap();
        let b = normalize(&found(RawProduct::default()), "4006381333931").unwrap();
        assert_eq!(a.image_url, b.image_url);
        assert!(a.image_url.unwrap().ends_with("4006381333931"));
    }

    #[test]
    fn test_not_found() {
        let raw = RawProductRecord {
            code: "000000000000".into(),
            product: None,
            status: 0,
            status_verbose: "product not found".into(),
        };
        let err = normalize(&raw, "000000000000").unwrap_err();
        assert_eq!(err.status_verbose, "product not found");

        let found_without_product = RawProductRecord {
            status: 1,
            ..raw
        };
        assert!(normalize(&found_without_product, "000000000000").is_err());
    }

    #[test]
    fn test_id_falls_back_to_requested_code() {
        let mut raw = found(RawProduct::default());
        raw.code = String::new();
        assert_eq!(normalize(&raw, "42").unwrap().id, "42");
    }

    #[test]
    fn test_deserializes_partial_payload() {
        let raw: RawProductRecord = serde_json::from_str(
            r#"{"code":"3017620422003","product":{"product_name":"Nutella","nutriscore_grade":"e","selected_images":{"front":{"display":{"en":"https://img/x.jpg"}}}},"status":1,"status_verbose":"product found"}"#,
        )
        .unwrap();
        let product = normalize(&raw, "3017620422003").unwrap();
        assert_eq!(product.name, "Nutella");
        assert_eq!(product.ingredients_text, None);
        assert_eq!(product.image_url, Some(placeholder_image_url("3017620422003")));
    }

    #[test]
    fn test_deserializes_not_found_payload() {
        let raw: RawProductRecord = serde_json::from_str(
            r#"{"code":"000000000000","status":0,"status_verbose":"product not found"}"#,
        )
        .unwrap();
        assert!(raw.product.is_none());
        assert!(normalize(&raw, "000000000000").is_err());
    }
}
