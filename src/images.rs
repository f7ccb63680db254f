use crate::models::Product;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Cap on images attached to a chat answer.
pub const CHAT_IMAGE_CAP: usize = 12;

/// Default cap for the dedicated `/images` lookup.
pub const IMAGES_DEFAULT_LIMIT: usize = 10;

static WANTS_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)imagen|foto|ver|muestra|mostrar|visual").expect("static regex"));

static WANTS_ALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)todos.*(producto|lista|cat[áa]logo)").expect("static regex"));

#[derive(Debug, Default)]
pub struct ImageSelection {
    pub images: Vec<String>,
    pub attached: bool,
}

/// Keyword-trigger policy: if the message asks for pictures or for the
/// whole catalog, attach the de-duplicated union of every product's images,
/// capped. Otherwise attach nothing. There is no per-product name matching
/// on the chat path; that lives in [`by_product_name`] for `/images`.
pub fn select(message: &str, products: &[Product]) -> ImageSelection {
    if !WANTS_IMAGE.is_match(message) && !WANTS_ALL.is_match(message) {
        return ImageSelection::default();
    }

    let images = collect_all(products, CHAT_IMAGE_CAP);
    ImageSelection {
        images,
        attached: true,
    }
}

/// `/images` lookup: substring match on product name, or everything when no
/// name (or the literal "todos") is given.
pub fn by_product_name(
    products: &[Product],
    product_name: Option<&str>,
    limit: usize,
) -> Vec<String> {
    match product_name {
        Some(name) if name != "todos" => {
            let needle = name.to_lowercase();
            let matched = products
                .iter()
                .filter(|p| {
                    p.nombre
                        .as_deref()
                        .map(|n| n.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                })
                .flat_map(|p| p.imagenes.iter().cloned());
            dedup_capped(matched, limit)
        }
        _ => collect_all(products, limit),
    }
}

fn collect_all(products: &[Product], cap: usize) -> Vec<String> {
    dedup_capped(
        products.iter().flat_map(|p| p.imagenes.iter().cloned()),
        cap,
    )
}

fn dedup_capped(urls: impl Iterator<Item = String>, cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for url in urls {
        if seen.insert(url.clone()) {
            result.push(url);
            if result.len() == cap {
                break;
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(nombre: &str, imagenes: &[&str]) -> Product {
        crate::normalize::normalize_product(json!({
            "nombre": nombre,
            "imagenes": imagenes,
        }))
    }

    fn sample_products() -> Vec<Product> {
        vec![
            product("Impresora Canon G110", &["https://a.jpg", "https://b.jpg"]),
            product("Pantalla Gamer", &["https://b.jpg", "https://c.jpg"]),
            product("Mouse Logitech", &[]),
        ]
    }

    #[test]
    fn catalog_request_attaches_deduplicated_union() {
        let products = sample_products();
        let selection = select("muéstrame todos los productos", &products);
        assert!(selection.attached);
        assert_eq!(
            selection.images,
            vec!["https://a.jpg", "https://b.jpg", "https://c.jpg"]
        );
        assert!(selection.images.len() <= CHAT_IMAGE_CAP);
    }

    #[test]
    fn off_topic_message_attaches_nothing() {
        let selection = select("cuál es el horario", &sample_products());
        assert!(!selection.attached);
        assert!(selection.images.is_empty());
    }

    #[test]
    fn photo_keyword_triggers_attachment() {
        let selection = select("tienes una FOTO de la impresora?", &sample_products());
        assert!(selection.attached);
        assert!(!selection.images.is_empty());
    }

    #[test]
    fn cap_is_enforced() {
        let products: Vec<Product> = (0..30)
            .map(|i| product(&format!("P{i}"), &[&format!("https://img/{i}.jpg")[..]]))
            .collect();
        let selection = select("quiero ver imagenes", &products);
        assert_eq!(selection.images.len(), CHAT_IMAGE_CAP);
    }

    #[test]
    fn name_lookup_matches_substring_case_insensitive() {
        let products = sample_products();
        let images = by_product_name(&products, Some("canon"), IMAGES_DEFAULT_LIMIT);
        assert_eq!(images, vec!["https://a.jpg", "https://b.jpg"]);
    }

    #[test]
    fn name_lookup_todos_returns_everything() {
        let products = sample_products();
        let images = by_product_name(&products, Some("todos"), IMAGES_DEFAULT_LIMIT);
        assert_eq!(images.len(), 3);
        let images = by_product_name(&products, None, 2);
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn unknown_name_yields_empty() {
        let images = by_product_name(&sample_products(), Some("servidor"), 10);
        assert!(images.is_empty());
    }
}
