use crate::aggregate::StoreData;
use crate::profile::{GARANTIAS, STORE_DIRECCION};
use crate::scrape::truncate_chars;
use std::fmt::Write;

/// Hard cap on serialized products so the prompt cannot grow without bound
/// as the store's stock does. Products are included in store order; there
/// is no ranking or retrieval step.
pub const MAX_PROMPT_PRODUCTS: usize = 30;

/// The scraped page is advisory context; a short excerpt is plenty.
pub const WEB_EXCERPT_CHARS: usize = 600;

/// Render store data, static policy tables, the scraped web excerpt, and
/// the literal user message into one Spanish instruction string. Pure and
/// deterministic; all formatting rules live here as named constants.
pub fn compose(data: &StoreData, web_content: &str, message: &str) -> String {
    let products: Vec<_> = data.products.iter().take(MAX_PROMPT_PRODUCTS).collect();
    let products_str =
        serde_json::to_string_pretty(&products).unwrap_or_else(|_| "[]".to_string());
    let categories_str =
        serde_json::to_string_pretty(&data.categories).unwrap_or_else(|_| "[]".to_string());

    let mut garantias_str = String::new();
    for (class, duration) in GARANTIAS {
        let _ = writeln!(garantias_str, "- {class}: {duration}");
    }

    let web_excerpt = truncate_chars(web_content, WEB_EXCERPT_CHARS);

    format!(
        "Eres Sr. Robot, asistente de Sr Robot en Huánuco.\n\
         REGLAS:\n\
         - Usa SOLO datos reales de productos.\n\
         - Precios en S/.\n\
         - Si piden imagen → \"Aquí tienes las imágenes adjuntas.\"\n\
         - Si piden todos → lista breve: nombre + precio + (ver imagen).\n\
         - Si no existe → \"Lo siento, no tengo ese producto.\"\n\
         - Máximo 3 líneas.\n\
         - 1 emoji al inicio.\n\
         - Español claro.\n\
         \n\
         Datos:\n\
         Productos: {products_str}\n\
         Categorías: {categories_str}\n\
         Garantías:\n{garantias_str}\
         Dirección: {direccion}\n\
         Web: {web_excerpt}\n\
         \n\
         Pregunta: {message}\n\
         \n\
         Respuesta:",
        direccion = STORE_DIRECCION,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{self, DataSource, assemble};
    use serde_json::json;

    fn data_with_products(count: usize) -> StoreData {
        let products = (0..count)
            .map(|i| {
                json!({
                    "id": i,
                    "nombre": format!("Producto {i}"),
                    "precio": 100 + i,
                })
            })
            .collect();
        assemble(products, vec![json!({ "nombre": "Laptops" })])
    }

    #[test]
    fn contains_literal_user_message() {
        let data = aggregate::fallback_data();
        let prompt = compose(&data, "web", "¿tienen impresoras Canon?");
        assert!(prompt.contains("¿tienen impresoras Canon?"));
    }

    #[test]
    fn product_list_is_capped() {
        let data = data_with_products(80);
        assert_eq!(data.source, DataSource::Live);
        let prompt = compose(&data, "", "hola");
        assert!(prompt.contains("Producto 29"));
        assert!(!prompt.contains("Producto 30"));
    }

    #[test]
    fn embeds_warranties_and_address() {
        let data = aggregate::fallback_data();
        let prompt = compose(&data, "", "garantía de laptops?");
        assert!(prompt.contains("Laptops: 1 año"));
        assert!(prompt.contains(STORE_DIRECCION));
    }

    #[test]
    fn web_excerpt_is_truncated() {
        let data = aggregate::fallback_data();
        let long_web = "x".repeat(5000);
        let prompt = compose(&data, &long_web, "hola");
        assert!(!prompt.contains(&"x".repeat(WEB_EXCERPT_CHARS + 1)));
        assert!(prompt.contains(&"x".repeat(WEB_EXCERPT_CHARS)));
    }

    #[test]
    fn fallback_catalog_renders_without_products() {
        let data = aggregate::fallback_data();
        let prompt = compose(&data, "web", "hola");
        assert!(prompt.contains("Productos: []"));
        assert!(prompt.contains("Smartphones"));
    }
}
