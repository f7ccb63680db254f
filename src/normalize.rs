use crate::models::{Category, Product};
use serde_json::{Map, Value};

/// Field used as a stored credential in some legacy documents. It must
/// never reach a prompt, an API response, or a log line.
const SENSITIVE_FIELD: &str = "contrasena";

/// Sentinel used when a product document carries no specification text.
pub const SPECS_UNSPECIFIED: &str = "No especificado";

/// Project one raw product document into the canonical record. Infallible:
/// documents with missing or oddly-typed fields degrade to empty/default
/// values instead of erroring.
pub fn normalize_product(raw: Value) -> Product {
    let mut doc = into_object(raw);
    doc.remove(SENSITIVE_FIELD);

    let id = take_id(&mut doc);
    let nombre = take_string(&mut doc, "nombre");
    let precio = doc.remove("precio").as_ref().and_then(Value::as_f64);
    let imagenes = take_images(&mut doc);
    let specs = take_string(&mut doc, "characteristics")
        .unwrap_or_else(|| SPECS_UNSPECIFIED.to_string());

    Product {
        id,
        nombre,
        precio,
        specs,
        imagenes,
        extra: doc,
    }
}

/// Same treatment for category documents: strip the credential, keep the
/// rest of the shape as-is.
pub fn normalize_category(raw: Value) -> Category {
    let mut doc = into_object(raw);
    doc.remove(SENSITIVE_FIELD);

    let id_categoria = doc.remove("id_categoria").as_ref().and_then(Value::as_i64);
    let nombre = take_string(&mut doc, "nombre");
    let descripcion = take_string(&mut doc, "descripcion");

    Category {
        id_categoria,
        nombre,
        descripcion,
        extra: doc,
    }
}

fn into_object(raw: Value) -> Map<String, Value> {
    match raw {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn take_string(doc: &mut Map<String, Value>, key: &str) -> Option<String> {
    match doc.remove(key) {
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            // Put anything non-string back so it still rides along in `extra`.
            doc.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}

/// Legacy documents store their identifier as `id` or as a Mongo `_id`,
/// which the Data API returns in extended JSON (`{"$oid": "..."}`).
fn take_id(doc: &mut Map<String, Value>) -> Option<String> {
    let raw = doc.remove("id").or_else(|| doc.remove("_id"))?;
    match raw {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map
            .get("$oid")
            .and_then(Value::as_str)
            .map(|s| s.to_string()),
        _ => None,
    }
}

/// Reconcile the three legacy image shapes into one sequence: an `imagenes`
/// array wins, then a singular `imagen` or `image` string. Absent or
/// malformed fields yield an empty sequence.
fn take_images(doc: &mut Map<String, Value>) -> Vec<String> {
    if let Some(Value::Array(entries)) = doc.remove("imagenes") {
        return entries
            .into_iter()
            .filter_map(|entry| match entry {
                Value::String(url) => Some(url),
                _ => None,
            })
            .collect();
    }
    for legacy in ["imagen", "image"] {
        if let Some(Value::String(url)) = doc.remove(legacy) {
            return vec![url];
        }
    }
    Vec::new()
}
