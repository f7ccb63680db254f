use crate::models::{Category, Product};
use crate::normalize::{normalize_category, normalize_product};
use crate::store::StoreClient;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

/// Everything the chat pipeline knows about the store's stock, already
/// normalized. Fresh on every call; nothing here is cached.
#[derive(Debug, Clone)]
pub struct StoreData {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub source: DataSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Live,
    Fallback,
}

impl DataSource {
    pub fn label(self) -> &'static str {
        match self {
            DataSource::Live => "DB Real",
            DataSource::Fallback => "Fallback",
        }
    }
}

/// Load both collections and normalize every record. Never fails the
/// caller: a missing client, a query error, or two empty collections all
/// yield the same fixed fallback catalog. Callers cannot distinguish
/// "store empty" from "store unreachable" by design.
pub async fn fetch(store: Option<&StoreClient>) -> StoreData {
    let Some(client) = store else {
        warn!(
            target = "srbot.store",
            "document store not configured, serving fallback catalog"
        );
        return fallback_data();
    };

    let (products, categories) =
        tokio::join!(client.find_all("productos"), client.find_all("categorias"));

    match (products, categories) {
        (Ok(products), Ok(categories)) => assemble(products, categories),
        (Err(err), _) | (_, Err(err)) => {
            error!(target = "srbot.store", error = %err, "store query failed, serving fallback catalog");
            fallback_data()
        }
    }
}

/// Pure assembly step, split out so the fallback-on-empty policy is
/// testable without a live store.
pub fn assemble(products_raw: Vec<Value>, categories_raw: Vec<Value>) -> StoreData {
    if products_raw.is_empty() && categories_raw.is_empty() {
        warn!(
            target = "srbot.store",
            "both collections empty, serving fallback catalog"
        );
        return fallback_data();
    }

    info!(
        target = "srbot.store",
        products = products_raw.len(),
        categories = categories_raw.len(),
        "live store data loaded"
    );

    StoreData {
        products: products_raw.into_iter().map(normalize_product).collect(),
        categories: categories_raw.into_iter().map(normalize_category).collect(),
        source: DataSource::Live,
    }
}

/// The fixed minimal catalog: zero products, four generic categories.
pub fn fallback_data() -> StoreData {
    let categories = [
        (1, "Laptops", "Computadoras portátiles"),
        (2, "Smartphones", "Teléfonos inteligentes"),
        (3, "Tablets", "Tabletas y iPads"),
        (4, "Accesorios", "Accesorios tecnológicos"),
    ]
    .into_iter()
    .map(|(id, nombre, descripcion)| Category {
        id_categoria: Some(id),
        nombre: Some(nombre.to_string()),
        descripcion: Some(descripcion.to_string()),
        extra: Map::new(),
    })
    .collect();

    StoreData {
        products: Vec::new(),
        categories,
        source: DataSource::Fallback,
    }
}
