use crate::models::StoreLocation;
use serde_json::{Map, Value, json};

/// Static store tables. Defined once, never mutated; every handler reads
/// them by reference.
pub const STORE_NAME: &str = "Sr Robot";
pub const STORE_UBICACION: &str = "Huánuco";
pub const STORE_DIRECCION: &str = "Jirón Ayacucho Huánuco 574, Huánuco, Huánuco 10000. \
     A media cuadra del Mercado Modelo.";
pub const STORE_HORARIO: &str = "Lun-Sáb: 9:00 AM - 7:00 PM";

pub const WELCOME_MESSAGE: &str = "¡Hola! Soy Sr. Robot, tu asistente en Sr Robot Huánuco. \
     Te ayudo con productos, precios en S/., imágenes y garantías. ¿Qué necesitas?";

/// Warranty durations by product class. Slice of pairs rather than a map so
/// the prompt renders entries in the order the store advertises them.
pub const GARANTIAS: &[(&str, &str)] = &[
    ("Pantallas de laptops", "4 meses"),
    ("Impresoras", "8 meses"),
    ("Laptops", "1 año"),
    ("PC (computadoras de escritorio)", "1 año"),
    ("Teclados", "2 meses"),
    ("Mouse", "2 meses"),
    ("Coolers", "2 meses"),
    ("Baterías para laptops", "3 meses"),
    ("Cables", "1 mes"),
    ("Cargadores de laptops", "1 mes"),
    ("Placas y otros componentes de laptops", "1 mes"),
    ("Otros componentes generales", "2 meses"),
];

pub fn store_location() -> StoreLocation {
    StoreLocation {
        ubicacion: STORE_UBICACION,
        direccion: STORE_DIRECCION,
    }
}

pub fn garantias_json() -> Value {
    let mut map = Map::new();
    for (class, duration) in GARANTIAS {
        map.insert((*class).to_string(), Value::String((*duration).to_string()));
    }
    Value::Object(map)
}

pub fn tienda_json() -> Value {
    json!({
        "nombre": STORE_NAME,
        "ubicacion": STORE_UBICACION,
        "direccion": STORE_DIRECCION,
        "horario": STORE_HORARIO,
    })
}
