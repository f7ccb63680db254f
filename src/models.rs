use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Canonical product record after normalization. Source documents are
/// schema-free, so anything beyond the known fields is carried in `extra`
/// and re-emitted as-is when the record is serialized into a prompt or an
/// API response. The stored credential field is stripped before this type
/// is ever built and must never reappear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precio: Option<f64>,
    pub specs: String,
    pub imagenes: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_categoria: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub images: Vec<String>,
    pub show_images: bool,
    pub store_info: StoreLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreLocation {
    pub ubicacion: &'static str,
    pub direccion: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagesRequest {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    pub product: String,
    pub images: Vec<String>,
    pub total: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Option<String>,
    pub nombre: Option<String>,
    pub precio: Option<f64>,
    pub imagen: Option<String>,
    pub total_imagenes: usize,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
