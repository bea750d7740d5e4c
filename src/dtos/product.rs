// src/dtos/product.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: f64,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub unit: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub category: String,
    pub subcategory: Option<String>,
    pub is_active: bool,
    pub created_at: Option<String>,
}

// Convert from Model to Response DTO
impl From<crate::models::product::Product> for ProductResponse {
    fn from(product: crate::models::product::Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            unit: product.unit,
            price: product.price,
            image_url: product.image_url,
            category: product.category,
            subcategory: product.subcategory,
            is_active: product.is_active,
            created_at: product.created_at.map(|dt| dt.to_rfc3339()),
        }
    }
}
