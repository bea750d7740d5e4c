// src/storage.rs
//
// Product image storage: incoming uploads are decoded, shrunk and
// re-encoded as JPEG before landing in the upload directory, which is
// served back under /uploads.

use std::io::Cursor;
use std::path::PathBuf;

use image::{GenericImageView, ImageFormat};

use crate::error::AppError;

const MAX_IMAGE_DIMENSION: u32 = 1024;

pub fn upload_dir() -> PathBuf {
    std::env::var("UPLOAD_DIR")
        .unwrap_or_else(|_| "uploads".to_string())
        .into()
}

/// Compress and persist an uploaded product image. Returns the public URL
/// path the product row should point at.
pub async fn save_product_image(product_id: i64, data: &[u8]) -> Result<String, AppError> {
    let img = image::load_from_memory(data)
        .map_err(|e| AppError::validation(format!("Unrecognized image data: {e}")))?;

    let img = if img.width() > MAX_IMAGE_DIMENSION || img.height() > MAX_IMAGE_DIMENSION {
        img.thumbnail(MAX_IMAGE_DIMENSION, MAX_IMAGE_DIMENSION)
    } else {
        img
    };

    // JPEG has no alpha channel
    let rgb = img.to_rgb8();
    let mut encoded = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Jpeg)
        .map_err(|e| AppError::internal(format!("Image encoding failed: {e}")))?;

    let file_name = format!(
        "product_{}_{}.jpg",
        product_id,
        chrono::Utc::now().timestamp_millis()
    );
    let dir = upload_dir();
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::internal(format!("Upload directory unavailable: {e}")))?;

    // Write to a tmp file then rename so a crash never leaves a torn image
    let tmp_path = dir.join(format!("{file_name}.tmp"));
    let final_path = dir.join(&file_name);
    tokio::fs::write(&tmp_path, &encoded)
        .await
        .map_err(|e| AppError::internal(format!("Image write failed: {e}")))?;
    tokio::fs::rename(&tmp_path, &final_path)
        .await
        .map_err(|e| AppError::internal(format!("Image rename failed: {e}")))?;

    tracing::info!(product_id, file = %final_path.display(), bytes = encoded.len(), "Stored product image");

    Ok(format!("/uploads/{file_name}"))
}
