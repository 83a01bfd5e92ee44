use axum::extract::Multipart;

use crate::{error::AppError, upload::Upload};

/// Fields of the sell and edit forms. Text fields are `None` when the form
/// did not carry them at all.
#[derive(Debug, Default, Clone)]
pub struct ListingForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub quantity: Option<String>,
    pub image: Option<Upload>,
}

impl ListingForm {
    /// Collect the form from a `multipart/form-data` body. A file input left
    /// empty by the browser arrives with an empty filename and is ignored.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                if !filename.is_empty() {
                    form.image = Some(Upload { filename, bytes });
                }
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            match name.as_str() {
                "title" => form.title = Some(value),
                "description" => form.description = Some(value),
                "price" => form.price = Some(value),
                "quantity" => form.quantity = Some(value),
                _ => {}
            }
        }
        Ok(form)
    }
}
