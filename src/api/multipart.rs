use std::collections::HashMap;

use axum::extract::{FromRequest, Multipart, Request};

use crate::error::{AppError, AppResult};
use crate::infrastructure::media::UploadFile;

/// A fully buffered multipart body: text fields by name, files in arrival order.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: Vec<(String, UploadFile)>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field
                        .content_type()
                        .map(str::to_string)
                        .unwrap_or_else(|| "application/octet-stream".to_string());
                    let bytes = field.bytes().await.map_err(|e| AppError::BadRequest(e.body_text()))?;
                    if bytes.is_empty() {
                        continue;
                    }
                    form.files.push((
                        name,
                        UploadFile {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    ));
                }
                None => {
                    let value = field.text().await.map_err(|e| AppError::BadRequest(e.body_text()))?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    /// Trimmed, non-empty text field.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn required_text(&self, name: &str) -> AppResult<String> {
        self.text(name)
            .ok_or_else(|| AppError::Validation(format!("{} is required", name)))
    }

    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> AppResult<Option<T>> {
        match self.text(name) {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| AppError::Validation(format!("{} is invalid", name))),
            None => Ok(None),
        }
    }

    pub fn take_files(&mut self, name: &str) -> Vec<UploadFile> {
        let (matching, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(field, _)| field == name);
        self.files = rest;
        matching.into_iter().map(|(_, file)| file).collect()
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadFile> {
        self.take_files(name).into_iter().next()
    }
}

impl<S> FromRequest<S> for MultipartForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state).await?;
        MultipartForm::read(multipart).await
    }
}
