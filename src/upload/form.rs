//! In-memory multipart form: parsed from the inbound request, validated,
//! optionally normalized, then rebuilt as the outbound upstream body.
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use reqwest::multipart::{Form, Part};

use crate::error::{AppError, AppResult};
use crate::upload::normalizer::ImageNormalizer;

pub const TARGET_IMAGE: &str = "target_image";
pub const REFERENCE_IMAGE: &str = "reference_image";
pub const REQUIRED_UPLOADS: [&str; 2] = [TARGET_IMAGE, REFERENCE_IMAGE];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl FormField {
    pub fn file(name: &str, file_name: &str, content_type: &str, data: impl Into<Bytes>) -> Self {
        FormField {
            name: name.to_string(),
            file_name: Some(file_name.to_string()),
            content_type: Some(content_type.to_string()),
            data: data.into(),
        }
    }

    pub fn text(name: &str, value: &str) -> Self {
        FormField {
            name: name.to_string(),
            file_name: None,
            content_type: None,
            data: Bytes::copy_from_slice(value.as_bytes()),
        }
    }

    fn into_part(self) -> AppResult<Part> {
        let mut part = Part::bytes(self.data.to_vec());
        if let Some(file_name) = self.file_name {
            part = part.file_name(file_name);
        }
        if let Some(content_type) = self.content_type {
            part = part.mime_str(&content_type)?;
        }
        Ok(part)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    fields: Vec<FormField>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain an axum multipart stream, keeping fields in arrival order.
    pub async fn from_multipart(multipart: &mut Multipart) -> AppResult<Self> {
        let mut form = UploadForm::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error("Invalid multipart body", e))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(String::from);
            let content_type = field.content_type().map(String::from);
            let data = field
                .bytes()
                .await
                .map_err(|e| multipart_error(&format!("Failed to read field '{}'", name), e))?;
            form.push(FormField { name, file_name, content_type, data });
        }
        Ok(form)
    }

    pub fn push(&mut self, field: FormField) {
        self.fields.push(field);
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Fail with a 400-class error unless every name in `names` is present.
    pub fn require(&self, names: &[&str]) -> AppResult<()> {
        let missing: Vec<&str> = names.iter().copied().filter(|n| !self.contains(n)).collect();
        if missing.is_empty() {
            return Ok(());
        }
        tracing::warn!(?missing, "Rejecting upload with missing fields");
        Err(AppError::BadRequest(format!("Missing required files: {}", names.join(" and "))))
    }

    /// Normalize the fields named in `image_fields` on the blocking pool.
    pub async fn normalize(self, normalizer: ImageNormalizer, image_fields: &'static [&'static str]) -> AppResult<Self> {
        tokio::task::spawn_blocking(move || self.normalize_blocking(&normalizer, image_fields)).await?
    }

    pub fn normalize_blocking(self, normalizer: &ImageNormalizer, image_fields: &[&str]) -> AppResult<Self> {
        let fields = self
            .fields
            .into_iter()
            .map(|field| {
                if image_fields.contains(&field.name.as_str()) {
                    normalizer.normalize_field(field)
                } else {
                    Ok(field)
                }
            })
            .collect::<AppResult<Vec<_>>>()?;
        Ok(UploadForm { fields })
    }

    /// Rebuild as an outbound reqwest multipart body.
    pub fn into_multipart(self) -> AppResult<Form> {
        self.fields.into_iter().try_fold(Form::new(), |form, field| -> AppResult<Form> {
            let name = field.name.clone();
            Ok(form.part(name, field.into_part()?))
        })
    }
}

/// Keep the status axum picked for the rejection.
fn multipart_error(context: &str, e: MultipartError) -> AppError {
    AppError::Multipart {
        status: e.status(),
        message: format!("{}: {}", context, e.body_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::normalizer::tests::{png_bytes, split_image};
    use crate::upload::normalizer::NORMALIZED_MIME;

    fn full_form() -> UploadForm {
        let png = png_bytes(&split_image());
        let mut form = UploadForm::new();
        form.push(FormField::file(TARGET_IMAGE, "me.png", "image/png", png.clone()));
        form.push(FormField::text("strength", "0.8"));
        form.push(FormField::file(REFERENCE_IMAGE, "style.png", "image/png", png));
        form
    }

    #[test]
    fn require_accepts_complete_form() {
        assert!(full_form().require(&REQUIRED_UPLOADS).is_ok());
    }

    #[test]
    fn require_reports_missing_reference() {
        let mut form = UploadForm::new();
        form.push(FormField::text(TARGET_IMAGE, "x"));
        match form.require(&REQUIRED_UPLOADS) {
            Err(AppError::BadRequest(msg)) => {
                assert_eq!(msg, "Missing required files: target_image and reference_image")
            }
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn require_rejects_empty_form() {
        assert!(matches!(UploadForm::new().require(&REQUIRED_UPLOADS), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn normalize_touches_only_image_fields() {
        let original = full_form();
        let normalized = original
            .clone()
            .normalize_blocking(&ImageNormalizer::default(), &REQUIRED_UPLOADS)
            .unwrap();

        let names: Vec<&str> = normalized.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec![TARGET_IMAGE, "strength", REFERENCE_IMAGE]);
        assert_eq!(normalized.get("strength"), original.get("strength"));

        let target = normalized.get(TARGET_IMAGE).unwrap();
        assert_eq!(target.content_type.as_deref(), Some(NORMALIZED_MIME));
        assert_eq!(target.file_name.as_deref(), Some("me.jpg"));
        assert_eq!(normalized.get(REFERENCE_IMAGE).unwrap().file_name.as_deref(), Some("style.jpg"));
    }

    #[test]
    fn normalize_fails_on_undecodable_upload() {
        let mut form = UploadForm::new();
        form.push(FormField::file(TARGET_IMAGE, "a.png", "image/png", b"junk".to_vec()));
        let err = form
            .normalize_blocking(&ImageNormalizer::default(), &REQUIRED_UPLOADS)
            .unwrap_err();
        assert!(matches!(err, AppError::Image(_)));
    }

    #[tokio::test]
    async fn normalize_runs_on_blocking_pool() {
        let normalized = full_form().normalize(ImageNormalizer::default(), &REQUIRED_UPLOADS).await.unwrap();
        assert_eq!(normalized.get(TARGET_IMAGE).unwrap().content_type.as_deref(), Some(NORMALIZED_MIME));
    }

    #[test]
    fn into_multipart_rejects_bad_mime() {
        let mut form = UploadForm::new();
        form.push(FormField::file(TARGET_IMAGE, "a.png", "not a mime", b"x".to_vec()));
        assert!(matches!(form.into_multipart(), Err(AppError::HttpClient(_))));
    }

    #[test]
    fn into_multipart_builds_form() {
        let form = full_form().into_multipart().unwrap();
        assert!(!form.boundary().is_empty());
    }
}
