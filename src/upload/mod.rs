pub mod form;
pub mod normalizer;

pub use form::{FormField, UploadForm, REFERENCE_IMAGE, REQUIRED_UPLOADS, TARGET_IMAGE};
pub use normalizer::ImageNormalizer;
