//! Validation of caller-supplied form fields.
//!
//! Fields arrive as a multimap (`name → values`), the shape a parsed
//! multipart form takes. Each required field must be present exactly once;
//! template fields must also carry the `%d` placeholder. All checks run
//! before any store I/O.

use crate::error::Pdf2JpegError;
use crate::output::ImageVariant;
use crate::template::PathTemplate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parsed form fields.
pub type FormFields = HashMap<String, Vec<String>>;

/// Field holding the store key of the source PDF.
pub const FIELD_PDF: &str = "pdf";
/// Field holding the remote template of the normal variant.
pub const FIELD_JPEG: &str = "jpeg";
/// Field holding the remote template of the small variant.
pub const FIELD_JPEG_SMALL: &str = "jpeg_small";
/// Field holding the remote template of the large variant.
pub const FIELD_JPEG_LARGE: &str = "jpeg_large";

/// Where each variant of each page is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTemplates {
    pub normal: PathTemplate,
    pub small: PathTemplate,
    pub large: PathTemplate,
}

impl RemoteTemplates {
    /// Validate the three template fields.
    pub fn from_form(fields: &FormFields) -> Result<Self, Pdf2JpegError> {
        Ok(Self {
            normal: template_field(fields, FIELD_JPEG)?,
            small: template_field(fields, FIELD_JPEG_SMALL)?,
            large: template_field(fields, FIELD_JPEG_LARGE)?,
        })
    }

    pub fn template(&self, variant: ImageVariant) -> &PathTemplate {
        match variant {
            ImageVariant::Small => &self.small,
            ImageVariant::Normal => &self.normal,
            ImageVariant::Large => &self.large,
        }
    }
}

/// The store key of the source PDF.
pub fn source_key_from_form(fields: &FormFields) -> Result<String, Pdf2JpegError> {
    single_value(fields, FIELD_PDF).map(str::to_string)
}

fn single_value<'a>(fields: &'a FormFields, field: &str) -> Result<&'a str, Pdf2JpegError> {
    let values = fields.get(field).ok_or_else(|| Pdf2JpegError::MissingField {
        field: field.to_string(),
    })?;
    match values.as_slice() {
        [value] => Ok(value.as_str()),
        _ => Err(Pdf2JpegError::FieldCardinality {
            field: field.to_string(),
            count: values.len(),
        }),
    }
}

fn template_field(fields: &FormFields, field: &str) -> Result<PathTemplate, Pdf2JpegError> {
    PathTemplate::parse(field, single_value(fields, field)?)
}
