//! Stack templates: format detection, validation and canonical rendering.
//!
//! A [`Template`] is always valid in its tagged format. Reformatting and
//! format conversion produce new templates rather than mutating text.

mod canonical;
mod format;

pub use canonical::{normalize_yaml, render, render_json, render_yaml};
pub use format::{Document, TemplateFormat};

use sha2::{Digest, Sha256};

use crate::error::TemplateError;

/// A template body tagged with the format it parses in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Raw template text.
    body: String,
    /// Format the body is valid in.
    format: TemplateFormat,
}

impl Template {
    /// Creates a template from text of unknown format.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::UndetectableFormat`] if the text is neither JSON nor YAML.
    pub fn detect(body: impl Into<String>) -> Result<Self, TemplateError> {
        let body = body.into();
        let (format, _) = TemplateFormat::detect(&body)?;
        Ok(Self { body, format })
    }

    /// Creates a template from text that must be valid in `format`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::FormatMismatch`] if the text does not parse as `format`.
    pub fn with_format(body: impl Into<String>, format: TemplateFormat) -> Result<Self, TemplateError> {
        let body = body.into();
        format.parse(&body)?;
        Ok(Self { body, format })
    }

    /// Creates a template holding the canonical rendering of a document.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Serialize`] if the document cannot be rendered.
    pub fn from_document(document: &Document) -> Result<Self, TemplateError> {
        Ok(Self {
            body: render(document)?,
            format: document.format(),
        })
    }

    /// Raw template text.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Format the body is valid in.
    #[must_use]
    pub const fn format(&self) -> TemplateFormat {
        self.format
    }

    /// Parses the body into a structured document.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::FormatMismatch`] if the body does not parse.
    pub fn document(&self) -> Result<Document, TemplateError> {
        self.format.parse(&self.body)
    }

    /// Canonical rendering of this template in its own format.
    ///
    /// YAML keeps its body text and only has its document marker and
    /// trailing newline normalized.
    ///
    /// # Errors
    ///
    /// Returns an error if the body does not parse or cannot be re-rendered.
    pub fn canonical(&self) -> Result<Self, TemplateError> {
        let document = self.document()?;
        match self.format {
            TemplateFormat::Json => Self::from_document(&document),
            TemplateFormat::Yaml => Ok(Self {
                body: normalize_yaml(&self.body),
                format: TemplateFormat::Yaml,
            }),
        }
    }

    /// Canonical rendering of this template in another format.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Conversion`] if the document cannot be expressed in `format`.
    pub fn convert(&self, format: TemplateFormat) -> Result<Self, TemplateError> {
        if format == self.format {
            return self.canonical();
        }
        Self::from_document(&self.document()?.convert(format)?)
    }

    /// Returns true if the body is already in canonical form.
    ///
    /// # Errors
    ///
    /// Returns an error if the canonical form cannot be computed.
    pub fn is_canonical(&self) -> Result<bool, TemplateError> {
        Ok(self.canonical()?.body == self.body)
    }

    /// Format-independent SHA-256 fingerprint of the template's content.
    ///
    /// Two templates with equal documents have equal fingerprints regardless
    /// of formatting or key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be rendered as JSON.
    pub fn fingerprint(&self) -> Result<String, TemplateError> {
        let canonical = render_json(&self.document()?.fingerprint_value()?)?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}
