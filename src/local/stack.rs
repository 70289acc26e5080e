//! A single stack's on-disk directory.
//!
//! Layout under the stack directory:
//!
//! - `template.json` or `template.yaml` (never both after a save)
//! - `parameters.yaml`, present only when the stack has parameters

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{LocalStackError, Result};
use crate::template::{Template, TemplateFormat};

use super::parameters::Parameters;

/// Parameters file name.
pub const PARAMETERS_FILE: &str = "parameters.yaml";

/// Template file lookup order when loading.
const LOAD_ORDER: [TemplateFormat; 2] = [TemplateFormat::Yaml, TemplateFormat::Json];

/// In-memory view of one stack directory.
#[derive(Debug, Clone)]
pub struct LocalStack {
    /// Stack name (directory name).
    name: String,
    /// Stack directory.
    path: PathBuf,
    /// Template, once loaded or set.
    template: Option<Template>,
    /// Parameters, empty until loaded or set.
    parameters: Parameters,
}

impl LocalStack {
    /// Creates an empty view of the stack `name` under `root`.
    #[must_use]
    pub fn new(name: impl Into<String>, root: &Path) -> Self {
        let name = name.into();
        let path = root.join(&name);
        Self {
            name,
            path,
            template: None,
            parameters: Parameters::new(),
        }
    }

    /// Stack name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stack directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Template, if loaded or set.
    #[must_use]
    pub const fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    /// Parameters.
    #[must_use]
    pub const fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Returns true if the stack directory exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    /// Replaces the in-memory template and parameters.
    pub fn update(&mut self, template: Template, parameters: Parameters) {
        self.template = Some(template);
        self.parameters = parameters;
    }

    /// Loads the template and parameters from disk.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStackError::NotFound`] if the directory is missing,
    /// [`LocalStackError::MissingTemplate`] if it has no template file, and
    /// parse errors for malformed template or parameters files.
    pub fn load(&mut self) -> std::result::Result<(), LocalStackError> {
        if !self.exists() {
            return Err(LocalStackError::NotFound {
                name: self.name.clone(),
                path: self.path.clone(),
            });
        }

        let template = self.read_template()?;
        let parameters = self.read_parameters()?;

        debug!("Loaded local stack {} ({})", self.name, template.format());
        self.template = Some(template);
        self.parameters = parameters;
        Ok(())
    }

    /// Writes the template and parameters to disk.
    ///
    /// The template file of the other format is removed and an empty
    /// parameter set removes the parameters file.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStackError::MissingTemplate`] if no template is set, or
    /// an IO error if a file cannot be written or removed.
    pub fn save(&self) -> Result<()> {
        let template = self.template.as_ref().ok_or_else(|| LocalStackError::MissingTemplate {
            name: self.name.clone(),
        })?;

        fs::create_dir_all(&self.path).map_err(|e| LocalStackError::io(&self.path, e))?;

        for format in LOAD_ORDER {
            if format != template.format() {
                remove_if_exists(&self.template_path(format))?;
            }
        }
        write_file(&self.template_path(template.format()), template.body())?;

        let parameters_path = self.parameters_path();
        if self.parameters.is_empty() {
            remove_if_exists(&parameters_path)?;
        } else {
            write_file(&parameters_path, &self.parameters.render()?)?;
        }

        debug!("Saved local stack {} to {}", self.name, self.path.display());
        Ok(())
    }

    /// Path of the template file for a format.
    #[must_use]
    pub fn template_path(&self, format: TemplateFormat) -> PathBuf {
        self.path.join(format.file_name())
    }

    /// Path of the parameters file.
    #[must_use]
    pub fn parameters_path(&self) -> PathBuf {
        self.path.join(PARAMETERS_FILE)
    }

    fn read_template(&self) -> std::result::Result<Template, LocalStackError> {
        for format in LOAD_ORDER {
            let path = self.template_path(format);
            let Some(text) = read_optional(&path)? else {
                continue;
            };
            return Template::with_format(text, format).map_err(|e| LocalStackError::InvalidTemplate {
                path,
                reason: e.to_string(),
            });
        }

        Err(LocalStackError::MissingTemplate {
            name: self.name.clone(),
        })
    }

    fn read_parameters(&self) -> std::result::Result<Parameters, LocalStackError> {
        let path = self.parameters_path();
        match read_optional(&path)? {
            Some(text) => Parameters::parse(&text)
                .map_err(|reason| LocalStackError::InvalidParameters { path, reason }),
            None => Ok(Parameters::new()),
        }
    }
}

fn read_optional(path: &Path) -> std::result::Result<Option<String>, LocalStackError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LocalStackError::io(path, e)),
    }
}

fn write_file(path: &Path, content: &str) -> std::result::Result<(), LocalStackError> {
    fs::write(path, content).map_err(|e| LocalStackError::io(path, e))
}

fn remove_if_exists(path: &Path) -> std::result::Result<(), LocalStackError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(LocalStackError::io(path, e)),
    }
}
