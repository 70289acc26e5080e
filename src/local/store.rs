//! Directory of local stacks.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{LocalStackError, Result};
use crate::template::{Template, TemplateFormat};

use super::parameters::Parameters;
use super::stack::LocalStack;

/// Stack directories under a common root, one subdirectory per stack.
#[derive(Debug, Clone)]
pub struct LocalStackStore {
    /// Root directory.
    root: PathBuf,
}

impl LocalStackStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Empty view of a stack, not read from disk.
    #[must_use]
    pub fn stack(&self, name: &str) -> LocalStack {
        LocalStack::new(name, &self.root)
    }

    /// Returns true if a directory exists for the stack.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.stack(name).exists()
    }

    /// Loads a stack from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the stack directory is missing or its files are malformed.
    pub fn load(&self, name: &str) -> Result<LocalStack> {
        let mut stack = self.stack(name);
        stack.load()?;
        Ok(stack)
    }

    /// Saves a template and parameters as stack `name`.
    ///
    /// With `format` set the template is converted before saving; otherwise
    /// it keeps its own format.
    ///
    /// # Errors
    ///
    /// Returns an error if conversion fails or a file cannot be written.
    pub fn save(
        &self,
        name: &str,
        template: &Template,
        parameters: Parameters,
        format: Option<TemplateFormat>,
    ) -> Result<LocalStack> {
        let template = match format {
            Some(format) if format != template.format() => template.convert(format)?,
            _ => template.clone(),
        };

        let mut stack = self.stack(name);
        stack.update(template, parameters);
        stack.save()?;
        Ok(stack)
    }

    /// Names of all local stacks, sorted.
    ///
    /// A missing root yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be read.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LocalStackError::io(&self.root, e).into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LocalStackError::io(&self.root, e))?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Copies stack `source` to `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStackError::AlreadyExists`] if `dest` exists and
    /// `force` is not set, or any load/save error.
    pub fn clone_stack(&self, source: &str, dest: &str, force: bool) -> Result<LocalStack> {
        let source = self.load(source)?;
        if self.exists(dest) && !force {
            return Err(LocalStackError::AlreadyExists {
                name: dest.to_string(),
            }
            .into());
        }

        let template = source.template().ok_or_else(|| LocalStackError::MissingTemplate {
            name: source.name().to_string(),
        })?;
        let cloned = self.save(dest, template, source.parameters().clone(), None)?;
        info!("Cloned local stack {} to {}", source.name(), dest);
        Ok(cloned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudsError;
    use tempfile::TempDir;

    fn yaml_template() -> Template {
        Template::detect("---\nResources:\n  Queue:\n    Type: AWS::SQS::Queue\n").expect("template")
    }

    #[test]
    fn test_list_missing_root_is_empty() {
        let dir = TempDir::new().expect("tempdir");
        let store = LocalStackStore::new(dir.path().join("nope"));
        assert!(store.list().expect("list").is_empty());
    }

    #[test]
    fn test_list_only_directories() {
        let dir = TempDir::new().expect("tempdir");
        let store = LocalStackStore::new(dir.path());
        store.save("web", &yaml_template(), Parameters::new(), None).expect("save");
        store.save("db", &yaml_template(), Parameters::new(), None).expect("save");
        fs::write(dir.path().join("README"), "notes").expect("write");

        assert_eq!(store.list().expect("list"), vec!["db", "web"]);
    }

    #[test]
    fn test_save_load_round_trip_with_format_override() {
        let dir = TempDir::new().expect("tempdir");
        let store = LocalStackStore::new(dir.path());
        let params: Parameters = [("Env", "prod")].into_iter().collect();

        store
            .save("web", &yaml_template(), params.clone(), Some(TemplateFormat::Json))
            .expect("save");
        let loaded = store.load("web").expect("load");

        let template = loaded.template().expect("template");
        assert_eq!(template.format(), TemplateFormat::Json);
        assert_eq!(
            template.fingerprint().expect("fingerprint"),
            yaml_template().fingerprint().expect("fingerprint")
        );
        assert_eq!(loaded.parameters(), &params);
    }

    #[test]
    fn test_clone_refuses_existing_without_force() {
        let dir = TempDir::new().expect("tempdir");
        let store = LocalStackStore::new(dir.path());
        store.save("web", &yaml_template(), Parameters::new(), None).expect("save");
        store.save("web-copy", &yaml_template(), Parameters::new(), None).expect("save");

        let result = store.clone_stack("web", "web-copy", false);
        assert!(matches!(
            result,
            Err(CloudsError::LocalStack(LocalStackError::AlreadyExists { .. }))
        ));
        assert!(store.clone_stack("web", "web-copy", true).is_ok());
    }

    #[test]
    fn test_clone_copies_files() {
        let dir = TempDir::new().expect("tempdir");
        let store = LocalStackStore::new(dir.path());
        let params: Parameters = [("Env", "dev")].into_iter().collect();
        store.save("web", &yaml_template(), params.clone(), None).expect("save");

        store.clone_stack("web", "web-dev", false).expect("clone");
        let cloned = store.load("web-dev").expect("load");
        assert_eq!(cloned.template(), Some(&yaml_template()));
        assert_eq!(cloned.parameters(), &params);
    }

    #[test]
    fn test_clone_missing_source() {
        let dir = TempDir::new().expect("tempdir");
        let store = LocalStackStore::new(dir.path());
        assert!(store.clone_stack("ghost", "copy", false).is_err());
        assert!(!store.exists("copy"));
    }
}
