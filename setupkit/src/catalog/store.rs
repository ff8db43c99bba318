//! Catalog loading, validation and selection.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use super::descriptor::{Category, TaskDescriptor};
use super::error::CatalogError;

/// Catalog embedded in the crate.
const BUILTIN_CATALOG: &str = include_str!("builtin.json");

/// An ordered, validated set of product descriptors.
///
/// Order is the order of the source file; it breaks priority ties when
/// scheduling.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<Arc<TaskDescriptor>>,
}

impl Catalog {
    /// Build a catalog from descriptors, validating them.
    pub fn from_entries(entries: Vec<TaskDescriptor>) -> Result<Self, CatalogError> {
        validate(&entries)?;
        Ok(Self {
            entries: entries.into_iter().map(Arc::new).collect(),
        })
    }

    /// Parse a catalog from a JSON array.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let entries: Vec<TaskDescriptor> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    /// Load a catalog file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&json)?;
        info!(path = %path.display(), products = catalog.len(), "catalog loaded");
        Ok(catalog)
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Load from `path` when given, otherwise the built-in catalog.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(p) => Self::load(p),
            None => Self::builtin(),
        }
    }

    pub fn entries(&self) -> &[Arc<TaskDescriptor>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find a product by exact name.
    pub fn get(&self, name: &str) -> Option<&Arc<TaskDescriptor>> {
        self.entries.iter().find(|d| d.name == name)
    }

    /// Products in a category, in catalog order.
    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &Arc<TaskDescriptor>> {
        self.entries.iter().filter(move |d| d.category == category)
    }

    /// Resolve a selection of names.
    ///
    /// The result is in catalog order regardless of the order of `names`;
    /// duplicates in `names` are collapsed. Names are matched exactly first,
    /// then case-insensitively.
    pub fn select<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<Vec<Arc<TaskDescriptor>>, CatalogError> {
        let mut wanted = vec![false; self.entries.len()];

        for name in names {
            let name = name.as_ref();
            let index = self
                .entries
                .iter()
                .position(|d| d.name == name)
                .or_else(|| {
                    self.entries
                        .iter()
                        .position(|d| d.name.eq_ignore_ascii_case(name))
                })
                .ok_or_else(|| CatalogError::UnknownProduct(name.to_string()))?;
            wanted[index] = true;
        }

        let selected: Vec<_> = self
            .entries
            .iter()
            .zip(wanted)
            .filter_map(|(d, w)| w.then(|| Arc::clone(d)))
            .collect();
        debug!(requested = names.len(), selected = selected.len(), "selection resolved");
        Ok(selected)
    }

    /// Every product, in catalog order.
    pub fn select_all(&self) -> Vec<Arc<TaskDescriptor>> {
        self.entries.clone()
    }
}

fn validate(entries: &[TaskDescriptor]) -> Result<(), CatalogError> {
    let mut names: HashMap<&str, ()> = HashMap::with_capacity(entries.len());
    let mut files: HashMap<String, &str> = HashMap::with_capacity(entries.len());

    for entry in entries {
        if entry.name.trim().is_empty() {
            return Err(CatalogError::MissingField {
                name: entry.url.clone(),
                field: "name",
            });
        }
        if entry.url.trim().is_empty() {
            return Err(CatalogError::MissingField {
                name: entry.name.clone(),
                field: "url",
            });
        }
        if entry.file_name.trim().is_empty() {
            return Err(CatalogError::MissingField {
                name: entry.name.clone(),
                field: "file_name",
            });
        }
        if names.insert(entry.name.as_str(), ()).is_some() {
            return Err(CatalogError::DuplicateName(entry.name.clone()));
        }
        // Payloads share one staging directory.
        let key = entry.file_name.to_ascii_lowercase();
        if let Some(first) = files.insert(key, entry.name.as_str()) {
            return Err(CatalogError::DuplicateFileName {
                file_name: entry.file_name.clone(),
                first: first.to_string(),
                second: entry.name.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TaskKind;
    use std::io::Write;

    fn descriptor(name: &str, file: &str) -> TaskDescriptor {
        TaskDescriptor::new(name, format!("https://example.com/{}", file), file)
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = Catalog::builtin().unwrap();
        assert!(!catalog.is_empty());
        for kind in TaskKind::ALL {
            assert!(
                catalog.entries().iter().any(|d| d.kind == kind),
                "builtin catalog has no {} entry",
                kind
            );
        }
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let result = Catalog::from_entries(vec![
            descriptor("A", "a.exe"),
            descriptor("A", "b.exe"),
        ]);
        assert!(matches!(result, Err(CatalogError::DuplicateName(n)) if n == "A"));
    }

    #[test]
    fn test_duplicate_file_name_rejected() {
        let result = Catalog::from_entries(vec![
            descriptor("A", "setup.exe"),
            descriptor("B", "SETUP.exe"),
        ]);
        match result {
            Err(CatalogError::DuplicateFileName { first, second, .. }) => {
                assert_eq!(first, "A");
                assert_eq!(second, "B");
            }
            other => panic!("expected DuplicateFileName, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_url_rejected() {
        let result = Catalog::from_entries(vec![TaskDescriptor::new("A", " ", "a.exe")]);
        assert!(matches!(
            result,
            Err(CatalogError::MissingField { field: "url", .. })
        ));
    }

    #[test]
    fn test_select_keeps_catalog_order() {
        let catalog = Catalog::from_entries(vec![
            descriptor("A", "a.exe"),
            descriptor("B", "b.exe"),
            descriptor("C", "c.exe"),
        ])
        .unwrap();

        let selected = catalog.select(&["C", "a", "C"]).unwrap();
        let names: Vec<_> = selected.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn test_select_unknown_product() {
        let catalog = Catalog::from_entries(vec![descriptor("A", "a.exe")]).unwrap();
        assert!(matches!(
            catalog.select(&["Z"]),
            Err(CatalogError::UnknownProduct(n)) if n == "Z"
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name":"Tool","url":"https://example.com/t.exe","file_name":"t.exe","category":"media"}}]"#
        )
        .unwrap();

        let catalog = Catalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.by_category(Category::Media).count(), 1);
        assert!(catalog.get("Tool").is_some());
        assert!(catalog.get("tool").is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Catalog::load(Path::new("/nonexistent/catalog.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Read { .. }));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            Catalog::from_json("{not json"),
            Err(CatalogError::Parse(_))
        ));
    }
}
