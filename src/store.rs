use crate::error::Result;
use crate::registry::{normalize_category, Registry};
use std::path::{Path, PathBuf};

/// A [`Registry`] bound to the file it is persisted in.
///
/// Every mutation is written to disk before it becomes visible through
/// [`RegistryStore::registry`]. If saving fails the in-memory view keeps its
/// previous state.
#[derive(Debug)]
pub struct RegistryStore {
    path: PathBuf,
    registry: Registry,
}

impl RegistryStore {
    /// Load the store at `path`, starting from the default registry when the
    /// file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let registry = Registry::load(&path)?;
        tracing::debug!(
            path = %path.display(),
            categories = registry.len(),
            "registry loaded"
        );
        Ok(Self { path, registry })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Write the current registry to disk.
    pub fn save(&self) -> Result<()> {
        self.registry.save(&self.path)
    }

    fn commit<T>(&mut self, f: impl FnOnce(&mut Registry) -> Result<T>) -> Result<T> {
        let mut next = self.registry.clone();
        let out = f(&mut next)?;
        next.save(&self.path)?;
        self.registry = next;
        Ok(out)
    }

    pub fn add_category(&mut self, name: &str) -> Result<String> {
        let name = self.commit(|reg| reg.add_category(name))?;
        tracing::info!(category = %name, "created category");
        Ok(name)
    }

    /// Remove a category after `confirm` approves it.
    ///
    /// `confirm` receives the normalized name and is only consulted once the
    /// category is known to exist and to be removable. Returns `Ok(None)`
    /// when the removal was declined.
    pub fn remove_category(
        &mut self,
        name: &str,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Result<Option<Vec<String>>> {
        let name = self.registry.check_removable(name)?;
        if !confirm(&name) {
            tracing::debug!(category = %name, "category removal declined");
            return Ok(None);
        }
        let removed = self.commit(|reg| reg.remove_category(&name))?;
        tracing::info!(category = %name, entries = removed.len(), "removed category");
        Ok(Some(removed))
    }

    pub fn add_entry(&mut self, category: &str, path: &str) -> Result<()> {
        self.commit(|reg| reg.add_entry(category, path))?;
        tracing::info!(
            category = %normalize_category(category),
            path = %path,
            "added entry"
        );
        Ok(())
    }

    pub fn remove_entry(&mut self, category: &str, index: usize) -> Result<String> {
        let removed = self.commit(|reg| reg.remove_entry(category, index))?;
        tracing::info!(
            category = %normalize_category(category),
            path = %removed,
            "removed entry"
        );
        Ok(removed)
    }
}
