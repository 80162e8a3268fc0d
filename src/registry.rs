use crate::error::{RegistryError, Result};
use hashlink::LinkedHashMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::ser::{Formatter, PrettyFormatter};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Category that is created on first start and can never be removed.
pub const DEFAULT_CATEGORY: &str = "default";

/// Mapping of category name to the application paths it launches.
///
/// Both the category order and the entry order within a category are kept
/// exactly as inserted; they drive display and launch order.
///
/// Deserializing always goes through the same repairs as [`Registry::load`],
/// so a decoded registry holds normalized keys, unique entries and the
/// default category.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "LinkedHashMap<String, Vec<String>>")]
pub struct Registry {
    categories: LinkedHashMap<String, Vec<String>>,
}

impl Serialize for Registry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.categories.serialize(serializer)
    }
}

impl From<LinkedHashMap<String, Vec<String>>> for Registry {
    fn from(raw: LinkedHashMap<String, Vec<String>>) -> Self {
        Self::repaired(raw)
    }
}

impl Default for Registry {
    fn default() -> Self {
        let mut categories = LinkedHashMap::new();
        categories.insert(DEFAULT_CATEGORY.to_string(), Vec::new());
        Self { categories }
    }
}

/// Trim and lowercase a category name so lookups are case-insensitive.
pub fn normalize_category(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Name shown for an entry: the final component of its path.
///
/// Both `/` and `\` are treated as separators so stores written on Windows
/// display the same everywhere.
pub fn display_name(path: &str) -> &str {
    path.trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(path)
}

impl Registry {
    /// Read the registry stored at `path`.
    ///
    /// A missing or empty file yields the default registry. A file that
    /// exists but cannot be parsed is reported as an error so the caller
    /// never overwrites data it could not read.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "no store found, using defaults");
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the full registry to `path` as pretty JSON with four space
    /// indentation and non-ASCII characters escaped. The data goes to a
    /// temporary file first and is renamed over the old store.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut buf = Vec::new();
        let formatter = AsciiFormatter::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        atomic_write(path, &buf)?;
        tracing::debug!(path = %path.display(), "registry saved");
        Ok(())
    }

    /// Build a registry from raw file contents, restoring the invariants a
    /// hand-edited file may have broken.
    fn repaired(raw: LinkedHashMap<String, Vec<String>>) -> Self {
        let mut categories: LinkedHashMap<String, Vec<String>> = LinkedHashMap::new();
        for (key, entries) in raw {
            let name = normalize_category(&key);
            if name.is_empty() {
                tracing::warn!("dropping category with an empty name");
                continue;
            }
            if name != key {
                tracing::warn!(from = %key, to = %name, "normalized category name");
            }
            if categories.get(&name).is_none() {
                categories.insert(name.clone(), Vec::new());
            }
            if let Some(list) = categories.get_mut(&name) {
                for entry in entries {
                    if list.contains(&entry) {
                        tracing::warn!(category = %name, path = %entry, "dropping duplicate entry");
                    } else {
                        list.push(entry);
                    }
                }
            }
        }
        if !categories.contains_key(DEFAULT_CATEGORY) {
            tracing::warn!("store has no '{}' category; adding it", DEFAULT_CATEGORY);
            categories.insert(DEFAULT_CATEGORY.to_string(), Vec::new());
        }
        Self { categories }
    }

    /// Category names in insertion order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// The category a front end should select when nothing else is chosen.
    pub fn first_category(&self) -> Option<&str> {
        self.categories.front().map(|(k, _)| k.as_str())
    }

    pub fn contains_category(&self, name: &str) -> bool {
        self.categories.contains_key(&normalize_category(name))
    }

    pub fn entries(&self, category: &str) -> Result<&[String]> {
        let name = normalize_category(category);
        self.categories
            .get(&name)
            .map(Vec::as_slice)
            .ok_or(RegistryError::UnknownCategory(name))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Map free-form user input to an existing category, falling back to
    /// [`DEFAULT_CATEGORY`] when the input names none.
    pub fn resolve_category(&self, input: &str) -> String {
        let name = normalize_category(input);
        if self.categories.contains_key(&name) {
            name
        } else {
            DEFAULT_CATEGORY.to_string()
        }
    }

    /// Insert an empty category and return its normalized name.
    pub fn add_category(&mut self, name: &str) -> Result<String> {
        let name = normalize_category(name);
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.categories.contains_key(&name) {
            return Err(RegistryError::AlreadyExists(name));
        }
        self.categories.insert(name.clone(), Vec::new());
        Ok(name)
    }

    /// Delete a category together with its entries, returning the entries.
    pub fn remove_category(&mut self, name: &str) -> Result<Vec<String>> {
        let name = self.check_removable(name)?;
        self.categories
            .remove(&name)
            .ok_or(RegistryError::UnknownCategory(name))
    }

    /// Validate that `name` may be removed and return its normalized form.
    pub fn check_removable(&self, name: &str) -> Result<String> {
        let name = normalize_category(name);
        if name == DEFAULT_CATEGORY {
            return Err(RegistryError::Protected(name));
        }
        if !self.categories.contains_key(&name) {
            return Err(RegistryError::UnknownCategory(name));
        }
        Ok(name)
    }

    /// Append `path` to `category`. The path must exist on disk and must not
    /// already be listed in that category.
    pub fn add_entry(&mut self, category: &str, path: &str) -> Result<()> {
        let name = normalize_category(category);
        let list = self
            .categories
            .get_mut(&name)
            .ok_or_else(|| RegistryError::UnknownCategory(name.clone()))?;
        if list.iter().any(|p| p == path) {
            return Err(RegistryError::DuplicateEntry {
                category: name,
                path: path.to_string(),
            });
        }
        if !Path::new(path).exists() {
            return Err(RegistryError::PathNotFound(path.to_string()));
        }
        list.push(path.to_string());
        Ok(())
    }

    /// Remove the entry at `index` in `category` and return its path.
    pub fn remove_entry(&mut self, category: &str, index: usize) -> Result<String> {
        let name = normalize_category(category);
        let list = self
            .categories
            .get_mut(&name)
            .ok_or(RegistryError::UnknownCategory(name))?;
        if index >= list.len() {
            return Err(RegistryError::IndexOutOfRange {
                index,
                len: list.len(),
            });
        }
        Ok(list.remove(index))
    }
}

/// Pretty printer that escapes every non-ASCII character as `\uXXXX`,
/// using surrogate pairs outside the basic multilingual plane.
struct AsciiFormatter {
    pretty: PrettyFormatter<'static>,
}

impl AsciiFormatter {
    fn new() -> Self {
        Self {
            pretty: PrettyFormatter::with_indent(b"    "),
        }
    }
}

impl Formatter for AsciiFormatter {
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_array(writer)
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object(writer)
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            if c.is_ascii() {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units).iter() {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Registry {
        let mut reg = Registry::default();
        reg.add_category("gaming").unwrap();
        reg
    }

    #[test]
    fn default_registry_has_default_category() {
        let reg = Registry::default();
        assert_eq!(reg.categories().collect::<Vec<_>>(), vec!["default"]);
        assert!(reg.entries("default").unwrap().is_empty());
    }

    #[test]
    fn add_category_normalizes_and_rejects_duplicates() {
        let mut reg = Registry::default();
        assert_eq!(reg.add_category("Gaming ").unwrap(), "gaming");
        assert!(matches!(
            reg.add_category("gaming"),
            Err(RegistryError::AlreadyExists(n)) if n == "gaming"
        ));
        assert!(matches!(reg.add_category("   "), Err(RegistryError::EmptyName)));
    }

    #[test]
    fn default_category_is_protected() {
        let mut reg = sample();
        assert!(matches!(
            reg.remove_category(" DEFAULT"),
            Err(RegistryError::Protected(_))
        ));
        assert!(reg.contains_category("default"));
    }

    #[test]
    fn remove_category_returns_entries() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("game.bin");
        std::fs::write(&app, b"").unwrap();
        let app = app.to_string_lossy().to_string();

        let mut reg = sample();
        reg.add_entry("gaming", &app).unwrap();
        assert_eq!(reg.remove_category("Gaming").unwrap(), vec![app]);
        assert!(!reg.contains_category("gaming"));
        assert!(matches!(
            reg.remove_category("gaming"),
            Err(RegistryError::UnknownCategory(_))
        ));
    }

    #[test]
    fn add_entry_rejects_missing_and_duplicate_paths() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("tool.exe");
        std::fs::write(&app, b"").unwrap();
        let app = app.to_string_lossy().to_string();

        let mut reg = sample();
        reg.add_entry("gaming", &app).unwrap();
        assert!(matches!(
            reg.add_entry("gaming", &app),
            Err(RegistryError::DuplicateEntry { .. })
        ));
        assert_eq!(reg.entries("gaming").unwrap().len(), 1);

        let missing = dir.path().join("missing.exe");
        assert!(matches!(
            reg.add_entry("gaming", &missing.to_string_lossy()),
            Err(RegistryError::PathNotFound(_))
        ));
        assert!(matches!(
            reg.add_entry("work", &app),
            Err(RegistryError::UnknownCategory(_))
        ));
    }

    #[test]
    fn remove_entry_out_of_range_leaves_list_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("a.lnk");
        std::fs::write(&app, b"").unwrap();
        let app = app.to_string_lossy().to_string();

        let mut reg = sample();
        reg.add_entry("gaming", &app).unwrap();
        assert!(matches!(
            reg.remove_entry("gaming", 1),
            Err(RegistryError::IndexOutOfRange { index: 1, len: 1 })
        ));
        assert_eq!(reg.entries("gaming").unwrap(), [app.clone()]);
        assert_eq!(reg.remove_entry("gaming", 0).unwrap(), app);
        assert!(reg.entries("gaming").unwrap().is_empty());
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let reg = sample();
        assert_eq!(reg.resolve_category(" Gaming"), "gaming");
        assert_eq!(reg.resolve_category("music"), DEFAULT_CATEGORY);
        assert_eq!(reg.resolve_category(""), DEFAULT_CATEGORY);
    }

    #[test]
    fn display_name_uses_last_component() {
        assert_eq!(display_name("/apps/game.bin"), "game.bin");
        assert_eq!(
            display_name(r"C:\Program Files (x86)\Steam\Steam.exe"),
            "Steam.exe"
        );
        assert_eq!(display_name("/opt/tools/"), "tools");
        assert_eq!(display_name("code"), "code");
    }

    #[test]
    fn repair_normalizes_keys_and_restores_default() {
        let raw: LinkedHashMap<String, Vec<String>> = serde_json::from_str(
            r#"{"Gaming": ["/a", "/b"], "gaming ": ["/b", "/c"], "  ": ["/x"]}"#,
        )
        .unwrap();
        let reg = Registry::repaired(raw);
        assert_eq!(reg.categories().collect::<Vec<_>>(), vec!["gaming", "default"]);
        assert_eq!(reg.entries("gaming").unwrap(), ["/a", "/b", "/c"]);
    }

    #[test]
    fn deserializing_applies_repairs() {
        let reg: Registry = serde_json::from_str(r#"{"Gaming": ["/a", "/a"]}"#).unwrap();
        assert_eq!(reg.categories().collect::<Vec<_>>(), vec!["gaming", "default"]);
        assert_eq!(reg.entries("gaming").unwrap(), ["/a"]);
    }

    #[test]
    fn non_ascii_paths_are_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let reg: Registry =
            serde_json::from_str(r#"{"default": ["/apps/caf\u00e9.exe", "/x/\ud83c\udfae"]}"#)
                .unwrap();
        reg.save(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "{\n    \"default\": [\n        \"/apps/caf\\u00e9.exe\",\n        \"/x/\\ud83c\\udfae\"\n    ]\n}"
        );
        assert_eq!(Registry::load(&path).unwrap(), reg);
    }

    #[test]
    fn serializes_with_four_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        Registry::default().save(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n    \"default\": []\n}");
    }
}
