use crate::error::Result;
use crate::registry::Registry;
use std::io;
use std::path::Path;

/// Result of handing one entry to the operating system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    Launched(String),
    Failed { path: String, reason: String },
}

impl LaunchOutcome {
    pub fn path(&self) -> &str {
        match self {
            LaunchOutcome::Launched(path) => path,
            LaunchOutcome::Failed { path, .. } => path,
        }
    }

    pub fn is_launched(&self) -> bool {
        matches!(self, LaunchOutcome::Launched(_))
    }
}

/// The "open this path" primitive used by [`Launcher`].
pub trait Opener {
    fn open(&self, path: &Path) -> io::Result<()>;
}

/// Opens paths with the host operating system.
///
/// Executables are spawned directly, anything else (shortcuts, documents)
/// goes to the default handler for its file type. Neither waits for the
/// started program.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl Opener for SystemOpener {
    fn open(&self, path: &Path) -> io::Result<()> {
        if !path.exists() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        if is_executable(path) {
            std::process::Command::new(path).spawn().map(|_| ())
        } else {
            open::that_detached(path)
        }
    }
}

fn is_executable(path: &Path) -> bool {
    let is_exe = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("exe"))
        .unwrap_or(false);
    is_exe || has_exec_bit(path)
}

#[cfg(unix)]
fn has_exec_bit(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn has_exec_bit(_path: &Path) -> bool {
    false
}

/// Launches every entry of a category through an [`Opener`].
#[derive(Debug, Default)]
pub struct Launcher<O = SystemOpener> {
    opener: O,
}

impl Launcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<O: Opener> Launcher<O> {
    pub fn with_opener(opener: O) -> Self {
        Self { opener }
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Hand each entry of `category` to the opener in list order.
    ///
    /// A failing entry is reported in its [`LaunchOutcome`] and does not stop
    /// the remaining ones. Only an unknown category fails the whole call.
    pub fn run_category(&self, registry: &Registry, category: &str) -> Result<Vec<LaunchOutcome>> {
        let entries = registry.entries(category)?;
        if entries.is_empty() {
            tracing::info!(category = %category.trim(), "no applications to run in this category");
            return Ok(Vec::new());
        }
        let outcomes: Vec<LaunchOutcome> = entries.iter().map(|p| self.launch(p)).collect();
        let launched = outcomes.iter().filter(|o| o.is_launched()).count();
        tracing::info!(
            category = %category.trim(),
            launched,
            failed = outcomes.len() - launched,
            "category run finished"
        );
        Ok(outcomes)
    }

    fn launch(&self, path: &str) -> LaunchOutcome {
        tracing::debug!(path = %path, "launching");
        match self.opener.open(Path::new(path)) {
            Ok(()) => LaunchOutcome::Launched(path.to_string()),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "could not launch");
                LaunchOutcome::Failed {
                    path: path.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        opened: RefCell<Vec<String>>,
    }

    impl Opener for Recorder {
        fn open(&self, path: &Path) -> io::Result<()> {
            let p = path.to_string_lossy().to_string();
            self.opened.borrow_mut().push(p.clone());
            if p.contains("broken") {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
            } else {
                Ok(())
            }
        }
    }

    fn registry_with(category: &str, entries: &[&str]) -> Registry {
        let mut json = serde_json::Map::new();
        json.insert("default".into(), serde_json::json!([]));
        json.insert(category.into(), serde_json::json!(entries));
        serde_json::from_value(serde_json::Value::Object(json)).unwrap()
    }

    #[test]
    fn failures_do_not_stop_later_entries() {
        let reg = registry_with("work", &["/a/editor", "/a/broken", "/a/mail"]);
        let launcher = Launcher::with_opener(Recorder::default());
        let out = launcher.run_category(&reg, "Work").unwrap();
        assert_eq!(
            *launcher.opener().opened.borrow(),
            vec!["/a/editor", "/a/broken", "/a/mail"]
        );
        assert_eq!(out.len(), 3);
        assert!(out[0].is_launched());
        assert_eq!(
            out[1],
            LaunchOutcome::Failed {
                path: "/a/broken".into(),
                reason: "denied".into()
            }
        );
        assert_eq!(out[2].path(), "/a/mail");
    }

    #[test]
    fn empty_category_makes_no_attempts() {
        let reg = Registry::default();
        let launcher = Launcher::with_opener(Recorder::default());
        assert!(launcher.run_category(&reg, "default").unwrap().is_empty());
        assert!(launcher.opener().opened.borrow().is_empty());
    }

    #[test]
    fn unknown_category_is_an_error() {
        let reg = Registry::default();
        let launcher = Launcher::with_opener(Recorder::default());
        assert!(matches!(
            launcher.run_category(&reg, "music"),
            Err(RegistryError::UnknownCategory(_))
        ));
    }

    #[test]
    fn system_opener_reports_missing_file() {
        let reg = registry_with("gaming", &["/apps/game.bin"]);
        let out = Launcher::new().run_category(&reg, "gaming").unwrap();
        assert_eq!(out.len(), 1);
        match &out[0] {
            LaunchOutcome::Failed { path, reason } => {
                assert_eq!(path, "/apps/game.bin");
                assert!(!reason.is_empty());
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
