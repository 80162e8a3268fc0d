pub mod error;
pub mod launcher;
pub mod logging;
pub mod registry;
pub mod settings;
pub mod store;

pub use error::RegistryError;
pub use launcher::{LaunchOutcome, Launcher, Opener, SystemOpener};
pub use registry::{display_name, normalize_category, Registry, DEFAULT_CATEGORY};
pub use store::RegistryStore;
