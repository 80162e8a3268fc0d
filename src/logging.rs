use std::path::{Path, PathBuf};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

fn default_level(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

/// Initialise logging. The default level is `info`; `debug` can be enabled
/// via the settings file or `--debug`. Only with debug enabled does the
/// `RUST_LOG` environment variable override the level.
///
/// When `log_file` is set, output goes to that file instead of stderr.
/// Calling this more than once keeps the first subscriber.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    let level = default_level(debug);
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let appender = log_file.and_then(|path| match file_appender(&path) {
        Ok(appender) => Some(appender),
        Err(e) => {
            eprintln!("could not open log file {}: {e}", path.display());
            None
        }
    });
    match appender {
        Some(appender) => {
            let _ = builder.with_writer(appender).with_ansi(false).try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}

fn file_appender(path: &Path) -> Result<RollingFileAppender, InitError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bootup.log".to_string());
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
}
