//! Logger setup.
//!
//! The library itself only uses the `log` macros.  Applications that don't
//! bring their own logger can call [`init_logger`] once at startup.

use std::path::Path;

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::error::{Error, Result};

const PATTERN: &'static str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {h({l:<5})} {t} - {m}{n}";

/// Logs to stderr, and additionally to `file` if given.
pub fn init_logger(file: Option<&Path>, level: LevelFilter) -> Result<()> {
    let config = build_config(file, level)?;
    log4rs::init_config(config).map_err(|e| Error::Logging(e.to_string()))?;
    info!("logging at {} to {}", level,
          file.map(|f| f.display().to_string()).unwrap_or_else(|| "console".into()));
    Ok(())
}

fn build_config(file: Option<&Path>, level: LevelFilter) -> Result<Config> {
    let console = ConsoleAppender::builder()
        .target(log4rs::append::console::Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();
    let mut builder = Config::builder()
        .appender(Appender::builder().build("console", Box::new(console)));
    let mut root = Root::builder().appender("console");
    if let Some(path) = file {
        let appender = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build(path)
            .map_err(|e| Error::Logging(format!("{}: {}", path.display(), e)))?;
        builder = builder.appender(Appender::builder().build("file", Box::new(appender)));
        root = root.appender("file");
    }
    builder.build(root.build(level)).map_err(|e| Error::Logging(e.to_string()))
}
