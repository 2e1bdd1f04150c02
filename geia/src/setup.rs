use geia_config::Config;

/// Initializes logging and prints startup infos to the log.
pub fn init_logging(config: &Config) {
    geia_log::init(config.logging());

    if config.path().as_os_str().is_empty() {
        geia_log::debug!("running without config file");
    } else {
        geia_log::debug!("running with config file {}", config.path().display());
    }

    match config.abbreviations_path() {
        Some(path) => geia_log::debug!("  abbreviations: {}", path.display()),
        None => geia_log::debug!("  abbreviations: -"),
    };
    geia_log::debug!("  log level: {:?}", config.logging().level);
}
