//! Logging initialization: a single combined terminal logger, `info`
//! by default or `debug` with `--verbose`. Errors are never logged
//! here — they are returned as [`crate::error::TsetlinError`] and it
//! is the caller's job to log or surface them.

#[cfg(feature = "cli")]
pub fn init(verbose: bool) {
    let term_level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let term = simplelog::TermLogger::new(
        term_level,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term]).expect("initialize logger");
}

#[cfg(not(feature = "cli"))]
pub fn init(_verbose: bool) {}
