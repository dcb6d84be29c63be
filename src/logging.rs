/// Install the global logger. Debug output (page fetches, buffer releases) is only
/// shown when `verbose` is set.
pub fn enable_logger(verbose: bool) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(move |out, message, record| {
            let level = match record.level() {
                // Padded to keep columns aligned
                log::Level::Error => "ERROR",
                log::Level::Warn => "WARN ",
                log::Level::Info => "INFO ",
                log::Level::Debug => "DEBUG",
                log::Level::Trace => "TRACE",
            };
            match verbose {
                true => out.finish(format_args!(
                    "{} [{}] {}",
                    level,
                    record.target(),
                    message
                )),
                false => out.finish(format_args!("{} {}", level, message)),
            }
        })
        .level(match verbose {
            true => log::LevelFilter::Debug,
            false => log::LevelFilter::Info,
        })
        .chain(std::io::stderr())
        .apply()?;

    log::debug!("Verbose logging enabled");
    Ok(())
}
