use log::{LevelFilter, Log, Metadata, Record};
use once_cell::sync::OnceCell;
use std::{process, sync::Arc};

/// A logger instance for logfmt format (https://www.brandur.org/logfmt)
#[derive(Debug)]
pub struct DopplerLogger {
    instance: String,
}

static DOPPLER_LOGGER: OnceCell<Arc<DopplerLogger>> = OnceCell::new();

impl DopplerLogger {
    pub fn init(instance: &str, level_filter: LevelFilter) {
        let logger = DOPPLER_LOGGER.get_or_init(|| {
            Arc::new(DopplerLogger {
                instance: instance.to_string(),
            })
        });
        // This function gets called multiple times by the tests so ignore the error.
        let _ = log::set_logger(logger.as_ref()).map(|()| log::set_max_level(level_filter));
    }

    pub fn global() -> Arc<DopplerLogger> {
        DOPPLER_LOGGER
            .get()
            .expect("logger is not initialized")
            .clone()
    }

    fn format(&self, record: &Record) -> String {
        let level = record.level().to_string().to_lowercase();
        let message = record.args().to_string().replace('"', "\\\"");
        format!(
            "level={level} pid={} message=\"{message}\" target=\"{}\" instance={}",
            process::id(),
            record.target(),
            self.instance
        )
    }
}

impl Log for DopplerLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("{}", self.format(record));
        }
    }

    fn flush(&self) {}
}
