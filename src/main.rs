use chrono::Local;
use flexi_logger::{FileSpec, Logger, LoggerHandle, WriteMode};
use log::{error, info};
use nsga3fs::param::{self, Param};
use nsga3fs::{cinfo, run};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::env;
use std::path::Path;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn init_logger(param: &Param) -> Result<LoggerHandle, flexi_logger::FlexiLoggerError> {
    let logger = Logger::try_with_str(&param.general.log_level)?;
    if param.general.log_base.is_empty() {
        logger.log_to_stderr().start()
    } else {
        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let base = Path::new(&param.general.log_base);
        let mut file_spec = FileSpec::default()
            .basename(base.file_name().map_or_else(|| "nsga3fs".into(), |name| name.to_string_lossy()))
            .discriminant(timestamp)
            .suffix(&param.general.log_suffix)
            .suppress_timestamp();
        if let Some(directory) = base.parent().filter(|d| !d.as_os_str().is_empty()) {
            file_spec = file_spec.directory(directory);
        }
        logger.log_to_file(file_spec).write_mode(WriteMode::Direct).start()
    }
}

/// Logs a fatal error, flushes the log file and exits with code 1
fn fatal(logger: &LoggerHandle, message: &str) -> ! {
    error!("{}", message);
    logger.flush();
    process::exit(1);
}

/// Clears `running` on SIGINT or SIGTERM so that the run stops at the next generation
fn install_signal_handler(running: Arc<AtomicBool>) -> std::io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::spawn(move || {
        for signal in signals.forever() {
            info!("Signal {} received, finishing the current generation...", signal);
            running.store(false, Ordering::Relaxed);
        }
    });
    Ok(())
}

fn main() {
    let param_path = env::args().nth(1).unwrap_or_else(|| "param.yaml".to_string());

    let param = match param::get(param_path.clone()) {
        Ok(param) => param,
        Err(e) => {
            eprintln!("Cannot load parameters from {}: {}", param_path, e);
            process::exit(1);
        }
    };

    let logger = match init_logger(&param) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Cannot initialize logging: {}", e);
            process::exit(1);
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    if let Err(e) = install_signal_handler(Arc::clone(&running)) {
        error!("Cannot register signal handlers: {}", e);
    }

    info!("nsga3fs v{} | parameters: {}", nsga3fs::version(), param_path);

    let experiment = match run(&param, running) {
        Ok(experiment) => experiment,
        Err(e) => fatal(&logger, &e.to_string()),
    };

    if !param.general.save_exp.is_empty() {
        match experiment.save_auto(&param.general.save_exp) {
            Ok(()) => info!("Experiment saved to {}", param.general.save_exp),
            Err(e) => error!("Cannot save experiment to {}: {}", param.general.save_exp, e),
        }
    }

    cinfo!(param.general.display_colorful, "{}", experiment.display_results());
    logger.flush();
}
