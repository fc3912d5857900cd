mod client_manager;
mod command_interface;
mod config;
mod file_reader;
mod server_manager;
mod session;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use app_config::AppConfig;
use app_thread::{Shutdown, ThreadGroup};
use dotenv::dotenv;
use error_handler::ThreadError;
use logger::{info, set_thread_label};
use thread_registry::ThreadRegistry;

use client_manager::ClientManager;
use command_interface::CommandInterface;
use config::{RecorderConfig, DEFAULT_CONFIG_PATH};
use file_reader::FileReader;
use server_manager::ServerManager;

const LOGGER_POLL_INTERVAL: Duration = Duration::from_millis(10);
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(500);
const THREAD_EXIT_TIMEOUT: Duration = Duration::from_secs(5);

fn start(group: &mut ThreadGroup, result: Result<(), ThreadError>) {
    match result {
        Ok(()) | Err(ThreadError::Suppressed(_)) => {}
        Err(err) => logger::error!("Failed to start thread: {}", err),
    }
    logger::debug!("{} threads running: {}", group.threads_count(), group.labels().join(", "));
}

fn main() -> ExitCode {
    dotenv().ok();
    set_thread_label("MAIN");

    let config_path = PathBuf::from(env::var("RECORDER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()));
    let (app_config, load_error) = match AppConfig::load(&config_path) {
        Ok(app_config) => (app_config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    };
    let cfg = RecorderConfig::from_app_config(&app_config);

    let logger = Arc::new(cfg.build_logger());
    if logger::install(logger.clone()).is_err() {
        eprintln!("Logger already installed");
        return ExitCode::FAILURE;
    }
    let writer = match logger::start_consumer_thread(logger.clone(), LOGGER_POLL_INTERVAL) {
        Ok(writer) => writer,
        Err(err) => {
            logger::fatal!("Cannot start logger thread: {}", err);
            return ExitCode::FAILURE;
        }
    };
    match load_error {
        Some(err) => logger::warn!("Using defaults, cannot load {}: {}", config_path.display(), err),
        None => {
            for section in RecorderConfig::missing_sections(&app_config) {
                logger::warn!("{} has no {} section, using defaults", config_path.display(), section);
            }
        }
    }
    info!("Recorder starting with log level {}", logger.get_log_level().as_str());

    let shutdown = Shutdown::new();
    if let Err(err) = shutdown.install_signal_handlers() {
        logger::error!("Cannot install signal handlers: {}", err);
    }

    let registry = Arc::new(ThreadRegistry::new());
    let mut group = ThreadGroup::new(registry.clone(), shutdown.clone()).with_suppressed(&cfg.suppressed);

    if let Some(port) = cfg.command_port {
        let result = group.spawn(CommandInterface::new(port, logger.clone(), cfg.comm.io_timeout));
        start(&mut group, result);
    }

    if let Some(bind) = &cfg.server_bind {
        let manager = ServerManager::new(bind, cfg.connect_retry, cfg.comm.clone());
        let result = group.spawn(manager);
        start(&mut group, result);
    }
    if let Some(host) = &cfg.client_host {
        let manager = ClientManager::new(host, cfg.connect_retry, cfg.comm.clone());
        let result = group.spawn(manager);
        start(&mut group, result);
    }
    if let Some(reader) = cfg.file_reader.clone() {
        let result = group.spawn(FileReader::new(reader));
        start(&mut group, result);
    }

    if group.threads_count() == 0 {
        logger::warn!("Nothing to run, every thread is disabled or suppressed");
    } else {
        while !shutdown.wait(SHUTDOWN_POLL_INTERVAL) {}
        info!("Shutdown requested");
    }

    shutdown.signal();
    for (label, result) in group.join_all(THREAD_EXIT_TIMEOUT) {
        if let Err(err) = result {
            logger::warn!("{} ended with error: {}", label, err);
        }
    }
    if registry.wait_all(THREAD_EXIT_TIMEOUT, None).is_err() {
        logger::warn!("Some threads did not stop in time: {}", registry.labels().join(", "));
    }
    drop(group);
    if let Err(err) = registry.cleanup() {
        logger::error!("Registry cleanup failed: {}", err);
    }

    info!("Recorder stopped");
    writer.terminate();
    ExitCode::SUCCESS
}
