use servlet_webserver::config::Config;
use servlet_webserver::servlet::ComponentRegistry;
use servlet_webserver::{demo, logger, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg.logging)?;

    // Worker thread count from config, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        logger::log_info(&format!("Using {workers} worker threads"));
    } else {
        logger::log_info("Using default worker threads (CPU cores)");
    }
    let runtime = runtime_builder.build()?;

    let mut registry = ComponentRegistry::new();
    demo::register(&mut registry);

    runtime.block_on(server::run(cfg, registry))
}
