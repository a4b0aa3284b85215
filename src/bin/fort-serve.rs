use std::env;
use std::path::PathBuf;

use fort_serve::{AppConfig, AssetServer, Error, offline, shutdown_signal};

fn print_usage() {
    eprintln!("Usage: fort-serve [MODE] [OPTIONS]");
    eprintln!();
    eprintln!("Modes:");
    eprintln!("  (default)           Serve the content root over HTTP");
    eprintln!("  offline             Run the offline cache proxy in front of the origin");
    eprintln!("  worker-script       Print the browser worker script (sw.js) to stdout");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <PATH>     Load settings from a TOML file");
    eprintln!("  -h, --help          Show this help");
    eprintln!();
    eprintln!("Logging is controlled by RUST_LOG (default: info).");
}

enum Mode {
    Serve,
    Offline,
    WorkerScript,
}

#[tokio::main]
async fn main() -> fort_serve::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut mode = Mode::Serve;
    let mut config_path: Option<PathBuf> = None;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "offline" => mode = Mode::Offline,
            "worker-script" => mode = Mode::WorkerScript,
            "--config" => {
                i += 1;
                if i < args.len() {
                    config_path = Some(PathBuf::from(&args[i]));
                } else {
                    eprintln!("Error: --config requires a value");
                    std::process::exit(1);
                }
            }
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Error: unknown argument '{other}'");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config = AppConfig::load(config_path.as_deref())?;

    let result = match mode {
        Mode::Serve => AssetServer::new(config.server).run(shutdown_signal()).await,
        Mode::Offline => offline::proxy::run(config.offline, shutdown_signal()).await,
        Mode::WorkerScript => {
            print!("{}", offline::worker_script(&config.offline));
            Ok(())
        }
    };

    match result {
        Ok(()) => Ok(()),
        Err(e @ Error::Bind { .. }) => {
            log::error!("{e}");
            std::process::exit(1);
        }
        Err(e) => Err(e),
    }
}
