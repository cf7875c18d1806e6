use anyhow::Context;
use pathgate::{config::Config, logging, policy::PolicyStore, server};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = PathBuf::from("pathgate.toml");
    let mut resolve_only: Option<String> = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                if i >= args.len() { eprintln!("--config requires a path"); std::process::exit(2); }
                config_path = PathBuf::from(&args[i]);
            }
            "--resolve" => {
                i += 1;
                if i >= args.len() { eprintln!("--resolve requires a path"); std::process::exit(2); }
                resolve_only = Some(args[i].clone());
            }
            other => { eprintln!("unknown argument: {other}"); std::process::exit(2); }
        }
        i += 1;
    }

    let cfg = Config::load(&config_path).context("loading config")?;
    cfg.validate().context("validating config")?;
    logging::init(&cfg.logging);

    let policy = cfg.build_policy().context("building path policy")?;
    let store = PolicyStore::new(policy);

    if let Some(raw) = resolve_only {
        match store.resolve(&raw) {
            Ok(resolved) => println!("{resolved}"),
            Err(e) => {
                eprintln!("{}: {}", e.code(), e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let addr = format!("{}:{}", cfg.server.bind_addr, cfg.server.port);
    info!(addr = %addr, base_path = %cfg.server.base_path, base_dir = %cfg.policy.base_dir.display(), "pathgate ready");
    println!("pathgate ready addr={} base_path={}", addr, cfg.server.base_path);

    server::serve(cfg, store).await
}
