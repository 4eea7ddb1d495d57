//! `intentus config`: Configuration helpers.

use intentus_config::AppConfig;

pub fn run(path_only: bool) {
    let config_path = AppConfig::config_dir().join("config.toml");
    if path_only {
        println!("{}", config_path.display());
        return;
    }

    println!("# Default configuration; save as {}", config_path.display());
    println!("{}", AppConfig::default_toml());
}
