//! Startup banner

use super::config::{AppConfig, is_all_interfaces};
use super::constants::APP_NAME;

/// Print the startup banner with URLs and the active stack
pub fn print_banner(config: &AppConfig, data_dir: &str) {
    let host = config.server.host.as_str();
    let port = config.server.port;

    // Use localhost for display when binding to all interfaces
    let display_host = if is_all_interfaces(host) {
        "localhost"
    } else {
        host
    };

    println!();
    println!(
        "  \x1b[1m\x1b[36m{}\x1b[0m \x1b[90mv{}\x1b[0m",
        APP_NAME,
        env!("CARGO_PKG_VERSION")
    );
    println!();

    const W: usize = 14;

    println!(
        "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m http://{}:{}/api/notes",
        "Notes API:", display_host, port
    );
    println!(
        "  \x1b[33m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m http://{}:{}/api/openapi.json",
        "OpenAPI:", display_host, port
    );

    let admission = if config.rate_limit.enabled {
        format!(
            "{} req / {}s",
            config.rate_limit.quota, config.rate_limit.window_secs
        )
    } else {
        "disabled".to_string()
    };
    println!(
        "  \x1b[35m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {} \x1b[90m({})\x1b[0m",
        "Store:", config.store.backend, admission
    );

    if host == "127.0.0.1" || host == "localhost" {
        println!(
            "  \x1b[90m➜  {:<W$} use --host 0.0.0.0 to expose\x1b[0m",
            "Network:"
        );
    }
    println!("  \x1b[90m➜  {:<W$} {}\x1b[0m", "Data:", data_dir);

    println!();
}
