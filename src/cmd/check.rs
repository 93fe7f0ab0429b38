//! Configuration summary: `gardinar --check`.

use std::path::Path;

use gardinar::config::Config;
use gardinar::webhook::server::WEBHOOK_PATH;

pub fn cmd_check(config_path: &Path, config: &Config) {
    println!();
    println!("Gardinar Configuration");
    println!("======================");
    println!();
    println!("Config file: {}", config_path.display());
    println!("Listen:      {}{}", config.listen_addr(), WEBHOOK_PATH);
    println!("Header:      {}", config.secret_header);
    println!("Git:         {}", config.git_path.display());
    match config.task_timeout {
        Some(limit) => println!("Timeout:     {}s", limit.as_secs()),
        None => println!("Timeout:     none"),
    }
    println!(
        "Strategy:    {} ({} task(s))",
        config.tasks.strategy(),
        config.tasks.task_names().len()
    );
    if let Some(script) = config.tasks.script() {
        let state = if script.is_file() { "" } else { " (missing)" };
        println!("Script:      {}{}", script.display(), state);
    }
    for name in config.tasks.task_names() {
        println!("  - {}", name);
    }
    println!();
    println!("Configuration OK");
}
