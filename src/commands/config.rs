//! Config command handler.
//!
//! Contains the implementation of the `config` CLI command.

use hiddenthread::config::HiddenThreadConfig;

/// Config command.
pub fn cmd_config(
    config: &HiddenThreadConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !show {
        println!("Use 'hiddenthread config --show' to display configuration");
        return Ok(());
    }

    println!("Current Configuration");
    println!("=====================");
    println!();
    print!("{}", config.to_redacted_toml()?);
    println!();

    println!("Index backend: {}", config.matching.index);
    println!(
        "API key: {}",
        if config.llm.require_api_key().is_ok() {
            "set"
        } else {
            "missing"
        }
    );
    Ok(())
}
