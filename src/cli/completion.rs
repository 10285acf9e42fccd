//! Shell completion generation for tablesnap

use clap::CommandFactory;
use clap_complete::{Shell, generate};
use std::io;

use crate::cli::CliArgs;
use crate::error::{ConfigError, Result};

/// Generate shell completion script on stdout
///
/// # Arguments
/// * `shell_name` - Shell type (bash, zsh, fish, powershell)
///
/// # Returns
/// * `Result<()>` - Success or error
pub fn generate_completion(shell_name: &str) -> Result<()> {
    let shell = parse_shell(shell_name)?;
    let mut cmd = CliArgs::command();
    generate(shell, &mut cmd, "tablesnap", &mut io::stdout());
    Ok(())
}

/// Parse shell name string to Shell enum
fn parse_shell(shell_name: &str) -> Result<Shell> {
    match shell_name.to_lowercase().as_str() {
        "bash" => Ok(Shell::Bash),
        "zsh" => Ok(Shell::Zsh),
        "fish" => Ok(Shell::Fish),
        "powershell" => Ok(Shell::PowerShell),
        _ => Err(ConfigError::Generic(format!(
            "Unsupported shell: {}. Supported shells: bash, zsh, fish, powershell",
            shell_name
        ))
        .into()),
    }
}
