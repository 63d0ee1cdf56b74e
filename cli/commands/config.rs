use crate::cli_args::ConfigArgs;
use crate::output::{write_to_file, write_to_stdout};
use anyhow::{Context, Result};
use codecontext_core::Config;
use codecontext_core::config::{DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME};
use colored::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub fn default_config_path(project_root: &Path) -> PathBuf {
    project_root
        .join(DEFAULT_CONFIG_DIR)
        .join(DEFAULT_CONFIG_FILENAME)
}

pub fn handle_config_command(args: &ConfigArgs, project_root: &Path, quiet: bool) -> Result<()> {
    let content = Config::default()
        .to_toml_string()
        .context("Failed to serialize default configuration")?;

    if !args.save {
        return write_to_stdout(&content);
    }

    let save_path = default_config_path(project_root);
    if save_path.exists() {
        if quiet {
            anyhow::bail!(
                "Target file '{}' exists. Overwrite prevented in quiet mode.",
                save_path.display()
            );
        }
        print!(
            "{} Config file already exists at '{}'. Overwrite? [{}/{}] ",
            "⚠️".yellow(),
            save_path.display().to_string().cyan(),
            "y".green(),
            "N".red()
        );
        io::stdout().flush().context("Failed to flush stdout")?;
        let mut response = String::new();
        io::stdin()
            .read_line(&mut response)
            .context("Failed to read user input")?;
        if !response.trim().eq_ignore_ascii_case("y") {
            println!("Save cancelled.");
            return Ok(());
        }
    }

    write_to_file(&save_path, &content)?;
    if !quiet {
        println!(
            "{} Default config saved to: {}",
            "✅".green(),
            save_path.display().to_string().blue()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn save_writes_loadable_default_config() {
        let tmp = TempDir::new().unwrap();
        let args = ConfigArgs {
            save: true,
            ..Default::default()
        };
        handle_config_command(&args, tmp.path(), true).unwrap();

        let path = default_config_path(tmp.path());
        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn quiet_save_refuses_to_overwrite() {
        let tmp = TempDir::new().unwrap();
        let path = default_config_path(tmp.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "# mine\n").unwrap();

        let args = ConfigArgs {
            save: true,
            ..Default::default()
        };
        assert!(handle_config_command(&args, tmp.path(), true).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "# mine\n");
    }
}
