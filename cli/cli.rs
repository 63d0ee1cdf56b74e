mod cli_args;
mod commands;
mod log_buffer;
mod output;
mod session;
mod tui;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use codecontext_core::{AppError, Config, split_list};
use colored::*;
use log;
use std::path::Path;
use std::process;

use cli_args::{Cli, Commands, ProjectConfigOpts, SelectionOpts};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = exit_code_for(&e);
            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}\n", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }
            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<AppError>() {
        Some(AppError::Config(_)) => 1,
        Some(AppError::TomlParse(_)) => 1,
        Some(AppError::TomlSerialize(_)) => 1,
        Some(AppError::Io(_)) => 2,
        Some(AppError::FileRead { .. }) => 2,
        Some(AppError::FileWrite { .. }) => 2,
        Some(AppError::Ignore(_)) => 2,
        Some(AppError::Pattern(_)) => 2,
        Some(AppError::InvalidKey(_)) => 5,
        Some(AppError::InvalidArgument(_)) => 5,
        Some(AppError::JsonSerialize(_)) => 6,
        Some(AppError::YamlError(_)) => 6,
        Some(_) => 1,
        None => 1,
    }
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .target(env_logger::Target::Pipe(Box::new(log_buffer::DeferredStderr)))
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(command) => match command {
            Commands::Select(args) => {
                log::debug!("Executing 'select' command...");
                commands::select::handle_select_command(args, quiet)?;
            }
            Commands::Generate(args) => {
                log::debug!("Executing 'generate' command...");
                commands::generate::handle_generate_command(args, quiet)?;
            }
            Commands::Count(args) => {
                log::debug!("Executing 'count' command...");
                commands::count::handle_count_command(args, quiet)?;
            }
            Commands::Config(args) => {
                log::debug!("Executing 'config' command...");
                let project_root =
                    Config::determine_project_root(args.project_config.root_arg())
                        .context("Failed to determine project root for config command")?;
                commands::config::handle_config_command(&args, &project_root, quiet)?;
            }
            Commands::Completion(args) => {
                log::debug!("Executing 'completion' command...");
                commands::completion::handle_completion_command(&args, quiet)?;
            }
        },
    }
    Ok(())
}

fn merge_config_with_cli_overrides(mut config: Config, opts: &SelectionOpts) -> Config {
    log::trace!("Applying CLI overrides to config...");

    if let Some(output_file) = &opts.output_file {
        config.general.output_file = output_file.clone();
    }
    if opts.no_gitignore {
        config.general.use_gitignore = false;
    }
    if opts.include_dot_files {
        config.general.ignore_dot_files = false;
    }
    if opts.no_preview {
        config.preview.enabled = false;
    }
    if let Some(dirs) = &opts.skip_dirs {
        config.ignore.skip_dirs.extend(split_list(dirs));
    }
    if let Some(files) = &opts.skip_files {
        config.ignore.skip_files.extend(split_list(files));
    }

    log::trace!("Config after CLI overrides: {:?}", config);
    config
}

/// Loads the config file (if any) for `project_root` and layers CLI flags on top.
pub fn load_config_for_command(
    project_root: &Path,
    project_opts: &ProjectConfigOpts,
    selection_opts: Option<&SelectionOpts>,
) -> Result<Config> {
    let config_path = Config::resolve_config_path(
        project_root,
        project_opts.config.as_ref(),
        project_opts.no_config,
    )
    .context("Failed to resolve configuration path")?;

    let config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    Ok(match selection_opts {
        Some(opts) => merge_config_with_cli_overrides(config, opts),
        None => config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn cli_overrides_layer_on_top_of_file_values() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".codecontext");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("codecontext.toml"),
            "[ignore]\nskip_dirs = [\"dist\"]\n",
        )
        .unwrap();

        let opts = SelectionOpts {
            skip_dirs: Some("build, out".to_string()),
            include_dot_files: true,
            output_file: Some("CONTEXT.md".to_string()),
            ..Default::default()
        };
        let config =
            load_config_for_command(tmp.path(), &ProjectConfigOpts::default(), Some(&opts))
                .unwrap();

        assert_eq!(config.ignore.skip_dirs, vec!["dist", "build", "out"]);
        assert!(!config.general.ignore_dot_files);
        assert_eq!(config.general.output_file, "CONTEXT.md");
        assert!(config.general.use_gitignore);
    }

    #[test]
    fn no_config_flag_skips_the_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".codecontext");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("codecontext.toml"), "[preview]\nenabled = false\n").unwrap();

        let opts = ProjectConfigOpts {
            no_config: true,
            ..Default::default()
        };
        let config = load_config_for_command(tmp.path(), &opts, None).unwrap();
        assert!(config.preview.enabled);
    }

    #[test]
    fn exit_codes_follow_error_kind() {
        let config_err = anyhow::Error::new(AppError::Config("bad".to_string()));
        assert_eq!(exit_code_for(&config_err), 1);
        let key_err = anyhow::Error::new(AppError::InvalidKey("x".to_string()))
            .context("while toggling");
        assert_eq!(exit_code_for(&key_err), 5);
        assert_eq!(exit_code_for(&anyhow::anyhow!("plain")), 1);
    }
}
