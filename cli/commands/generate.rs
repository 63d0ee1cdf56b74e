use crate::cli_args::{GenerateArgs, ProjectConfigOpts, SelectionOpts};
use crate::load_config_for_command;
use crate::output;
use anyhow::{Context, Result};
use chrono::Utc;
use codecontext_core::{
    AppError, Config, ContentSanitizer, EntryCount, FsReader, GitignoreOracle, IgnoreRules,
    NoopSanitizer, PreviewOptions, Renderer, RuleSet, SecretRedactor, SelectionTree,
};
use log;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Resolved root, effective config and the base ignore rules for one run.
pub struct Project {
    pub root: PathBuf,
    pub config: Config,
    pub base_rules: IgnoreRules,
    pub oracle: GitignoreOracle,
}

impl Project {
    pub fn prepare(project_opts: &ProjectConfigOpts, selection_opts: &SelectionOpts) -> Result<Self> {
        let root = Config::determine_project_root(project_opts.root_arg())
            .context("Failed to determine project root")?;
        log::info!("Project root determined: {}", root.display());

        let config = load_config_for_command(&root, project_opts, Some(selection_opts))
            .context("Failed to load configuration")?;

        let base_rules =
            IgnoreRules::from_config(&root, &config).context("Failed to assemble ignore rules")?;
        let oracle = base_rules
            .build()
            .context("Failed to build ignore matcher")?;

        Ok(Self {
            root,
            config,
            base_rules,
            oracle,
        })
    }

    /// Tree with only the initial top-level selection applied.
    pub fn initial_tree(&self) -> SelectionTree {
        SelectionTree::from_listing(&self.root, &FsReader, &self.oracle)
    }

    pub fn output_path(&self) -> PathBuf {
        self.config.output_path(&self.root)
    }

    /// Base rules plus the rule set's overrides, then its excludes.
    pub fn filter_for(&self, rules: &RuleSet) -> Result<GitignoreOracle> {
        self.base_rules
            .with_overrides(&rules.overrides)
            .with_excludes(&rules.excludes)
            .build()
            .context("Failed to build selection filter")
    }

    fn sanitizer(&self) -> &'static dyn ContentSanitizer {
        if self.config.preview.redact {
            &SecretRedactor
        } else {
            &NoopSanitizer
        }
    }

    pub fn count(&self, rules: &RuleSet) -> Result<EntryCount> {
        let filter = self.filter_for(rules)?;
        Renderer::new(&self.root, &FsReader, &filter, self.sanitizer())
            .count(rules)
            .context("Failed to count selection")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    File(PathBuf),
    Stdout,
}

/// Renders `rules` to `target`. Returns `None` when nothing was selected.
pub fn write_summary(
    project: &Project,
    rules: &RuleSet,
    target: &OutputTarget,
    quiet: bool,
) -> Result<Option<EntryCount>> {
    if rules.is_empty() {
        log::info!("Selection is empty, skipping generation");
        if !quiet {
            output::print_nothing_selected();
        }
        return Ok(None);
    }

    let filter = project.filter_for(rules)?;
    let timestamp = project.config.output.include_timestamp.then(Utc::now);
    let renderer = Renderer::new(&project.root, &FsReader, &filter, project.sanitizer())
        .with_preview(PreviewOptions {
            enabled: project.config.preview.enabled,
            max_file_size: project.config.preview.max_file_size,
        })
        .with_timestamp(timestamp);

    let count = match target {
        OutputTarget::File(path) => {
            let mut writer = output::create_output_file(path)?;
            let count = renderer
                .render(rules, &mut writer)
                .map_err(|e| as_write_error(e, path))
                .with_context(|| format!("Failed to write summary to {}", path.display()))?;
            if !quiet {
                output::print_saved(path, &count);
            }
            count
        }
        OutputTarget::Stdout => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            let count = renderer
                .render(rules, &mut handle)
                .context("Failed to write summary to stdout")?;
            handle.flush().context("Failed to flush stdout")?;
            count
        }
    };
    Ok(Some(count))
}

fn as_write_error(err: AppError, path: &Path) -> AppError {
    match err {
        AppError::Io(source) => AppError::FileWrite {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    }
}

pub fn handle_generate_command(args: GenerateArgs, quiet: bool) -> Result<()> {
    let project = Project::prepare(&args.project_config, &args.selection)?;
    let tree = project.initial_tree();
    let rules = RuleSet::derive(&tree, &[]);
    log::debug!("Default selection rules: {:?}", rules);

    let target = if args.stdout {
        OutputTarget::Stdout
    } else {
        OutputTarget::File(project.output_path())
    };
    write_summary(&project, &rules, &target, quiet)?;
    Ok(())
}
