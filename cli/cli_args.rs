use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        value_name = "ROOT",
        help = "Project directory to summarize (default: current dir)."
    )]
    pub root: Option<PathBuf>,

    #[arg(
        short = 'p',
        long,
        help = "Same as ROOT, kept for older scripts.",
        value_name = "PATH",
        conflicts_with = "root",
        help_heading = "Project Setup"
    )]
    pub project_path: Option<PathBuf>,

    #[arg(
        long,
        help = "Path of the TOML config file (default: .codecontext/codecontext.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "no_config",
        help_heading = "Project Setup"
    )]
    pub config: Option<String>,

    #[arg(
        long,
        help = "Do not load any TOML config file.",
        conflicts_with = "config",
        help_heading = "Project Setup"
    )]
    pub no_config: bool,
}

impl ProjectConfigOpts {
    pub fn root_arg(&self) -> Option<&PathBuf> {
        self.root.as_ref().or(self.project_path.as_ref())
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct SelectionOpts {
    #[arg(
        short = 'o',
        long,
        help = "Output Markdown file, relative to ROOT [default: ProjectStructure.md].",
        value_name = "FILE",
        help_heading = "Output Control"
    )]
    pub output_file: Option<String>,

    #[arg(
        long,
        help = "Skip previews of file contents.",
        help_heading = "Output Control"
    )]
    pub no_preview: bool,

    #[arg(
        long,
        value_name = "DIRS",
        help = "Extra directory names to skip, comma separated (e.g. dist,build).",
        help_heading = "Ignore Rules"
    )]
    pub skip_dirs: Option<String>,

    #[arg(
        long,
        value_name = "FILES",
        help = "Extra file names or patterns to skip, comma separated.",
        help_heading = "Ignore Rules"
    )]
    pub skip_files: Option<String>,

    #[arg(
        long,
        help = "Do not read the project's .gitignore.",
        help_heading = "Ignore Rules"
    )]
    pub no_gitignore: bool,

    #[arg(
        long,
        help = "Treat dot files and folders like any other entry.",
        help_heading = "Ignore Rules"
    )]
    pub include_dot_files: bool,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Pick files and folders interactively and write a Markdown summary of them.",
    long_about = "codecontext walks a project directory, lets you include or exclude files and \nfolders in a terminal tree view, and writes a Markdown document listing the \nselection with short content previews.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  codecontext select ~/work/app\n  codecontext generate --stdout --skip-dirs dist\n  codecontext count -f json",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "i",
        about = "Choose files and folders interactively, then write the summary."
    )]
    Select(SelectArgs),

    #[command(
        visible_alias = "g",
        about = "Write the summary for the default selection without prompting."
    )]
    Generate(GenerateArgs),

    #[command(about = "Count the directories, files and bytes the default selection covers.")]
    Count(CountArgs),

    #[command(about = "Show or save the default configuration file structure.")]
    Config(ConfigArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SelectArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub selection: SelectionOpts,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub selection: SelectionOpts,

    #[arg(
        long,
        help = "Write the summary to standard output instead of the output file.",
        help_heading = "Output Control"
    )]
    pub stdout: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CountArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub selection: SelectionOpts,

    #[arg(short = 'f', long, help = "Set the output format.", value_name = "FORMAT", value_parser = ["text", "json", "yaml"], default_value = "text", help_heading = "Output Formatting")]
    pub format: String,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
    #[arg(
        long,
        help = "Save completion script to default location (prompts overwrite)."
    )]
    pub save: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,

    #[arg(
        long,
        help = "Save default config structure to default path (prompts overwrite)."
    )]
    pub save: bool,
}
