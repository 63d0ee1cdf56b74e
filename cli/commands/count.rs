use crate::cli_args::CountArgs;
use crate::commands::generate::Project;
use crate::output::{CountReport, print_count};
use anyhow::Result;
use codecontext_core::RuleSet;
use log;

pub fn handle_count_command(args: CountArgs, quiet: bool) -> Result<()> {
    let project = Project::prepare(&args.project_config, &args.selection)?;
    let rules = RuleSet::derive(&project.initial_tree(), &[]);

    if rules.is_empty() && !quiet && args.format == "text" {
        println!("Nothing is selected by default in {}.", project.root.display());
        return Ok(());
    }

    log::debug!("Counting entries for {} roots", rules.roots.len());
    let count = project.count(&rules)?;
    print_count(&CountReport::new(&project.root, &count), &args.format)
}
