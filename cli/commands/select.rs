use crate::cli_args::SelectArgs;
use crate::commands::generate::{OutputTarget, Project, write_summary};
use crate::session::{Phase, Session};
use crate::tui;
use anyhow::Result;
use codecontext_core::FsReader;
use log;

pub fn handle_select_command(args: SelectArgs, quiet: bool) -> Result<()> {
    let project = Project::prepare(&args.project_config, &args.selection)?;
    let mut session = Session::with_tree(
        &project.root,
        &FsReader,
        &project.oracle,
        project.initial_tree(),
    );

    match tui::run(&mut session)? {
        Phase::Generate => {
            let rules = session.rule_set();
            log::debug!("Selection rules: {:?}", rules);
            let target = OutputTarget::File(project.output_path());
            write_summary(&project, &rules, &target, quiet)?;
        }
        phase => {
            log::info!("Session ended in {:?} without generating", phase);
            if !quiet {
                println!("Cancelled, no summary written.");
            }
        }
    }
    Ok(())
}
