use super::select_target;
use crate::context::ProvisionContext;
use crate::exec;
use crate::prompt::Prompter;
use anyhow::Result;

pub fn handle_cleanup(ctx: &ProvisionContext, prompter: &mut dyn Prompter) -> Result<()> {
    let target = select_target(prompter, "What would you like to clean up?")?;

    let question = format!("Are you sure you want to clean up {}?", target.label());
    if !prompter.confirm(&question, false)? {
        println!("Cleanup cancelled");
        return Ok(());
    }

    let status = target.cleanup(ctx)?;
    exec::ensure_success(target.cleanup_program(), status)?;

    println!("✓ Cleanup completed successfully");
    Ok(())
}
