use super::select_target;
use crate::context::ProvisionContext;
use crate::prompt::Prompter;
use anyhow::Result;
use tracing::debug;

pub fn handle_provision(ctx: &ProvisionContext, prompter: &mut dyn Prompter) -> Result<()> {
    let target = select_target(prompter, "What would you like to provision?")?;
    debug!(?target, mode = ?ctx.mode(), "provisioning");
    target.provision(ctx, prompter)
}
