use crate::reports;
use clap::Args;
use maskforge::config::MaskConfig;
use maskforge::{MaskResult, MaskSession};

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[command(flatten)]
    pub mask: MaskConfig,

    /// Also show how the candidates split across this many nodes.
    #[arg(long)]
    pub nodes: Option<u32>,
}

pub fn run(args: &InspectArgs, config: MaskConfig) -> MaskResult<()> {
    let session = MaskSession::new(config.to_options())?;

    reports::print_summary(&session);
    reports::print_ranges(&session);

    let nodes = args.nodes.or(config.node.map(|n| n.count));
    if let Some(count) = nodes.filter(|&c| c > 1) {
        reports::print_node_shares(session.chain().total()?, count)?;
    }
    Ok(())
}
