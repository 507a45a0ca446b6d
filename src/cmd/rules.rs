//! Rules command - print the thresholds in effect

use super::{print_json, RulesArgs};
use clap::Args;

#[derive(Args, Debug)]
pub struct RulesCommand {
    #[command(flatten)]
    rules: RulesArgs,
}

impl RulesCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let rules = self.rules.load()?;
        print_json(&rules)
    }
}
