//! Tie-breaker command - treaty residence for a dual resident

use super::print_json;
use clap::Args;
use residency::tax::{resolve_tie_breaker, Nationality, TieBreakerInput};

#[derive(Args, Debug)]
pub struct TieBreakerCommand {
    /// Permanent home available in the UK
    #[arg(long)]
    uk_home: bool,
    /// Permanent home available in SA
    #[arg(long)]
    sa_home: bool,
    /// Personal and economic relations closer to the UK
    #[arg(long)]
    uk_vital_interests: bool,
    /// Personal and economic relations closer to SA
    #[arg(long)]
    sa_vital_interests: bool,
    /// Habitual abode in the UK
    #[arg(long)]
    uk_habitual_abode: bool,
    /// Habitual abode in SA
    #[arg(long)]
    sa_habitual_abode: bool,
    /// UK, SA or BOTH
    #[arg(long)]
    nationality: Nationality,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

impl TieBreakerCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let input = TieBreakerInput {
            has_uk_home: self.uk_home,
            has_sa_home: self.sa_home,
            uk_vital_interests: self.uk_vital_interests,
            sa_vital_interests: self.sa_vital_interests,
            uk_habitual_abode: self.uk_habitual_abode,
            sa_habitual_abode: self.sa_habitual_abode,
            nationality: self.nationality,
        };
        let result = resolve_tie_breaker(&input);

        if self.json {
            return print_json(&result);
        }
        println!();
        println!("TREATY TIE-BREAKER");
        println!();
        match result.sole_residence.country() {
            Some(country) => println!("  Resident in {} ({})", country, result.test_applied),
            None => println!("  Undetermined ({})", result.test_applied),
        }
        println!("  {}", result.explanation);
        Ok(())
    }
}
