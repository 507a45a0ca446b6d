//! Presence command - SA physical presence test

use super::{print_json, print_table, read_json_input, RulesArgs};
use clap::Args;
use residency::tax::{evaluate_sa_presence, SaPresenceInput, SaPresenceResult};
use std::path::PathBuf;
use tabled::Tabled;

#[derive(Args, Debug)]
pub struct PresenceCommand {
    /// JSON file with the presence input. Reads from stdin if not specified.
    #[arg(default_value = "-")]
    input: PathBuf,

    #[command(flatten)]
    rules: RulesArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Tabled)]
struct YearRow {
    #[tabled(rename = "Tax Year")]
    year: String,
    #[tabled(rename = "Days in SA")]
    days: u32,
}

impl PresenceCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let rules = self.rules.load()?;
        let input: SaPresenceInput = read_json_input(&self.input)?;
        let result = evaluate_sa_presence(&input, &rules.presence)?;

        if self.json {
            return print_json(&result);
        }
        print_result(&input, &result);
        Ok(())
    }
}

fn print_result(input: &SaPresenceInput, result: &SaPresenceResult) {
    println!();
    println!("SA PHYSICAL PRESENCE TEST ({})", input.tax_year.display());
    println!();
    println!(
        "  Result: {} ({})",
        if result.tax_resident {
            "SA resident"
        } else {
            "Not SA resident"
        },
        result.test_result.display()
    );
    if let Some(average) = result.five_year_average {
        println!("  Five-year average: {} days", average);
    }
    println!("  {}", result.explanation);
    println!();

    let mut rows = vec![YearRow {
        year: input.tax_year.display(),
        days: input.days_in_sa,
    }];
    if let Some(prior) = input.prior_years_days {
        let mut year = input.tax_year;
        for days in prior {
            year = year.previous();
            rows.push(YearRow {
                year: year.display(),
                days,
            });
        }
    }
    print_table(rows);
}
