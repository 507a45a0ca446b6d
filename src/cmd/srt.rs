//! Srt command - UK Statutory Residence Test

use super::{print_json, print_table, read_json_input, yes_no, RulesArgs};
use clap::Args;
use residency::tax::rules::SrtRules;
use residency::tax::srt::{count_ties, Tie};
use residency::tax::{evaluate_srt, SrtInput, SrtResult};
use std::path::PathBuf;
use tabled::Tabled;

#[derive(Args, Debug)]
pub struct SrtCommand {
    /// JSON file with the SRT input. Reads from stdin if not specified.
    #[arg(default_value = "-")]
    input: PathBuf,

    #[command(flatten)]
    rules: RulesArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Tabled)]
struct TieRow {
    #[tabled(rename = "Tie")]
    tie: &'static str,
    #[tabled(rename = "Claimed")]
    claimed: &'static str,
    #[tabled(rename = "Counted")]
    counted: &'static str,
}

impl SrtCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let rules = self.rules.load()?;
        let input: SrtInput = read_json_input(&self.input)?;
        let result = evaluate_srt(&input, &rules.srt)?;

        if self.json {
            return print_json(&result);
        }
        print_result(&input, &result, &rules.srt);
        Ok(())
    }
}

fn print_result(input: &SrtInput, result: &SrtResult, rules: &SrtRules) {
    println!();
    println!("STATUTORY RESIDENCE TEST ({})", result.tax_year);
    println!();
    println!(
        "  {} with {} days in the UK",
        if input.is_leaver() { "Leaver" } else { "Arriver" },
        input.days_in_uk
    );
    println!(
        "  Result: {} ({})",
        if result.tax_resident {
            "UK resident"
        } else {
            "Not UK resident"
        },
        result.test_result.display()
    );
    println!("  {}", result.explanation);
    println!();

    let counted = count_ties(input, rules);
    let claimed = [
        (Tie::Family, input.family_tie),
        (Tie::Accommodation, input.accommodation_tie),
        (Tie::Work, input.work_tie),
        (Tie::NinetyDay, input.ninety_day_tie),
        (Tie::Country, input.country_tie),
    ];
    let rows: Vec<TieRow> = claimed
        .into_iter()
        .map(|(tie, claimed)| TieRow {
            tie: tie.display(),
            claimed: yes_no(claimed),
            counted: yes_no(counted.contains(&tie)),
        })
        .collect();
    print_table(rows);
}
