//! Domicile command - UK deemed domicile lookback over a residency history

use super::{print_json, print_table, yes_no, RulesArgs};
use chrono::NaiveDate;
use clap::Args;
use residency::history::{FileHistory, ResidencyHistory};
use residency::tax::{
    evaluate_deemed_domicile, evaluate_formerly_domiciled_resident, DeemedDomicileResult, TaxYear,
};
use std::path::PathBuf;
use tabled::Tabled;

#[derive(Args, Debug)]
pub struct DomicileCommand {
    /// Residency history file (JSON or CSV)
    #[arg(long)]
    history: PathBuf,

    /// User whose records are evaluated
    #[arg(short, long)]
    user: String,

    /// Date to measure the lookback from (YYYY-MM-DD)
    #[arg(long)]
    as_of: NaiveDate,

    /// The person has a UK domicile of origin
    #[arg(long)]
    origin_uk: bool,

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
    #[tabled(rename = "UK Resident")]
    resident: &'static str,
}

impl DomicileCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let rules = self.rules.load()?;
        let history = FileHistory::open(&self.history)?;
        let records = history.list_residency_records(&self.user, self.as_of)?;

        let mut result = evaluate_deemed_domicile(&records, self.as_of, &rules.domicile)?;
        if !result.is_deemed_domiciled && self.origin_uk {
            let origin = evaluate_formerly_domiciled_resident(
                &records,
                self.as_of,
                true,
                &rules.domicile,
            )?;
            if origin.is_deemed_domiciled {
                result = origin;
            }
        }

        if self.json {
            return print_json(&result);
        }
        self.print_result(&result, rules.domicile.lookback_years);
        Ok(())
    }

    fn print_result(&self, result: &DeemedDomicileResult, lookback_years: u32) {
        println!();
        println!("UK DEEMED DOMICILE ({} as of {})", self.user, self.as_of);
        println!();
        println!(
            "  Result: {}",
            if result.is_deemed_domiciled {
                "Deemed domiciled"
            } else {
                "Not deemed domiciled"
            }
        );
        if let Some(date) = result.deemed_domicile_date {
            println!("  Deemed domiciled from: {}", date);
        }
        println!("  {}", result.reason);
        println!();

        let current = TaxYear::from_date(self.as_of);
        let rows: Vec<YearRow> = (0..lookback_years as i32)
            .map(|i| TaxYear(current.0 - i))
            .map(|year| YearRow {
                year: year.display(),
                resident: yes_no(result.qualifying_years.contains(&year)),
            })
            .collect();
        print_table(rows);
    }
}
