//! Assess command - full residency assessment for one tax year

use super::{print_json, read_json_input, yes_no, RulesArgs};
use clap::Args;
use residency::history::{FileHistory, ResidencyHistory};
use residency::store::{JsonResultStore, ResultStore};
use residency::tax::{assess, Assessment, AssessmentInput};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct AssessCommand {
    /// JSON file with the assessment input. Reads from stdin if not specified.
    #[arg(default_value = "-")]
    input: PathBuf,

    /// Residency history file (JSON or CSV) for the deemed domicile lookback
    #[arg(long)]
    history: Option<PathBuf>,

    /// Save the result to this JSON results file, replacing any result for the same year
    #[arg(long)]
    save: Option<PathBuf>,

    #[command(flatten)]
    rules: RulesArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

impl AssessCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let rules = self.rules.load()?;
        let input: AssessmentInput = read_json_input(&self.input)?;

        let records = match &self.history {
            Some(path) => {
                FileHistory::open(path)?.list_residency_records(&input.user_id, input.as_of)?
            }
            None => Vec::new(),
        };
        let assessment = assess(&input, &records, &rules)?;

        if let Some(path) = &self.save {
            let mut store = JsonResultStore::open(path)?;
            let replaced = store
                .get(&assessment.user_id, assessment.tax_year)
                .is_some();
            store.save(&assessment.user_id, assessment.tax_year, &assessment)?;
            log::info!("Saved assessment to {}", path.display());
            if !self.json {
                println!(
                    "{} assessment for {} {} in {}",
                    if replaced { "Replaced" } else { "Saved" },
                    assessment.user_id,
                    assessment.tax_year,
                    path.display()
                );
            }
        }

        if self.json {
            return print_json(&assessment);
        }
        print_assessment(&assessment);
        Ok(())
    }
}

fn print_assessment(assessment: &Assessment) {
    println!();
    println!(
        "RESIDENCY ASSESSMENT: {} ({})",
        assessment.user_id, assessment.tax_year
    );
    println!();
    println!(
        "  UK resident:        {:4} {}",
        yes_no(assessment.uk.tax_resident),
        assessment.uk.test_result.display()
    );
    println!(
        "  SA resident:        {:4} {}",
        yes_no(assessment.sa.tax_resident),
        assessment.sa.test_result.display()
    );
    println!(
        "  Dual resident:      {}",
        yes_no(assessment.dual_resident)
    );
    if let Some(tie_breaker) = &assessment.tie_breaker {
        match tie_breaker.sole_residence.country() {
            Some(country) => println!(
                "  Treaty residence:   {} ({})",
                country, tie_breaker.test_applied
            ),
            None => println!("  Treaty residence:   undetermined ({})", tie_breaker.test_applied),
        }
    } else if assessment.dual_resident {
        println!("  Treaty residence:   not resolved, no tie-breaker facts given");
    }
    println!(
        "  UK domicile:        {}",
        assessment.uk_domicile_status.display()
    );
    if let Some(date) = assessment.deemed_domicile.deemed_domicile_date {
        println!("  Deemed domiciled:   from {}", date);
    }
    println!();
    println!("  UK: {}", assessment.uk.explanation);
    println!("  SA: {}", assessment.sa.explanation);
    println!("  Domicile: {}", assessment.deemed_domicile.reason);
}
