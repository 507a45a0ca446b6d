//! Schema command - print expected input formats

use clap::Args;
use residency::history::{HistoryInput, CSV_FIELD_DESCRIPTIONS};
use residency::tax::{AssessmentInput, RulesConfig, SaPresenceInput, SrtInput, TieBreakerInput};
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Which input to describe
    #[arg(value_enum, default_value = "assessment")]
    target: SchemaTarget,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaTarget {
    /// JSON Schema for the assess input
    Assessment,
    /// JSON Schema for the srt input
    Srt,
    /// JSON Schema for the presence input
    Presence,
    /// JSON Schema for tie-breaker facts
    TieBreaker,
    /// JSON Schema for a residency history file
    History,
    /// JSON Schema for a rules override file
    Rules,
    /// CSV header row for a residency history file
    HistoryCsvHeader,
    /// CSV column descriptions for a residency history file
    HistoryCsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let schema = match self.target {
            SchemaTarget::Assessment => schema_for!(AssessmentInput),
            SchemaTarget::Srt => schema_for!(SrtInput),
            SchemaTarget::Presence => schema_for!(SaPresenceInput),
            SchemaTarget::TieBreaker => schema_for!(TieBreakerInput),
            SchemaTarget::History => schema_for!(HistoryInput),
            SchemaTarget::Rules => schema_for!(RulesConfig),
            SchemaTarget::HistoryCsvHeader => {
                print_csv_header();
                return Ok(());
            }
            SchemaTarget::HistoryCsvFields => {
                print_csv_fields();
                return Ok(());
            }
        };
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }
}

fn print_csv_header() {
    let columns: Vec<&str> = CSV_FIELD_DESCRIPTIONS
        .iter()
        .map(|(name, _, _)| *name)
        .collect();
    println!("{}", columns.join(","));
}

fn print_csv_fields() {
    println!("Residency History CSV Format");
    println!("============================");
    println!();
    for (name, required, description) in CSV_FIELD_DESCRIPTIONS {
        let req = if *required { "required" } else { "optional" };
        println!("{:24} ({:8})  {}", name, req, description);
    }
    println!();
    println!("Periods are half-open: effective_to is the first day no longer covered.");
}
