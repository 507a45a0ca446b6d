//! Relief command - treaty relief for a single item of income

use super::{print_json, RulesArgs};
use clap::{Args, Subcommand};
use residency::tax::rules::DtaRules;
use residency::tax::{
    capital_gains_relief, dividend_relief, employment_relief, interest_relief, pension_relief,
    AssetCategory, CapitalGainInput, Country, DividendInput, DtaReliefResult,
    EmploymentIncomeInput, InterestInput, PensionInput, PensionType, Residence,
};
use rust_decimal::Decimal;

#[derive(Subcommand, Debug)]
pub enum ReliefCommand {
    /// Employment and business income
    Employment(EmploymentArgs),
    /// Dividends
    Dividends(DividendArgs),
    /// Interest
    Interest(InterestArgs),
    /// Capital gains
    Gains(GainArgs),
    /// Pensions
    Pensions(PensionArgs),
}

#[derive(Args, Debug)]
pub struct CommonArgs {
    #[command(flatten)]
    rules: RulesArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
pub struct EmploymentArgs {
    /// Gross income
    #[arg(long)]
    amount: Decimal,
    /// Country where the work is performed (UK or SA)
    #[arg(long)]
    source: Country,
    /// Treaty residence (UK, SA or DUAL)
    #[arg(long)]
    residence: Residence,
    /// Tax rate in the source country
    #[arg(long, default_value = "0")]
    source_rate: Decimal,
    /// Tax rate in the residence country
    #[arg(long, default_value = "0")]
    residence_rate: Decimal,
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct DividendArgs {
    #[arg(long)]
    amount: Decimal,
    /// Country of the paying company
    #[arg(long)]
    source: Country,
    #[arg(long)]
    residence: Country,
    /// Withholding rate, defaults to the treaty rate
    #[arg(long)]
    withholding_rate: Option<Decimal>,
    #[arg(long, default_value = "0")]
    residence_rate: Decimal,
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct InterestArgs {
    #[arg(long)]
    amount: Decimal,
    /// Country of the payer
    #[arg(long)]
    source: Country,
    #[arg(long)]
    residence: Country,
    #[arg(long, default_value = "0")]
    residence_rate: Decimal,
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct GainArgs {
    #[arg(long)]
    gain: Decimal,
    /// immovable_property, permanent_establishment, shares or other
    #[arg(long)]
    category: AssetCategory,
    /// Where the property or permanent establishment is located
    #[arg(long)]
    asset_country: Option<Country>,
    #[arg(long)]
    residence: Country,
    #[arg(long, default_value = "0")]
    source_rate: Decimal,
    #[arg(long, default_value = "0")]
    residence_rate: Decimal,
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct PensionArgs {
    #[arg(long)]
    amount: Decimal,
    /// private or government_service
    #[arg(long = "type")]
    pension_type: PensionType,
    /// Country paying the pension
    #[arg(long)]
    payer: Country,
    #[arg(long)]
    residence: Country,
    #[arg(long, default_value = "0")]
    source_rate: Decimal,
    #[arg(long, default_value = "0")]
    residence_rate: Decimal,
    #[command(flatten)]
    common: CommonArgs,
}

impl ReliefCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self {
            ReliefCommand::Employment(args) => args.common.run(|rules| {
                employment_relief(
                    &EmploymentIncomeInput {
                        amount: args.amount,
                        source_country: args.source,
                        residence: args.residence,
                        source_rate: args.source_rate,
                        residence_rate: args.residence_rate,
                    },
                    rules,
                )
            }),
            ReliefCommand::Dividends(args) => args.common.run(|rules| {
                dividend_relief(
                    &DividendInput {
                        amount: args.amount,
                        source_country: args.source,
                        residence_country: args.residence,
                        withholding_rate: args.withholding_rate,
                        residence_rate: args.residence_rate,
                    },
                    rules,
                )
            }),
            ReliefCommand::Interest(args) => args.common.run(|rules| {
                interest_relief(
                    &InterestInput {
                        amount: args.amount,
                        source_country: args.source,
                        residence_country: args.residence,
                        residence_rate: args.residence_rate,
                    },
                    rules,
                )
            }),
            ReliefCommand::Gains(args) => args.common.run(|rules| {
                capital_gains_relief(
                    &CapitalGainInput {
                        gain: args.gain,
                        asset_category: args.category,
                        asset_country: args.asset_country,
                        residence_country: args.residence,
                        source_rate: args.source_rate,
                        residence_rate: args.residence_rate,
                    },
                    rules,
                )
            }),
            ReliefCommand::Pensions(args) => args.common.run(|rules| {
                pension_relief(
                    &PensionInput {
                        amount: args.amount,
                        pension_type: args.pension_type,
                        paying_country: args.payer,
                        residence_country: args.residence,
                        source_rate: args.source_rate,
                        residence_rate: args.residence_rate,
                    },
                    rules,
                )
            }),
        }
    }
}

impl CommonArgs {
    fn run<F>(&self, relief: F) -> anyhow::Result<()>
    where
        F: FnOnce(&DtaRules) -> Result<DtaReliefResult, residency::tax::EngineError>,
    {
        let rules = self.rules.load()?;
        let result = relief(&rules.dta)?;
        if self.json {
            return print_json(&result);
        }
        print_result(&result);
        Ok(())
    }
}

fn print_result(result: &DtaReliefResult) {
    println!();
    println!("TREATY RELIEF: {}", result.income_type.display().to_uppercase());
    println!();
    match result.taxing_country {
        Some(country) => println!("  Primary taxing right: {}", country),
        None => println!("  Primary taxing right: undetermined"),
    }
    if let (Some(rate), Some(tax)) = (result.withholding_rate, result.withholding_tax) {
        println!("  Withholding:    {:>12} at {}", format_money(tax), rate);
    }
    println!("  Source tax:     {:>12}", format_money(result.source_tax));
    println!("  Residence tax:  {:>12}", format_money(result.residence_tax));
    println!("  Relief:         {:>12}", format_money(result.relief_amount));
    println!("  Net tax:        {:>12}", format_money(result.net_tax));
    if result.provisional {
        println!();
        println!("  Provisional: resolve treaty residence before relying on this figure");
    }
    println!();
    println!("  {}", result.explanation);
}

fn format_money(value: Decimal) -> String {
    format!("{:.2}", value)
}
