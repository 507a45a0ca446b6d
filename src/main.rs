use clap::{Parser, Subcommand};

mod cmd;

#[derive(Parser, Debug)]
#[command(
    name = "residency",
    version,
    about = "UK/SA tax residency, deemed domicile and double taxation relief"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// UK Statutory Residence Test for one tax year
    Srt(cmd::srt::SrtCommand),
    /// SA physical presence test for one tax year
    Presence(cmd::presence::PresenceCommand),
    /// UK deemed domicile from residency history
    Domicile(cmd::domicile::DomicileCommand),
    /// Double taxation relief for one item of income
    #[command(subcommand)]
    Relief(cmd::relief::ReliefCommand),
    /// Treaty tie-breaker for a dual resident
    TieBreaker(cmd::tie_breaker::TieBreakerCommand),
    /// Combined assessment for one tax year
    Assess(cmd::assess::AssessCommand),
    /// Print expected input formats
    Schema(cmd::schema::SchemaCommand),
    /// Print the rule thresholds in effect
    Rules(cmd::rules::RulesCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    log::debug!("{:?}", cli);

    match cli.command {
        Command::Srt(cmd) => cmd.exec(),
        Command::Presence(cmd) => cmd.exec(),
        Command::Domicile(cmd) => cmd.exec(),
        Command::Relief(cmd) => cmd.exec(),
        Command::TieBreaker(cmd) => cmd.exec(),
        Command::Assess(cmd) => cmd.exec(),
        Command::Schema(cmd) => cmd.exec(),
        Command::Rules(cmd) => cmd.exec(),
    }
}
