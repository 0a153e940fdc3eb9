//! Invoice audit console CLI

mod render;

use anyhow::{bail, Context, Result};
use audit_core::{
    extract, AnalysisOutcome, AuditConsole, ConsoleConfig, DerivedMetrics, Trigger,
    TriggerOutcome, VendorOutcome,
};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use render::HeadlessAnimator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("audit-console")
        .version(audit_core::VERSION)
        .about("Tax-invoice audit console")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("engine-url")
                .long("engine-url")
                .global(true)
                .help("Analysis Engine base URL (overrides the config file)"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print results as JSON"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("analyze")
                .about("Analyse an invoice from free text or a dropped file name")
                .arg(Arg::new("text").help("Text containing an invoice identifier"))
                .arg(
                    Arg::new("file")
                        .long("file")
                        .conflicts_with("text")
                        .help("File name to take the identifier from"),
                ),
        )
        .subcommand(
            Command::new("vendor")
                .about("Show a vendor's compliance risk profile")
                .arg(Arg::new("gstin").required(true).help("Vendor GSTIN")),
        )
        .subcommand(
            Command::new("extract")
                .about("Show the invoice identifier found in the input, without analysing")
                .arg(Arg::new("text").required(true).help("Text or file name")),
        )
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(matches: &ArgMatches) -> Result<ConsoleConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ConsoleConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ConsoleConfig::default(),
    };
    if let Some(url) = matches.get_one::<String>("engine-url") {
        config = config.with_engine_url(url.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("log-json"));
    run(&matches).await
}

async fn run(matches: &ArgMatches) -> Result<()> {
    let json = matches.get_flag("json");

    match matches.subcommand() {
        Some(("extract", args)) => {
            let text = args.get_one::<String>("text").map_or("", String::as_str);
            run_extract(text, json)
        }
        Some(("analyze", args)) => {
            let trigger = match (args.get_one::<String>("file"), args.get_one::<String>("text")) {
                (Some(file), _) => Trigger::FileDrop(file.clone()),
                (None, Some(text)) => Trigger::ChatMessage(text.clone()),
                (None, None) => bail!("give either TEXT or --file NAME"),
            };
            let console = connect(matches)?;
            run_analyze(&console, trigger, json).await
        }
        Some(("vendor", args)) => {
            let gstin = args.get_one::<String>("gstin").map_or("", String::as_str);
            let console = connect(matches)?;
            run_vendor(&console, gstin, json).await
        }
        Some((other, _)) => bail!("unknown subcommand {other:?}"),
        None => bail!("a subcommand is required"),
    }
}

fn connect(matches: &ArgMatches) -> Result<AuditConsole> {
    let config = load_config(matches)?;
    AuditConsole::connect(config, Arc::new(HeadlessAnimator)).context("connecting to the engine")
}

fn run_extract(text: &str, json: bool) -> Result<()> {
    match extract(text) {
        Ok(id) if json => println!("{}", serde_json::json!({ "invoice_id": id })),
        Ok(id) => println!("{id}"),
        Err(failure) => bail!(failure.guidance()),
    }
    Ok(())
}

async fn run_analyze(console: &AuditConsole, trigger: Trigger, json: bool) -> Result<()> {
    let result = match console.handle(trigger).await {
        TriggerOutcome::Analysis(AnalysisOutcome::Success(result)) => result,
        TriggerOutcome::Analysis(AnalysisOutcome::Failed(failure)) => bail!(failure.reason()),
        TriggerOutcome::Analysis(AnalysisOutcome::Rejected { pending }) => {
            bail!("analysis of {pending} is still pending")
        }
        TriggerOutcome::NotRecognized(failure) => bail!(failure.guidance()),
        TriggerOutcome::Vendor(_) => bail!("input was not an invoice identifier"),
    };

    let metrics: Arc<DerivedMetrics> = console
        .settled_derived()
        .await
        .context("derived state missing")?;
    let highlights = console.highlights();
    let invoice = result
        .invoice_id
        .clone()
        .or_else(|| console.controller().last_request().map(|r| r.identifier.to_string()))
        .unwrap_or_default();

    if json {
        let report = serde_json::json!({
            "invoice_id": invoice,
            "overall_risk": result.overall_risk,
            "explanation": result.explanation,
            "derived": &*metrics,
            "nodes": highlights,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{}",
            render::analysis_report(
                &invoice,
                &result.overall_risk,
                &result.explanation,
                &metrics,
                &highlights,
            )
        );
    }
    Ok(())
}

async fn run_vendor(console: &AuditConsole, gstin: &str, json: bool) -> Result<()> {
    let profile = match console.handle(Trigger::VendorLookup(gstin.to_string())).await {
        TriggerOutcome::Vendor(VendorOutcome::Applied(profile)) => profile,
        TriggerOutcome::Vendor(VendorOutcome::Failed(failure)) => {
            bail!("{} ({})", failure.kind.message(), failure.gstin)
        }
        TriggerOutcome::Vendor(VendorOutcome::Stale { .. }) => {
            bail!("vendor lookup superseded")
        }
        TriggerOutcome::NotRecognized(_) | TriggerOutcome::Analysis(_) => {
            bail!("{gstin:?} is not a GSTIN")
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&*profile)?);
    } else {
        println!("{}", render::vendor_report(gstin, &profile));
    }
    Ok(())
}
