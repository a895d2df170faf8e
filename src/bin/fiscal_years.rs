use budget_etl::utils::error::EtlError;
use budget_etl::utils::{logger, validation::Validate};
use budget_etl::{
    BudgetJob, BudgetPipeline, BudgetReport, EtlEngine, FiscalYearRegistry, LocalStorage,
    TrackingConfig,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fiscal-years")]
#[command(about = "Manage the fiscal years tracked by budget-etl")]
struct Args {
    /// Path to the fiscal year registry
    #[arg(short, long, default_value = "fiscal_years.json")]
    registry: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add or update a fiscal year, e.g. `add FY26 budgets/fy26_master.xlsx`
    Add { year: String, budget_file: String },
    /// List all fiscal years
    List,
    /// Set the current fiscal year
    Current { year: String },
    /// Extract master budget figures for one fiscal year, or `all`
    Budget {
        target: String,

        #[arg(long, default_value = "./output")]
        output_path: String,

        #[arg(long, help = "TOML file overriding the sheet layout")]
        layout: Option<String>,

        #[arg(long, help = "Bundle outputs into a single ZIP file")]
        bundle: bool,
    },
}

fn load_settings(layout: Option<&str>) -> Result<TrackingConfig, EtlError> {
    match layout {
        Some(path) => {
            tracing::info!("📁 Loading layout from: {}", path);
            let settings = TrackingConfig::from_file(path)?;
            settings.validate()?;
            Ok(settings)
        }
        None => Ok(TrackingConfig::default()),
    }
}

fn print_budget(report: &BudgetReport, output_path: &str) {
    let summary = &report.summary;
    println!("✓ {} master budget ({})", report.fiscal_year, report.source_file_name);
    println!("  Total Budget: {}", summary.grand_total);
    println!("  Compensation: {}", summary.total_compensation);
    println!("  Current Expenses: {}", summary.current_expenses);
    for category in &report.expense_categories {
        println!(
            "    {}: {} ({} items)",
            category.name,
            category.amount,
            category.subcategories.len()
        );
    }
    println!("  Saved: {}", output_path);
}

/// 逐年擷取；`all` 模式下單一年度失敗不影響其他年度
fn run_budget(
    registry: &FiscalYearRegistry,
    target: &str,
    output_path: &str,
    settings: &TrackingConfig,
    bundle: bool,
) -> Result<(), EtlError> {
    let jobs = registry.budget_jobs(target)?;
    if jobs.is_empty() {
        println!("No fiscal years configured yet.");
        return Ok(());
    }

    let total = jobs.len();
    let mut failed = Vec::new();
    for job in jobs {
        let job = BudgetJob { bundle, ..job };
        let year = job.fiscal_year.clone();
        let pipeline = BudgetPipeline::with_settings(
            LocalStorage::new(output_path),
            job,
            settings.clone(),
        );

        match EtlEngine::new(pipeline).run() {
            Ok(run) => print_budget(&run.report, &run.output_path),
            Err(e) if total == 1 => return Err(e),
            Err(e) => {
                tracing::error!("❌ {}: {}", year, e);
                eprintln!("✗ {}: {}", year, e.user_friendly_message());
                failed.push(year);
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(EtlError::ProcessingError {
            message: format!(
                "{} of {} fiscal years failed: {}",
                failed.len(),
                total,
                failed.join(", ")
            ),
        })
    }
}

fn run(args: &Args) -> Result<(), EtlError> {
    let mut registry = FiscalYearRegistry::load(&args.registry)?;

    match &args.command {
        Command::Add { year, budget_file } => {
            let entry = registry.add(year, budget_file)?.clone();
            registry.save(&args.registry)?;
            println!("✓ {} saved ({})", entry.year, entry.period);
            println!("  Budget File: {}", entry.master_budget_file);
        }
        Command::List => {
            if registry.list().is_empty() {
                println!("No fiscal years configured yet.");
            }
            for fy in registry.list() {
                let marker = if registry.is_current(fy) { "⭐ CURRENT" } else { "" };
                println!("\n{}: {} {}", fy.year, fy.label, marker);
                println!("  Period: {}", fy.period);
                println!("  Budget File: {}", fy.master_budget_file);
                if let Some(month) = &fy.latest_report_month {
                    println!("  Latest Report: {} ({} months)", month, fy.months_elapsed);
                }
                println!("  Status: {}", fy.status);
            }
        }
        Command::Current { year } => {
            registry.set_current(year)?;
            registry.save(&args.registry)?;
            println!("✓ Set current fiscal year to {}", registry.current_fiscal_year);
        }
        Command::Budget {
            target,
            output_path,
            layout,
            bundle,
        } => {
            let settings = load_settings(layout.as_deref())?;
            run_budget(&registry, target, output_path, &settings, *bundle)?;
        }
    }

    Ok(())
}

fn main() {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    if let Err(e) = run(&args) {
        tracing::error!("❌ {} (Category: {:?})", e, e.category());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());
        std::process::exit(e.severity().exit_code().max(1));
    }
}
