use budget_etl::adapters::workbook::find_latest_workbook;
use budget_etl::core::assembler::{format_percent, over_budget_count, percent_of_budget};
use budget_etl::utils::error::EtlError;
use budget_etl::utils::{logger, validation::Validate};
use budget_etl::{
    CliConfig, EtlEngine, FiscalYearRegistry, LocalStorage, TrackingConfig, TrackingPipeline,
    TrackingReport,
};
use clap::Parser;
use std::path::Path;

fn exit_with(e: &EtlError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ Tracking extraction failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    // 輸出用戶友好的錯誤信息
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    std::process::exit(e.severity().exit_code().max(1));
}

fn print_summary(report: &TrackingReport) {
    println!("📅 Period: {}", report.period);
    for group in &report.groups {
        println!(
            "   {}: {} categories ({} over budget), total {} of {}",
            group.fund,
            group.categories.len(),
            over_budget_count(&group.categories),
            group.total.actuals,
            group.total.budget
        );
    }
    if let Some(total) = &report.total_expenditures {
        println!(
            "   Total expenditures: {} spent",
            format_percent(percent_of_budget(total))
        );
    }
    if !report.unclassified.is_empty() {
        println!(
            "⚠️  {} categories could not be assigned to a fund",
            report.unclassified.len()
        );
    }
}

/// 將本次月報記錄到會計年度登錄表；未登錄的年度只提示不寫入
fn record_in_registry(config: &CliConfig, code: &str, report: &TrackingReport) {
    let result = FiscalYearRegistry::load(&config.registry).and_then(|mut registry| {
        let Some(entry) = registry.get(code) else {
            tracing::warn!(
                "{} is not registered in {}; run `fiscal-years add {} <budget.xlsx>` first",
                code,
                config.registry,
                code
            );
            return Ok(false);
        };
        tracing::debug!("Master budget for {}: {}", entry.year, entry.master_budget_file);

        registry.record_report(code, &report.source_file_name, &report.period)?;
        registry.save(&config.registry)?;
        Ok(true)
    });

    match result {
        Ok(true) => tracing::info!("📒 Recorded {} report in {}", code, config.registry),
        Ok(false) => {}
        Err(e) => tracing::warn!("Could not update {}: {}", config.registry, e),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting budget-etl CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    // 輸入為目錄時取最新的活頁簿
    if Path::new(&config.input).is_dir() {
        match find_latest_workbook(Path::new(&config.input)) {
            Ok(path) => {
                tracing::info!("📂 Using latest workbook: {}", path.display());
                config.input = path.to_string_lossy().into_owned();
            }
            Err(e) => exit_with(&e),
        }
    }

    // 載入版面設定
    let settings = match &config.layout {
        Some(layout) => {
            tracing::info!("📁 Loading layout from: {}", layout);
            TrackingConfig::from_file(layout).and_then(|settings| {
                settings.validate()?;
                Ok(settings)
            })
        }
        None => Ok(TrackingConfig::default()),
    };
    let settings = settings.unwrap_or_else(|e| exit_with(&e));

    // 創建存儲和管道
    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = TrackingPipeline::with_settings(storage, config.clone(), settings);
    let engine = EtlEngine::new(pipeline);

    match engine.run() {
        Ok(run) => {
            tracing::info!("✅ Tracking extraction completed successfully!");
            println!("✅ Tracking extraction completed successfully!");
            print_summary(&run.report);
            println!("📁 Output saved to: {}", run.output_path);

            if let Some(code) = &config.fiscal_year {
                record_in_registry(&config, code, &run.report);
            }
        }
        Err(e) => exit_with(&e),
    }

    Ok(())
}
