use anyhow::Result;
use budget_etl::config::fiscal_years::FiscalYearRegistry;
use budget_etl::EtlError;
use tempfile::TempDir;

#[test]
fn test_registry_round_trip_through_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let registry_path = temp_dir.path().join("fiscal_years.json");
    let budget_path = temp_dir.path().join("FY26_master_budget.xlsx");
    std::fs::write(&budget_path, b"placeholder")?;
    let budget_file = budget_path.to_string_lossy().into_owned();

    // 首次載入：檔案不存在
    let mut registry = FiscalYearRegistry::load(&registry_path)?;
    assert!(registry.list().is_empty());

    registry.add("FY25", &budget_file)?;
    registry.add("fy26", &budget_file)?;
    registry.record_report("FY26", "Feb_2026.xlsx", "February 2026")?;
    registry.save(&registry_path)?;

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&registry_path)?)?;
    assert_eq!(raw["current_fiscal_year"], "FY25");
    assert_eq!(raw["fiscal_years"][0]["year"], "FY26");
    assert_eq!(raw["fiscal_years"][0]["label"], "Fiscal Year 2026");
    assert_eq!(raw["fiscal_years"][0]["latest_report_month"], "February 2026");
    assert_eq!(raw["fiscal_years"][1]["latest_report_file"], serde_json::Value::Null);

    let mut reloaded = FiscalYearRegistry::load(&registry_path)?;
    assert_eq!(reloaded, registry);

    reloaded.set_current("FY26")?;
    reloaded.save(&registry_path)?;
    let current = FiscalYearRegistry::load(&registry_path)?;
    assert_eq!(current.current_fiscal_year, "FY26");
    assert_eq!(current.get("FY26").map(|fy| fy.months_elapsed), Some(1));

    Ok(())
}

#[test]
fn test_registry_written_by_hand_is_accepted() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let registry_path = temp_dir.path().join("fiscal_years.json");
    std::fs::write(
        &registry_path,
        r#"{
  "fiscal_years": [
    {
      "year": "FY26",
      "label": "Fiscal Year 2026",
      "period": "July 1, 2025 - June 30, 2026",
      "master_budget_file": "budgets/fy26.xlsx",
      "latest_report_file": null,
      "latest_report_month": null,
      "status": "active"
    }
  ],
  "current_fiscal_year": "FY26"
}"#,
    )?;

    let registry = FiscalYearRegistry::load(&registry_path)?;
    let entry = registry.get("FY26").expect("FY26 entry");
    assert_eq!(entry.months_elapsed, 0);
    assert_eq!(entry.added, None);
    assert!(registry.is_current(entry));

    Ok(())
}

#[test]
fn test_add_with_missing_budget_file_leaves_registry_untouched() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut registry = FiscalYearRegistry::default();

    let missing = temp_dir.path().join("missing.xlsx");
    let err = registry
        .add("FY26", &missing.to_string_lossy())
        .unwrap_err();

    assert!(matches!(err, EtlError::MissingInput { .. }));
    assert!(registry.current_fiscal_year.is_empty());
    Ok(())
}
