use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::commands;
use crate::group::GroupedExport;
use crate::reconcile::Reconciler;
use crate::record;
use crate::sheet;

pub struct SyncArgs {
    pub file: Option<PathBuf>,
    pub sheet: Option<String>,
    pub mount: Option<String>,
    pub dry_run: bool,
}

pub fn run(config_path: Option<&Path>, args: SyncArgs) -> Result<()> {
    let settings = commands::load_settings(config_path)?;
    let file = args.file.unwrap_or_else(|| settings.file.clone());
    let sheet_name = args.sheet.unwrap_or_else(|| settings.sheet.clone());
    let mount = args.mount.unwrap_or_else(|| settings.mount.clone());

    if args.dry_run {
        let export = build_export(&file, &sheet_name)?;
        print_plan(&export, &mount);
        return Ok(());
    }

    // Connection problems must surface before the spreadsheet is touched.
    let mut store = commands::connect(&settings, &mount)?;

    let export = build_export(&file, &sheet_name)?;
    if export.is_empty() {
        println!("No credentials found in sheet '{}'.", sheet_name);
        return Ok(());
    }

    let report = Reconciler::new(&mut store, &mount)
        .run(&export)
        .context("Sync stopped; paths synced before this one keep their new values")?;

    println!(
        "Synced {} path(s) under {}/: {} added, {} updated, {} unchanged, {} kept from Vault.",
        report.groups, mount, report.added, report.updated, report.unchanged, report.preserved
    );
    Ok(())
}

/// Load, normalize and group the whole sheet. Any malformed row fails the
/// run here, before anything is written.
fn build_export(file: &Path, sheet_name: &str) -> Result<GroupedExport> {
    let rows = sheet::load(file, sheet_name)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    let credentials = record::normalize_all(rows)?;
    let export = GroupedExport::build(credentials);
    info!(
        groups = export.group_count(),
        credentials = export.credential_count(),
        "grouped spreadsheet"
    );
    Ok(export)
}

fn print_plan(export: &GroupedExport, mount: &str) {
    if export.is_empty() {
        println!("No credentials found.");
        return;
    }
    for (key, users) in export.groups() {
        println!("{}/{}  ({} user(s))", mount, key.path(), users.len());
    }
    println!(
        "{} path(s), {} credential(s). Dry run: Vault was not contacted.",
        export.group_count(),
        export.credential_count()
    );
}
