//! Import command - load a carteira spreadsheet

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use cobranca_core::services::{format_brl, format_date_br, ImportPreview, ImportResult};

use super::{get_context, get_logger, log_outcome};
use crate::output;

const PREVIEW_ROWS: usize = 20;

pub fn run(file: &Path, preview: bool, json: bool) -> Result<()> {
    let logger = get_logger();
    let result = run_import(file, preview, json);
    if !preview {
        log_outcome(&logger, "import", &result);
    }
    result
}

fn run_import(file: &Path, preview: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;

    if preview {
        let parsed = ctx.import_service.preview(file)?;
        let result = ctx.import_service.import(file, true)?;
        if json {
            return output::print_json(&serde_json::json!({
                "summary": parsed.summary,
                "result": result,
                "carteira": parsed.carteira,
            }));
        }
        print_preview(&parsed);
        println!();
        print_result(&result);
        return Ok(());
    }

    let result = ctx.import_service.import(file, false)?;
    if json {
        return output::print_json(&result);
    }
    print_result(&result);
    Ok(())
}

fn print_preview(preview: &ImportPreview) {
    let summary = &preview.summary;
    println!("{}", "Preview".bold());
    println!(
        "  {} rows, {} clients, {} invoices",
        summary.rows, summary.clients, summary.invoices
    );
    println!("  Total: {}", format_brl(summary.total));
    println!("  Overdue: {}", format_brl(summary.overdue_total).red());
    println!();

    let names: std::collections::HashMap<_, _> = preview
        .carteira
        .clients
        .iter()
        .map(|c| (c.id, c.name.as_str()))
        .collect();

    let mut table = output::create_table();
    table.set_header(vec!["Client", "NF", "Título", "Due", "Total", "Days", "Status"]);
    for inv in preview.carteira.invoices.iter().take(PREVIEW_ROWS) {
        table.add_row(vec![
            names.get(&inv.client_id).copied().unwrap_or("").to_string(),
            inv.invoice_number.clone(),
            inv.note_number.clone().unwrap_or_default(),
            inv.due_date.map(format_date_br).unwrap_or_default(),
            format_brl(inv.total_amount),
            inv.overdue_days.to_string(),
            output::invoice_status(inv.status).to_string(),
        ]);
    }
    println!("{}", table);

    let hidden = preview.carteira.invoices.len().saturating_sub(PREVIEW_ROWS);
    if hidden > 0 {
        println!("{}", format!("... and {} more", hidden).dimmed());
    }
}

fn print_result(result: &ImportResult) {
    if result.preview {
        output::info("Nothing was written (preview).");
    } else {
        output::success(&format!("Imported batch {}", result.batch_id));
    }
    println!("  Rows read:          {}", result.rows);
    println!("  Clients created:    {}", result.clients_created);
    println!("  Clients reused:     {}", result.clients_reused);
    println!("  Invoices created:   {}", result.invoices_created);
    if result.invoices_duplicate > 0 {
        output::warning(&format!(
            "  Duplicates skipped: {}",
            result.invoices_duplicate
        ));
    }
}
