//! Clear command - undo a day's imports

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use colored::Colorize;
use dialoguer::Confirm;

use super::{get_context, get_logger, log_outcome};
use crate::output;

pub fn run(date: Option<NaiveDate>, force: bool, json: bool) -> Result<()> {
    let day = date.unwrap_or_else(|| Utc::now().date_naive());

    if !force {
        println!(
            "\n{}",
            format!("This will delete every invoice imported on {}.", day).yellow()
        );
        println!("{}\n", "Payments and dispatches of those invoices are deleted too.".dimmed());

        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    let logger = get_logger();
    let result = get_context().and_then(|ctx| ctx.import_service.clear_day(day));
    log_outcome(&logger, "clear", &result);
    let counts = result?;

    if json {
        return output::print_json(&serde_json::json!({
            "date": day,
            "invoices_deleted": counts.invoices,
            "clients_deleted": counts.clients,
        }));
    }

    output::success(&format!(
        "Deleted {} invoices and {} clients imported on {}",
        counts.invoices, counts.clients, day
    ));
    Ok(())
}
