//! Clients command - list debtors

use anyhow::Result;

use super::get_context;
use crate::output;

pub fn run(search: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let clients = ctx.invoice_service.clients(search)?;

    if json {
        return output::print_json(&clients);
    }

    if clients.is_empty() {
        println!("No clients found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Name", "Phone", "Document"]);
    for client in &clients {
        table.add_row(vec![
            output::short_id(&client.id),
            client.name.clone(),
            client.phone.clone().unwrap_or_default(),
            client.document.clone().unwrap_or_default(),
        ]);
    }
    println!("{}", table);
    println!("{} clients", clients.len());
    Ok(())
}
