use anyhow::Result;

use super::Page;
use crate::types::{Exchange, Symbol};

pub async fn search(page: &Page, query: &str, exchange: Exchange) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        println!("Enter a symbol to search");
        return Ok(());
    }

    let symbols = page.client().search_symbols(query, exchange).await?;
    println!("\n=== Symbols matching \"{}\" on {} ===", query, exchange.name());
    print_symbols(&symbols);
    Ok(())
}

pub async fn get(page: &Page, instrument_token: u64) -> Result<()> {
    let symbol = page.client().get_symbol(instrument_token).await?;
    println!("\n=== Instrument {} ===", instrument_token);
    println!("{}", symbol);
    if let Some(expiry) = &symbol.expiry {
        println!("Expiry: {}", expiry);
    }
    if let Some(strike) = symbol.strike {
        println!("Strike: {:.2}", strike);
    }
    if let Some(lot_size) = symbol.lot_size {
        println!("Lot size: {}", lot_size);
    }
    Ok(())
}

fn print_symbols(symbols: &[Symbol]) {
    if symbols.is_empty() {
        println!("No symbols found");
        return;
    }

    println!(
        "{:<12} {:<24} {:<12} {:<6} {:<6} {:<12} {:>10} {:>6}",
        "Token", "Symbol", "Name", "Exch", "Type", "Expiry", "Strike", "Lot"
    );
    println!("{}", "-".repeat(94));
    for s in symbols {
        println!(
            "{:<12} {:<24} {:<12} {:<6} {:<6} {:<12} {:>10} {:>6}",
            s.instrument_token,
            s.tradingsymbol,
            s.name,
            s.exchange,
            s.kind(),
            s.expiry.as_deref().unwrap_or("-"),
            s.strike.map(|k| format!("{:.2}", k)).unwrap_or_else(|| "-".to_string()),
            s.lot_size.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string())
        );
    }
    println!("{} result(s)", symbols.len());
}
