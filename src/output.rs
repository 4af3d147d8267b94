use std::io::Write;

use pagwallet::utils::shorten_address;
use pagwallet::{Advisory, PurchaseQuote, TokenHolding, TransactionRecord};

/// Holdings as an aligned table: name, symbol, amount, mint.
pub fn write_holdings<W: Write>(writer: &mut W, holdings: &[TokenHolding]) -> std::io::Result<()> {
    if holdings.is_empty() {
        writeln!(writer, "No tokens found.")?;
        return Ok(());
    }
    let name_width = column_width("NAME", holdings.iter().map(|h| h.name.as_str()));
    let symbol_width = column_width("SYMBOL", holdings.iter().map(|h| h.symbol.as_str()));
    let amounts: Vec<String> = holdings.iter().map(|h| h.amount.to_string()).collect();
    let amount_width = column_width("AMOUNT", amounts.iter().map(String::as_str));

    writeln!(
        writer,
        "{:<name_width$}  {:<symbol_width$}  {:>amount_width$}  MINT",
        "NAME", "SYMBOL", "AMOUNT"
    )?;
    for (holding, amount) in holdings.iter().zip(&amounts) {
        writeln!(
            writer,
            "{:<name_width$}  {:<symbol_width$}  {:>amount_width$}  {}",
            holding.name, holding.symbol, amount, holding.mint
        )?;
    }
    Ok(())
}

fn column_width<'a>(header: &str, values: impl Iterator<Item = &'a str>) -> usize {
    values
        .map(|v| v.chars().count())
        .max()
        .unwrap_or(0)
        .max(header.len())
}

/// One line per transfer, newest first, as listed by the history view.
pub fn write_history<W: Write>(writer: &mut W, records: &[TransactionRecord]) -> std::io::Result<()> {
    if records.is_empty() {
        writeln!(writer, "No transactions found.")?;
        return Ok(());
    }
    for record in records {
        writeln!(
            writer,
            "{}  {} sent {} {} to {}  [{}]",
            record.time_label(),
            short_party(&record.sender, record.sender_is_self),
            record.amount,
            record.token,
            short_party(&record.recipient, record.recipient_is_self),
            shorten_address(&record.signature),
        )?;
    }
    Ok(())
}

fn short_party(address: &str, is_self: bool) -> String {
    if is_self {
        format!("{} (You)", shorten_address(address))
    } else {
        shorten_address(address)
    }
}

pub fn write_advisories<W: Write>(writer: &mut W, advisories: &[Advisory]) -> std::io::Result<()> {
    for advisory in advisories {
        writeln!(writer, "warning: {advisory}")?;
    }
    Ok(())
}

pub fn write_quote<W: Write>(writer: &mut W, quote: &PurchaseQuote) -> std::io::Result<()> {
    writeln!(
        writer,
        "{} SOL at ${} = ${}",
        quote.sol, quote.price_usd, quote.spend_usd
    )
}

/// Explorer link for a devnet signature.
pub fn explorer_url(signature: &str) -> String {
    format!("https://explorer.solana.com/tx/{signature}?cluster=devnet")
}
