pub fn write_csv<I, R, W>(records: I, writer: W) -> anyhow::Result<()>
where
    I: IntoIterator<Item = R>,
    R: serde::Serialize,
    W: std::io::Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records.into_iter() {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Parse a won amount, accepting `,` and `_` digit separators
pub fn parse_won(s: &str) -> Result<i64, String> {
    let cleaned: String = s.chars().filter(|c| *c != ',' && *c != '_').collect();
    cleaned
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid amount '{s}': {e}"))
}
