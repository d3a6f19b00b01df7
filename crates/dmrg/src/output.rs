use std::fs::File;
use std::io::{self, Write};

/// Two-column CSV with the given header line.
pub fn write_csv(path: &str, header: &str, rows: &[(f64, f64)]) -> io::Result<()> {
    let mut f = File::create(path)?;
    writeln!(f, "{}", header)?;
    for (x, y) in rows {
        writeln!(f, "{},{}", x, y)?;
    }
    Ok(())
}
