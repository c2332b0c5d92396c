use std::io::Write;

use anyhow::Result;

/// Redraw the single status line in place.
pub fn render<W: Write>(out: &mut W, text: &str) -> Result<()> {
    // Return to column 0 and clear the line before drawing
    write!(out, "\r\x1b[2K{text}")?;
    out.flush()?;
    Ok(())
}
