use charsmith_core::store::to_pretty_json;
use serde::Serialize;

/// Print `value` with the same 4-space layout used for character files.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", to_pretty_json(value)?);
    Ok(())
}

/// Print left-aligned columns separated by two spaces, with a dashed rule
/// under the header.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    for line in render_table(headers, rows) {
        println!("{line}");
    }
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_row(headers.iter().copied(), &widths));
    lines.push(rule.join("  "));
    lines.extend(rows.iter().map(|row| render_row(row.iter().map(String::as_str), &widths)));
    lines
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .enumerate()
        .map(|(i, cell)| {
            let width = widths.get(i).copied().unwrap_or(0);
            format!("{cell:<width$}")
        })
        .collect();
    padded.join("  ").trim_end().to_string()
}
