use client_core::{Column, OrderTable};

const ID_HEADER: &str = "ID";

/// Renders visible rows as an aligned plain-text table.
pub fn render_table(table: &OrderTable) -> String {
    let mut header = vec![ID_HEADER.to_string()];
    header.extend(Column::ALL.iter().map(|column| column.name().to_string()));

    let body: Vec<Vec<String>> = table
        .visible_rows()
        .map(|row| {
            let mut line = vec![row.order_id().to_string()];
            line.extend(
                Column::ALL
                    .iter()
                    .map(|column| row.cell(*column).unwrap_or_default().to_string()),
            );
            line
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|cell| cell.chars().count()).collect();
    for line in &body {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for line in std::iter::once(&header).chain(body.iter()) {
        let padded: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        out.push_str(padded.join("  ").trim_end());
        out.push('\n');
    }
    if body.is_empty() {
        out.push_str("(no orders)\n");
    }
    out
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
