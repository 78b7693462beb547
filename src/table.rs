use std::fmt::Write as _;

use itertools::Itertools;

/// Renders rows as left-aligned, space-padded columns under a dashed rule.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count().max(3)).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let _ = writeln!(output, "{}", format_row(&header_cells, &widths));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(output, "{}", format_row(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let cleaned = value.replace(['\n', '\r', '\t'], " ");
            let padding = width.saturating_sub(cleaned.chars().count());
            format!("{cleaned}{}", " ".repeat(padding))
        })
        .join("  ");
    line.truncate(line.trim_end().len());
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_table_pads_columns() {
        let rendered = render_table(
            &["name", "required"],
            &[
                vec!["id".to_string(), "yes".to_string()],
                vec!["firstname".to_string(), "no".to_string()],
            ],
        );
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "name       required");
        assert_eq!(lines[1], "---------  --------");
        assert_eq!(lines[2], "id         yes");
        assert_eq!(lines[3], "firstname  no");
    }
}
