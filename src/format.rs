/// Money with two decimals and thousands separators, e.g. `$1,250.00`
pub fn format_money(value: f64, currency_symbol: &str) -> String {
    let rounded = format!("{:.2}", value.abs());
    let (whole, frac) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));
    let grouped = format_grouped_int(whole.parse::<i64>().unwrap_or(0));
    let sign = if value < 0.0 && rounded != "0.00" { "-" } else { "" };
    format!("{sign}{currency_symbol}{grouped}.{frac}")
}

pub fn format_grouped_int(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    let mut grouped: String = out.chars().rev().collect();
    if negative {
        grouped.insert(0, '-');
    }
    grouped
}

/// Append summary rows under a rounded `tabled` table. The columns left of
/// `value_col` are merged into one label cell, the value column is kept, and
/// the columns to its right are closed off.
pub fn add_summary_footer(table: &str, value_col: usize, rows: &[(&str, String)]) -> String {
    let lines: Vec<&str> = table.lines().collect();
    if lines.len() < 4 || value_col == 0 || rows.is_empty() {
        return table.to_string();
    }

    // Parse the top border to discover column widths
    let Some(inner) = lines[0]
        .strip_prefix('╭')
        .and_then(|s| s.strip_suffix('╮'))
    else {
        return table.to_string();
    };

    let widths: Vec<usize> = inner.split('┬').map(|p| p.chars().count()).collect();
    if widths.len() <= value_col {
        return table.to_string();
    }

    let left = &widths[..value_col];
    let value_width = widths[value_col];
    let right = &widths[value_col + 1..];
    let left_width: usize = left.iter().sum::<usize>() + left.len() - 1;

    let dashes = |n: usize| "─".repeat(n);
    let join = |ws: &[usize]| ws.iter().map(|w| dashes(*w)).collect::<Vec<_>>().join("┴");

    // Strip the original bottom border and start building
    let mut out = lines[..lines.len() - 1].join("\n");
    out.push('\n');

    if right.is_empty() {
        out.push_str(&format!("├{}┼{}┤\n", join(left), dashes(value_width)));
    } else {
        out.push_str(&format!(
            "├{}┼{}┼{}╯\n",
            join(left),
            dashes(value_width),
            join(right)
        ));
    }

    for (idx, (label, value)) in rows.iter().enumerate() {
        out.push_str(&format!(
            "│ {:>left$} │ {:>val$} │\n",
            label,
            value,
            left = left_width.saturating_sub(2),
            val = value_width.saturating_sub(2)
        ));
        if idx < rows.len() - 1 {
            out.push_str(&format!("├{}┼{}┤\n", dashes(left_width), dashes(value_width)));
        }
    }

    out.push_str(&format!("╰{}┴{}╯", dashes(left_width), dashes(value_width)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(format_grouped_int(1250), "1,250");
        assert_eq!(format_grouped_int(-1234567), "-1,234,567");
        assert_eq!(format_grouped_int(999), "999");
    }

    #[test]
    fn formats_money_with_cents() {
        assert_eq!(format_money(1250.0, "$"), "$1,250.00");
        assert_eq!(format_money(0.5, "$"), "$0.50");
        assert_eq!(format_money(-42.5, "€"), "-€42.50");
    }
}
