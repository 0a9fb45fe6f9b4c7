use crate::dataset::Row;

/// Label shown in the detail panel and the field it is read from.
pub const DETAIL_FIELDS: [(&str, &str); 7] = [
    ("Completion date", "Completion date"),
    ("Country of buyer & Region", "Country of Buyer"),
    ("Country of target & Region", "Country of Target"),
    ("Technology", "Technology(s)"),
    ("Lead Product", "Lead product(s)"),
    ("Indications", "Indication(s)"),
    ("Mechanism of Action", "Mechanism of action"),
];

/// Projects the detail-only fields of `row` into labeled lines.
pub fn detail_view(row: &Row) -> Vec<(&'static str, String)> {
    DETAIL_FIELDS
        .iter()
        .map(|(label, field)| (*label, row.display(field)))
        .collect()
}

/// CSV line of all fields in `row`. Used for copying a row to the clipboard.
pub fn row_as_csv(row: &Row) -> String {
    row.values()
        .map(|v| wrap_cell_content(&v.to_string()))
        .collect::<Vec<String>>()
        .join(",")
}

fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping || needs_escaping {
        out = format!("\"{out}\"");
    }
    out
}
