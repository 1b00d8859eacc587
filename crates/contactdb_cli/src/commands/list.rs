//! List command implementation.

use super::open_existing;
use contactdb_core::Record;
use std::path::Path;

/// Runs the list command.
///
/// Sorting only affects the printed order; nothing is written.
pub fn run(path: &Path, sorted: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_existing(path)?;
    if sorted {
        engine.sort_by_name_initial();
    }
    let records = engine.list();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => {
            print!("{}", render_table(&records));
        }
    }

    Ok(())
}

fn render_table(records: &[Record]) -> String {
    if records.is_empty() {
        return "No contacts.\n".to_string();
    }

    let name_width = records
        .iter()
        .map(|r| r.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(4);
    let phone_width = records
        .iter()
        .map(|r| r.phone.chars().count())
        .max()
        .unwrap_or(0)
        .max(5);

    let mut out = format!(
        "{:<6} {:<name_width$} {:<phone_width$} Remark\n",
        "Id", "Name", "Phone"
    );
    for r in records {
        out.push_str(&format!(
            "{:<6} {:<name_width$} {:<phone_width$} {}\n",
            r.id.to_string(),
            r.name,
            r.phone,
            r.remark
        ));
    }
    out.push_str(&format!("\n{} contact(s)\n", records.len()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use contactdb_core::RecordId;

    #[test]
    fn empty_list_has_message() {
        assert_eq!(render_table(&[]), "No contacts.\n");
    }

    #[test]
    fn table_aligns_columns() {
        let records = vec![
            Record::new(RecordId::new(1), "Ann", "111", ""),
            Record::new(RecordId::new(2), "Bartholomew", "5551234", "work"),
        ];
        let table = render_table(&records);
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with("Id     Name        "));
        assert_eq!(lines[1], "#1     Ann         111     ");
        assert!(lines[2].ends_with("5551234 work"));
        assert_eq!(lines.last(), Some(&"2 contact(s)"));
    }
}
