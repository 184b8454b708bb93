//! Table rendering helpers around comfy-table.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};

/// Create a borderless list table with the given headers.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

/// Render a table with a leading count line.
pub fn render_list(entity_name: &str, table: &Table, total: usize) -> String {
    if total == 0 {
        return format!("No {entity_name} found.");
    }
    let plural = if total == 1 {
        entity_name.to_string()
    } else {
        format!("{entity_name}s")
    };
    format!("{total} {plural}:\n{table}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty_list() {
        let table = list_table(&["name"]);
        assert_eq!(render_list("experiment", &table, 0), "No experiments found.");
    }

    #[test]
    fn test_render_counts_and_pluralizes() {
        let mut table = list_table(&["name"]);
        table.add_row(vec!["egg drop"]);
        let rendered = render_list("experiment", &table, 1);
        assert!(rendered.starts_with("1 experiment:"));
        assert!(rendered.contains("egg drop"));
    }
}
