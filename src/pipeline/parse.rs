//! Table parser: locate GFM pipe-table blocks in the model response.
//!
//! A table block is a header row immediately followed by a separator row
//! (dashes, optional alignment colons), then zero or more data rows. Rows
//! are split on `|`, cells trimmed, and ragged data rows padded or
//! truncated to the header width so every [`Table`] leaves here
//! rectangular.
//!
//! Finding no table is not an error: the caller treats an empty result as
//! the per-document "no table" skip.

use crate::consolidate::Table;

/// Parse every markdown table block out of a model response, in order.
pub fn parse_tables(markdown: &str) -> Vec<Table> {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut tables = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if is_table_row(lines[i])
            && lines.get(i + 1).copied().is_some_and(is_separator_row)
        {
            let header = split_row(lines[i]);
            let width = header.len();
            let mut rows = Vec::new();
            i += 2;

            while i < lines.len() && is_table_row(lines[i]) {
                // Models sometimes repeat the separator mid-table; drop it
                // rather than ending the block.
                if !is_separator_row(lines[i]) {
                    let mut row = split_row(lines[i]);
                    row.resize(width, String::new());
                    rows.push(row);
                }
                i += 1;
            }

            tables.push(Table { header, rows });
        } else {
            i += 1;
        }
    }

    tables
}

/// True when the line could be a table row: at least one cell delimiter.
fn is_table_row(line: &str) -> bool {
    line.trim().contains('|')
}

/// True for a GFM separator row: every cell is dashes with optional
/// alignment colons.
fn is_separator_row(line: &str) -> bool {
    let cells = split_row(line);
    !cells.is_empty()
        && cells.iter().all(|cell| {
            let body = cell.trim_start_matches(':').trim_end_matches(':');
            !body.is_empty() && body.chars().all(|c| c == '-')
        })
}

/// Split a pipe row into trimmed cells, tolerating missing outer pipes.
fn split_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('|').unwrap_or(trimmed);
    trimmed.split('|').map(|cell| cell.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::INVOICE_COLUMNS;

    #[test]
    fn parses_well_formed_invoice_table() {
        let header = INVOICE_COLUMNS.join(" | ");
        let separator = vec!["---"; INVOICE_COLUMNS.len()].join(" | ");
        let row = vec!["x"; INVOICE_COLUMNS.len()].join(" | ");
        let md = format!("| {header} |\n| {separator} |\n| {row} |\n");

        let tables = parse_tables(&md);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].header, INVOICE_COLUMNS.to_vec());
        assert_eq!(tables[0].rows.len(), 1);
        assert_eq!(tables[0].rows[0].len(), INVOICE_COLUMNS.len());
    }

    #[test]
    fn response_without_table_yields_nothing() {
        let md = "I could not find any invoice data in the provided text.\nSorry!";
        assert!(parse_tables(md).is_empty());
    }

    #[test]
    fn pipe_lines_without_separator_are_not_tables() {
        let md = "| looks | like | a row |\nbut no separator follows\n";
        assert!(parse_tables(md).is_empty());
    }

    #[test]
    fn surrounding_prose_is_ignored() {
        let md = "Here is the table you asked for:\n\n\
                  | A | B |\n| --- | --- |\n| 1 | 2 |\n\n\
                  Let me know if you need anything else.";
        let tables = parse_tables(md);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows, vec![vec!["1".to_string(), "2".to_string()]]);
    }

    #[test]
    fn ragged_rows_are_padded_to_header_width() {
        let md = "| A | B | C |\n| --- | --- | --- |\n| 1 | 2 |\n| 1 | 2 | 3 | 4 |\n";
        let tables = parse_tables(md);
        assert_eq!(tables[0].rows[0], vec!["1", "2", ""]);
        assert_eq!(tables[0].rows[1], vec!["1", "2", "3"]);
    }

    #[test]
    fn alignment_colons_count_as_separator() {
        let md = "| A | B |\n| :--- | ---: |\n| 1 | 2 |\n";
        let tables = parse_tables(md);
        assert_eq!(tables.len(), 1);
    }

    #[test]
    fn mid_table_separator_rows_are_dropped() {
        let md = "| A | B |\n| --- | --- |\n| 1 | 2 |\n| --- | --- |\n| 3 | 4 |\n";
        let tables = parse_tables(md);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 2);
    }

    #[test]
    fn multiple_tables_parse_independently() {
        let md = "| A |\n| --- |\n| 1 |\n\n| B | C |\n| --- | --- |\n| 2 | 3 |\n";
        let tables = parse_tables(md);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].header, vec!["A"]);
        assert_eq!(tables[1].header, vec!["B", "C"]);
    }

    #[test]
    fn rows_without_outer_pipes_still_split() {
        let md = "A | B\n--- | ---\n1 | 2\n";
        let tables = parse_tables(md);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows[0], vec!["1", "2"]);
    }
}
