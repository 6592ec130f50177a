//! CSV export of an aligned table, for inspecting exactly what was charted.
//!
//! One row per date; absent cells are written as empty fields.

use std::path::Path;

use crate::data::{AlignedTable, Column};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv encoding failed")]
    Csv(#[from] csv::Error),

    #[error("write {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Serialize `table` as CSV with a leading `date` column.
pub fn table_to_csv(table: &AlignedTable) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["date".to_string()];
    header.extend(table.columns().map(|(name, _)| name.to_string()));
    wtr.write_record(&header)?;

    for (row, date) in table.dates().iter().enumerate() {
        let mut record = vec![date.format("%Y-%m-%d").to_string()];
        for (_, column) in table.columns() {
            record.push(cell(column, row));
        }
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().map_err(|e| ExportError::Io {
        path: "<buffer>".into(),
        source: e.into_error(),
    })?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

/// Write `table` as CSV to `path`.
pub fn write_table_csv(table: &AlignedTable, path: &Path) -> Result<(), ExportError> {
    let content = table_to_csv(table)?;
    std::fs::write(path, content).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn cell(column: &Column, row: usize) -> String {
    match column {
        Column::Values(v) => v[row].map(|x| x.to_string()).unwrap_or_default(),
        Column::Labels(v) => v[row].as_ref().map(|l| l.to_string()).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Aligner, JoinPolicy};
    use crate::trade::TradeLabel;

    #[test]
    fn writes_header_and_gaps() {
        let table = Aligner::new(JoinPolicy::Outer)
            .labels(
                "trades",
                [
                    ("2020-01-02", TradeLabel::Out),
                    ("2020-01-03", TradeLabel::Action("Long".into())),
                ],
            )
            .unwrap()
            .values("price", [("2020-01-03", 50.5)])
            .unwrap()
            .build()
            .unwrap();

        let csv = table_to_csv(&table).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,trades,price");
        assert_eq!(lines[1], "2020-01-02,Out,");
        assert_eq!(lines[2], "2020-01-03,Long,50.5");
    }

    #[test]
    fn writes_file() {
        let table = Aligner::new(JoinPolicy::Outer)
            .values("price", [("2020-01-02", 1.0)])
            .unwrap()
            .build()
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        write_table_csv(&table, &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("date,price"));
    }
}
