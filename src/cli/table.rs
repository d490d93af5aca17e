use prettytable::{format, Row, Table};
use serde::Serialize;

pub trait ToRow {
    fn columns() -> Row;
    fn to_row(&self) -> Row;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl From<bool> for OutputFormat {
    /// From the `--json` flag
    fn from(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        }
    }
}

/// Query results, rendered as a titled table or a JSON array
pub struct OutputTable<T> {
    rows: Vec<T>,
}

impl<T> OutputTable<T>
where
    T: ToRow + Serialize,
{
    pub fn new(rows: impl IntoIterator<Item = T>) -> Self {
        Self {
            rows: rows.into_iter().collect(),
        }
    }

    fn table(&self) -> Table {
        let format = format::FormatBuilder::new()
            .padding(1, 1)
            .separator(
                format::LinePosition::Title,
                format::LineSeparator::new('-', '-', '-', '-'),
            )
            .build();
        let mut table = Table::new();
        table.set_format(format);
        table.set_titles(T::columns());
        for row in &self.rows {
            table.add_row(row.to_row());
        }
        table
    }

    pub fn render(&self, output: OutputFormat) -> Result<String, serde_json::Error> {
        match output {
            OutputFormat::Table => Ok(self.table().to_string()),
            OutputFormat::Json => serde_json::to_string_pretty(&self.rows).map(|json| json + "\n"),
        }
    }
}
