use std::collections::BTreeMap;
use std::io;

use anyhow::{Context, Result};
use geia_text::Batch;

/// A CSV table of maintenance records held in memory.
///
/// Rows are identified by their position, starting at zero after the header.
#[derive(Debug)]
pub struct RecordTable {
    headers: csv::StringRecord,
    rows: Vec<csv::StringRecord>,
}

impl RecordTable {
    /// Reads all records from CSV data with a header row.
    pub fn read<R: io::Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers().context("failed to read header row")?.clone();

        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read records")?;

        Ok(Self { headers, rows })
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns the position of the named column.
    pub fn column(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|header| header.trim() == name)
            .with_context(|| format!("missing column '{name}' in input"))
    }

    /// Returns the values of a column keyed by row number.
    pub fn batch(&self, column: usize) -> Batch<usize> {
        self.rows
            .iter()
            .enumerate()
            .map(|(row, record)| (row, record.get(column).unwrap_or_default().to_owned()))
            .collect()
    }

    /// Replaces the values of a column with the values of the batch.
    ///
    /// Rows missing from the batch keep their value.
    pub fn replace(&mut self, column: usize, batch: &Batch<usize>) {
        for (row, record) in self.rows.iter_mut().enumerate() {
            let Some(value) = batch.get(&row) else {
                continue;
            };

            *record = record
                .iter()
                .enumerate()
                .map(|(index, field)| if index == column { value.as_str() } else { field })
                .collect();
        }
    }

    /// Writes the header and all records as CSV.
    pub fn write<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.headers)?;
        for record in &self.rows {
            writer.write_record(record)?;
        }

        writer.flush().context("failed to write records")?;
        Ok(())
    }
}

/// Returns the facility of every record, for the given facility column.
pub fn facilities(table: &RecordTable, column: usize) -> BTreeMap<usize, String> {
    table
        .batch(column)
        .into_iter()
        .map(|(row, facility)| (row, facility.trim().to_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORDS: &str = "\
ID,FACILITY,NOTE
1,Palas,pmp leak
2,Tapis B,\"valve, stuck\"
";

    #[test]
    fn test_read_columns() {
        let table = RecordTable::read(RECORDS.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.column("NOTE").unwrap(), 2);
        assert!(table.column("CAUSE_NOTE").is_err());

        let batch = table.batch(2);
        assert_eq!(batch[&0], "pmp leak");
        assert_eq!(batch[&1], "valve, stuck");

        let facilities = facilities(&table, 1);
        assert_eq!(facilities[&1], "Tapis B");
    }

    #[test]
    fn test_replace_and_write() {
        let mut table = RecordTable::read(RECORDS.as_bytes()).unwrap();
        table.replace(2, &Batch::from([(1, "valve stuck".to_owned())]));

        let mut output = Vec::new();
        table.write(&mut output).unwrap();

        insta::assert_snapshot!(String::from_utf8(output).unwrap(), @r###"
        ID,FACILITY,NOTE
        1,Palas,pmp leak
        2,Tapis B,valve stuck
        "###);
    }
}
