use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Result;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use log::info;

use crate::record::OrientationRecord;

pub const CSV_HEADER: [&str; 5] = ["ID", "Roll", "Pitch", "Yaw", "Timestamp"];

/// Writes orientation history to a CSV file, replacing whatever was there.
pub struct CsvExporter {
    path: PathBuf,
}

impl CsvExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of rows written
    pub fn export(&self, records: &[OrientationRecord]) -> Result<usize> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::File::create(&self.path)?;
        let rows = Self::write_to(file, records)?;
        info!("exported {} records to {:?}", rows, self.path);
        Ok(rows)
    }

    pub fn write_to(writer: impl Write, records: &[OrientationRecord]) -> Result<usize> {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(writer);
        writer.write_record(CSV_HEADER)?;
        for record in records {
            writer.write_record(row(record))?;
        }
        writer.flush()?;
        Ok(records.len())
    }
}

fn row(record: &OrientationRecord) -> [String; 5] {
    [
        format!("{}", record.id),
        // debug formatting keeps the ".0" on whole numbers
        format!("{:?}", record.roll),
        format!("{:?}", record.pitch),
        format!("{:?}", record.yaw),
        format!("{}", record.timestamp),
    ]
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::Rng;

    fn record(id: u64, roll: f32, pitch: f32, yaw: f32, timestamp: u64) -> OrientationRecord {
        OrientationRecord {
            id,
            roll,
            pitch,
            yaw,
            timestamp,
        }
    }

    #[test]
    fn single_record_matches_expected_bytes() {
        let mut buffer = Vec::new();
        CsvExporter::write_to(&mut buffer, &[record(1, 1.0, 2.0, 3.0, 1000)]).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "ID,Roll,Pitch,Yaw,Timestamp\n1,1.0,2.0,3.0,1000\n"
        );
    }

    #[test]
    fn empty_history_is_header_only() {
        let mut buffer = Vec::new();
        assert_eq!(CsvExporter::write_to(&mut buffer, &[]).unwrap(), 0);
        assert_eq!(buffer, b"ID,Roll,Pitch,Yaw,Timestamp\n");
    }

    #[test]
    fn fractional_and_negative_angles() {
        let mut buffer = Vec::new();
        CsvExporter::write_to(&mut buffer, &[record(7, -12.5, 0.25, -179.75, 1_700_000_000_123)]).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "ID,Roll,Pitch,Yaw,Timestamp\n7,-12.5,0.25,-179.75,1700000000123\n"
        );
    }

    #[test]
    fn repeated_export_is_byte_identical() {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "orientation-csv-test-{}/orientation_data.csv",
            rand::thread_rng().gen::<u64>()
        ));
        let exporter = CsvExporter::new(&path);
        let records = vec![record(2, 4.0, 5.5, 6.0, 2000), record(1, 1.0, 2.0, 3.0, 1000)];

        assert_eq!(exporter.export(&records).unwrap(), 2);
        let first = fs::read(&path).unwrap();
        exporter.export(&records).unwrap();
        let second = fs::read(&path).unwrap();
        assert_eq!(first, second);

        // a shorter export fully replaces the longer one
        exporter.export(&records[1..]).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "ID,Roll,Pitch,Yaw,Timestamp\n1,1.0,2.0,3.0,1000\n"
        );

        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let mut path = std::env::temp_dir();
        path.push(format!("orientation-csv-test-{}", rand::thread_rng().gen::<u64>()));
        fs::create_dir_all(&path).unwrap();
        // the target is a directory
        assert!(CsvExporter::new(&path).export(&[]).is_err());
        fs::remove_dir_all(&path).unwrap();
    }
}
