use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use orientation_host_lib::{store::OrientationStore, CsvExporter};

pub async fn export(store: Arc<dyn OrientationStore>, output: PathBuf) -> Result<()> {
    let records = store.all().await?;
    let exporter = CsvExporter::new(output);
    let rows = exporter.export(&records)?;
    println!("Exported {} records to {:?}", rows, exporter.path());
    Ok(())
}
