use std::sync::Arc;

use anyhow::Result;
use orientation_host_lib::store::OrientationStore;

pub async fn history(store: Arc<dyn OrientationStore>, limit: usize) -> Result<()> {
    let records = store.latest(limit).await?;
    if records.is_empty() {
        println!("No records yet");
        return Ok(());
    }

    println!("{:>8} {:>8} {:>8} {:>8} {:>15}", "ID", "Roll", "Pitch", "Yaw", "Timestamp");
    for record in records {
        println!(
            "{:>8} {:>8.1} {:>8.1} {:>8.1} {:>15}",
            record.id, record.roll, record.pitch, record.yaw, record.timestamp
        );
    }
    Ok(())
}
