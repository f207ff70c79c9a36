use std::fmt::Write;

use anyhow::Result;

use crate::{
    csv_export::CsvExporter, orientation::Orientation, query::QueryService,
    record::OrientationRecord,
};

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Terminal view of the live readouts and the optional history chart.
#[derive(Default)]
pub struct Dashboard {
    // newest first, as delivered by the latest feed
    latest: Vec<OrientationRecord>,
    chart_visible: bool,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_latest(&mut self, records: Vec<OrientationRecord>) {
        self.latest = records;
    }

    pub fn readout(&self) -> Option<Orientation> {
        self.latest.first().map(OrientationRecord::orientation)
    }

    pub fn chart_visible(&self) -> bool {
        self.chart_visible
    }

    /// Returns the new visibility
    pub fn toggle_chart(&mut self) -> bool {
        self.chart_visible = !self.chart_visible;
        self.chart_visible
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        match self.readout() {
            Some(o) => {
                let _ = writeln!(out, "Roll:  {:>7.1}°", o.roll);
                let _ = writeln!(out, "Pitch: {:>7.1}°", o.pitch);
                let _ = writeln!(out, "Yaw:   {:>7.1}°", o.yaw);
            }
            None => {
                let _ = writeln!(out, "Roll:        --");
                let _ = writeln!(out, "Pitch:       --");
                let _ = writeln!(out, "Yaw:         --");
            }
        }

        if self.chart_visible {
            let _ = writeln!(out, "roll  {}", self.sparkline(|r| r.roll));
            let _ = writeln!(out, "pitch {}", self.sparkline(|r| r.pitch));
            let _ = writeln!(out, "yaw   {}", self.sparkline(|r| r.yaw));
        }
        out
    }

    /// Oldest to newest, [-180, 180] mapped onto the block levels.
    fn sparkline(&self, angle: impl Fn(&OrientationRecord) -> f32) -> String {
        self.latest
            .iter()
            .rev()
            .map(|record| {
                let normalized = ((angle(record) + 180.0) / 360.0).clamp(0.0, 1.0);
                let level = (normalized * (SPARK_LEVELS.len() - 1) as f32).round() as usize;
                SPARK_LEVELS[level]
            })
            .collect()
    }

    /// Loads the full history and writes it out as CSV.
    pub async fn export_history(&self, query: &QueryService, exporter: &CsvExporter) -> Result<usize> {
        let records = query.all().await?;
        exporter.export(&records)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        record::NewOrientationRecord,
        store::{MemoryStore, OrientationStore},
    };
    use rand::Rng;
    use std::sync::Arc;
    use tokio::sync::watch;

    fn record(id: u64, roll: f32, pitch: f32, yaw: f32) -> OrientationRecord {
        OrientationRecord {
            id,
            roll,
            pitch,
            yaw,
            timestamp: id * 1000,
        }
    }

    #[test]
    fn empty_dashboard_shows_placeholders() {
        let dashboard = Dashboard::new();
        assert!(dashboard.readout().is_none());
        assert!(dashboard.render().contains("--"));
    }

    #[test]
    fn readout_is_newest_record() {
        let mut dashboard = Dashboard::new();
        dashboard.apply_latest(vec![record(2, 10.04, -5.0, 179.96), record(1, 0.0, 0.0, 0.0)]);
        assert_eq!(dashboard.readout().unwrap().roll, 10.04);
        assert_eq!(
            dashboard.render(),
            "Roll:     10.0°\nPitch:    -5.0°\nYaw:     180.0°\n"
        );
    }

    #[test]
    fn chart_toggles_and_renders_oldest_first() {
        let mut dashboard = Dashboard::new();
        dashboard.apply_latest(vec![
            record(3, 180.0, 0.0, 0.0),
            record(2, 0.0, 0.0, 0.0),
            record(1, -180.0, 0.0, 0.0),
        ]);
        assert!(!dashboard.chart_visible());
        assert!(dashboard.toggle_chart());
        let rendered = dashboard.render();
        assert!(rendered.contains("roll  ▁▅█"), "{}", rendered);

        assert!(!dashboard.toggle_chart());
        assert!(!dashboard.render().contains("roll  "));
    }

    #[tokio::test]
    async fn export_history_writes_every_record() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..150 {
            store
                .insert(NewOrientationRecord {
                    roll: 1.0,
                    pitch: 2.0,
                    yaw: 3.0,
                    timestamp: i,
                })
                .await
                .unwrap();
        }
        let (_tx, rx) = watch::channel(150);
        let query = QueryService::new(store, rx);

        let mut path = std::env::temp_dir();
        path.push(format!(
            "orientation-dashboard-test-{}/export.csv",
            rand::thread_rng().gen::<u64>()
        ));
        let exporter = CsvExporter::new(&path);
        let rows = Dashboard::new().export_history(&query, &exporter).await.unwrap();
        assert_eq!(rows, 150);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 151);
        assert_eq!(text.lines().nth(1).unwrap(), "150,1.0,2.0,3.0,149");

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }
}
