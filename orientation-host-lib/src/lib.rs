pub mod clock;
pub mod config;
pub mod csv_export;
pub mod dashboard;
pub mod orientation;
pub mod persister;
pub mod query;
pub mod record;
pub mod sensor;
pub mod session;
pub mod shutdown;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppPaths, SessionConfig, StoreErrorPolicy};
pub use csv_export::CsvExporter;
pub use dashboard::Dashboard;
pub use orientation::{Axis, Orientation, OrientationEstimator};
pub use persister::Persister;
pub use query::QueryService;
pub use record::{NewOrientationRecord, OrientationRecord};
pub use sensor::{SamplingRate, SensorEvent, SensorKind, SensorReader, SensorSample, SensorSource};
pub use session::OrientationSession;
pub use store::{FileStore, MemoryStore, OrientationStore, StoreError};
