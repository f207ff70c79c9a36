use crate::orientation::Orientation;

/// One persisted orientation sample. Immutable once stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationRecord {
    pub id: u64,
    pub roll: f32,  // degrees
    pub pitch: f32, // degrees
    pub yaw: f32,   // degrees
    pub timestamp: u64, // ms since unix epoch
}

impl OrientationRecord {
    pub fn orientation(&self) -> Orientation {
        Orientation {
            roll: self.roll,
            pitch: self.pitch,
            yaw: self.yaw,
        }
    }
}

/// Insert request, the store assigns the id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewOrientationRecord {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub timestamp: u64,
}

impl NewOrientationRecord {
    pub fn new(orientation: Orientation, timestamp: u64) -> Self {
        Self {
            roll: orientation.roll,
            pitch: orientation.pitch,
            yaw: orientation.yaw,
            timestamp,
        }
    }

    pub fn with_id(self, id: u64) -> OrientationRecord {
        OrientationRecord {
            id,
            roll: self.roll,
            pitch: self.pitch,
            yaw: self.yaw,
            timestamp: self.timestamp,
        }
    }
}
