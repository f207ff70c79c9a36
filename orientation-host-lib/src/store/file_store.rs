use std::{io::SeekFrom, path::Path};

use async_trait::async_trait;
use crc::{Crc, CRC_8_SMBUS};
use log::{info, warn};
use tokio::{
    fs::{self, File, OpenOptions},
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
    sync::Mutex,
};

use crate::record::{NewOrientationRecord, OrientationRecord};

use super::{OrientationStore, StoreError};

const MAGIC: &[u8; 4] = b"ORL1";
const HEADER_LEN: u64 = MAGIC.len() as u64;
// id u64, roll f32, pitch f32, yaw f32, timestamp u64, crc u8
const PAYLOAD_LEN: usize = 8 + 4 * 3 + 8;
const RECORD_LEN: usize = PAYLOAD_LEN + 1;

const CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// Append-only record log. Records are fixed size so the tail can be read
/// without scanning the whole file.
pub struct FileStore {
    inner: Mutex<FileStoreInner>,
}

struct FileStoreInner {
    file: File,
    count: u64,
    next_id: u64,
}

fn record_offset(index: u64) -> u64 {
    HEADER_LEN + index * RECORD_LEN as u64
}

fn encode(record: &OrientationRecord) -> [u8; RECORD_LEN] {
    let mut buffer = [0u8; RECORD_LEN];
    buffer[0..8].copy_from_slice(&record.id.to_le_bytes());
    buffer[8..12].copy_from_slice(&record.roll.to_le_bytes());
    buffer[12..16].copy_from_slice(&record.pitch.to_le_bytes());
    buffer[16..20].copy_from_slice(&record.yaw.to_le_bytes());
    buffer[20..28].copy_from_slice(&record.timestamp.to_le_bytes());
    buffer[PAYLOAD_LEN] = CRC.checksum(&buffer[..PAYLOAD_LEN]);
    buffer
}

fn decode(buffer: &[u8], offset: u64) -> Result<OrientationRecord, StoreError> {
    if CRC.checksum(&buffer[..PAYLOAD_LEN]) != buffer[PAYLOAD_LEN] {
        return Err(StoreError::Corrupted { offset });
    }
    let u64_at = |i: usize| {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&buffer[i..i + 8]);
        u64::from_le_bytes(bytes)
    };
    let f32_at = |i: usize| {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&buffer[i..i + 4]);
        f32::from_le_bytes(bytes)
    };
    Ok(OrientationRecord {
        id: u64_at(0),
        roll: f32_at(8),
        pitch: f32_at(12),
        yaw: f32_at(16),
        timestamp: u64_at(20),
    })
}

impl FileStore {
    /// Opens the log at `path`, creating it (and its parent directories) if
    /// needed. A partially written trailing record is cut off.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .await?;

        let len = file.metadata().await?.len();
        if len == 0 {
            file.write_all(MAGIC).await?;
            file.flush().await?;
            info!("created record log {:?}", path);
            return Ok(Self::from_parts(file, 0, 1));
        }

        if len < HEADER_LEN {
            return Err(StoreError::BadHeader);
        }
        let mut magic = [0u8; 4];
        file.seek(SeekFrom::Start(0)).await?;
        file.read_exact(&mut magic).await?;
        if &magic != MAGIC {
            return Err(StoreError::BadHeader);
        }

        let count = (len - HEADER_LEN) / RECORD_LEN as u64;
        if record_offset(count) != len {
            warn!(
                "record log {:?} ends with a partial record, dropping {} bytes",
                path,
                len - record_offset(count)
            );
            file.set_len(record_offset(count)).await?;
        }

        let next_id = if count == 0 {
            1
        } else {
            let mut buffer = [0u8; RECORD_LEN];
            let offset = record_offset(count - 1);
            file.seek(SeekFrom::Start(offset)).await?;
            file.read_exact(&mut buffer).await?;
            decode(&buffer, offset)?.id + 1
        };
        info!("opened record log {:?} with {} records", path, count);

        Ok(Self::from_parts(file, count, next_id))
    }

    fn from_parts(file: File, count: u64, next_id: u64) -> Self {
        Self {
            inner: Mutex::new(FileStoreInner {
                file,
                count,
                next_id,
            }),
        }
    }
}

impl FileStoreInner {
    /// Reads `n` records starting at `start`, oldest first.
    async fn read_range(&mut self, start: u64, n: u64) -> Result<Vec<OrientationRecord>, StoreError> {
        let mut buffer = vec![0u8; n as usize * RECORD_LEN];
        self.file.seek(SeekFrom::Start(record_offset(start))).await?;
        self.file.read_exact(&mut buffer).await?;

        buffer
            .chunks_exact(RECORD_LEN)
            .enumerate()
            .map(|(i, chunk)| decode(chunk, record_offset(start + i as u64)))
            .collect()
    }
}

#[async_trait]
impl OrientationStore for FileStore {
    async fn insert(&self, record: NewOrientationRecord) -> Result<OrientationRecord, StoreError> {
        let mut inner = self.inner.lock().await;
        let record = record.with_id(inner.next_id);
        let offset = record_offset(inner.count);
        inner.file.seek(SeekFrom::Start(offset)).await?;
        inner.file.write_all(&encode(&record)).await?;
        inner.file.flush().await?;
        inner.count += 1;
        inner.next_id += 1;
        Ok(record)
    }

    async fn latest(&self, limit: usize) -> Result<Vec<OrientationRecord>, StoreError> {
        let mut inner = self.inner.lock().await;
        let n = inner.count.min(limit as u64);
        let start = inner.count - n;
        let mut records = inner.read_range(start, n).await?;
        records.reverse();
        Ok(records)
    }

    async fn all(&self) -> Result<Vec<OrientationRecord>, StoreError> {
        let mut inner = self.inner.lock().await;
        let count = inner.count;
        let mut records = inner.read_range(0, count).await?;
        records.reverse();
        Ok(records)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.inner.lock().await.count)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.file.set_len(HEADER_LEN).await?;
        inner.count = 0;
        inner.next_id = 1;
        Ok(())
    }
}
