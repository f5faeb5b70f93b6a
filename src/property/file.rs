//! Memory-mapped property files.
//!
//! Two layouts are supported, both big-endian:
//!
//! * fixed numeric: one signed 64-bit record per node id; [`ABSENT_NUMERIC`]
//!   marks a node without a value;
//! * text: an offsets file with one unsigned 64-bit offset per node id, and a
//!   buffer file holding, at each offset, a 32-bit length followed by that
//!   many UTF-8 bytes.
//!
//! Files are mapped once when opened and stay mapped until [`release`]d, so
//! lookups never copy the file into memory.
//!
//! [`release`]: FixedNumericFile::release

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::{debug, warn};

use crate::error::{GraphError, Result};

/// Slot value meaning "no value for this id" in a fixed numeric file.
pub const ABSENT_NUMERIC: i64 = i64::MIN;

const NUMERIC_WIDTH: usize = 8;
const OFFSET_WIDTH: usize = 8;
const LENGTH_WIDTH: usize = 4;

enum MapState {
    Empty,
    Mapped(Mmap),
    Released,
}

struct MappedFile {
    path: PathBuf,
    state: MapState,
}

impl MappedFile {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|err| GraphError::property_file(path, err))?;
        let len = file
            .metadata()
            .map_err(|err| GraphError::property_file(path, err))?
            .len();
        let state = if len == 0 {
            MapState::Empty
        } else {
            // SAFETY: property files are immutable for the process lifetime.
            let map = unsafe { Mmap::map(&file) }
                .map_err(|err| GraphError::property_file(path, err))?;
            MapState::Mapped(map)
        };
        Ok(Self {
            path: path.to_path_buf(),
            state,
        })
    }

    fn bytes(&self) -> Result<&[u8]> {
        match &self.state {
            MapState::Empty => Ok(&[]),
            MapState::Mapped(map) => Ok(&map[..]),
            MapState::Released => Err(GraphError::Closed),
        }
    }

    fn len(&self) -> usize {
        match &self.state {
            MapState::Mapped(map) => map.len(),
            MapState::Empty | MapState::Released => 0,
        }
    }

    fn release(&mut self) {
        if !matches!(self.state, MapState::Released) {
            debug!(path = %self.path.display(), "property.file.released");
            self.state = MapState::Released;
        }
    }

    fn is_released(&self) -> bool {
        matches!(self.state, MapState::Released)
    }
}

/// Index of the record for `id`. A node id past the last record means the
/// file does not cover the graph, which is a data problem rather than a bad
/// caller id.
fn slot_index(id: u64, slots: u64, path: &Path) -> Result<usize> {
    if id >= slots {
        return Err(GraphError::Corruption(format!(
            "{} holds {slots} records, none for node {id}",
            path.display()
        )));
    }
    usize::try_from(id).map_err(|_| {
        GraphError::Corruption(format!(
            "record {id} of {} is not addressable",
            path.display()
        ))
    })
}

fn read_u64_be(bytes: &[u8], at: usize) -> Option<u64> {
    let end = at.checked_add(8)?;
    let raw: [u8; 8] = bytes.get(at..end)?.try_into().ok()?;
    Some(u64::from_be_bytes(raw))
}

/// Fixed-width numeric property file.
pub struct FixedNumericFile {
    file: MappedFile,
    records: u64,
}

impl FixedNumericFile {
    /// Maps the file at `path`. Trailing bytes short of a record are ignored.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = MappedFile::open(path.as_ref())?;
        let len = file.len();
        if len % NUMERIC_WIDTH != 0 {
            warn!(
                path = %file.path.display(),
                len,
                "property.numeric.trailing_bytes"
            );
        }
        let records = (len / NUMERIC_WIDTH) as u64;
        debug!(path = %file.path.display(), records, "property.numeric.opened");
        Ok(Self { file, records })
    }

    /// Location of the file.
    pub fn path(&self) -> &Path {
        &self.file.path
    }

    /// Number of complete records in the file.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Value stored for `id`, or `None` when the slot holds [`ABSENT_NUMERIC`].
    pub fn get(&self, id: u64) -> Result<Option<i64>> {
        let bytes = self.file.bytes()?;
        let slot = slot_index(id, self.records, &self.file.path)?;
        let raw = read_u64_be(bytes, slot * NUMERIC_WIDTH).ok_or_else(|| {
            GraphError::Corruption(format!("numeric record {id} is truncated"))
        })?;
        let value = raw as i64;
        Ok((value != ABSENT_NUMERIC).then_some(value))
    }

    /// Unmaps the file; later reads fail with [`GraphError::Closed`].
    pub fn release(&mut self) {
        self.file.release();
    }

    /// Whether the mapping has been dropped.
    pub fn is_released(&self) -> bool {
        self.file.is_released()
    }
}

/// Length-prefixed text property stored as an offsets file plus a buffer file.
pub struct TextFile {
    offsets: MappedFile,
    buffer: MappedFile,
    records: u64,
}

impl TextFile {
    /// Maps both files; if either fails, nothing stays mapped.
    pub fn open(buffer_path: impl AsRef<Path>, offsets_path: impl AsRef<Path>) -> Result<Self> {
        let buffer = MappedFile::open(buffer_path.as_ref())?;
        let offsets = MappedFile::open(offsets_path.as_ref())?;
        let records = (offsets.len() / OFFSET_WIDTH) as u64;
        debug!(
            buffer = %buffer.path.display(),
            offsets = %offsets.path.display(),
            records,
            buffer_len = buffer.len(),
            "property.text.opened"
        );
        Ok(Self {
            offsets,
            buffer,
            records,
        })
    }

    /// Number of offsets, one per node id.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Text stored for `id`. A zero-length record is an empty string.
    pub fn get(&self, id: u64) -> Result<String> {
        let offsets = self.offsets.bytes()?;
        let buffer = self.buffer.bytes()?;
        let slot = slot_index(id, self.records, &self.offsets.path)?;
        let offset = read_u64_be(offsets, slot * OFFSET_WIDTH)
            .ok_or_else(|| GraphError::Corruption(format!("text offset {id} is truncated")))?;
        let start = usize::try_from(offset).map_err(|_| {
            GraphError::Corruption(format!("text offset {offset} for id {id} is not addressable"))
        })?;
        let len_end = start
            .checked_add(LENGTH_WIDTH)
            .filter(|&end| end <= buffer.len())
            .ok_or_else(|| {
                GraphError::Corruption(format!(
                    "text length for id {id} at offset {offset} is out of bounds"
                ))
            })?;
        let mut raw_len = [0u8; LENGTH_WIDTH];
        raw_len.copy_from_slice(&buffer[start..len_end]);
        let len = u32::from_be_bytes(raw_len) as usize;
        let end = len_end
            .checked_add(len)
            .filter(|&end| end <= buffer.len())
            .ok_or_else(|| {
                GraphError::Corruption(format!(
                    "text payload for id {id} ({len} bytes) runs past the buffer"
                ))
            })?;
        String::from_utf8(buffer[len_end..end].to_vec()).map_err(|err| {
            GraphError::Corruption(format!("text for id {id} is not valid UTF-8: {err}"))
        })
    }

    /// Unmaps both files; later reads fail with [`GraphError::Closed`].
    pub fn release(&mut self) {
        self.offsets.release();
        self.buffer.release();
    }

    /// Whether both mappings have been dropped.
    pub fn is_released(&self) -> bool {
        self.offsets.is_released() && self.buffer.is_released()
    }
}

/// Writes a fixed numeric property file; returns the number of records.
/// Use [`ABSENT_NUMERIC`] for ids without a value.
pub fn write_fixed_numeric<I>(path: impl AsRef<Path>, values: I) -> Result<u64>
where
    I: IntoIterator<Item = i64>,
{
    let path = path.as_ref();
    let file = File::create(path).map_err(|err| GraphError::property_file(path, err))?;
    let mut writer = BufWriter::new(file);
    let mut records = 0u64;
    for value in values {
        writer.write_all(&value.to_be_bytes())?;
        records += 1;
    }
    writer.flush()?;
    Ok(records)
}

/// Writes a text property as a buffer file and an offsets file; returns the
/// number of records.
pub fn write_text<I, S>(
    buffer_path: impl AsRef<Path>,
    offsets_path: impl AsRef<Path>,
    values: I,
) -> Result<u64>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let buffer_path = buffer_path.as_ref();
    let offsets_path = offsets_path.as_ref();
    let buffer_file =
        File::create(buffer_path).map_err(|err| GraphError::property_file(buffer_path, err))?;
    let offsets_file =
        File::create(offsets_path).map_err(|err| GraphError::property_file(offsets_path, err))?;
    let mut buffer = BufWriter::new(buffer_file);
    let mut offsets = BufWriter::new(offsets_file);
    let mut position = 0u64;
    let mut records = 0u64;
    for value in values {
        let bytes = value.as_ref().as_bytes();
        let len = u32::try_from(bytes.len()).map_err(|_| {
            GraphError::InvalidConfig(format!(
                "text record {records} is {} bytes, above the 32-bit length limit",
                bytes.len()
            ))
        })?;
        offsets.write_all(&position.to_be_bytes())?;
        buffer.write_all(&len.to_be_bytes())?;
        buffer.write_all(bytes)?;
        position += (LENGTH_WIDTH + bytes.len()) as u64;
        records += 1;
    }
    buffer.flush()?;
    offsets.flush()?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn numeric_file_reads_values_and_absence() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("graph.property.timestamp.bin");
        write_fixed_numeric(&path, [42, ABSENT_NUMERIC, -7, 0])?;
        let file = FixedNumericFile::open(&path)?;
        assert_eq!(file.records(), 4);
        assert_eq!(file.get(0)?, Some(42));
        assert_eq!(file.get(1)?, None);
        assert_eq!(file.get(2)?, Some(-7));
        assert_eq!(file.get(3)?, Some(0));
        Ok(())
    }

    #[test]
    fn numeric_file_is_big_endian() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("raw.bin");
        std::fs::write(&path, [0, 0, 0, 0, 0, 0, 1, 2])?;
        let file = FixedNumericFile::open(&path)?;
        assert_eq!(file.get(0)?, Some(0x0102));
        Ok(())
    }

    #[test]
    fn numeric_lookup_past_end_is_corruption() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("short.bin");
        write_fixed_numeric(&path, [1])?;
        let file = FixedNumericFile::open(&path)?;
        match file.get(1) {
            Err(GraphError::Corruption(msg)) => {
                assert!(msg.contains("short.bin"), "{msg}");
                assert!(msg.contains("1 records"), "{msg}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn numeric_trailing_bytes_are_ignored() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("ragged.bin");
        let mut bytes = 5i64.to_be_bytes().to_vec();
        bytes.extend_from_slice(&[0xAB, 0xCD]);
        std::fs::write(&path, bytes)?;
        let file = FixedNumericFile::open(&path)?;
        assert_eq!(file.records(), 1);
        assert_eq!(file.get(0)?, Some(5));
        Ok(())
    }

    #[test]
    fn empty_numeric_file_opens_without_records() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("empty.bin");
        std::fs::write(&path, b"")?;
        let file = FixedNumericFile::open(&path)?;
        assert_eq!(file.records(), 0);
        assert!(matches!(file.get(0), Err(GraphError::Corruption(_))));
        Ok(())
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.bin");
        match FixedNumericFile::open(&path) {
            Err(GraphError::PropertyFile { path: reported, .. }) => assert_eq!(reported, path),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("missing file must not open"),
        }
    }

    #[test]
    fn text_file_reads_records_including_empty() -> Result<()> {
        let dir = tempdir()?;
        let buffer = dir.path().join("message.bin");
        let offsets = dir.path().join("message.offsets");
        write_text(&buffer, &offsets, ["hello", "", "héllo wörld"])?;
        let file = TextFile::open(&buffer, &offsets)?;
        assert_eq!(file.records(), 3);
        assert_eq!(file.get(0)?, "hello");
        assert_eq!(file.get(1)?, "");
        assert_eq!(file.get(2)?, "héllo wörld");
        Ok(())
    }

    #[test]
    fn text_offsets_may_share_records() -> Result<()> {
        let dir = tempdir()?;
        let buffer = dir.path().join("buf.bin");
        let offsets = dir.path().join("off.bin");
        let mut raw = 3u32.to_be_bytes().to_vec();
        raw.extend_from_slice(b"abc");
        std::fs::write(&buffer, raw)?;
        let mut offs = 0u64.to_be_bytes().to_vec();
        offs.extend_from_slice(&0u64.to_be_bytes());
        std::fs::write(&offsets, offs)?;
        let file = TextFile::open(&buffer, &offsets)?;
        assert_eq!(file.get(0)?, "abc");
        assert_eq!(file.get(1)?, "abc");
        Ok(())
    }

    #[test]
    fn text_payload_past_buffer_is_corruption() -> Result<()> {
        let dir = tempdir()?;
        let buffer = dir.path().join("buf.bin");
        let offsets = dir.path().join("off.bin");
        let mut raw = 10u32.to_be_bytes().to_vec();
        raw.extend_from_slice(b"abc");
        std::fs::write(&buffer, raw)?;
        std::fs::write(&offsets, 0u64.to_be_bytes())?;
        let file = TextFile::open(&buffer, &offsets)?;
        assert!(matches!(file.get(0), Err(GraphError::Corruption(_))));
        Ok(())
    }

    #[test]
    fn invalid_utf8_is_corruption() -> Result<()> {
        let dir = tempdir()?;
        let buffer = dir.path().join("buf.bin");
        let offsets = dir.path().join("off.bin");
        let mut raw = 2u32.to_be_bytes().to_vec();
        raw.extend_from_slice(&[0xFF, 0xFE]);
        std::fs::write(&buffer, raw)?;
        std::fs::write(&offsets, 0u64.to_be_bytes())?;
        let file = TextFile::open(&buffer, &offsets)?;
        assert!(matches!(file.get(0), Err(GraphError::Corruption(_))));
        Ok(())
    }

    #[test]
    fn text_open_fails_when_offsets_missing() -> Result<()> {
        let dir = tempdir()?;
        let buffer = dir.path().join("buf.bin");
        write_text(&buffer, dir.path().join("off.bin"), ["x"])?;
        let result = TextFile::open(&buffer, dir.path().join("nope.bin"));
        assert!(matches!(result, Err(GraphError::PropertyFile { .. })));
        Ok(())
    }

    #[test]
    fn released_files_refuse_reads() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("n.bin");
        write_fixed_numeric(&path, [1, 2])?;
        let mut file = FixedNumericFile::open(&path)?;
        file.release();
        file.release();
        assert!(file.is_released());
        assert!(matches!(file.get(0), Err(GraphError::Closed)));
        Ok(())
    }
}
