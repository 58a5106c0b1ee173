use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::config::SyncMode;
use crate::error::{poisoned, StoreError, StoreResult};
use crate::table::Mutation;

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Where journal frames are written.
///
/// Implemented for [`File`]; tests substitute sinks that fail on demand.
trait Sink: Write {
    /// Cut the sink back to `len` bytes.
    fn truncate(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl Sink for File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

struct JournalWriter<S = File> {
    sink: S,
    /// Current end of the journal file.
    offset: u64,
    /// Set when a failed append could not be rolled back.
    failed: bool,
}

impl<S: Sink> JournalWriter<S> {
    fn new(sink: S, offset: u64) -> Self {
        Self {
            sink,
            offset,
            failed: false,
        }
    }

    /// Write one frame. On failure the sink is cut back to the previous end,
    /// so a frame the caller was told failed never reaches the journal.
    fn append(&mut self, frame: &[u8], sync: bool) -> StoreResult<u64> {
        if self.failed {
            return Err(StoreError::Io(io::Error::other(
                "journal is unusable after a failed rollback; reopen the store",
            )));
        }

        let entry_offset = self.offset;
        if let Err(err) = self.write_frame(frame, sync) {
            if let Err(rollback) = self.sink.truncate(entry_offset) {
                warn!(
                    offset = entry_offset,
                    error = %rollback,
                    "journal rollback failed; refusing further appends"
                );
                self.failed = true;
            }
            return Err(err.into());
        }
        self.offset += frame.len() as u64;
        Ok(entry_offset)
    }

    fn write_frame(&mut self, frame: &[u8], sync: bool) -> io::Result<()> {
        self.sink.write_all(frame)?;
        self.sink.flush()?;
        if sync {
            self.sink.sync()?;
        }
        Ok(())
    }
}

/// What a front-to-back scan of the journal found.
struct Scan {
    mutations: Vec<Mutation>,
    /// Offset just past the last complete entry.
    valid_len: u64,
    file_len: u64,
}

/// Append-only log of accepted mutations.
///
/// On-disk format, repeated:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized Mutation)]
/// ```
///
/// A damaged region with no valid entry after it is a torn write; recovery
/// ends there and the region is cut off when the journal is next opened. A
/// damaged entry that valid entries follow is corruption: the journal is left
/// untouched and opening it fails with [`StoreError::CorruptJournal`].
pub struct Journal {
    path: PathBuf,
    writer: Mutex<JournalWriter>,
    sync_mode: SyncMode,
}

impl Journal {
    /// Open (or create) the journal file at `path`.
    pub fn open(path: &Path, sync_mode: SyncMode) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let scan = scan(path)?;
        if scan.valid_len < scan.file_len {
            warn!(
                path = %path.display(),
                valid_len = scan.valid_len,
                file_len = scan.file_len,
                "discarding torn journal tail"
            );
            file.set_len(scan.valid_len)?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(JournalWriter::new(file, scan.valid_len)),
            sync_mode,
        })
    }

    /// Append one mutation. Returns the byte offset of the entry.
    pub fn append(&self, mutation: &Mutation) -> StoreResult<u64> {
        let frame = encode_frame(mutation)?;

        let mut w = self.writer.lock().map_err(poisoned)?;
        let entry_offset = w.append(&frame, self.sync_mode == SyncMode::EveryWrite)?;

        debug!(offset = entry_offset, len = frame.len(), "journal append");
        Ok(entry_offset)
    }

    /// Read every mutation, in append order.
    pub fn recover(&self) -> StoreResult<Vec<Mutation>> {
        let _guard = self.writer.lock().map_err(poisoned)?;
        let scan = scan(&self.path)?;
        debug!(recovered = scan.mutations.len(), "journal recovery complete");
        Ok(scan.mutations)
    }

    /// Replace the journal contents with `mutations`.
    ///
    /// The new contents are written to a sibling temporary file, synced, and
    /// renamed over the journal, so a crash leaves either the old or the new
    /// journal intact. The append handle is opened on the temporary file
    /// before the rename; if anything fails the old journal stays in use.
    pub fn rewrite(&self, mutations: &[Mutation]) -> StoreResult<()> {
        let mut w = self.writer.lock().map_err(poisoned)?;

        let tmp_path = self.path.with_extension("journal.tmp");
        let staged = stage(&tmp_path, mutations).and_then(|staged| {
            fs::rename(&tmp_path, &self.path)?;
            Ok(staged)
        });
        let (file, written) = match staged {
            Ok(staged) => staged,
            Err(err) => {
                if tmp_path.is_file() {
                    if let Err(e) = fs::remove_file(&tmp_path) {
                        warn!(
                            path = %tmp_path.display(),
                            error = %e,
                            "could not remove staged journal"
                        );
                    }
                }
                return Err(err);
            }
        };
        *w = JournalWriter::new(file, written);

        debug!(entries = mutations.len(), len = written, "journal rewritten");
        Ok(())
    }

    /// Current end offset.
    pub fn offset(&self) -> StoreResult<u64> {
        Ok(self.writer.lock().map_err(poisoned)?.offset)
    }

    /// Path to the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("path", &self.path)
            .field("sync_mode", &self.sync_mode)
            .finish()
    }
}

/// Write `mutations` to `tmp_path`, sync it, and return an append handle on
/// it along with its length.
fn stage(tmp_path: &Path, mutations: &[Mutation]) -> StoreResult<(File, u64)> {
    let mut tmp = BufWriter::new(File::create(tmp_path)?);
    let mut written: u64 = 0;
    for mutation in mutations {
        let frame = encode_frame(mutation)?;
        tmp.write_all(&frame)?;
        written += frame.len() as u64;
    }
    tmp.flush()?;
    tmp.get_ref().sync_all()?;
    drop(tmp);

    let file = OpenOptions::new().read(true).append(true).open(tmp_path)?;
    Ok((file, written))
}

fn encode_frame(mutation: &Mutation) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(mutation).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len()).map_err(|_| {
        StoreError::Serialization(format!("entry too large: {} bytes", payload.len()))
    })?;
    let crc = crc32fast::hash(&payload);

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

enum Frame {
    Valid { mutation: Mutation, len: usize },
    /// Short, zero-length, overlong, or failing its CRC.
    Damaged(&'static str),
    /// Intact CRC but not a `Mutation`.
    Undecodable(String),
}

fn decode_frame(bytes: &[u8]) -> Frame {
    let Some(header) = bytes.get(..HEADER_SIZE) else {
        return Frame::Damaged("truncated header");
    };
    let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

    if length == 0 {
        return Frame::Damaged("zero-length entry");
    }
    let Some(payload) = HEADER_SIZE
        .checked_add(length as usize)
        .and_then(|end| bytes.get(HEADER_SIZE..end))
    else {
        return Frame::Damaged("entry runs past end of journal");
    };
    if crc32fast::hash(payload) != expected_crc {
        return Frame::Damaged("CRC mismatch");
    }

    match bincode::deserialize::<Mutation>(payload) {
        Ok(mutation) => Frame::Valid {
            mutation,
            len: HEADER_SIZE + payload.len(),
        },
        Err(e) => Frame::Undecodable(e.to_string()),
    }
}

/// A bincode `Mutation` starts with its variant index as a little-endian u32.
fn has_variant_tag(bytes: &[u8], pos: usize) -> bool {
    matches!(
        bytes.get(pos + HEADER_SIZE..pos + HEADER_SIZE + 4),
        Some([0 | 1, 0, 0, 0])
    )
}

/// Offset of the first intact entry starting after `from`, if any.
fn next_valid_frame(bytes: &[u8], from: usize) -> Option<usize> {
    (from + 1..bytes.len()).find(|&pos| {
        has_variant_tag(bytes, pos) && matches!(decode_frame(&bytes[pos..]), Frame::Valid { .. })
    })
}

fn scan(path: &Path) -> StoreResult<Scan> {
    let bytes = fs::read(path)?;
    scan_bytes(path, &bytes)
}

fn scan_bytes(path: &Path, bytes: &[u8]) -> StoreResult<Scan> {
    let corrupt = |offset: usize, reason: String| StoreError::CorruptJournal {
        path: path.to_path_buf(),
        offset: offset as u64,
        reason,
    };

    let mut mutations = Vec::new();
    let mut offset = 0usize;
    while offset < bytes.len() {
        match decode_frame(&bytes[offset..]) {
            Frame::Valid { mutation, len } => {
                mutations.push(mutation);
                offset += len;
            }
            Frame::Damaged(reason) => {
                if let Some(next) = next_valid_frame(bytes, offset) {
                    return Err(corrupt(
                        offset,
                        format!("{reason}; an intact entry follows at offset {next}"),
                    ));
                }
                warn!(offset, reason, "torn journal tail; stopping recovery");
                break;
            }
            Frame::Undecodable(reason) => return Err(corrupt(offset, reason)),
        }
    }

    Ok(Scan {
        mutations,
        valid_len: offset as u64,
        file_len: bytes.len() as u64,
    })
}
