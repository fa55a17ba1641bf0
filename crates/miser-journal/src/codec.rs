use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use miser_core::MiserError;
use miser_crypto::{take_last_decrypt_failed, Cipher};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

/// Fixed journal file names, per the on-disk format.
pub const ACCOUNTS_FILE: &str = "miser.ar";
pub const TRANSACTIONS_FILE: &str = "miser.tr";
pub const BALANCES_FILE: &str = "miser.br";
pub const TAGS_FILE: &str = "miser.tg";
pub const TAG_BINDINGS_FILE: &str = "miser.tm";

/// Something a journal can replay records into. `add` returns the count of
/// records that changed the visible projection (1 for a new or modified
/// visible record, 0 for a pure deletion of a key that was never visible).
pub trait JournalSink<E> {
    fn add(&self, record: E) -> usize;
}

/// Something a journal can drain pending records from for an `append`.
pub trait JournalSource<E> {
    fn pending_flush(&self) -> Vec<E>;
}

/// Reads `path` line by line, decoding (and decrypting) one record per
/// line and handing it to `sink.add`. Returns the number of lines
/// successfully decoded. A missing file is treated as an empty journal
/// (nothing to load yet), not an error. A malformed or undecryptable line
/// aborts the load immediately; the caller should discard whatever the
/// sink accumulated so far.
pub fn load<E, S>(sink: &S, path: &Path, cipher: &Cipher) -> Result<usize, MiserError>
where
    E: DeserializeOwned,
    S: JournalSink<E>,
{
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "journal file absent, treating as empty");
            return Ok(0);
        }
        Err(e) => return Err(MiserError::Io(e)),
    };
    let reader = BufReader::new(file);
    let mut count = 0usize;
    for line in reader.lines() {
        let line = line.map_err(MiserError::Io)?;
        if line.is_empty() {
            continue;
        }
        let record: E = cipher
            .scoped(|| serde_json::from_str(&line))
            .map_err(|e| {
                if take_last_decrypt_failed() {
                    MiserError::Decryption
                } else {
                    MiserError::Codec(e.to_string())
                }
            })?;
        sink.add(record);
        count += 1;
    }
    debug!(path = %path.display(), count, "loaded journal");
    Ok(count)
}

/// Appends every record in `source.pending_flush()` to `path`, creating
/// the file with mode 0600 if it does not exist. Returns the number of
/// records written before any failure; on failure the caller's pending
/// queue is left untouched so the same records can be retried.
pub fn append<E, S>(source: &S, path: &Path, cipher: &Cipher) -> Result<usize, MiserError>
where
    E: Serialize,
    S: JournalSource<E>,
{
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(MiserError::Io)?;

    let pending = source.pending_flush();
    let mut count = 0usize;
    for record in &pending {
        let line = cipher
            .scoped(|| serde_json::to_string(record))
            .map_err(|e| MiserError::Codec(e.to_string()))?;
        writeln!(file, "{line}").map_err(MiserError::Io)?;
        count += 1;
    }
    debug!(path = %path.display(), count, "appended to journal");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::sync::Mutex;

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
    struct Record {
        id: u32,
        text: miser_crypto::EncryptedString,
    }

    struct VecSink {
        items: Mutex<RefCell<Vec<Record>>>,
    }

    impl JournalSink<Record> for VecSink {
        fn add(&self, record: Record) -> usize {
            self.items.lock().unwrap().borrow_mut().push(record);
            1
        }
    }

    struct VecSource {
        items: Vec<Record>,
    }

    impl JournalSource<Record> for VecSource {
        fn pending_flush(&self) -> Vec<Record> {
            self.items.clone()
        }
    }

    #[test]
    fn append_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("miser.test");
        let cipher = Cipher::new([3u8; 32]);

        let source = VecSource {
            items: vec![
                Record { id: 1, text: "alpha".into() },
                Record { id: 2, text: "beta".into() },
            ],
        };
        let written = append(&source, &path, &cipher).unwrap();
        assert_eq!(written, 2);

        let sink = VecSink { items: Mutex::new(RefCell::new(Vec::new())) };
        let loaded = load(&sink, &path, &cipher).unwrap();
        assert_eq!(loaded, 2);
        let items = sink.items.lock().unwrap();
        assert_eq!(items.borrow()[0].text.as_str(), "alpha");
        assert_eq!(items.borrow()[1].text.as_str(), "beta");
    }

    #[test]
    fn loading_with_the_wrong_key_surfaces_a_decryption_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("miser.test");
        let cipher = Cipher::new([3u8; 32]);
        let source = VecSource { items: vec![Record { id: 1, text: "secret".into() }] };
        append(&source, &path, &cipher).unwrap();

        let sink = VecSink { items: Mutex::new(RefCell::new(Vec::new())) };
        let wrong_cipher = Cipher::new([9u8; 32]);
        let err = load(&sink, &path, &wrong_cipher).unwrap_err();
        assert!(matches!(err, MiserError::Decryption));
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist");
        let cipher = Cipher::new([3u8; 32]);
        let sink = VecSink { items: Mutex::new(RefCell::new(Vec::new())) };
        let loaded = load(&sink, &path, &cipher).unwrap();
        assert_eq!(loaded, 0);
    }
}
