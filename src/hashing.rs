//! Streaming SHA-256 content hashes used to verify extracted files.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Read buffer size for hashing.
const CHUNK_SIZE: usize = 64 * 1024;

/// Lower-case hex SHA-256 digest of a file's content.
pub type ContentHash = String;

/// Hashes everything `reader` yields.
pub fn hash_reader<R: Read>(reader: &mut R) -> io::Result<ContentHash> {
    copy_and_hash(reader, &mut io::sink())
}

/// Hashes the file at `path`.
pub fn hash_file(path: &Path) -> io::Result<ContentHash> {
    let mut file = File::open(path)?;
    hash_reader(&mut file)
}

/// Copies `reader` into `writer` and returns the hash of the bytes copied.
///
/// The hash describes the source stream, not what reached the writer, so a
/// later [`hash_file`] on the destination is an independent check.
pub fn copy_and_hash<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> io::Result<ContentHash> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
        writer.write_all(&buffer[..bytes_read])?;
    }
    writer.flush()?;
    Ok(hex::encode(hasher.finalize()))
}
