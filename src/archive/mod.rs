// backuptool/src/archive/mod.rs
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::errors::Result;

const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Compresses a file into a sibling `<name>.gz` using streaming gzip.
///
/// The source is piped through the encoder chunk by chunk, so memory use
/// stays constant regardless of dump size. The source file is left in
/// place; the caller decides when to discard it.
pub fn compress_file(source: &Path, level: u32) -> Result<PathBuf> {
    let dest = gz_path(source);
    let input = File::open(source)?;
    let output = File::create(&dest)?;

    let mut reader = BufReader::new(input);
    let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::new(level));
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?.flush()?;

    Ok(dest)
}

/// Decompresses a `.gz` file next to itself, stripping the `.gz` suffix.
pub fn decompress_file(source: &Path) -> Result<PathBuf> {
    let dest = stripped_gz_path(source)?;
    let input = File::open(source)?;
    let output = File::create(&dest)?;

    let mut decoder = GzDecoder::new(BufReader::new(input));
    let mut writer = BufWriter::new(output);
    io::copy(&mut decoder, &mut writer)?;
    writer.flush()?;

    Ok(dest)
}

/// Computes the lowercase hex SHA-256 digest of a file's exact bytes.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_BUFFER_SIZE];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn gz_path(source: &Path) -> PathBuf {
    let mut name = source.as_os_str().to_os_string();
    name.push(".gz");
    PathBuf::from(name)
}

fn stripped_gz_path(source: &Path) -> Result<PathBuf> {
    let name = source.to_string_lossy();
    match name.strip_suffix(".gz") {
        Some(stripped) => Ok(PathBuf::from(stripped)),
        None => Err(anyhow::anyhow!(
            "Cannot decompress {}: file does not have a .gz suffix",
            source.display()
        )
        .into()),
    }
}
