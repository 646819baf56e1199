//! Test data files and the firmware images they reference
//!
//! A test data file is uploaded verbatim. Lines of the form
//!
//! ```text
//! # DownloadFirmware FileOnPC="fw/uut_v2.bin" FirmwareFileNumber=1
//! ```
//!
//! name firmware images that have to be uploaded first, numbered from 1.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;

/// Largest test data file the client will send
pub const MAX_TESTDATA_LEN: usize = 100 * 1024 * 1024;

const DOWNLOAD_FIRMWARE_MARKER: &str = "# DownloadFirmware";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareRef {
    /// Slot number the shell will report, starting at 1
    pub number: usize,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct TestData {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    /// Firmware images in upload order
    pub firmware: Vec<FirmwareRef>,
}

impl TestData {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = read_upload_file(path, "Test data")?;
        if bytes.len() > MAX_TESTDATA_LEN {
            bail!(
                "Test data file too big: {} bytes, at most {MAX_TESTDATA_LEN} allowed",
                bytes.len()
            );
        }
        let firmware = firmware_refs(&String::from_utf8_lossy(&bytes))?;
        Ok(Self {
            path: path.to_path_buf(),
            bytes,
            firmware,
        })
    }
}

/// Read a file that is about to be uploaded; empty files are rejected
pub fn read_upload_file(path: &Path, kind: &str) -> Result<Vec<u8>> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read {kind} file {}", path.display()))?;
    if bytes.is_empty() {
        bail!("{kind} file has zero length: {}", path.display());
    }
    Ok(bytes)
}

/// Collect `# DownloadFirmware` references
///
/// Numbers must run from 1 without gaps. A number given twice keeps its
/// last path.
pub fn firmware_refs(text: &str) -> Result<Vec<FirmwareRef>> {
    let pattern = Regex::new(r#"FileOnPC="(.*)"\s+FirmwareFileNumber=(\d+)"#)
        .context("Invalid firmware reference pattern")?;

    let mut by_number = BTreeMap::new();
    for (i, line) in text.lines().enumerate() {
        if !line.contains(DOWNLOAD_FIRMWARE_MARKER) {
            continue;
        }
        let caps = pattern
            .captures(line.trim())
            .with_context(|| format!("line {}: malformed firmware reference", i + 1))?;
        let number: usize = caps[2]
            .parse()
            .with_context(|| format!("line {}: bad firmware number", i + 1))?;
        if let Some(previous) = by_number.insert(number, PathBuf::from(&caps[1])) {
            log::warn!(
                "Firmware {number} listed twice, {} replaced by {}",
                previous.display(),
                &caps[1]
            );
        }
    }

    let mut refs = Vec::with_capacity(by_number.len());
    for (expected, (number, path)) in (1..).zip(by_number) {
        if number != expected {
            bail!("Firmware numbers must run 1..N without gaps, missing {expected}");
        }
        refs.push(FirmwareRef { number, path });
    }
    Ok(refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_firmware_refs_in_number_order() {
        let text = "\
# DownloadFirmware FileOnPC=\"b.bin\" FirmwareFileNumber=2
T>BEGIN 1
G>MR
T>END 1
  # DownloadFirmware FileOnPC=\"dir with space/a.bin\"   FirmwareFileNumber=1
";
        let refs = firmware_refs(text).unwrap();
        assert_eq!(
            refs,
            vec![
                FirmwareRef {
                    number: 1,
                    path: PathBuf::from("dir with space/a.bin")
                },
                FirmwareRef {
                    number: 2,
                    path: PathBuf::from("b.bin")
                },
            ]
        );
    }

    #[test]
    fn test_firmware_refs_reject_gaps_and_garbage() {
        assert!(firmware_refs("# DownloadFirmware FileOnPC=\"a\" FirmwareFileNumber=2\n").is_err());
        assert!(firmware_refs("# DownloadFirmware somewhere\n").is_err());
        assert!(firmware_refs("G>MR\n").unwrap().is_empty());
    }

    #[test]
    fn test_load_rejects_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = TestData::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("zero length"));
    }

    #[test]
    fn test_load_reads_bytes_and_refs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# DownloadFirmware FileOnPC=\"fw.bin\" FirmwareFileNumber=1").unwrap();
        writeln!(file, "G>MR").unwrap();
        let data = TestData::load(file.path()).unwrap();
        assert_eq!(data.firmware.len(), 1);
        assert!(data.bytes.ends_with(b"G>MR\n"));
    }
}
