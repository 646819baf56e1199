//! The pending script buffer
//!
//! A script is either a test data file uploaded verbatim by the PC client or
//! a single operator command wrapped into the minimal scripted format. The
//! buffer is handed to the parser by value; once moved, the shell no longer
//! holds it and cannot release it a second time.

extern crate alloc;

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;

/// Owned bytes of one pending script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBuffer {
    bytes: Vec<u8>,
}

impl ScriptBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            bytes: text.as_bytes().to_vec(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Script text; invalid UTF-8 sequences are replaced
    pub fn as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for ScriptBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}
