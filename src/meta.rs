//! Metadata string tables.
//!
//! A metadata block is a run of NUL-terminated strings with no count or
//! length prefix, e.g. `dev=/dev/mtdblock/1\0type=firmware\0`.  Order is
//! significant and preserved.

use std::borrow::Cow;

/// Encode `strings` as a metadata block: each string followed by one NUL.
///
/// Alignment padding is not included; the entity builder adds it.
pub fn encode<I, S>(strings: I) -> Vec<u8>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Vec::new();
    for s in strings {
        out.extend_from_slice(s.as_ref().as_bytes());
        out.push(0);
    }
    out
}

/// Lazily decode a metadata block.
///
/// The last byte of the region is always treated as a terminator whatever it
/// holds, so the scan can never run past the block.  Scanning also stops at
/// the first empty string, which is how zero padding after the last entry is
/// ignored.
pub fn decode(block: &[u8]) -> MetaEntries<'_> {
    let scan = match block.len() {
        0 => block,
        n => &block[..n - 1],
    };
    MetaEntries { scan, pos: 0 }
}

/// Iterator over the strings of a metadata block.  A clone continues from the
/// same position; call [`decode`] again to start over.
#[derive(Debug, Clone)]
pub struct MetaEntries<'a> {
    scan: &'a [u8],
    pos:  usize,
}

impl<'a> Iterator for MetaEntries<'a> {
    type Item = Cow<'a, str>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.scan.get(self.pos..)?;
        let len = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        if len == 0 {
            self.pos = self.scan.len() + 1;
            return None;
        }
        self.pos += len + 1;
        Some(String::from_utf8_lossy(&rest[..len]))
    }
}
