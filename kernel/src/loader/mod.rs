//! Executable header validation and image streaming.
//!
//! The supported format is identified by a 4-byte magic signature; a
//! little-endian entry-point address sits at a fixed header offset and
//! must point at or above the image load base. The image itself is
//! streamed from the filesystem collaborator in bounded chunks into the
//! freshly mapped user frame.

use crate::config::{ENTRY_POINT_OFFSET, EXEC_CHUNK_SIZE, EXEC_MAGIC, IMAGE_LOAD_BASE};
use crate::platform::{FileSystem, UserMemory};
use crate::process::{ProcessError, UserAddr};

/// Validate the header chunk and extract the entry point.
pub fn parse_header(header: &[u8]) -> Result<UserAddr, ProcessError> {
    if header.len() < ENTRY_POINT_OFFSET + 4 || header[..4] != EXEC_MAGIC {
        return Err(ProcessError::BadExecutableFormat);
    }
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&header[ENTRY_POINT_OFFSET..ENTRY_POINT_OFFSET + 4]);
    let entry = u32::from_le_bytes(raw);
    if entry < IMAGE_LOAD_BASE {
        return Err(ProcessError::AddressOutOfRange);
    }
    Ok(entry)
}

/// Stream the executable image into the currently mapped user frame.
///
/// `first_chunk` is the header chunk already read for validation; it is
/// written first, then the rest of the file follows in
/// [`EXEC_CHUNK_SIZE`] pieces until end of file. Must be called after the
/// target address space is activated.
pub fn load_image<P: FileSystem + UserMemory>(
    platform: &mut P,
    inode: u32,
    first_chunk: &[u8],
) -> Result<(), ProcessError> {
    platform
        .write_user(IMAGE_LOAD_BASE, first_chunk)
        .map_err(|_| ProcessError::AddressOutOfRange)?;

    let mut pos = first_chunk.len() as u32;
    let mut buf = [0u8; EXEC_CHUNK_SIZE];
    loop {
        let n = platform.read_file(inode, pos, &mut buf);
        if n == 0 {
            break;
        }
        platform
            .write_user(IMAGE_LOAD_BASE + pos, &buf[..n])
            .map_err(|_| ProcessError::AddressOutOfRange)?;
        pos += n as u32;
    }
    Ok(())
}
