//! RIFF container primitives: four-byte tags, bounded cursors, chunks.
//!
//! A [`Cursor`] is a `(offset, end)` window over the open file; every read
//! seeks first, so cursors can be copied and handed around freely. Any
//! read past `end`, and any tag that is not what the caller expected,
//! fails the whole load with [`Error::Format`].

use std::io::{Read, Seek, SeekFrom};

use crate::error::Error;

/// A four-byte packed-ASCII RIFF tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag([u8; 4]);

impl Tag {
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Tag(*bytes)
    }
}

impl std::fmt::Debug for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tag({})", String::from_utf8_lossy(&self.0))
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// The tags this crate understands.
pub mod tags {
    use super::Tag;

    pub const RIFF: Tag = Tag::new(b"RIFF");
    pub const LIST: Tag = Tag::new(b"LIST");
    pub const SFBK: Tag = Tag::new(b"sfbk");
    pub const INFO: Tag = Tag::new(b"INFO");
    pub const SDTA: Tag = Tag::new(b"sdta");
    pub const PDTA: Tag = Tag::new(b"pdta");

    pub const PHDR: Tag = Tag::new(b"phdr");
    pub const PBAG: Tag = Tag::new(b"pbag");
    pub const PMOD: Tag = Tag::new(b"pmod");
    pub const PGEN: Tag = Tag::new(b"pgen");
    pub const INST: Tag = Tag::new(b"inst");
    pub const IBAG: Tag = Tag::new(b"ibag");
    pub const IMOD: Tag = Tag::new(b"imod");
    pub const IGEN: Tag = Tag::new(b"igen");
    pub const SHDR: Tag = Tag::new(b"shdr");

    pub const SMPL: Tag = Tag::new(b"smpl");
    pub const SM24: Tag = Tag::new(b"sm24");

    pub const IFIL: Tag = Tag::new(b"ifil");
    pub const ISNG: Tag = Tag::new(b"isng");
    pub const INAM: Tag = Tag::new(b"INAM");
    pub const ICRD: Tag = Tag::new(b"ICRD");
    pub const IENG: Tag = Tag::new(b"IENG");
    pub const IPRD: Tag = Tag::new(b"IPRD");
    pub const ICOP: Tag = Tag::new(b"ICOP");
    pub const ICMT: Tag = Tag::new(b"ICMT");
    pub const ISFT: Tag = Tag::new(b"ISFT");
}

/// A bounded read window over the file.
#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    offset: u64,
    end: u64,
}

impl Cursor {
    pub fn new(offset: u64, end: u64) -> Self {
        Cursor { offset, end }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes left in this window.
    pub fn remaining(&self) -> u64 {
        self.end.saturating_sub(self.offset)
    }

    /// Read exactly `buf.len()` bytes at the current offset, advancing.
    pub fn read_exact<R: Read + Seek>(
        &mut self,
        source: &mut R,
        buf: &mut [u8],
    ) -> Result<(), Error> {
        let len = buf.len() as u64;
        if self.offset + len > self.end {
            return Err(Error::format(format!(
                "short read: {len} bytes wanted, {} available",
                self.remaining()
            )));
        }
        source.seek(SeekFrom::Start(self.offset))?;
        source
            .read_exact(buf)
            .map_err(|e| Error::format(format!("short read: {e}")))?;
        self.offset += len;
        Ok(())
    }

    pub fn read_u8<R: Read + Seek>(&mut self, source: &mut R) -> Result<u8, Error> {
        let mut b = [0u8; 1];
        self.read_exact(source, &mut b)?;
        Ok(b[0])
    }

    pub fn read_i8<R: Read + Seek>(&mut self, source: &mut R) -> Result<i8, Error> {
        Ok(self.read_u8(source)? as i8)
    }

    pub fn read_u16<R: Read + Seek>(&mut self, source: &mut R) -> Result<u16, Error> {
        let mut b = [0u8; 2];
        self.read_exact(source, &mut b)?;
        Ok(u16::from_le_bytes(b))
    }

    pub fn read_i16<R: Read + Seek>(&mut self, source: &mut R) -> Result<i16, Error> {
        Ok(self.read_u16(source)? as i16)
    }

    pub fn read_u32<R: Read + Seek>(&mut self, source: &mut R) -> Result<u32, Error> {
        let mut b = [0u8; 4];
        self.read_exact(source, &mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    pub fn read_tag<R: Read + Seek>(&mut self, source: &mut R) -> Result<Tag, Error> {
        let mut b = [0u8; 4];
        self.read_exact(source, &mut b)?;
        Ok(Tag(b))
    }

    /// Read a chunk header (tag + size) and yield the chunk. The cursor
    /// advances past the chunk data including the RIFF pad-to-even byte.
    pub fn chunk<R: Read + Seek>(&mut self, source: &mut R) -> Result<Chunk, Error> {
        let tag = self.read_tag(source)?;
        let size = self.read_u32(source)?;
        let data_start = self.offset;
        let data_end = data_start + size as u64;
        if data_end > self.end {
            return Err(Error::format(format!(
                "chunk {tag} claims {size} bytes but only {} remain",
                self.remaining()
            )));
        }
        // Chunks are padded to even byte counts.
        self.offset = (data_end + (size & 1) as u64).min(self.end);
        Ok(Chunk {
            tag,
            size,
            data: Cursor::new(data_start, data_end),
        })
    }

    /// Read a LIST chunk header (tag + size + form kind) and yield the
    /// list. The cursor advances past the whole list.
    pub fn chunk_list<R: Read + Seek>(
        &mut self,
        source: &mut R,
    ) -> Result<ChunkList, Error> {
        let chunk = self.chunk(source)?;
        if chunk.size < 4 {
            return Err(Error::format(format!(
                "list chunk {} too small for a form kind",
                chunk.tag
            )));
        }
        let mut data = chunk.data;
        let kind = data.read_tag(source)?;
        Ok(ChunkList {
            tag: chunk.tag,
            kind,
            data,
        })
    }

    /// Fail unless `found` is `expected`.
    pub fn expect_tag(expected: Tag, found: Tag) -> Result<(), Error> {
        if expected == found {
            Ok(())
        } else {
            Err(Error::format(format!(
                "expected tag {expected}, found {found}"
            )))
        }
    }
}

/// A tagged chunk with a bounded data window.
#[derive(Debug, Clone, Copy)]
pub struct Chunk {
    pub tag: Tag,
    pub size: u32,
    pub data: Cursor,
}

/// A LIST chunk: a form kind plus a window over its sub-chunks.
#[derive(Debug, Clone, Copy)]
pub struct ChunkList {
    pub tag: Tag,
    pub kind: Tag,
    /// Window over the sub-chunks, starting just after the form kind.
    pub data: Cursor,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor as IoCursor;

    fn chunk_bytes(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(tag);
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        if payload.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    #[test]
    fn reads_little_endian_scalars() {
        let bytes = [0x01u8, 0x02, 0x03, 0x04, 0xFF];
        let mut source = IoCursor::new(bytes.to_vec());
        let mut cursor = Cursor::new(0, bytes.len() as u64);
        assert_eq!(cursor.read_u16(&mut source).unwrap(), 0x0201);
        assert_eq!(cursor.read_u16(&mut source).unwrap(), 0x0403);
        assert_eq!(cursor.read_i8(&mut source).unwrap(), -1);
    }

    #[test]
    fn short_read_is_format_error() {
        let mut source = IoCursor::new(vec![0u8; 2]);
        let mut cursor = Cursor::new(0, 2);
        let mut buf = [0u8; 4];
        match cursor.read_exact(&mut source, &mut buf) {
            Err(Error::Format(_)) => {}
            other => panic!("expected Format error, got {other:?}"),
        }
    }

    #[test]
    fn chunk_advances_past_odd_payload_pad() {
        let mut bytes = chunk_bytes(b"abcd", &[1, 2, 3]);
        bytes.extend_from_slice(&chunk_bytes(b"efgh", &[9]));
        let len = bytes.len() as u64;
        let mut source = IoCursor::new(bytes);
        let mut cursor = Cursor::new(0, len);

        let first = cursor.chunk(&mut source).unwrap();
        assert_eq!(first.tag, Tag::new(b"abcd"));
        assert_eq!(first.size, 3);

        let second = cursor.chunk(&mut source).unwrap();
        assert_eq!(second.tag, Tag::new(b"efgh"));
        let mut data = second.data;
        assert_eq!(data.read_u8(&mut source).unwrap(), 9);
    }

    #[test]
    fn chunk_size_beyond_window_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"abcd");
        bytes.extend_from_slice(&100u32.to_le_bytes());
        bytes.extend_from_slice(&[0; 4]);
        let len = bytes.len() as u64;
        let mut source = IoCursor::new(bytes);
        let mut cursor = Cursor::new(0, len);
        assert!(matches!(cursor.chunk(&mut source), Err(Error::Format(_))));
    }

    #[test]
    fn list_reads_form_kind() {
        let mut payload = Vec::new();
        payload.extend_from_slice(b"INFO");
        payload.extend_from_slice(&chunk_bytes(b"INAM", b"hi"));
        let bytes = chunk_bytes(b"LIST", &payload);
        let len = bytes.len() as u64;
        let mut source = IoCursor::new(bytes);
        let mut cursor = Cursor::new(0, len);

        let list = cursor.chunk_list(&mut source).unwrap();
        assert_eq!(list.tag, tags::LIST);
        assert_eq!(list.kind, tags::INFO);
        let mut data = list.data;
        let sub = data.chunk(&mut source).unwrap();
        assert_eq!(sub.tag, tags::INAM);
        assert_eq!(sub.size, 2);
    }
}
