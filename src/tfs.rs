/*
    netmd-tfs-fs

    Copyright 2026 netmd-tfs-fs contributors

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the "Software"),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    src/tfs.rs

    The TFS binary codec: encodes and decodes the overlay filesystem tree
    embedded at a fixed offset inside UTOC sector 2.

    The format is a flat, tag-prefixed recursive structure rather than a
    fixed-layout struct, so unlike most binrw-derived formats in this
    codebase's disk-image parsers, the tree body is walked by hand (the same
    way `file_parsers::pri` hand-walks a chunk stream after `binrw` decodes
    each chunk's fixed header).
*/
use binrw::{BinRead, BinWrite};
use std::io::Cursor;

use crate::error::{Result, TfsError};
use crate::fs_tree::{DirNode, FileNode, FsNode};

/// Byte offset of the TFS payload within UTOC sector 2 (0x2F + 1 + 255).
pub const OFFSET: usize = 0x130;
/// Maximum encoded payload length; exceeding this is a fatal encode error.
pub const MAX_LEN: usize = 2300;

const DIR_TAG: u8 = 0xF0;
const DIR_END_TAG: u8 = 0xFF;

#[derive(BinRead, BinWrite)]
#[brw(big, magic = b"\x8c\xb3\x96\xe9\x8d\xa2")]
struct Magic;

fn write_namez(out: &mut Vec<u8>, name: &str) -> Result<()> {
    if name.as_bytes().contains(&0) {
        return Err(TfsError::FormatInvalid);
    }
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    Ok(())
}

/// Picks the smallest `typ in {0,1,2,3}` that represents `len`, per
/// spec.md §4.1 (typ+1 is the byte width of the encoded length).
fn length_typ(len: u32) -> u8 {
    if len <= 0xFF {
        0
    }
    else if len <= 0xFFFF {
        1
    }
    else if len <= 0xFF_FFFF {
        2
    }
    else {
        3
    }
}

fn write_length(out: &mut Vec<u8>, len: u32, typ: u8) {
    let width = typ as usize + 1;
    let bytes = len.to_be_bytes();
    out.extend_from_slice(&bytes[4 - width..]);
}

fn write_dir(out: &mut Vec<u8>, dir: &DirNode) -> Result<()> {
    out.push(DIR_TAG);
    write_namez(out, &dir.name)?;
    for child in dir.children.values() {
        match child {
            FsNode::Directory(d) => write_dir(out, d)?,
            FsNode::File(f) => {
                let typ = length_typ(f.byte_len);
                out.push(typ);
                out.push(f.track_id);
                write_length(out, f.byte_len, typ);
                write_namez(out, &f.name)?;
            }
        }
    }
    out.push(DIR_END_TAG);
    Ok(())
}

/// Encodes `root` (which must be a Directory) into the TFS payload bytes.
/// Fails with [`TfsError::FormatOverflow`] if the encoding would exceed
/// [`MAX_LEN`]; the caller MUST NOT write anything to the device in that
/// case (spec.md §4.1).
pub fn encode(root: &FsNode) -> Result<Vec<u8>> {
    let dir = root.as_dir().ok_or(TfsError::FormatInvalid)?;
    let mut out = Vec::new();
    {
        let mut cursor = Cursor::new(&mut out);
        Magic.write(&mut cursor).map_err(|e| TfsError::Io(e.to_string()))?;
    }
    write_dir(&mut out, dir)?;
    if out.len() > MAX_LEN {
        return Err(TfsError::FormatOverflow {
            needed: out.len(),
            max: MAX_LEN,
        });
    }
    Ok(out)
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn byte(&mut self) -> Result<u8> {
        let b = *self.buf.get(self.pos).ok_or(TfsError::FormatInvalid)?;
        self.pos += 1;
        Ok(b)
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(TfsError::FormatInvalid)?;
        let slice = self.buf.get(self.pos..end).ok_or(TfsError::FormatInvalid)?;
        self.pos = end;
        Ok(slice)
    }

    fn namez(&mut self) -> Result<String> {
        let start = self.pos;
        loop {
            let b = self.byte()?;
            if b == 0 {
                break;
            }
        }
        let raw = &self.buf[start..self.pos - 1];
        String::from_utf8(raw.to_vec()).map_err(|_| TfsError::FormatInvalid)
    }

    fn length(&mut self, typ: u8) -> Result<u32> {
        let width = typ as usize + 1;
        let slice = self.bytes(width)?;
        let mut padded = [0u8; 4];
        padded[4 - width..].copy_from_slice(slice);
        Ok(u32::from_be_bytes(padded))
    }
}

fn read_dir(r: &mut Reader) -> Result<DirNode> {
    let name = r.namez()?;
    let mut dir = DirNode {
        name,
        children: Default::default(),
    };
    loop {
        let tag = r.byte()?;
        match tag {
            DIR_END_TAG => break,
            DIR_TAG => {
                let child = read_dir(r)?;
                dir.add(FsNode::Directory(child));
            }
            0..=3 => {
                let track_id = r.byte()?;
                let byte_len = r.length(tag)?;
                let name = r.namez()?;
                dir.add(FsNode::File(FileNode {
                    track_id,
                    name,
                    byte_len,
                }));
            }
            _ => return Err(TfsError::FormatInvalid),
        }
    }
    Ok(dir)
}

/// Decodes a TFS payload. A MAGIC mismatch or any structural error is
/// reported as [`TfsError::FormatInvalid`]; callers treat that as "disc is
/// unformatted" and fall back to an empty root (spec.md §4.1, §6.3).
pub fn decode(bytes: &[u8]) -> Result<FsNode> {
    let mut cursor = Cursor::new(bytes);
    Magic::read(&mut cursor).map_err(|_| TfsError::FormatInvalid)?;
    let consumed = cursor.position() as usize;
    let mut r = Reader::new(&bytes[consumed..]);
    let tag = r.byte()?;
    if tag != DIR_TAG {
        return Err(TfsError::FormatInvalid);
    }
    let dir = read_dir(&mut r)?;
    Ok(FsNode::Directory(dir))
}
