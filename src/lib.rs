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

    src/lib.rs
*/

//! netmd-tfs-fs mounts a NetMD MiniDisc's TFS overlay — a small recursive
//! directory tree smuggled inside UTOC sector 2, backing each file on a
//! hidden audio track titled `h_fs_XX` — as an ordinary FUSE directory tree,
//! alongside read-only views of the disc's real audio tracks and a handful
//! of diagnostic virtual files.
//!
//! The crate is organized bottom-up:
//! - [`device`] is the boundary to a real NetMD USB driver (not implemented
//!   here).
//! - [`tfs`] encodes and decodes the on-disc TFS tree format.
//! - [`fs_tree`] is the in-memory tree those bytes deserialize into.
//! - [`stream_buffer`] lets concurrent readers share one in-flight device
//!   transfer.
//! - [`transfer`] serializes every device-touching operation behind one
//!   lock.
//! - [`cache`] is the process-wide view of disc state built on top of
//!   [`transfer`].
//! - [`system_files`] is the fixed `/$system` virtual file table.
//! - [`vfs`] routes filesystem operations across `/$audio`, `/$system`, and
//!   the TFS tree.
//! - [`fuse_binding`] is the thin [`fuse3::path::PathFilesystem`] shim over
//!   [`vfs::Adapter`].

pub mod cache;
pub mod device;
pub mod error;
pub mod fs_tree;
pub mod fuse_binding;
pub mod stream_buffer;
pub mod system_files;
pub mod tfs;
pub mod transfer;
pub mod vfs;
