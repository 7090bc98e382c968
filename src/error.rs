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

    src/error.rs
*/
use thiserror::Error;

/// The single error type every fallible operation in this crate funnels into.
#[derive(Debug, Error)]
pub enum TfsError {
    #[error("path not found")]
    NotFound,
    #[error("operation not permitted")]
    PermissionDenied,
    #[error("access denied")]
    AccessDenied,
    #[error("directory not empty")]
    NotEmpty,
    #[error("device I/O error: {0}")]
    Io(String),
    #[error("TFS encoding exceeded {max} bytes (needed {needed})")]
    FormatOverflow { needed: usize, max: usize },
    #[error("TFS payload did not begin with the expected magic bytes")]
    FormatInvalid,
    #[error("the file handle table has no entry for this descriptor")]
    InvalidHandle,
    #[error("disc has no free track ID in 0..256")]
    DiscFull,
}

impl TfsError {
    /// Maps this error onto the host VFS error-number taxonomy (spec.md §7).
    /// `InvalidHandle` (an operation on an invalidated fd) maps to `EACCES`,
    /// not `EBADF`, per spec.md §7's taxonomy.
    pub fn to_errno(&self) -> i32 {
        match self {
            TfsError::NotFound => libc::ENOENT,
            TfsError::PermissionDenied => libc::EPERM,
            TfsError::AccessDenied | TfsError::InvalidHandle => libc::EACCES,
            TfsError::NotEmpty => libc::ENOTEMPTY,
            TfsError::Io(_) => libc::EIO,
            TfsError::FormatOverflow { .. } => libc::EIO,
            TfsError::FormatInvalid => libc::EIO,
            TfsError::DiscFull => libc::ENOSPC,
        }
    }
}

impl From<TfsError> for fuse3::Errno {
    fn from(err: TfsError) -> Self {
        fuse3::Errno::from(err.to_errno())
    }
}

pub type Result<T> = std::result::Result<T, TfsError>;
