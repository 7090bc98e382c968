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

    src/system_files.rs

    The fixed table of `/$system` virtual files (spec.md §6.4). This module
    only knows the table shape; rendering each file's payload needs the
    Cache and the open-file table, so that logic lives in `vfs`.
*/

pub const INFO_TEXT: &str = "netmd-tfs-fs: TFS overlay filesystem for NetMD MiniDisc\n";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SystemFile {
    Info,
    Handles,
    TfsBin,
    ForceImmediateFlush,
}

impl SystemFile {
    pub fn name(&self) -> &'static str {
        match self {
            SystemFile::Info => "info",
            SystemFile::Handles => "handles",
            SystemFile::TfsBin => "tfs.bin",
            SystemFile::ForceImmediateFlush => "force_immediate_flush",
        }
    }

    pub fn readable(&self) -> bool {
        matches!(self, SystemFile::Info | SystemFile::Handles | SystemFile::TfsBin)
    }

    pub fn writable(&self) -> bool {
        matches!(self, SystemFile::TfsBin | SystemFile::ForceImmediateFlush)
    }

    pub fn all() -> &'static [SystemFile] {
        &[
            SystemFile::Info,
            SystemFile::Handles,
            SystemFile::TfsBin,
            SystemFile::ForceImmediateFlush,
        ]
    }

    pub fn lookup(name: &str) -> Option<SystemFile> {
        Self::all().iter().copied().find(|f| f.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_matches_table() {
        assert_eq!(SystemFile::lookup("tfs.bin"), Some(SystemFile::TfsBin));
        assert_eq!(SystemFile::lookup("nope"), None);
    }

    #[test]
    fn access_bits_match_spec() {
        assert!(SystemFile::Info.readable() && !SystemFile::Info.writable());
        assert!(SystemFile::Handles.readable() && !SystemFile::Handles.writable());
        assert!(SystemFile::TfsBin.readable() && SystemFile::TfsBin.writable());
        assert!(!SystemFile::ForceImmediateFlush.readable() && SystemFile::ForceImmediateFlush.writable());
    }
}
