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

    src/fuse_binding.rs

    The thin `fuse3::path::PathFilesystem` shim over `vfs::Adapter`. All of
    the actual routing and bookkeeping lives in `vfs`; everything here does
    is translate `OsStr`/`Errno`/`FileAttr` to and from that inherent API, so
    the adapter's logic stays testable without a real mount.
*/
use std::ffi::OsStr;
use std::num::NonZeroU32;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use fuse3::path::prelude::*;
use fuse3::{Errno, MountOptions, Result as FuseResult};
use futures_util::stream;

use crate::vfs::{Adapter, NodeKind};

const ATTR_TTL: Duration = Duration::from_secs(1);

fn path_str(p: Option<&OsStr>) -> FuseResult<String> {
    p.and_then(|p| p.to_str())
        .map(|s| if s.is_empty() { "/".to_string() } else { s.to_string() })
        .ok_or_else(|| Errno::from(libc::EINVAL))
}

fn join(parent: &OsStr, name: &OsStr) -> FuseResult<String> {
    let parent = parent.to_str().unwrap_or("/");
    let name = name.to_str().ok_or_else(|| Errno::from(libc::EINVAL))?;
    Ok(if parent == "/" {
        format!("/{name}")
    }
    else {
        format!("{}/{name}", parent.trim_end_matches('/'))
    })
}

fn attr_of(stat: crate::vfs::Stat, uid: u32, gid: u32, now: SystemTime) -> FileAttr {
    FileAttr {
        size: stat.size,
        blocks: stat.size.div_ceil(512),
        atime: now,
        mtime: now,
        ctime: now,
        #[cfg(target_os = "macos")]
        crtime: now,
        kind: if stat.kind == NodeKind::Dir {
            FileType::Directory
        }
        else {
            FileType::RegularFile
        },
        perm: stat.mode,
        nlink: 1,
        uid,
        gid,
        rdev: 0,
        blksize: 4096,
        #[cfg(target_os = "macos")]
        flags: 0,
    }
}

/// The mounted filesystem: an `Adapter` plus the host uid/gid to stamp on
/// every synthesized `FileAttr`.
pub struct NetmdTfsFuse {
    adapter: Adapter,
    uid: u32,
    gid: u32,
    mount_time: SystemTime,
}

impl NetmdTfsFuse {
    pub fn new(adapter: Adapter) -> Self {
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
        Self {
            adapter,
            uid,
            gid,
            mount_time: SystemTime::now(),
        }
    }

    fn dir_attr(&self) -> FileAttr {
        attr_of(
            crate::vfs::Stat::synthetic_dir(),
            self.uid,
            self.gid,
            self.mount_time,
        )
    }
}

impl PathFilesystem for NetmdTfsFuse {
    type DirEntryStream<'a>
        = stream::Iter<std::vec::IntoIter<FuseResult<DirectoryEntry>>>
    where
        Self: 'a;

    type DirEntryPlusStream<'a>
        = stream::Iter<std::vec::IntoIter<FuseResult<DirectoryEntryPlus>>>
    where
        Self: 'a;

    async fn init(&self, _req: Request) -> FuseResult<ReplyInit> {
        self.adapter.init().await.map_err(Errno::from)?;
        Ok(ReplyInit {
            max_write: NonZeroU32::new(128 * 1024).unwrap(),
        })
    }

    async fn destroy(&self, _req: Request) {}

    async fn getattr(
        &self,
        _req: Request,
        path: Option<&OsStr>,
        _fh: Option<u64>,
        _flags: u32,
    ) -> FuseResult<ReplyAttr> {
        let path = path_str(path)?;
        let stat = self.adapter.getattr(&path).await.map_err(Errno::from)?;
        Ok(ReplyAttr {
            ttl: ATTR_TTL,
            attr: attr_of(stat, self.uid, self.gid, self.mount_time),
        })
    }

    async fn lookup(&self, _req: Request, parent: &OsStr, name: &OsStr) -> FuseResult<ReplyEntry> {
        let path = join(parent, name)?;
        let stat = self.adapter.getattr(&path).await.map_err(Errno::from)?;
        Ok(ReplyEntry {
            ttl: ATTR_TTL,
            attr: attr_of(stat, self.uid, self.gid, self.mount_time),
        })
    }

    async fn opendir(&self, _req: Request, _path: &OsStr, _flags: u32) -> FuseResult<ReplyOpen> {
        Ok(ReplyOpen { fh: 0, flags: 0 })
    }

    async fn releasedir(&self, _req: Request, _path: &OsStr, _fh: u64, _flags: u32) -> FuseResult<()> {
        Ok(())
    }

    async fn readdir<'a>(
        &'a self,
        _req: Request,
        path: &'a OsStr,
        _fh: u64,
        offset: i64,
    ) -> FuseResult<ReplyDirectory<Self::DirEntryStream<'a>>> {
        let path_s = path.to_str().unwrap_or("/");
        let listing = self.adapter.readdir(path_s).await.map_err(Errno::from)?;

        let mut entries: Vec<FuseResult<DirectoryEntry>> = Vec::new();
        if offset == 0 {
            entries.push(Ok(DirectoryEntry {
                kind: FileType::Directory,
                name: ".".into(),
                offset: 1,
            }));
        }
        if offset <= 1 {
            entries.push(Ok(DirectoryEntry {
                kind: FileType::Directory,
                name: "..".into(),
                offset: 2,
            }));
        }
        let mut next_offset = 3i64;
        for (name, kind) in listing {
            if next_offset > offset {
                entries.push(Ok(DirectoryEntry {
                    kind: if kind == NodeKind::Dir {
                        FileType::Directory
                    }
                    else {
                        FileType::RegularFile
                    },
                    name: name.into(),
                    offset: next_offset,
                }));
            }
            next_offset += 1;
        }
        Ok(ReplyDirectory {
            entries: stream::iter(entries),
        })
    }

    async fn readdirplus<'a>(
        &'a self,
        req: Request,
        path: &'a OsStr,
        fh: u64,
        offset: u64,
        _lock_owner: u64,
    ) -> FuseResult<ReplyDirectoryPlus<Self::DirEntryPlusStream<'a>>> {
        let path_s = path.to_str().unwrap_or("/").to_string();
        let base = self.readdir(req, path, fh, offset as i64).await?;
        let mut entries = Vec::new();
        let mut base_entries = base.entries;
        use futures_util::StreamExt;
        while let Some(entry) = base_entries.next().await {
            let entry = entry?;
            let child_path = if path_s == "/" {
                format!("/{}", entry.name.to_string_lossy())
            }
            else {
                format!("{}/{}", path_s.trim_end_matches('/'), entry.name.to_string_lossy())
            };
            let attr = match entry.name.to_str() {
                Some(".") | Some("..") => self.dir_attr(),
                _ => {
                    let stat = self.adapter.getattr(&child_path).await.map_err(Errno::from)?;
                    attr_of(stat, self.uid, self.gid, self.mount_time)
                }
            };
            entries.push(Ok(DirectoryEntryPlus {
                kind: entry.kind,
                name: entry.name,
                offset: entry.offset,
                attr,
                entry_ttl: ATTR_TTL,
                attr_ttl: ATTR_TTL,
            }));
        }
        Ok(ReplyDirectoryPlus {
            entries: stream::iter(entries),
        })
    }

    async fn open(&self, _req: Request, path: &OsStr, flags: u32) -> FuseResult<ReplyOpen> {
        let path_s = path.to_str().ok_or_else(|| Errno::from(libc::EINVAL))?;
        let fh = self.adapter.open(path_s, flags as i32).await.map_err(Errno::from)?;
        Ok(ReplyOpen { fh, flags: 0 })
    }

    async fn create(
        &self,
        _req: Request,
        parent: &OsStr,
        name: &OsStr,
        _mode: u32,
        _flags: u32,
    ) -> FuseResult<ReplyCreated> {
        let path = join(parent, name)?;
        let fh = self.adapter.create(&path).await.map_err(Errno::from)?;
        let stat = self.adapter.getattr(&path).await.map_err(Errno::from)?;
        Ok(ReplyCreated {
            ttl: ATTR_TTL,
            attr: attr_of(stat, self.uid, self.gid, self.mount_time),
            generation: 0,
            fh,
            flags: 0,
        })
    }

    async fn read(
        &self,
        _req: Request,
        _path: Option<&OsStr>,
        fh: u64,
        offset: u64,
        size: u32,
    ) -> FuseResult<ReplyData> {
        let data = self.adapter.read(fh, offset, size).await.map_err(Errno::from)?;
        Ok(ReplyData { data: Bytes::from(data) })
    }

    async fn write(
        &self,
        _req: Request,
        _path: Option<&OsStr>,
        fh: u64,
        offset: u64,
        data: &[u8],
        _write_flags: u32,
        _flags: u32,
    ) -> FuseResult<ReplyWrite> {
        let written = self.adapter.write(fh, offset, data).await.map_err(Errno::from)?;
        Ok(ReplyWrite { written })
    }

    async fn release(
        &self,
        _req: Request,
        _path: Option<&OsStr>,
        fh: u64,
        _flags: u32,
        _lock_owner: u64,
        _flush: bool,
    ) -> FuseResult<()> {
        self.adapter.release(fh).await.map_err(Errno::from)
    }

    async fn flush(&self, _req: Request, _path: Option<&OsStr>, _fh: u64, _lock_owner: u64) -> FuseResult<()> {
        Ok(())
    }

    async fn setattr(
        &self,
        _req: Request,
        path: Option<&OsStr>,
        _fh: Option<u64>,
        set_attr: SetAttr,
    ) -> FuseResult<ReplyAttr> {
        let path_s = path_str(path)?;
        if let Some(size) = set_attr.size {
            self.adapter.truncate(&path_s, size).await.map_err(Errno::from)?;
        }
        let stat = self.adapter.getattr(&path_s).await.map_err(Errno::from)?;
        Ok(ReplyAttr {
            ttl: ATTR_TTL,
            attr: attr_of(stat, self.uid, self.gid, self.mount_time),
        })
    }

    async fn unlink(&self, _req: Request, parent: &OsStr, name: &OsStr) -> FuseResult<()> {
        let path = join(parent, name)?;
        self.adapter.unlink(&path).await.map_err(Errno::from)
    }

    async fn mkdir(
        &self,
        _req: Request,
        parent: &OsStr,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
    ) -> FuseResult<ReplyEntry> {
        let path = join(parent, name)?;
        self.adapter.mkdir(&path).await.map_err(Errno::from)?;
        let stat = self.adapter.getattr(&path).await.map_err(Errno::from)?;
        Ok(ReplyEntry {
            ttl: ATTR_TTL,
            attr: attr_of(stat, self.uid, self.gid, self.mount_time),
        })
    }

    async fn rmdir(&self, _req: Request, parent: &OsStr, name: &OsStr) -> FuseResult<()> {
        let path = join(parent, name)?;
        self.adapter.unlink(&path).await.map_err(Errno::from)
    }

    async fn rename(
        &self,
        _req: Request,
        origin_parent: &OsStr,
        origin_name: &OsStr,
        parent: &OsStr,
        name: &OsStr,
    ) -> FuseResult<()> {
        let src = join(origin_parent, origin_name)?;
        let dest = join(parent, name)?;
        self.adapter.rename(&src, &dest).await.map_err(Errno::from)
    }

    async fn statfs(&self, _req: Request, _path: &OsStr) -> FuseResult<ReplyStatFs> {
        Ok(ReplyStatFs {
            blocks: 1,
            bfree: 0,
            bavail: 0,
            files: 1,
            ffree: 0,
            bsize: crate::device::SECTOR_SIZE as u32,
            namelen: 255,
            frsize: crate::device::SECTOR_SIZE as u32,
        })
    }
}

/// Mount-time options, read by `bin/mount.rs` off the command line. Kept
/// separate from [`Adapter`] construction so the core adapter stays usable
/// against any FUSE session setup (spec.md §9.3).
pub struct MountConfig {
    pub mountpoint: std::path::PathBuf,
    pub read_only: bool,
    pub allow_other: bool,
}

/// Mounts `adapter` per `cfg` and blocks until unmounted.
pub async fn mount(adapter: Adapter, cfg: MountConfig) -> std::io::Result<()> {
    let fs = NetmdTfsFuse::new(adapter);
    let mut opts = MountOptions::default();
    opts.fs_name("netmd-tfs-fs");
    opts.force_readdir_plus(true);
    opts.read_only(cfg.read_only);
    if cfg.allow_other {
        opts.allow_other(true);
    }

    log::info!("mounting netmd-tfs-fs at {}", cfg.mountpoint.display());

    let handle = Session::new(opts)
        .mount_with_unprivileged(fs, &cfg.mountpoint)
        .await?;
    handle.await
}
