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

    src/vfs.rs

    The VFS adapter: path routing across `/$audio`, `/$system`, and the TFS
    tree, the open-file handle table, and the translation from filesystem
    operations into Cache/Transfer calls. This module owns the *logic*
    (spec.md §4.6) as plain `async fn`s returning `Result<_, TfsError>`,
    independent of any FUSE crate, so it can be exercised directly in
    tests; `fuse_binding` is the thin shim that calls into it.
*/
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::cache::Cache;
use crate::device::{DeviceDriver, TrackEncoding, TrackListing};
use crate::error::{Result, TfsError};
use crate::fs_tree::{self, DirNode, FileNode, FsNode, Traversal};
use crate::stream_buffer::StreamBuffer;
use crate::system_files::{SystemFile, INFO_TEXT};
use crate::tfs;
use crate::transfer::{ReadTarget, TransferCoordinator};

const O_ACCMODE: i32 = libc::O_ACCMODE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Dir,
}

#[derive(Clone, Copy, Debug)]
pub struct Stat {
    pub kind: NodeKind,
    pub size: u64,
    /// Permission bits only (no S_IFDIR/S_IFREG — the FUSE shim supplies
    /// those from `kind`).
    pub mode: u16,
}

impl Stat {
    /// A plain directory `Stat`, for synthesizing `.`/`..` entries that
    /// don't correspond to a routable path.
    pub fn synthetic_dir() -> Self {
        Self::dir()
    }

    fn dir() -> Self {
        Stat {
            kind: NodeKind::Dir,
            size: 0,
            mode: 0o777,
        }
    }

    fn file(size: u64, mode: u16) -> Self {
        Stat {
            kind: NodeKind::File,
            size,
            mode,
        }
    }
}

enum OpenFileKind {
    SystemRead { data: Vec<u8> },
    SystemWrite { file: SystemFile, buffer: Vec<u8> },
    AudioRead { buffer: StreamBuffer },
    TfsRead { buffer: StreamBuffer },
    TfsWrite { track_id: u8, buffer: Vec<u8> },
}

struct OpenFile {
    path: String,
    kind: OpenFileKind,
}

/// The process-wide VFS adapter. Cheap to clone (shares state through
/// `Arc`s), so a FUSE binding can hand out clones to concurrent request
/// handlers without re-wrapping anything (spec.md §9 design note: no
/// ambient globals, state is explicitly constructed and threaded through).
#[derive(Clone)]
pub struct Adapter {
    cache: Arc<Mutex<Cache>>,
    transfer: Arc<TransferCoordinator>,
    handles: Arc<Mutex<Vec<Option<OpenFile>>>>,
}

enum Route<'a> {
    Root,
    AudioDir,
    AudioEntry(&'a str),
    SystemDir,
    SystemEntry(&'a str),
    Tfs(&'a str),
}

fn route(path: &str) -> Route<'_> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Route::Root;
    }
    if trimmed == "/$audio" {
        return Route::AudioDir;
    }
    if let Some(rest) = trimmed.strip_prefix("/$audio/") {
        return Route::AudioEntry(rest);
    }
    if trimmed == "/$system" {
        return Route::SystemDir;
    }
    if let Some(rest) = trimmed.strip_prefix("/$system/") {
        return Route::SystemEntry(rest);
    }
    Route::Tfs(trimmed)
}

fn audio_display_name(listing: &TrackListing) -> String {
    let ext = match listing.encoding {
        TrackEncoding::Sp => "aea",
        TrackEncoding::Lp | TrackEncoding::Lp2 => "wav",
    };
    let title = if listing.title.is_empty() {
        "No Title".to_string()
    }
    else {
        listing.title.replace('/', "_")
    };
    format!("{}. {}.{}", listing.index + 1, title, ext)
}

fn audio_entries(cache: &Cache) -> Vec<(String, usize)> {
    cache
        .tracks
        .iter()
        .filter(|t| !t.title.starts_with("h_fs_"))
        .map(|t| (audio_display_name(t), t.index))
        .collect()
}

impl Adapter {
    pub fn new(device: Arc<dyn DeviceDriver>) -> Self {
        let transfer = Arc::new(TransferCoordinator::new(device));
        Self {
            cache: Arc::new(Mutex::new(Cache::new(transfer.clone()))),
            transfer,
            handles: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn init(&self) -> Result<()> {
        self.cache.lock().await.init().await
    }

    fn access_mode(flags: i32) -> i32 {
        flags & O_ACCMODE
    }

    async fn alloc_handle(&self, file: OpenFile) -> u64 {
        let mut handles = self.handles.lock().await;
        if let Some(slot) = handles.iter_mut().position(|h| h.is_none()) {
            handles[slot] = Some(file);
            slot as u64
        }
        else {
            handles.push(Some(file));
            (handles.len() - 1) as u64
        }
    }

    /// Renders a `/$system` file's readable payload. `force_immediate_flush`
    /// is never readable and is handled separately.
    async fn render_system_file(&self, file: SystemFile) -> Result<Vec<u8>> {
        match file {
            SystemFile::Info => Ok(INFO_TEXT.as_bytes().to_vec()),
            SystemFile::Handles => {
                let handles = self.handles.lock().await;
                let mut out = String::new();
                for (idx, slot) in handles.iter().enumerate() {
                    match slot {
                        Some(of) => out.push_str(&format!("{idx}\t{}\n", of.path)),
                        None => out.push_str(&format!("{idx}\t<INVL>\n")),
                    }
                }
                Ok(out.into_bytes())
            }
            SystemFile::TfsBin => {
                let cache = self.cache.lock().await;
                tfs::encode(&cache.root)
            }
            SystemFile::ForceImmediateFlush => Ok(Vec::new()),
        }
    }

    pub async fn getattr(&self, path: &str) -> Result<Stat> {
        match route(path) {
            Route::Root | Route::AudioDir | Route::SystemDir => Ok(Stat::dir()),
            Route::SystemEntry(name) => {
                let file = SystemFile::lookup(name).ok_or(TfsError::NotFound)?;
                let size = if file.readable() {
                    self.render_system_file(file).await?.len() as u64
                }
                else {
                    0
                };
                let mode = 0o111 | if file.readable() { 0o444 } else { 0 } | if file.writable() { 0o222 } else { 0 };
                Ok(Stat::file(size, mode))
            }
            Route::AudioEntry(name) => {
                let cache = self.cache.lock().await;
                let (_, index) = audio_entries(&cache)
                    .into_iter()
                    .find(|(n, _)| n == name)
                    .ok_or(TfsError::NotFound)?;
                let size = cache.track_sector_lengths.get(index).copied().unwrap_or(0);
                Ok(Stat::file(size as u64, 0o555))
            }
            Route::Tfs(p) => {
                let cache = self.cache.lock().await;
                match fs_tree::traverse(&cache.root, p)? {
                    Traversal::Dir(_) => Ok(Stat::dir()),
                    Traversal::File(f) => Ok(Stat::file(f.byte_len as u64, 0o777)),
                }
            }
        }
    }

    pub async fn readdir(&self, path: &str) -> Result<Vec<(String, NodeKind)>> {
        match route(path) {
            Route::Root => {
                let cache = self.cache.lock().await;
                let mut out = vec![
                    ("$audio".to_string(), NodeKind::Dir),
                    ("$system".to_string(), NodeKind::Dir),
                ];
                if let Some(dir) = cache.root.as_dir() {
                    for child in dir.children.values() {
                        out.push((child.name().to_string(), kind_of(child)));
                    }
                }
                Ok(out)
            }
            Route::AudioDir => {
                let cache = self.cache.lock().await;
                Ok(audio_entries(&cache)
                    .into_iter()
                    .map(|(name, _)| (name, NodeKind::File))
                    .collect())
            }
            Route::SystemDir => Ok(SystemFile::all()
                .iter()
                .map(|f| (f.name().to_string(), NodeKind::File))
                .collect()),
            Route::AudioEntry(_) | Route::SystemEntry(_) => Err(TfsError::NotFound),
            Route::Tfs(p) => {
                let cache = self.cache.lock().await;
                match fs_tree::traverse(&cache.root, p)? {
                    Traversal::Dir(d) => Ok(d
                        .children
                        .values()
                        .map(|c| (c.name().to_string(), kind_of(c)))
                        .collect()),
                    Traversal::File(_) => Err(TfsError::NotFound),
                }
            }
        }
    }

    /// Opens `path` for reading (`flags` low bits `O_RDONLY`) or writing
    /// (`O_WRONLY`). Any other access mode is rejected immediately with
    /// `EACCES` (spec.md §9 open question: the source kept going after
    /// reporting the error; this does not).
    pub async fn open(&self, path: &str, flags: i32) -> Result<u64> {
        let mode = Self::access_mode(flags);
        let write = if mode == libc::O_RDONLY {
            false
        }
        else if mode == libc::O_WRONLY {
            true
        }
        else {
            return Err(TfsError::AccessDenied);
        };

        match route(path) {
            Route::Root | Route::AudioDir | Route::SystemDir => Err(TfsError::AccessDenied),
            Route::SystemEntry(name) => {
                let file = SystemFile::lookup(name).ok_or(TfsError::NotFound)?;
                if write {
                    if !file.writable() {
                        return Err(TfsError::PermissionDenied);
                    }
                    let fh = self
                        .alloc_handle(OpenFile {
                            path: path.to_string(),
                            kind: OpenFileKind::SystemWrite { file, buffer: Vec::new() },
                        })
                        .await;
                    Ok(fh)
                }
                else {
                    if !file.readable() {
                        return Err(TfsError::PermissionDenied);
                    }
                    let data = self.render_system_file(file).await?;
                    let fh = self
                        .alloc_handle(OpenFile {
                            path: path.to_string(),
                            kind: OpenFileKind::SystemRead { data },
                        })
                        .await;
                    Ok(fh)
                }
            }
            Route::AudioEntry(name) => {
                if write {
                    return Err(TfsError::AccessDenied);
                }
                let (index, buffer) = {
                    let mut cache = self.cache.lock().await;
                    let (_, index) = audio_entries(&cache)
                        .into_iter()
                        .find(|(n, _)| n == name)
                        .ok_or(TfsError::NotFound)?;
                    (index, cache.audio_buffer(index))
                };
                if buffer.start_once().await {
                    let transfer = self.transfer.clone();
                    let buffer = buffer.clone();
                    tokio::spawn(async move {
                        if let Err(e) = transfer.start_read_transfer(&buffer, ReadTarget::Audio(index)).await {
                            log::warn!("audio read transfer for track {index} failed: {e}");
                            buffer.mark_complete().await;
                        }
                    });
                }
                let fh = self
                    .alloc_handle(OpenFile {
                        path: path.to_string(),
                        kind: OpenFileKind::AudioRead { buffer },
                    })
                    .await;
                Ok(fh)
            }
            Route::Tfs(p) => {
                if write {
                    self.open_tfs_write(path, p).await
                }
                else {
                    self.open_tfs_read(path, p).await
                }
            }
        }
    }

    async fn open_tfs_read(&self, path: &str, p: &str) -> Result<u64> {
        let (track_id, has_payload) = {
            let cache = self.cache.lock().await;
            match fs_tree::traverse(&cache.root, p)? {
                Traversal::File(f) => (f.track_id, cache.resolve_id_to_index(f.track_id).is_some()),
                Traversal::Dir(_) => return Err(TfsError::AccessDenied),
            }
        };
        let buffer = if !has_payload {
            StreamBuffer::with_contents(Vec::new(), true)
        }
        else {
            let buffer = self.cache.lock().await.hidden_buffer(track_id);
            if buffer.start_once().await {
                let transfer = self.transfer.clone();
                let buffer2 = buffer.clone();
                tokio::spawn(async move {
                    if let Err(e) = transfer
                        .start_read_transfer(&buffer2, ReadTarget::Hidden { track_id })
                        .await
                    {
                        log::warn!("TFS read transfer for track {track_id} failed: {e}");
                        buffer2.mark_complete().await;
                    }
                });
            }
            buffer
        };
        let fh = self
            .alloc_handle(OpenFile {
                path: path.to_string(),
                kind: OpenFileKind::TfsRead { buffer },
            })
            .await;
        Ok(fh)
    }

    async fn open_tfs_write(&self, path: &str, p: &str) -> Result<u64> {
        let mut cache = self.cache.lock().await;
        let existing = fs_tree::traverse(&cache.root, p);
        let track_id = match existing {
            Ok(Traversal::Dir(_)) => return Err(TfsError::PermissionDenied),
            Ok(Traversal::File(f)) => {
                let track_id = f.track_id;
                let had_payload = f.byte_len > 0;
                if had_payload {
                    if let Some(index) = cache.resolve_id_to_index(track_id) {
                        cache.erase_only(index).await?;
                    }
                    cache.hidden_file_cache.remove(&track_id);
                }
                track_id
            }
            Err(TfsError::NotFound) => self.allocate_and_insert(&mut cache, p)?,
            Err(e) => return Err(e),
        };
        drop(cache);
        let fh = self
            .alloc_handle(OpenFile {
                path: path.to_string(),
                kind: OpenFileKind::TfsWrite {
                    track_id,
                    buffer: Vec::new(),
                },
            })
            .await;
        Ok(fh)
    }

    fn allocate_and_insert(&self, cache: &mut Cache, p: &str) -> Result<u8> {
        let track_id = cache.next_file_id.ok_or(TfsError::DiscFull)?;
        let (parent, name) = fs_tree::traverse_parent_mut(&mut cache.root, p)?;
        parent.add(FsNode::File(FileNode {
            track_id,
            name,
            byte_len: 0,
        }));
        Ok(track_id)
    }

    /// `create(path)` per spec.md §4.6: allocates a new file ID, inserts a
    /// File node immediately, and returns a write handle. `/$audio` and
    /// `/$system` reject immediately (spec.md §9 open question).
    pub async fn create(&self, path: &str) -> Result<u64> {
        match route(path) {
            Route::AudioDir | Route::AudioEntry(_) | Route::SystemDir | Route::SystemEntry(_) | Route::Root => {
                Err(TfsError::PermissionDenied)
            }
            Route::Tfs(p) => {
                let mut cache = self.cache.lock().await;
                if fs_tree::traverse(&cache.root, p).is_ok() {
                    return Err(TfsError::PermissionDenied);
                }
                let track_id = self.allocate_and_insert(&mut cache, p)?;
                drop(cache);
                let fh = self
                    .alloc_handle(OpenFile {
                        path: path.to_string(),
                        kind: OpenFileKind::TfsWrite {
                            track_id,
                            buffer: Vec::new(),
                        },
                    })
                    .await;
                Ok(fh)
            }
        }
    }

    pub async fn read(&self, fh: u64, offset: u64, length: u32) -> Result<Vec<u8>> {
        let handles = self.handles.lock().await;
        let handle = handles
            .get(fh as usize)
            .and_then(|h| h.as_ref())
            .ok_or(TfsError::InvalidHandle)?;
        match &handle.kind {
            OpenFileKind::SystemRead { data } => Ok(slice_at(data, offset, length)),
            OpenFileKind::AudioRead { buffer } | OpenFileKind::TfsRead { buffer } => {
                let buffer = buffer.clone();
                drop(handles);
                Ok(buffer.get_contents(offset as usize, length as usize).await)
            }
            OpenFileKind::SystemWrite { .. } | OpenFileKind::TfsWrite { .. } => Err(TfsError::AccessDenied),
        }
    }

    pub async fn write(&self, fh: u64, offset: u64, data: &[u8]) -> Result<u32> {
        let mut handles = self.handles.lock().await;
        let handle = handles
            .get_mut(fh as usize)
            .and_then(|h| h.as_mut())
            .ok_or(TfsError::InvalidHandle)?;
        let written = match &mut handle.kind {
            OpenFileKind::SystemWrite { file, buffer } => {
                let written = append_at(buffer, offset, data);
                let trigger_flush = *file == SystemFile::ForceImmediateFlush;
                drop(handles);
                if trigger_flush {
                    self.cache.lock().await.flush_cache().await?;
                }
                return Ok(written);
            }
            OpenFileKind::TfsWrite { buffer, .. } => append_at(buffer, offset, data),
            _ => return Err(TfsError::AccessDenied),
        };
        Ok(written)
    }

    pub async fn release(&self, fh: u64) -> Result<()> {
        let taken = {
            let mut handles = self.handles.lock().await;
            let slot = handles.get_mut(fh as usize).ok_or(TfsError::InvalidHandle)?;
            slot.take().ok_or(TfsError::InvalidHandle)?
        };
        match taken.kind {
            OpenFileKind::SystemWrite {
                file: SystemFile::TfsBin,
                buffer,
            } => {
                let new_root = tfs::decode(&buffer)?;
                self.cache.lock().await.root = new_root;
                Ok(())
            }
            OpenFileKind::TfsWrite { track_id, buffer } => {
                if !buffer.is_empty() {
                    self.transfer.start_file_write_transfer(track_id, buffer.clone()).await?;
                }
                let mut cache = self.cache.lock().await;
                set_byte_len(&mut cache.root, track_id, buffer.len() as u32);
                cache.flush_cache().await?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Always succeeds; writes always grow the buffer, so there is nothing
    /// to shrink (spec.md §1, §4.6 non-goal).
    pub async fn truncate(&self, _path: &str, _size: u64) -> Result<()> {
        Ok(())
    }

    pub async fn unlink(&self, path: &str) -> Result<()> {
        match route(path) {
            Route::SystemDir | Route::SystemEntry(_) => Err(TfsError::PermissionDenied),
            Route::AudioDir => Err(TfsError::PermissionDenied),
            Route::AudioEntry(name) => {
                let mut cache = self.cache.lock().await;
                let (_, index) = audio_entries(&cache)
                    .into_iter()
                    .find(|(n, _)| n == name)
                    .ok_or(TfsError::NotFound)?;
                cache.delete_audio_track(index).await
            }
            Route::Root => Err(TfsError::PermissionDenied),
            Route::Tfs(p) => {
                let mut cache = self.cache.lock().await;
                if let Traversal::Dir(d) = fs_tree::traverse(&cache.root, p)? {
                    if !d.children.is_empty() {
                        return Err(TfsError::NotEmpty);
                    }
                }
                let removed_track_id = {
                    let (parent, name) = fs_tree::traverse_parent_mut(&mut cache.root, p)?;
                    let removed = parent.children.remove(&name).ok_or(TfsError::NotFound)?;
                    match removed {
                        FsNode::File(f) => Some(f.track_id),
                        FsNode::Directory(_) => None,
                    }
                };
                if let Some(track_id) = removed_track_id {
                    if let Some(index) = cache.resolve_id_to_index(track_id) {
                        cache.erase_only(index).await?;
                    }
                    cache.hidden_file_cache.remove(&track_id);
                }
                Ok(())
            }
        }
    }

    /// `mkdir` per spec.md §4.6: fails with `EPERM` whenever the parent is
    /// not a directory *or does not exist* (both collapse to the same
    /// `traverse_parent_mut` failure here, and both map to `EPERM` rather
    /// than `ENOENT`).
    pub async fn mkdir(&self, path: &str) -> Result<()> {
        match route(path) {
            Route::Tfs(p) => {
                let mut cache = self.cache.lock().await;
                if fs_tree::traverse(&cache.root, p).is_ok() {
                    return Err(TfsError::PermissionDenied);
                }
                let (parent, name) = fs_tree::traverse_parent_mut(&mut cache.root, p)
                    .map_err(|_| TfsError::PermissionDenied)?;
                parent.add(FsNode::Directory(DirNode {
                    name,
                    children: Default::default(),
                }));
                Ok(())
            }
            _ => Err(TfsError::PermissionDenied),
        }
    }

    pub async fn rename(&self, src: &str, dest: &str) -> Result<()> {
        let (src_p, dest_p) = match (route(src), route(dest)) {
            (Route::Tfs(s), Route::Tfs(d)) => (s, d),
            _ => return Err(TfsError::PermissionDenied),
        };
        let mut cache = self.cache.lock().await;
        match fs_tree::traverse(&cache.root, src_p) {
            Ok(_) => {}
            Err(TfsError::NotFound) => return Err(TfsError::NotFound),
            Err(e) => return Err(e),
        }
        if fs_tree::traverse(&cache.root, dest_p).is_ok() {
            return Err(TfsError::PermissionDenied);
        }
        fs_tree::traverse_parent(&cache.root, src_p).map_err(|_| TfsError::PermissionDenied)?;
        fs_tree::traverse_parent(&cache.root, dest_p).map_err(|_| TfsError::PermissionDenied)?;

        let mut node = {
            let (parent, name) = fs_tree::traverse_parent_mut(&mut cache.root, src_p)?;
            parent.children.remove(&name).ok_or(TfsError::NotFound)?
        };
        let new_name = fs_tree::split_path(dest_p)
            .last()
            .copied()
            .unwrap_or_default()
            .to_string();
        node.set_name(new_name);
        let (dest_parent, _) = fs_tree::traverse_parent_mut(&mut cache.root, dest_p)?;
        dest_parent.add(node);
        Ok(())
    }
}

fn kind_of(node: &FsNode) -> NodeKind {
    if node.is_dir() {
        NodeKind::Dir
    }
    else {
        NodeKind::File
    }
}

fn slice_at(data: &[u8], offset: u64, length: u32) -> Vec<u8> {
    let start = offset as usize;
    if start >= data.len() {
        return Vec::new();
    }
    let end = (start + length as usize).min(data.len());
    data[start..end].to_vec()
}

fn append_at(buffer: &mut Vec<u8>, offset: u64, data: &[u8]) -> u32 {
    let start = offset as usize;
    let end = start + data.len();
    if buffer.len() < end {
        buffer.resize(end, 0);
    }
    buffer[start..end].copy_from_slice(data);
    data.len() as u32
}

fn set_byte_len(root: &mut FsNode, track_id: u8, byte_len: u32) {
    match root {
        FsNode::File(f) => {
            if f.track_id == track_id {
                f.byte_len = byte_len;
            }
        }
        FsNode::Directory(d) => {
            for child in d.children.values_mut() {
                set_byte_len(child, track_id, byte_len);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::tests::FakeDevice;

    fn adapter() -> Adapter {
        Adapter::new(Arc::new(FakeDevice::new()))
    }

    #[tokio::test]
    async fn s1_format_empty_disc() {
        let a = adapter();
        a.init().await.unwrap();
        let entries = a.readdir("/").await.unwrap();
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&"$audio"));
        assert!(names.contains(&"$system"));
    }

    #[tokio::test]
    async fn s2_create_write_read_flush() {
        let a = adapter();
        a.init().await.unwrap();
        let fh = a.create("/a.bin").await.unwrap();
        a.write(fh, 0, &[0xDE, 0xAD, 0xBE, 0xEF]).await.unwrap();
        a.release(fh).await.unwrap();

        let stat = a.getattr("/a.bin").await.unwrap();
        assert_eq!(stat.size, 4);
    }

    #[tokio::test]
    async fn s4_unlink_nonempty_dir_fails() {
        let a = adapter();
        a.init().await.unwrap();
        a.mkdir("/d").await.unwrap();
        let fh = a.create("/d/inner.bin").await.unwrap();
        a.write(fh, 0, &[1]).await.unwrap();
        a.release(fh).await.unwrap();

        assert!(matches!(a.unlink("/d").await, Err(TfsError::NotEmpty)));
    }

    #[tokio::test]
    async fn open_rejects_rdwr() {
        let a = adapter();
        a.init().await.unwrap();
        let result = a.open("/$system/info", libc::O_RDWR).await;
        assert!(matches!(result, Err(TfsError::AccessDenied)));
    }

    #[tokio::test]
    async fn create_on_audio_is_rejected() {
        let a = adapter();
        a.init().await.unwrap();
        assert!(matches!(
            a.create("/$audio/whatever").await,
            Err(TfsError::PermissionDenied)
        ));
    }
}
