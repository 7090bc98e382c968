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

    src/transfer.rs

    Serializes every device-touching operation behind a single lock. Every
    public method here plays the role the teacher's `DiskLock` plays for a
    `DiskImage`: "acquire on entry, release on exit", except the guarded
    resource is a remote device rather than an in-memory struct, and the
    lock is async so a slow USB transfer doesn't block the callback
    dispatcher thread (spec.md §4.5, §5, §9 design note on the mutex
    decorator).
*/
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::Mutex;

use crate::device::{
    Chunk, DeviceDriver, FragmentMode, RecoveryOptions, Toc, TrackListing, WireFormat,
};
use crate::error::{Result, TfsError};
use crate::fs_tree::FsNode;
use crate::stream_buffer::StreamBuffer;
use crate::tfs;

/// Track-to-track payload is padded to at least this many bytes before
/// upload, regardless of the real data length (spec.md §4.5, scenario S2).
pub const MIN_UPLOAD_LEN: usize = 2112;

/// Which track a read transfer targets: an ordinary audio track (index is
/// the track itself) or a TFS-hidden track (looked up by file ID).
#[derive(Clone, Copy, Debug)]
pub enum ReadTarget {
    Audio(usize),
    Hidden { track_id: u8 },
}

pub struct TransferCoordinator {
    device: Arc<dyn DeviceDriver>,
    /// The device lock: every public method acquires it on entry and holds
    /// it for the method's entire body. No method here calls another
    /// public method of this type, to avoid the non-reentrancy trap called
    /// out in spec.md §5.
    lock: Mutex<()>,
}

impl TransferCoordinator {
    pub fn new(device: Arc<dyn DeviceDriver>) -> Self {
        Self {
            device,
            lock: Mutex::new(()),
        }
    }

    fn hidden_title(track_id: u8) -> String {
        format!("h_fs_{track_id:02x}")
    }

    async fn resolve_hidden_index(&self, track_id: u8) -> Result<Option<usize>> {
        let tracks = self.device.list_tracks().await?;
        let title = Self::hidden_title(track_id);
        Ok(tracks.iter().find(|t| t.title == title).map(|t| t.index))
    }

    /// Resolves a [`ReadTarget`] to an on-disc track index, independent of
    /// the Cache's own bookkeeping (spec.md §4.5).
    pub async fn resolve_id_to_index(&self, track_id: u8) -> Result<Option<usize>> {
        let _guard = self.lock.lock().await;
        self.resolve_hidden_index(track_id).await
    }

    pub async fn list_tracks(&self) -> Result<Vec<TrackListing>> {
        let _guard = self.lock.lock().await;
        self.device.list_tracks().await
    }

    pub async fn get_disc_state(&self) -> Result<Vec<TrackListing>> {
        let _guard = self.lock.lock().await;
        self.device.list_tracks().await
    }

    pub async fn get_toc(&self) -> Result<Toc> {
        let _guard = self.lock.lock().await;
        let s0 = self.device.read_utoc_sector(0).await?;
        let s1 = self.device.read_utoc_sector(1).await?;
        self.device.parse_toc(&s0, &s1)
    }

    /// Pure address translation; no device I/O, so it does not need the
    /// device lock.
    pub fn disc_address_to_logical(&self, addr: crate::device::DiscAddress) -> u32 {
        self.device.disc_address_to_logical(addr)
    }

    /// Begins recovering `target`'s payload into `buffer`. The caller is
    /// responsible for only invoking this once per buffer (see
    /// [`StreamBuffer::start_once`]); this method itself issues exactly one
    /// device transfer per call.
    pub async fn start_read_transfer(&self, buffer: &StreamBuffer, target: ReadTarget) -> Result<()> {
        let _guard = self.lock.lock().await;
        let (index, audio_track) = match target {
            ReadTarget::Audio(idx) => (idx, true),
            ReadTarget::Hidden { track_id } => {
                let idx = self
                    .resolve_hidden_index(track_id)
                    .await?
                    .ok_or(TfsError::NotFound)?;
                (idx, false)
            }
        };
        let opts = RecoveryOptions { audio_track };
        let mut stream = self.device.download_track_stream(index, opts).await?;
        while let Some(chunk) = stream.next().await {
            match chunk {
                Chunk::Header(bytes) if audio_track => buffer.append(&bytes).await,
                Chunk::AudioData(bytes) => buffer.append(&bytes).await,
                _ => {}
            }
        }
        buffer.mark_complete().await;
        Ok(())
    }

    /// Zero-pads `data` to [`MIN_UPLOAD_LEN`] and uploads it as an LP2
    /// track titled `h_fs_XX` (spec.md §4.5, scenario S2).
    pub async fn start_file_write_transfer(&self, track_id: u8, mut data: Vec<u8>) -> Result<()> {
        let _guard = self.lock.lock().await;
        if data.len() < MIN_UPLOAD_LEN {
            data.resize(MIN_UPLOAD_LEN, 0);
        }
        let name = Self::hidden_title(track_id);
        self.device.upload_track(&name, WireFormat::Lp2, data).await
    }

    /// Erases the track at `index`. Pure device operation; the caller
    /// (the Cache) is responsible for refreshing its own bookkeeping
    /// afterward.
    pub async fn delete_track(&self, index: usize) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.device.erase_track(index).await
    }

    /// Re-reads UTOC sectors 0/1, stamps every `h_fs_*` track's fragments
    /// with SP_MODE + STEREO and clears WRITABLE, re-emits the sectors, and
    /// overwrites sector 2 with the TFS encoding of `root`, then forces a
    /// TOC commit. Mode-bit stamping happens before the TFS payload write
    /// in the same read-modify-write cycle, so a committed TOC never
    /// exposes a hidden track as writable (spec.md §4.5 ordering
    /// rationale). The TFS encode is validated before anything is written
    /// to the device: a `FormatOverflow` must abort without touching the
    /// disc (spec.md §4.1, testable property 2).
    pub async fn write_toc(&self, root: &FsNode) -> Result<()> {
        let _guard = self.lock.lock().await;

        let payload = tfs::encode(root)?;

        let tracks = self.device.list_tracks().await?;
        let s0 = self.device.read_utoc_sector(0).await?;
        let s1 = self.device.read_utoc_sector(1).await?;
        let mut toc = self.device.parse_toc(&s0, &s1)?;

        for track in tracks.iter().filter(|t| t.title.starts_with("h_fs_")) {
            for frag_idx in toc.fragments_for_track(track.index) {
                let frag = &mut toc.fragments[frag_idx];
                frag.mode.insert(FragmentMode::SP_MODE);
                frag.mode.insert(FragmentMode::STEREO);
                frag.mode.remove(FragmentMode::WRITABLE);
            }
        }

        let (new_s0, new_s1) = self.device.reconstruct_toc(&toc)?;
        self.device.write_utoc_sector(0, &new_s0).await?;
        self.device.write_utoc_sector(1, &new_s1).await?;

        let mut sector2 = [0u8; crate::device::SECTOR_SIZE];
        sector2[tfs::OFFSET..tfs::OFFSET + payload.len()].copy_from_slice(&payload);
        self.device.write_utoc_sector(2, &sector2).await?;

        self.device.force_toc_commit().await
    }

    /// Reads UTOC sector 2 and decodes the TFS payload. Parse failures are
    /// treated as "disc is unformatted" rather than propagated, returning
    /// an empty root (spec.md §4.5).
    pub async fn get_tfs(&self) -> Result<FsNode> {
        let _guard = self.lock.lock().await;
        let sector2 = self.device.read_utoc_sector(2).await?;
        match tfs::decode(&sector2[tfs::OFFSET..]) {
            Ok(root) => Ok(root),
            Err(_) => {
                log::warn!("UTOC sector 2 did not decode as TFS; treating disc as unformatted");
                Ok(FsNode::empty_root())
            }
        }
    }
}
