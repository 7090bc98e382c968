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

    src/cache.rs

    The process-wide model of disc state: the FS tree root, a snapshot of
    the track list, the per-audio-track presented byte length, a pool of
    in-progress audio read buffers, and the free-file-ID allocator. Plays
    the role the teacher's `DiskImage` plays for a loaded disk image — the
    one owning struct everything else is a view onto — but is explicitly
    constructed and threaded through by the VFS adapter rather than kept as
    an ambient global (spec.md §9 design note).
*/
use std::collections::HashMap;
use std::sync::Arc;

use crate::device::{FragmentMode, Toc, TrackListing};
use crate::error::Result;
use crate::fs_tree::{all_files, FsNode};
use crate::stream_buffer::StreamBuffer;
use crate::transfer::TransferCoordinator;

/// Origin of the constant 220 (= 20*11) used in the sector-length formula
/// below is not recorded in the source this system was distilled from;
/// preserved literally per spec.md §9.
const LP_SECTOR_DISCOUNT: u32 = 220;

pub struct Cache {
    pub root: FsNode,
    pub tracks: Vec<TrackListing>,
    pub track_sector_lengths: Vec<u32>,
    pub audio_file_cache: HashMap<usize, StreamBuffer>,
    /// Streaming buffers for in-progress reads of TFS-hidden files, keyed by
    /// file ID rather than track index (a hidden file's backing track index
    /// can move across a refresh, the file ID cannot).
    pub hidden_file_cache: HashMap<u8, StreamBuffer>,
    /// Smallest unused track ID in `0..256`, or `None` if the disc has no
    /// room left for another hidden track.
    pub next_file_id: Option<u8>,
    transfer: Arc<TransferCoordinator>,
}

fn hidden_track_id(title: &str) -> Option<u8> {
    let suffix = title.strip_prefix("h_fs_")?;
    u8::from_str_radix(suffix, 16).ok()
}

fn sector_length(track_index: usize, toc: &Toc, transfer: &TransferCoordinator) -> u32 {
    let frag_indices = toc.fragments_for_track(track_index);
    if frag_indices.is_empty() {
        return 0;
    }
    let is_lp = !toc.fragments[frag_indices[0]].mode.contains(FragmentMode::SP_MODE);
    let mut sector_count: u32 = 0;
    for idx in frag_indices {
        let frag = &toc.fragments[idx];
        let start = transfer.disc_address_to_logical(frag.start);
        let end = transfer.disc_address_to_logical(frag.end);
        sector_count += end.saturating_sub(start);
    }
    let per_sector = 2332 - if is_lp { LP_SECTOR_DISCOUNT } else { 0 };
    let base = if is_lp { 48 } else { 2048 };
    sector_count * per_sector + base
}

impl Cache {
    pub fn new(transfer: Arc<TransferCoordinator>) -> Self {
        Self {
            root: FsNode::empty_root(),
            tracks: Vec::new(),
            track_sector_lengths: Vec::new(),
            audio_file_cache: HashMap::new(),
            hidden_file_cache: HashMap::new(),
            next_file_id: Some(0),
            transfer,
        }
    }

    /// Loads the FS tree root from the device. A TFS parse failure is not
    /// an error to this method's caller: the disc is treated as
    /// unformatted and an empty root is adopted (spec.md §4.4, §6.3).
    pub async fn init(&mut self) -> Result<()> {
        self.root = self.transfer.get_tfs().await?;
        self.refresh_cache().await
    }

    /// Re-reads the disc listing and TOC, recomputing
    /// `track_sector_lengths` and `next_file_id`. Does not reload the FS
    /// tree (that only happens in [`Cache::init`] or after a
    /// `tfs.bin` write).
    pub async fn refresh_cache(&mut self) -> Result<()> {
        self.tracks = self.transfer.get_disc_state().await?;
        let toc = self.transfer.get_toc().await?;

        // Indexed by each track's own on-disc index, not its position in
        // `self.tracks` — a track list with holes (an erased track leaves
        // a gap) would otherwise misalign every later entry.
        let max_index = self.tracks.iter().map(|t| t.index).max();
        self.track_sector_lengths = match max_index {
            Some(max) => (0..=max).map(|i| sector_length(i, &toc, &self.transfer)).collect(),
            None => Vec::new(),
        };

        let used: std::collections::HashSet<u8> = self
            .tracks
            .iter()
            .filter_map(|t| hidden_track_id(&t.title))
            .collect();
        self.next_file_id = (0u16..256).map(|i| i as u8).find(|id| !used.contains(id));
        if self.next_file_id.is_none() {
            log::error!("disc has no free hidden-track ID left in 0..256; treating disc as full");
        }
        Ok(())
    }

    /// Writes the current FS tree to the device and refreshes this cache
    /// from the resulting disc state (spec.md §4.4).
    pub async fn flush_cache(&mut self) -> Result<()> {
        self.transfer.write_toc(&self.root).await?;
        self.refresh_cache().await
    }

    /// Finds the on-disc track index of the hidden track backing file ID
    /// `id`, or `None` if it has no payload yet.
    pub fn resolve_id_to_index(&self, id: u8) -> Option<usize> {
        let title = format!("h_fs_{id:02x}");
        self.tracks.iter().find(|t| t.title == title).map(|t| t.index)
    }

    /// Erases the track at `index` with no cache refresh and no bookkeeping
    /// beyond the erase itself, for callers (unlink, write-open's
    /// erase-before-overwrite) that manage the surrounding state
    /// themselves.
    pub async fn erase_only(&mut self, index: usize) -> Result<()> {
        self.transfer.delete_track(index).await
    }

    /// Gets (creating if needed) the streaming buffer backing an
    /// in-progress read of the TFS-hidden file with track ID `id`.
    pub fn hidden_buffer(&mut self, id: u8) -> StreamBuffer {
        self.hidden_file_cache
            .entry(id)
            .or_insert_with(StreamBuffer::new)
            .clone()
    }

    /// Erases the audio track at `index` (used by `/$audio` unlink) and
    /// drops any cached streaming buffer for it.
    pub async fn delete_audio_track(&mut self, index: usize) -> Result<()> {
        self.transfer.delete_track(index).await?;
        self.audio_file_cache.remove(&index);
        self.refresh_cache().await
    }

    /// Gets (creating if needed) the streaming buffer backing an in-progress
    /// read of audio track `index`.
    pub fn audio_buffer(&mut self, index: usize) -> StreamBuffer {
        self.audio_file_cache
            .entry(index)
            .or_insert_with(StreamBuffer::new)
            .clone()
    }

    /// Every File node currently reachable from the tree root, for
    /// diagnostics (`/$system/handles`) and invariant checks.
    pub fn all_file_nodes(&self) -> Vec<&crate::fs_tree::FileNode> {
        all_files(&self.root)
    }
}

