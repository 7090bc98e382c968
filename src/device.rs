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

    src/device.rs

    The device driver boundary (spec.md §6.2): an opaque collaborator this
    crate does not implement. Everything below is the *shape* of that
    collaborator, the same role `track::Track` plays in the teacher as a
    boundary trait downcastable to a concrete representation — here the
    "concrete representation" is a real NetMD USB driver, which lives
    outside this crate.
*/
use std::pin::Pin;

use async_trait::async_trait;
use bitflags::bitflags;
use futures_util::Stream;

use crate::error::Result;

/// Every UTOC sector is a fixed 2352-byte CD-style sector.
pub const SECTOR_SIZE: usize = 2352;
pub type UtocSector = [u8; SECTOR_SIZE];

bitflags! {
    /// Per-fragment mode bits stored in the UTOC (spec.md §4.5, §8 property 6).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct FragmentMode: u8 {
        const SP_MODE  = 0b001;
        const STEREO   = 0b010;
        const WRITABLE = 0b100;
    }
}

/// A disc address as the driver presents it; opaque to this crate except
/// through `DeviceDriver::disc_address_to_logical`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct DiscAddress(pub u32);

/// One physical span of sectors belonging to a track's fragment chain.
/// `next == 0` terminates the chain (spec.md §4.4, §4.5).
#[derive(Clone, Copy, Debug)]
pub struct Fragment {
    pub mode: FragmentMode,
    pub start: DiscAddress,
    pub end: DiscAddress,
    pub next: u16,
}

/// The parsed contents of UTOC sectors 0 and 1: the track-to-fragment map
/// and fragment chain storage. Produced by [`DeviceDriver::parse_toc`] and
/// consumed by [`DeviceDriver::reconstruct_toc`].
#[derive(Clone, Debug, Default)]
pub struct Toc {
    /// `track_map[i + 1]` is the index of the first fragment for track `i`.
    pub track_map: Vec<u16>,
    /// Fragment storage; index 0 is a sentinel, never a real fragment.
    pub fragments: Vec<Fragment>,
}

impl Toc {
    /// Walks the fragment chain for track `i`, in chain order.
    pub fn fragments_for_track(&self, i: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let Some(&start) = self.track_map.get(i + 1) else {
            return out;
        };
        let mut cur = start as usize;
        let mut guard = 0usize;
        while cur != 0 && guard < self.fragments.len() + 1 {
            out.push(cur);
            cur = self.fragments[cur].next as usize;
            guard += 1;
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackEncoding {
    Sp,
    Lp,
    Lp2,
}

#[derive(Clone, Debug)]
pub struct TrackListing {
    pub index: usize,
    pub title: String,
    pub encoding: TrackEncoding,
}

#[derive(Clone, Debug)]
pub enum Chunk {
    Header(Vec<u8>),
    AudioData(Vec<u8>),
    Other,
}

pub type ChunkStream = Pin<Box<dyn Stream<Item = Chunk> + Send>>;

/// Configures a chunked recovery transfer: for TFS-hidden files, LP padding
/// is stripped and no header is emitted (the file is raw payload); for
/// audio files, the header is retained, producing a playable ATRAC file
/// (spec.md §4.5).
#[derive(Clone, Copy, Debug)]
pub struct RecoveryOptions {
    pub audio_track: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireFormat {
    Lp2,
}

/// The NetMD device driver: USB command framing, ATRAC decryption, raw
/// track recovery, and forced TOC commits. Not implemented by this crate
/// (spec.md §1); a test fake implements this trait under `#[cfg(test)]`.
#[async_trait]
pub trait DeviceDriver: Send + Sync {
    async fn list_tracks(&self) -> Result<Vec<TrackListing>>;
    async fn read_utoc_sector(&self, i: usize) -> Result<UtocSector>;
    async fn write_utoc_sector(&self, i: usize, data: &UtocSector) -> Result<()>;
    async fn erase_track(&self, index: usize) -> Result<()>;
    async fn download_track_stream(&self, index: usize, opts: RecoveryOptions) -> Result<ChunkStream>;
    async fn upload_track(&self, name: &str, format: WireFormat, data: Vec<u8>) -> Result<()>;
    async fn force_toc_commit(&self) -> Result<()>;

    fn parse_toc(&self, sector0: &UtocSector, sector1: &UtocSector) -> Result<Toc>;
    fn reconstruct_toc(&self, toc: &Toc) -> Result<(UtocSector, UtocSector)>;
    fn disc_address_to_logical(&self, addr: DiscAddress) -> u32;
}

#[cfg(test)]
pub mod tests {
    use std::sync::Mutex as StdMutex;

    use futures_util::stream;

    use super::*;

    /// An in-memory stand-in for a real NetMD driver, just capable enough to
    /// exercise the Cache/TransferCoordinator/Adapter layers above it.
    /// Sector 2 starts zeroed (an "unformatted" disc); `parse_toc` and
    /// `reconstruct_toc` are identity operations since nothing in this crate
    /// inspects fragment geometry beyond `fragments_for_track`.
    pub struct FakeDevice {
        sectors: StdMutex<[UtocSector; 3]>,
        tracks: StdMutex<Vec<Option<TrackListing>>>,
        payloads: StdMutex<std::collections::HashMap<usize, Vec<u8>>>,
        toc: StdMutex<Toc>,
        utoc_write_calls: StdMutex<u32>,
    }

    impl FakeDevice {
        pub fn new() -> Self {
            Self {
                sectors: StdMutex::new([[0u8; SECTOR_SIZE]; 3]),
                tracks: StdMutex::new(Vec::new()),
                payloads: StdMutex::new(std::collections::HashMap::new()),
                toc: StdMutex::new(Toc::default()),
                utoc_write_calls: StdMutex::new(0),
            }
        }

        pub fn utoc_write_call_count(&self) -> u32 {
            *self.utoc_write_calls.lock().unwrap()
        }
    }

    impl Default for FakeDevice {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl DeviceDriver for FakeDevice {
        async fn list_tracks(&self) -> Result<Vec<TrackListing>> {
            Ok(self.tracks.lock().unwrap().iter().flatten().cloned().collect())
        }

        async fn read_utoc_sector(&self, i: usize) -> Result<UtocSector> {
            Ok(self.sectors.lock().unwrap()[i])
        }

        async fn write_utoc_sector(&self, i: usize, data: &UtocSector) -> Result<()> {
            *self.utoc_write_calls.lock().unwrap() += 1;
            self.sectors.lock().unwrap()[i] = *data;
            Ok(())
        }

        async fn erase_track(&self, index: usize) -> Result<()> {
            let mut tracks = self.tracks.lock().unwrap();
            if let Some(slot) = tracks.get_mut(index) {
                *slot = None;
            }
            self.payloads.lock().unwrap().remove(&index);
            Ok(())
        }

        async fn download_track_stream(&self, index: usize, _opts: RecoveryOptions) -> Result<ChunkStream> {
            let data = self.payloads.lock().unwrap().get(&index).cloned().unwrap_or_default();
            Ok(Box::pin(stream::iter(vec![Chunk::AudioData(data)])))
        }

        async fn upload_track(&self, name: &str, format: WireFormat, data: Vec<u8>) -> Result<()> {
            let encoding = match format {
                WireFormat::Lp2 => TrackEncoding::Lp2,
            };
            let mut tracks = self.tracks.lock().unwrap();
            let index = tracks.iter().position(|t| t.is_none()).unwrap_or(tracks.len());
            let listing = TrackListing {
                index,
                title: name.to_string(),
                encoding,
            };
            if index == tracks.len() {
                tracks.push(Some(listing));
            }
            else {
                tracks[index] = Some(listing);
            }
            drop(tracks);
            self.payloads.lock().unwrap().insert(index, data);
            Ok(())
        }

        async fn force_toc_commit(&self) -> Result<()> {
            Ok(())
        }

        fn parse_toc(&self, _sector0: &UtocSector, _sector1: &UtocSector) -> Result<Toc> {
            Ok(self.toc.lock().unwrap().clone())
        }

        fn reconstruct_toc(&self, toc: &Toc) -> Result<(UtocSector, UtocSector)> {
            *self.toc.lock().unwrap() = toc.clone();
            let sectors = self.sectors.lock().unwrap();
            Ok((sectors[0], sectors[1]))
        }

        fn disc_address_to_logical(&self, addr: DiscAddress) -> u32 {
            addr.0
        }
    }
}
