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

    tests/support.rs

    A fake in-memory `DeviceDriver`, richer than the one colocated with
    `src/device.rs`'s own unit tests: it models real fragment geometry so
    the integration suite can assert on sector-length math and mode-bit
    stamping, not just track presence.
*/
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream;
use netmd_tfs_fs::device::{
    Chunk, ChunkStream, DeviceDriver, DiscAddress, Fragment, FragmentMode, RecoveryOptions, Toc,
    TrackEncoding, TrackListing, UtocSector, WireFormat, SECTOR_SIZE,
};
use netmd_tfs_fs::error::Result;

pub struct FakeDevice {
    sectors: Mutex<[UtocSector; 3]>,
    tracks: Mutex<Vec<Option<TrackListing>>>,
    payloads: Mutex<HashMap<usize, Vec<u8>>>,
    toc: Mutex<Toc>,
    force_commits: Mutex<u32>,
    download_calls: Mutex<u32>,
    utoc_write_calls: Mutex<u32>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self {
            sectors: Mutex::new([[0u8; SECTOR_SIZE]; 3]),
            tracks: Mutex::new(Vec::new()),
            payloads: Mutex::new(HashMap::new()),
            toc: Mutex::new(Toc::default()),
            force_commits: Mutex::new(0),
            download_calls: Mutex::new(0),
            utoc_write_calls: Mutex::new(0),
        }
    }

    /// Registers a track at a specific index with a one-fragment chain
    /// spanning `sectors` logical sectors in `mode`. Grows the track and
    /// fragment tables as needed.
    pub fn seed_track(&self, index: usize, title: &str, encoding: TrackEncoding, sectors: u32, mode: FragmentMode) {
        {
            let mut tracks = self.tracks.lock().unwrap();
            if tracks.len() <= index {
                tracks.resize(index + 1, None);
            }
            tracks[index] = Some(TrackListing {
                index,
                title: title.to_string(),
                encoding,
            });
        }
        let mut toc = self.toc.lock().unwrap();
        if toc.fragments.is_empty() {
            toc.fragments.push(Fragment {
                mode: FragmentMode::empty(),
                start: DiscAddress(0),
                end: DiscAddress(0),
                next: 0,
            });
        }
        let frag_index = toc.fragments.len();
        toc.fragments.push(Fragment {
            mode,
            start: DiscAddress(0),
            end: DiscAddress(sectors),
            next: 0,
        });
        if toc.track_map.len() <= index + 1 {
            toc.track_map.resize(index + 2, 0);
        }
        toc.track_map[index + 1] = frag_index as u16;
    }

    pub fn set_payload(&self, index: usize, data: Vec<u8>) {
        self.payloads.lock().unwrap().insert(index, data);
    }

    pub fn force_commit_count(&self) -> u32 {
        *self.force_commits.lock().unwrap()
    }

    pub fn download_call_count(&self) -> u32 {
        *self.download_calls.lock().unwrap()
    }

    pub fn utoc_write_call_count(&self) -> u32 {
        *self.utoc_write_calls.lock().unwrap()
    }

    pub fn sectors_snapshot(&self) -> [UtocSector; 3] {
        *self.sectors.lock().unwrap()
    }

    pub fn fragment_modes_for(&self, title: &str) -> Vec<FragmentMode> {
        let tracks = self.tracks.lock().unwrap();
        let toc = self.toc.lock().unwrap();
        let Some(track) = tracks.iter().flatten().find(|t| t.title == title) else {
            return Vec::new();
        };
        toc.fragments_for_track(track.index)
            .into_iter()
            .map(|i| toc.fragments[i].mode)
            .collect()
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
        if let Some(slot) = self.tracks.lock().unwrap().get_mut(index) {
            *slot = None;
        }
        self.payloads.lock().unwrap().remove(&index);
        Ok(())
    }

    async fn download_track_stream(&self, index: usize, opts: RecoveryOptions) -> Result<ChunkStream> {
        *self.download_calls.lock().unwrap() += 1;
        let data = self.payloads.lock().unwrap().get(&index).cloned().unwrap_or_default();
        let mut chunks = Vec::new();
        if opts.audio_track {
            chunks.push(Chunk::Header(vec![0xAA; 4]));
        }
        chunks.push(Chunk::AudioData(data));
        chunks.push(Chunk::Other);
        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn upload_track(&self, name: &str, format: WireFormat, data: Vec<u8>) -> Result<()> {
        let encoding = match format {
            WireFormat::Lp2 => TrackEncoding::Lp2,
        };
        let index = {
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
            index
        };
        let sectors = (data.len() as u32).div_ceil(2332).max(1);
        self.payloads.lock().unwrap().insert(index, data);

        let mut toc = self.toc.lock().unwrap();
        if toc.fragments.is_empty() {
            toc.fragments.push(Fragment {
                mode: FragmentMode::empty(),
                start: DiscAddress(0),
                end: DiscAddress(0),
                next: 0,
            });
        }
        let frag_index = toc.fragments.len();
        toc.fragments.push(Fragment {
            mode: FragmentMode::empty(),
            start: DiscAddress(0),
            end: DiscAddress(sectors),
            next: 0,
        });
        if toc.track_map.len() <= index + 1 {
            toc.track_map.resize(index + 2, 0);
        }
        toc.track_map[index + 1] = frag_index as u16;

        Ok(())
    }

    async fn force_toc_commit(&self) -> Result<()> {
        *self.force_commits.lock().unwrap() += 1;
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
