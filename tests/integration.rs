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

    tests/integration.rs

    Exercises `vfs::Adapter` end to end against the fake device driver in
    `support`, covering the scenarios and testable properties from spec.md
    §8 that a single module's unit tests can't reach on their own (listing
    across both `/$audio` and the TFS tree together, concurrent reads
    sharing one transfer, mode-bit stamping on flush).
*/
mod support;

use std::sync::Arc;
use std::time::Duration;

use netmd_tfs_fs::device::{FragmentMode, TrackEncoding};
use netmd_tfs_fs::vfs::Adapter;
use support::FakeDevice;

fn adapter_over(device: FakeDevice) -> (Adapter, Arc<FakeDevice>) {
    let device = Arc::new(device);
    (Adapter::new(device.clone()), device)
}

/// S5 — audio listing: hidden `h_fs_*` tracks are excluded, titles with `/`
/// are sanitized, untitled tracks fall back to "No Title", and SP/LP pick
/// the `.aea`/`.wav` extension.
#[tokio::test]
async fn s5_audio_listing_excludes_hidden_tracks() {
    let device = FakeDevice::new();
    device.seed_track(0, "Hello/World", TrackEncoding::Sp, 10, FragmentMode::SP_MODE | FragmentMode::STEREO);
    device.seed_track(1, "h_fs_00", TrackEncoding::Lp2, 1, FragmentMode::empty());
    device.seed_track(2, "", TrackEncoding::Lp, 5, FragmentMode::empty());
    let (adapter, _device) = adapter_over(device);
    adapter.init().await.unwrap();

    let mut names: Vec<String> = adapter
        .readdir("/$audio")
        .await
        .unwrap()
        .into_iter()
        .map(|(n, _)| n)
        .collect();
    names.sort();

    assert_eq!(names, vec!["1. Hello_World.aea".to_string(), "3. No Title.wav".to_string()]);
}

/// S6 — two concurrent readers of the same unread audio file trigger
/// exactly one device transfer and both observe the same prefix once it is
/// available.
#[tokio::test]
async fn s6_concurrent_audio_reads_share_one_transfer() {
    let device = FakeDevice::new();
    device.seed_track(0, "Track", TrackEncoding::Sp, 4, FragmentMode::SP_MODE | FragmentMode::STEREO);
    device.set_payload(0, vec![7u8; 4096]);
    let (adapter, device) = adapter_over(device);
    adapter.init().await.unwrap();

    let name = adapter
        .readdir("/$audio")
        .await
        .unwrap()
        .into_iter()
        .map(|(n, _)| n)
        .next()
        .unwrap();
    let path = format!("/$audio/{name}");

    let fh_a = adapter.open(&path, libc::O_RDONLY).await.unwrap();
    let fh_b = adapter.open(&path, libc::O_RDONLY).await.unwrap();

    let a = adapter.clone();
    let b = adapter.clone();
    let (ra, rb) = tokio::join!(
        tokio::time::timeout(Duration::from_secs(2), a.read(fh_a, 0, 1024)),
        tokio::time::timeout(Duration::from_secs(2), b.read(fh_b, 0, 1024)),
    );
    let ra = ra.unwrap().unwrap();
    let rb = rb.unwrap().unwrap();

    assert_eq!(ra, rb);
    assert_eq!(ra.len(), 1024);
    assert_eq!(device.download_call_count(), 1);
}

/// Testable property 6 — after `write_toc` (triggered here by sealing a
/// newly created TFS file), every fragment of every `h_fs_*` track carries
/// SP_MODE + STEREO and has WRITABLE cleared.
#[tokio::test]
async fn mode_stamping_clears_writable_on_hidden_tracks() {
    let device = FakeDevice::new();
    let (adapter, device) = adapter_over(device);
    adapter.init().await.unwrap();

    let fh = adapter.create("/a.bin").await.unwrap();
    adapter.write(fh, 0, &[1, 2, 3]).await.unwrap();
    adapter.release(fh).await.unwrap();

    let modes = device.fragment_modes_for("h_fs_00");
    assert!(!modes.is_empty());
    for mode in modes {
        assert!(mode.contains(FragmentMode::SP_MODE));
        assert!(mode.contains(FragmentMode::STEREO));
        assert!(!mode.contains(FragmentMode::WRITABLE));
    }
}

/// Testable property 3 — flushing twice with no mutation between produces
/// the same committed UTOC sector 2 bytes.
#[tokio::test]
async fn idempotent_flush_produces_same_sector() {
    let device = FakeDevice::new();
    let (adapter, device) = adapter_over(device);
    adapter.init().await.unwrap();

    let fh = adapter.create("/a.bin").await.unwrap();
    adapter.write(fh, 0, &[9, 9]).await.unwrap();
    adapter.release(fh).await.unwrap();

    let before = device.sectors_snapshot();

    let flush_fh = adapter.open("/$system/force_immediate_flush", libc::O_WRONLY).await.unwrap();
    adapter.write(flush_fh, 0, &[0]).await.unwrap();
    adapter.release(flush_fh).await.unwrap();

    let after = device.sectors_snapshot();
    assert_eq!(before[2], after[2]);
}

/// Testable property 4 — after a cache refresh, the next allocated file ID
/// is the smallest integer in `0..256` not already used as an `h_fs_XX`
/// suffix.
#[tokio::test]
async fn next_file_id_fills_the_gap() {
    let device = FakeDevice::new();
    device.seed_track(0, "h_fs_00", TrackEncoding::Lp2, 1, FragmentMode::empty());
    device.seed_track(1, "h_fs_02", TrackEncoding::Lp2, 1, FragmentMode::empty());
    let (adapter, device) = adapter_over(device);
    adapter.init().await.unwrap();

    let fh = adapter.create("/b.bin").await.unwrap();
    adapter.write(fh, 0, &[1]).await.unwrap();
    adapter.release(fh).await.unwrap();

    // track ID 1 was the only free slot below the seeded 0 and 2, so the
    // new file must have landed on h_fs_01.
    assert!(!device.fragment_modes_for("h_fs_01").is_empty());
}

/// S4 — unlinking a TFS file whose backing track has a payload erases
/// that track and removes it from the tree.
#[tokio::test]
async fn s4_unlink_erases_backing_track() {
    let device = FakeDevice::new();
    let (adapter, device) = adapter_over(device);
    adapter.init().await.unwrap();

    let fh = adapter.create("/a.bin").await.unwrap();
    adapter.write(fh, 0, &[1, 2, 3, 4]).await.unwrap();
    adapter.release(fh).await.unwrap();
    assert!(adapter.getattr("/a.bin").await.is_ok());

    adapter.unlink("/a.bin").await.unwrap();

    assert!(adapter.getattr("/a.bin").await.is_err());
    assert!(device.fragment_modes_for("h_fs_00").is_empty());
}
