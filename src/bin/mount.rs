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

    src/bin/mount.rs

    Entry point: parses a handful of flags, wires `env_logger` over the
    library's `log` calls, and mounts the TFS overlay at a mountpoint
    (default `./mnt`, matching the reference host in spec.md §6.1).

    This binary does not speak NetMD USB itself — `device::DeviceDriver` is
    an external collaborator (spec.md §1) implemented by whatever driver
    crate an integrator links in. `StubDriver` below stands in for that
    driver so this binary links and runs standalone; swap it for a real
    `DeviceDriver` impl to talk to actual hardware.
*/
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use netmd_tfs_fs::device::{
    ChunkStream, DeviceDriver, DiscAddress, RecoveryOptions, Toc, TrackListing, UtocSector, WireFormat,
};
use netmd_tfs_fs::error::{Result, TfsError};
use netmd_tfs_fs::fuse_binding::{self, MountConfig};
use netmd_tfs_fs::vfs::Adapter;

struct Args {
    mountpoint: PathBuf,
    read_only: bool,
    allow_other: bool,
}

fn parse_args() -> Args {
    let mut mountpoint = PathBuf::from("./mnt");
    let mut read_only = false;
    let mut allow_other = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--read-only" => read_only = true,
            "--allow-other" => allow_other = true,
            other => mountpoint = PathBuf::from(other),
        }
    }
    Args {
        mountpoint,
        read_only,
        allow_other,
    }
}

/// No NetMD hardware attached to this binary; every operation reports an
/// I/O error. Present so `cargo build --bin netmd-tfs-mount` links without a
/// real driver dependency.
struct StubDriver;

#[async_trait]
impl DeviceDriver for StubDriver {
    async fn list_tracks(&self) -> Result<Vec<TrackListing>> {
        Err(unwired())
    }

    async fn read_utoc_sector(&self, _i: usize) -> Result<UtocSector> {
        Err(unwired())
    }

    async fn write_utoc_sector(&self, _i: usize, _data: &UtocSector) -> Result<()> {
        Err(unwired())
    }

    async fn erase_track(&self, _index: usize) -> Result<()> {
        Err(unwired())
    }

    async fn download_track_stream(&self, _index: usize, _opts: RecoveryOptions) -> Result<ChunkStream> {
        Err(unwired())
    }

    async fn upload_track(&self, _name: &str, _format: WireFormat, _data: Vec<u8>) -> Result<()> {
        Err(unwired())
    }

    async fn force_toc_commit(&self) -> Result<()> {
        Err(unwired())
    }

    fn parse_toc(&self, _sector0: &UtocSector, _sector1: &UtocSector) -> Result<Toc> {
        Err(unwired())
    }

    fn reconstruct_toc(&self, _toc: &Toc) -> Result<(UtocSector, UtocSector)> {
        Err(unwired())
    }

    fn disc_address_to_logical(&self, addr: DiscAddress) -> u32 {
        addr.0
    }
}

fn unwired() -> TfsError {
    TfsError::Io("no NetMD device driver is wired into this binary".to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args = parse_args();
    if !args.mountpoint.is_dir() {
        log::error!("mountpoint {} is not a directory", args.mountpoint.display());
        return ExitCode::FAILURE;
    }

    let adapter = Adapter::new(Arc::new(StubDriver));
    if let Err(e) = adapter.init().await {
        log::warn!("initial TFS load failed, starting with an empty tree: {e}");
    }

    let cfg = MountConfig {
        mountpoint: args.mountpoint,
        read_only: args.read_only,
        allow_other: args.allow_other,
    };

    match fuse_binding::mount(adapter, cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("mount failed: {e}");
            ExitCode::FAILURE
        }
    }
}
