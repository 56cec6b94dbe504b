use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use filesys::{Clock, FileSystem, SECTOR_SIZE};

use crate::{asctime, BlockFile, HostClock};

fn image(name: &str, num_sectors: usize) -> (Arc<BlockFile>, PathBuf) {
    let path = std::env::temp_dir().join(format!("filesys-{}-{name}.img", std::process::id()));
    let fd = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .unwrap();
    fd.set_len((num_sectors * SECTOR_SIZE) as u64).unwrap();
    (Arc::new(BlockFile(Mutex::new(fd))), path)
}

#[test]
fn asctime_layout() {
    assert_eq!(asctime(0), "Thu Jan  1 00:00:00 1970\n");
    assert_eq!(asctime(951_868_799), "Tue Feb 29 23:59:59 2000\n");
    assert_eq!(asctime(1_792_143_000), "Fri Oct 16 09:30:00 2026\n");
}

#[test]
fn host_clock_fits_time_field() {
    let now = HostClock.now();
    assert_eq!(now.len(), 25);
    assert!(now.ends_with('\n'));
}

#[test]
fn image_survives_remount() {
    let (block_file, path) = image("remount", 256);

    let fs = FileSystem::format(block_file.clone(), 256)
        .unwrap()
        .with_clock(Arc::new(HostClock));
    fs.create("a.txt", 300).unwrap();
    fs.open("a.txt").unwrap().write_at(100, b"on the host disk");
    drop(fs);

    let fs = FileSystem::mount(block_file, 256);
    assert_eq!(fs.list(), ["a.txt"]);
    let mut buf = [0; 16];
    fs.open("a.txt").unwrap().read_at(100, &mut buf);
    assert_eq!(&buf, b"on the host disk");

    std::fs::remove_file(path).unwrap();
}
