mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use filesys::{
    Clock, Error, FileSystem, MAX_FILE_SIZE, NUM_DIRECT, NUM_DIR_ENTRIES, NUM_SECTORS, SECTOR_SIZE,
};

use common::formatted;

/// 位图文件 1 个扇区，目录文件 4 个扇区，再加两个文件头扇区
const RESERVED_SECTORS: usize = 2 + 1 + 4;

struct TickClock(AtomicUsize);

impl Clock for TickClock {
    fn now(&self) -> String {
        format!("tick {}", self.0.fetch_add(1, Ordering::SeqCst))
    }
}

#[test]
fn format_reserves_metadata_sectors() {
    let (fs, _) = formatted();
    assert_eq!(fs.num_free_sectors(), NUM_SECTORS - RESERVED_SECTORS);
    assert!(fs.list().is_empty());
}

#[test]
fn mount_sees_what_format_wrote() {
    let (fs, disk) = formatted();
    fs.create("hello.txt", 200).unwrap();
    fs.open("hello.txt")
        .unwrap()
        .write_at(0, b"persisted across mounts");
    let free = fs.num_free_sectors();
    drop(fs);

    let fs = FileSystem::mount(disk, NUM_SECTORS);
    assert_eq!(fs.list(), ["hello.txt"]);
    assert_eq!(fs.num_free_sectors(), free);

    let file = fs.open("hello.txt").unwrap();
    assert_eq!(file.length(), 200);
    let mut buf = [0; 23];
    assert_eq!(file.read_at(0, &mut buf), 23);
    assert_eq!(&buf, b"persisted across mounts");
}

#[test]
fn create_rejects_bad_requests_without_side_effects() {
    let (fs, _) = formatted();
    fs.create("a", 10).unwrap();
    let free = fs.num_free_sectors();

    assert_eq!(fs.create("a", 10), Err(Error::AlreadyExists));
    assert_eq!(fs.create(&"n".repeat(28), 10), Err(Error::NameTooLong));
    assert_eq!(fs.create("", 10), Err(Error::EmptyName));
    assert_eq!(
        fs.create("big", MAX_FILE_SIZE + 1),
        Err(Error::FileTooLarge)
    );

    assert_eq!(fs.num_free_sectors(), free);
    assert_eq!(fs.list(), ["a"]);

    fs.create(&"n".repeat(27), 0).unwrap();
}

#[test]
fn directory_fills_up() {
    let (fs, _) = formatted();
    for i in 0..NUM_DIR_ENTRIES {
        fs.create(&format!("f{i}"), 0).unwrap();
    }
    assert_eq!(fs.create("extra", 0), Err(Error::DirectoryFull));

    fs.remove("f3").unwrap();
    fs.create("extra", 0).unwrap();
    assert_eq!(fs.list().len(), NUM_DIR_ENTRIES);
}

#[test]
fn disk_fills_up() {
    let (fs, _) = formatted();
    let mut created = 0;
    loop {
        match fs.create(&format!("f{created}"), MAX_FILE_SIZE) {
            Ok(()) => created += 1,
            Err(err) => {
                assert_eq!(err, Error::DirectoryFull);
                break;
            }
        }
    }
    assert_eq!(created, NUM_DIR_ENTRIES);

    // 16 个满额文件用不完 1024 个扇区，换个小盘
    let disk = common::ram_disk();
    let fs = FileSystem::format(disk, 40).unwrap();
    assert_eq!(fs.create("a", MAX_FILE_SIZE), Err(Error::NoSpace));
    assert_eq!(fs.num_free_sectors(), 40 - RESERVED_SECTORS);
    assert!(fs.list().is_empty());
}

#[test]
fn remove_returns_every_sector() {
    let (fs, _) = formatted();
    let free = fs.num_free_sectors();

    fs.create("small", 300).unwrap();
    fs.create("large", MAX_FILE_SIZE).unwrap();
    assert_eq!(fs.num_free_sectors(), free - (1 + 3) - (1 + 40 + 1));

    fs.remove("large").unwrap();
    fs.remove("small").unwrap();
    assert_eq!(fs.num_free_sectors(), free);
    assert_eq!(fs.remove("small"), Err(Error::NotFound));
    assert!(matches!(fs.open("small"), Err(Error::NotFound)));
}

#[test]
fn write_grows_file_within_direct_range() {
    let (fs, _) = formatted();
    fs.create("grow", 10).unwrap();
    let free = fs.num_free_sectors();

    let mut file = fs.open("grow").unwrap();
    let data = [7u8; 300];
    assert_eq!(file.write_at(0, &data), 300);
    assert_eq!(file.length(), 300);
    assert_eq!(fs.num_free_sectors(), free - 2);

    // 重新打开也能看到新长度
    let file = fs.open("grow").unwrap();
    let mut buf = [0; 300];
    assert_eq!(file.read_at(0, &mut buf), 300);
    assert_eq!(buf, data);
}

#[test]
fn write_is_clamped_when_growth_fails() {
    let (fs, _) = formatted();
    let length = NUM_DIRECT * SECTOR_SIZE - 10;
    fs.create("edge", length).unwrap();
    let free = fs.num_free_sectors();

    let mut file = fs.open("edge").unwrap();
    assert_eq!(file.write_at(length - 4, &[1; 100]), 4);
    assert_eq!(file.length(), length);
    assert_eq!(fs.num_free_sectors(), free);
}

#[test]
fn two_handles_grow_the_same_file() {
    let (fs, _) = formatted();
    let free = fs.num_free_sectors();
    fs.create("shared", 10).unwrap();

    let mut first = fs.open("shared").unwrap();
    let mut second = fs.open("shared").unwrap();
    assert_eq!(first.write_at(0, &[1; 200]), 200);
    assert_eq!(second.write_at(0, &[2; 300]), 300);
    assert_eq!(first.write_at(300, &[3; 100]), 100);
    assert_eq!(second.length(), 400);

    let mut buf = [0; 400];
    assert_eq!(second.read_at(0, &mut buf), 400);
    assert_eq!(buf[..300], [2; 300]);
    assert_eq!(buf[300..], [3; 100]);

    drop((first, second));
    fs.remove("shared").unwrap();
    assert_eq!(fs.num_free_sectors(), free);
}

#[test]
fn new_file_reads_zeros() {
    let (fs, _) = formatted();
    fs.create("old", SECTOR_SIZE).unwrap();
    fs.open("old").unwrap().write_at(0, &[b'S'; SECTOR_SIZE]);
    fs.remove("old").unwrap();

    fs.create("new", SECTOR_SIZE).unwrap();
    let mut buf = [0xff; SECTOR_SIZE];
    assert_eq!(fs.open("new").unwrap().read_at(0, &mut buf), SECTOR_SIZE);
    assert_eq!(buf, [0; SECTOR_SIZE]);
}

#[test]
fn write_past_end_zeroes_the_gap() {
    let (fs, _) = formatted();
    fs.create("old", 3 * SECTOR_SIZE).unwrap();
    fs.open("old").unwrap().write_at(0, &[b'S'; 3 * SECTOR_SIZE]);
    fs.remove("old").unwrap();

    // 扩容拿到的正是刚释放、还留着旧数据的扇区
    fs.create("gap", 0).unwrap();
    let mut file = fs.open("gap").unwrap();
    assert_eq!(file.write_at(300, b"end"), 3);
    assert_eq!(file.length(), 303);

    let mut buf = [0xff; 303];
    assert_eq!(file.read_at(0, &mut buf), 303);
    assert_eq!(buf[..300], [0; 300]);
    assert_eq!(&buf[300..], b"end");
}

#[test]
fn sequential_read_and_write() {
    let (fs, _) = formatted();
    fs.create("seq", 0).unwrap();

    let mut file = fs.open("seq").unwrap();
    assert_eq!(file.write(b"hello "), 6);
    assert_eq!(file.write(b"world"), 5);

    file.seek(0);
    let mut buf = [0; 32];
    assert_eq!(file.read(&mut buf), 11);
    assert_eq!(&buf[..11], b"hello world");
    assert_eq!(file.read(&mut buf), 0);
}

#[test]
fn clock_stamps_headers() {
    let (fs, _) = formatted();
    let fs = fs.with_clock(Arc::new(TickClock(AtomicUsize::new(0))));

    fs.create("log.txt", 16).unwrap();
    let mut file = fs.open("log.txt").unwrap();
    assert_eq!(file.header().file_type(), "txt");
    assert_eq!(file.header().created_time(), "tick 0");
    assert_eq!(file.header().modified_time(), "tick 0");

    file.write_at(0, b"x");
    let header = fs.open("log.txt").unwrap().header();
    assert_eq!(header.created_time(), "tick 0");
    assert_eq!(header.modified_time(), "tick 1");
    assert_eq!(header.visited_time(), "tick 0");

    fs.create("Makefile", 0).unwrap();
    assert_eq!(fs.open("Makefile").unwrap().header().file_type(), "None");
}

#[test]
fn print_lists_files() {
    let (fs, _) = formatted();
    fs.create("note.md", 5).unwrap();
    fs.open("note.md").unwrap().write_at(0, b"# hi\n");

    let mut out = String::new();
    fs.print(&mut out).unwrap();
    assert!(out.starts_with("Bit map file header:"));
    assert!(out.contains("Directory file header:"));
    assert!(out.contains(&format!(
        "Free sectors: {} of {NUM_SECTORS}",
        fs.num_free_sectors()
    )));
    assert!(out.contains("Name: note.md, Sector: 7"));
    assert!(out.contains("# hi\\a"));
}
