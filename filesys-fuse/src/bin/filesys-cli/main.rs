mod cli;

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use clap::Parser;
use cli::{Cli, Command, Disk};
use filesys::{FileSystem, SECTOR_SIZE};
use filesys_fuse::{BlockFile, HostClock};

fn main() -> io::Result<()> {
    env_logger::init();
    let Cli { disk, command } = Cli::parse();

    match command {
        Command::Format => {
            FileSystem::format(open_image(&disk, true)?, disk.sectors).map_err(io::Error::other)?;
            log::info!("formatted {:?} with {} sectors", disk.image, disk.sectors);
        }
        Command::Cp { source, name } => {
            let fs = mount(&disk)?;
            let data = fs::read(&source)?;
            fs.create(&name, data.len()).map_err(io::Error::other)?;
            let written = fs.open(&name).map_err(io::Error::other)?.write_at(0, &data);
            println!("copied {written} bytes from {source:?} to {name:?}");
        }
        Command::Cat { name } => {
            let file = mount(&disk)?.open(&name).map_err(io::Error::other)?;
            let mut data = vec![0; file.length()];
            file.read_at(0, &mut data);
            io::stdout().write_all(&data)?;
        }
        Command::Ls => {
            for name in mount(&disk)?.list() {
                println!("{name}");
            }
        }
        Command::Rm { name } => mount(&disk)?.remove(&name).map_err(io::Error::other)?,
        Command::Dump => {
            let mut out = String::new();
            mount(&disk)?.print(&mut out).map_err(io::Error::other)?;
            print!("{out}");
        }
    }

    Ok(())
}

fn open_image(disk: &Disk, wipe: bool) -> io::Result<Arc<BlockFile>> {
    let fd = OpenOptions::new()
        .read(true)
        .write(true)
        .create(wipe)
        .truncate(wipe)
        .open(&disk.image)?;
    fd.set_len((disk.sectors * SECTOR_SIZE) as u64)?;

    Ok(Arc::new(BlockFile(Mutex::new(fd))))
}

fn mount(disk: &Disk) -> io::Result<FileSystem> {
    let fs = FileSystem::mount(open_image(disk, false)?, disk.sectors);
    Ok(fs.with_clock(Arc::new(HostClock)))
}
