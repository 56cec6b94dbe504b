#[cfg(test)]
mod tests;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use block_dev::BlockDevice;
use filesys::{Clock, SECTOR_SIZE};

/// 以宿主机上的一个文件作为磁盘镜像
pub struct BlockFile(pub Mutex<File>);

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        let mut file = self.0.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * SECTOR_SIZE) as u64))
            .expect("seeking error");
        assert_eq!(buf.len(), SECTOR_SIZE, "not a complete block!");
        file.read_exact(buf).expect("reading past the end of image");
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        let mut file = self.0.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * SECTOR_SIZE) as u64))
            .expect("seeking error");
        assert_eq!(buf.len(), SECTOR_SIZE, "not a complete block!");
        file.write_all(buf).expect("writing image failed");
    }
}

/// 宿主机的系统时钟，按 UTC 给出 `Thu Oct 16 09:30:00 2026` 式样的时间
pub struct HostClock;

impl Clock for HostClock {
    fn now(&self) -> String {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        asctime(secs)
    }
}

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// 把自纪元起的秒数格式化为 asctime 的样子，带结尾换行
pub fn asctime(secs: u64) -> String {
    let days = secs / 86400;
    let rem = secs % 86400;
    let (hour, minute, second) = (rem / 3600, rem % 3600 / 60, rem % 60);
    // 1970-01-01 是星期四
    let weekday = WEEKDAYS[((days + 4) % 7) as usize];
    let (year, month, day) = civil_from_days(days);

    format!(
        "{weekday} {} {day:2} {hour:02}:{minute:02}:{second:02} {year}\n",
        MONTHS[month - 1]
    )
}

/// 天数换算成公历日期，月份从 1 开始
fn civil_from_days(days: u64) -> (u64, usize, u64) {
    // 以 0000-03-01 为起点，每 400 年一个周期
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);

    (year, month as usize, day)
}
