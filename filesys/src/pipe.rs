//! # 管道层
//!
//! 管道是一个定长的环形缓冲区，数据存放在一个隐藏文件里。
//! 容量为 `size + 1` 字节，始终空出一个哨兵字节，以区分满与空：
//! - 空：`head == tail`
//! - 满：`(tail + 1) % capacity == head`
//!
//! [`Pipe::read`] 与 [`Pipe::write`] 从不阻塞，缓冲区空或满时直接返回 0；
//! 需要等待时使用 [`Pipe::read_blocking`] 与 [`Pipe::write_blocking`]。

use alloc::format;
use alloc::string::String;
use core::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, warn};
use spin::relax::RelaxStrategy;
use spin::Mutex;

use crate::{Error, FileSystem, OpenFile, Result, SECTOR_SIZE};

/// 管道文件的编号只增不减，保证同一时刻不会撞名
static PIPE_NUMBER: AtomicUsize = AtomicUsize::new(0);

pub struct Pipe {
    name: String,
    fs: FileSystem,
    ring_buffer: Mutex<PipeRingBuffer>,
}

struct PipeRingBuffer {
    file: OpenFile,
    /// 下一个可读字节的位置
    head: usize,
    /// 下一个可写字节的位置
    tail: usize,
    capacity: usize,
}

impl Pipe {
    /// 缺省能缓存一个扇区的数据
    pub const DEFAULT_SIZE: usize = SECTOR_SIZE;

    /// 新建能缓存 `size` 字节的管道，`size` 为 0 或底层文件创建、打开失败时返回错误
    pub fn new(fs: &FileSystem, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::ZeroSizedPipe);
        }
        let capacity = size + 1;
        let name = format!(
            "__pipe_{capacity}_{}__",
            PIPE_NUMBER.fetch_add(1, Ordering::Relaxed)
        );

        fs.create(&name, capacity)?;
        let file = match fs.open(&name) {
            Ok(file) => file,
            Err(err) => {
                // 打不开就别留下孤儿文件
                if let Err(err) = fs.remove(&name) {
                    warn!("cannot remove pipe file {name:?}: {err}");
                }
                return Err(err);
            }
        };
        debug!("pipe {name:?} created with capacity {capacity}");

        Ok(Self {
            name,
            fs: fs.clone(),
            ring_buffer: Mutex::new(PipeRingBuffer {
                file,
                head: 0,
                tail: 0,
                capacity,
            }),
        })
    }

    /// 读出至多 `buf.len()` 字节，返回实际读出的字节数；管道为空时返回 0
    pub fn read(&self, buf: &mut [u8]) -> usize {
        self.exclusive_session(|ring_buffer| ring_buffer.pop(buf))
    }

    /// 写入至多 `buf.len()` 字节，返回实际写入的字节数；管道已满时返回 0
    pub fn write(&self, buf: &[u8]) -> usize {
        self.exclusive_session(|ring_buffer| ring_buffer.push(buf))
    }

    /// 等到管道里有数据为止，然后读出能读的部分
    pub fn read_blocking<R: RelaxStrategy>(&self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }

        loop {
            let read_len = self.read(buf);
            if read_len > 0 {
                return read_len;
            }
            // 让出处理器，等写者往里放数据
            R::relax();
        }
    }

    /// 直到 `buf` 全部写入才返回
    pub fn write_blocking<R: RelaxStrategy>(&self, buf: &[u8]) -> usize {
        let mut written_len = 0;

        while written_len < buf.len() {
            let len = self.write(&buf[written_len..]);
            if len == 0 {
                R::relax();
            }
            written_len += len;
        }

        written_len
    }

    /// 可读的字节数
    pub fn len(&self) -> usize {
        self.exclusive_session(|ring_buffer| ring_buffer.readables())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.exclusive_session(|ring_buffer| ring_buffer.writables() == 0)
    }

    /// 最多能缓存的字节数，不含哨兵字节
    pub fn capacity(&self) -> usize {
        self.exclusive_session(|ring_buffer| ring_buffer.capacity - 1)
    }

    /// 底层文件的名字
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Pipe {
    fn exclusive_session<V>(&self, f: impl FnOnce(&mut PipeRingBuffer) -> V) -> V {
        let mut ring_buffer = self.ring_buffer.lock();
        f(&mut *ring_buffer)
    }
}

impl Drop for Pipe {
    fn drop(&mut self) {
        if let Err(err) = self.fs.remove(&self.name) {
            warn!("cannot remove pipe file {:?}: {err}", self.name);
        }
    }
}

impl PipeRingBuffer {
    fn readables(&self) -> usize {
        (self.tail + self.capacity - self.head) % self.capacity
    }

    fn writables(&self) -> usize {
        self.capacity - 1 - self.readables()
    }

    fn pop(&mut self, buf: &mut [u8]) -> usize {
        let len = buf.len().min(self.readables());
        if len == 0 {
            return 0;
        }

        // 未越过缓冲区末尾时一次读完，否则先读到末尾，再从头读剩下的部分
        let first = len.min(self.capacity - self.head);
        let mut read_len = self.file.read_at(self.head, &mut buf[..first]);
        if len > first {
            read_len += self.file.read_at(0, &mut buf[first..len]);
        }

        self.head = (self.head + read_len) % self.capacity;
        read_len
    }

    fn push(&mut self, buf: &[u8]) -> usize {
        let len = buf.len().min(self.writables());
        if len == 0 {
            return 0;
        }

        let first = len.min(self.capacity - self.tail);
        let mut written_len = self.file.write_at(self.tail, &buf[..first]);
        if len > first {
            written_len += self.file.write_at(0, &buf[first..len]);
        }

        self.tail = (self.tail + written_len) % self.capacity;
        written_len
    }
}
