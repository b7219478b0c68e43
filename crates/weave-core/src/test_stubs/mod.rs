//! 行为测试共用的记录型桩对象。
//!
//! # 使用方式（How）
//! - `use weave_core::test_stubs::observability::RecordingLogger;` 捕获行为写出的日志，再按级别或内容断言；
//! - `use weave_core::test_stubs::retry::RecordingPause;` 记录重试等待序列而不真正休眠；
//! - `use weave_core::test_stubs::time::ManualClock;` 以手动推进的虚拟时间驱动过期与耗时判定。
//!
//! # 契约说明（What）
//! - 桩对象线程安全，可以 `Arc` 共享给多个并发调用者；
//! - 记录按到达顺序保存，不做去重与截断，仅适用于测试规模的数据量。

pub mod observability {
    //! 记录型 [`Logger`] 实现。

    use std::error::Error;

    use parking_lot::Mutex;

    use crate::observability::{LogLevel, Logger};

    /// 一条被捕获的日志。
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct LogEntry {
        pub level: LogLevel,
        pub message: String,
        /// 附带错误的 `Display` 文本。
        pub error: Option<String>,
    }

    /// 把每次 `log` 调用保存到内存中的 Logger。
    #[derive(Debug, Default)]
    pub struct RecordingLogger {
        entries: Mutex<Vec<LogEntry>>,
    }

    impl RecordingLogger {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn entries(&self) -> Vec<LogEntry> {
            self.entries.lock().clone()
        }

        pub fn messages(&self) -> Vec<String> {
            self.entries
                .lock()
                .iter()
                .map(|entry| entry.message.clone())
                .collect()
        }

        pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
            self.entries
                .lock()
                .iter()
                .filter(|entry| entry.level == level)
                .map(|entry| entry.message.clone())
                .collect()
        }

        pub fn count(&self, level: LogLevel) -> usize {
            self.entries
                .lock()
                .iter()
                .filter(|entry| entry.level == level)
                .count()
        }

        pub fn is_empty(&self) -> bool {
            self.entries.lock().is_empty()
        }

        pub fn clear(&self) {
            self.entries.lock().clear();
        }
    }

    impl Logger for RecordingLogger {
        fn log(&self, level: LogLevel, message: &str, error: Option<&(dyn Error + 'static)>) {
            self.entries.lock().push(LogEntry {
                level,
                message: message.to_owned(),
                error: error.map(|err| err.to_string()),
            });
        }
    }
}

pub mod retry {
    //! 记录型 [`Pause`] 实现。

    use std::time::Duration;

    use parking_lot::Mutex;

    use crate::retry::Pause;

    #[derive(Debug, Default)]
    pub struct RecordingPause {
        pauses: Mutex<Vec<Duration>>,
    }

    impl RecordingPause {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn pauses(&self) -> Vec<Duration> {
            self.pauses.lock().clone()
        }
    }

    impl Pause for RecordingPause {
        fn pause(&self, delay: Duration) {
            self.pauses.lock().push(delay);
        }
    }
}

pub mod time {
    //! 手动推进的 [`Clock`] 实现。

    use std::time::{Duration, Instant};

    use parking_lot::Mutex;

    use crate::time::Clock;

    /// 虚拟时钟：`now = origin + elapsed`，只有 [`ManualClock::advance`] 会推进时间。
    #[derive(Debug)]
    pub struct ManualClock {
        origin: Instant,
        elapsed: Mutex<Duration>,
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                elapsed: Mutex::new(Duration::ZERO),
            }
        }

        pub fn advance(&self, delta: Duration) {
            let mut elapsed = self.elapsed.lock();
            *elapsed = elapsed.saturating_add(delta);
        }

        pub fn elapsed(&self) -> Duration {
            *self.elapsed.lock()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.origin + *self.elapsed.lock()
        }
    }
}
