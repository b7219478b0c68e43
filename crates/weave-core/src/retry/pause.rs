use std::time::Duration;

/// 两次尝试之间的阻塞等待。
///
/// 执行器只在第二次及之后的尝试前、且延迟非零时调用；测试通过记录型实现断言等待序列而不真正休眠。
pub trait Pause: Send + Sync {
    fn pause(&self, delay: Duration);
}

/// 以 `std::thread::sleep` 阻塞当前线程。
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleep;

impl Pause for ThreadSleep {
    fn pause(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}
