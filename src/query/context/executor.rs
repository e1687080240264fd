//! 执行线程池
//!
//! 驱动线程池和溢写线程池在进程启动时创建一次，由所有查询上下文共享。

use std::fmt;

use crate::core::error::{ContextError, ContextResult};

/// 命名线程池
pub struct Executor {
    name: String,
    pool: rayon::ThreadPool,
}

impl Executor {
    pub fn new(name: impl Into<String>, num_threads: usize) -> ContextResult<Self> {
        let name = name.into();
        if num_threads == 0 {
            return Err(ContextError::ExecutorBuild(format!(
                "线程池 {} 的线程数必须大于0",
                name
            )));
        }

        let thread_prefix = name.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(move |i| format!("{}-{}", thread_prefix, i))
            .build()
            .map_err(|e| ContextError::ExecutorBuild(format!("{}: {}", name, e)))?;

        Ok(Self { name, pool })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// 异步提交任务
    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(f);
    }

    /// 在线程池中同步执行并返回结果
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("name", &self.name)
            .field("num_threads", &self.num_threads())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_executor_runs_tasks() {
        let executor = Executor::new("driver", 2).expect("创建线程池失败");
        assert_eq!(executor.name(), "driver");
        assert_eq!(executor.num_threads(), 2);

        let (tx, rx) = mpsc::channel();
        executor.spawn(move || {
            let name = std::thread::current().name().map(str::to_string);
            tx.send(name).expect("发送失败");
        });
        let thread_name = rx.recv().expect("接收失败").expect("线程应当有名字");
        assert!(thread_name.starts_with("driver-"));

        assert_eq!(executor.install(|| 6 * 7), 42);
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(matches!(
            Executor::new("spiller", 0),
            Err(ContextError::ExecutorBuild(_))
        ));
    }
}
