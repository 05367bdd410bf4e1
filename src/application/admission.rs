//! Engine Admission Controller - 重量级引擎准入控制
//!
//! 转写引擎和生成引擎都是单实例、常驻内存的重量级资源，不支持并发调用。
//! 每个引擎一个互斥闸门：
//! - 同一时刻每个引擎最多一个调用在执行
//! - 两个闸门互相独立（第 N+1 轮的转写可以和第 N 轮的生成重叠）
//! - 闸门忙时调用方挂起等待（tokio Semaphore 按 FIFO 唤醒）
//! - `max_queue_depth > 0` 时，等待者达到上限直接拒绝（ServiceBusy）

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// 准入错误
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("{engine} gate is busy ({waiting} waiting)")]
    Busy { engine: &'static str, waiting: usize },

    #[error("Cancelled while waiting for {engine} gate")]
    Cancelled { engine: &'static str },

    #[error("{engine} gate closed")]
    Closed { engine: &'static str },
}

/// 闸门快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct GateStats {
    pub busy: bool,
    pub waiting: usize,
    pub admitted: u64,
}

/// 互斥闸门
pub struct AdmissionGate {
    engine: &'static str,
    semaphore: Arc<Semaphore>,
    waiting: AtomicUsize,
    admitted: AtomicU64,
    /// 0 表示不限制
    max_waiting: usize,
}

/// 持有期间独占引擎，Drop 时释放
#[derive(Debug)]
pub struct AdmissionPermit {
    engine: &'static str,
    acquired_at: Instant,
    _permit: OwnedSemaphorePermit,
}

impl AdmissionPermit {
    pub fn engine(&self) -> &'static str {
        self.engine
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        tracing::debug!(
            engine = self.engine,
            held_ms = self.acquired_at.elapsed().as_millis() as u64,
            "Engine gate released"
        );
    }
}

/// 等待计数，离开作用域（包括被取消）时归还
struct WaitSlot<'a>(&'a AtomicUsize);

impl Drop for WaitSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AdmissionGate {
    pub fn new(engine: &'static str, max_waiting: usize) -> Self {
        Self {
            engine,
            semaphore: Arc::new(Semaphore::new(1)),
            waiting: AtomicUsize::new(0),
            admitted: AtomicU64::new(0),
            max_waiting,
        }
    }

    pub fn engine(&self) -> &'static str {
        self.engine
    }

    /// 当前等待者数量
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> GateStats {
        GateStats {
            busy: self.semaphore.available_permits() == 0,
            waiting: self.waiting(),
            admitted: self.admitted.load(Ordering::SeqCst),
        }
    }

    /// 进入闸门
    ///
    /// 闸门空闲时立即返回；否则挂起直到轮到自己、被取消或被拒绝
    pub async fn enter(&self, cancel: &CancellationToken) -> Result<AdmissionPermit, AdmissionError> {
        if let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
            return Ok(self.admit(permit, Instant::now()));
        }

        let ahead = self.waiting.fetch_add(1, Ordering::SeqCst);
        let _slot = WaitSlot(&self.waiting);

        if self.max_waiting > 0 && ahead >= self.max_waiting {
            tracing::warn!(
                engine = self.engine,
                waiting = ahead,
                max_waiting = self.max_waiting,
                "Engine gate queue full, rejecting"
            );
            return Err(AdmissionError::Busy {
                engine: self.engine,
                waiting: ahead,
            });
        }

        tracing::debug!(engine = self.engine, ahead = ahead, "Waiting for engine gate");
        let queued_at = Instant::now();

        let permit = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(engine = self.engine, "Gave up waiting for engine gate");
                return Err(AdmissionError::Cancelled { engine: self.engine });
            }
            permit = self.semaphore.clone().acquire_owned() => {
                permit.map_err(|_| AdmissionError::Closed { engine: self.engine })?
            }
        };

        Ok(self.admit(permit, queued_at))
    }

    fn admit(&self, permit: OwnedSemaphorePermit, queued_at: Instant) -> AdmissionPermit {
        self.admitted.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            engine = self.engine,
            waited_ms = queued_at.elapsed().as_millis() as u64,
            "Engine gate acquired"
        );
        AdmissionPermit {
            engine: self.engine,
            acquired_at: Instant::now(),
            _permit: permit,
        }
    }
}

/// 准入控制器：转写、生成两个独立闸门
pub struct EngineAdmissionController {
    transcription: AdmissionGate,
    generation: AdmissionGate,
}

/// 控制器快照
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct AdmissionStats {
    pub transcription: GateStats,
    pub generation: GateStats,
}

impl EngineAdmissionController {
    /// # 参数
    /// - `max_queue_depth` - 每个闸门的最大等待者数量，0 表示不限制
    pub fn new(max_queue_depth: usize) -> Self {
        Self {
            transcription: AdmissionGate::new("transcription", max_queue_depth),
            generation: AdmissionGate::new("generation", max_queue_depth),
        }
    }

    /// 不限制等待队列
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    pub async fn admit_transcription(
        &self,
        cancel: &CancellationToken,
    ) -> Result<AdmissionPermit, AdmissionError> {
        self.transcription.enter(cancel).await
    }

    pub async fn admit_generation(
        &self,
        cancel: &CancellationToken,
    ) -> Result<AdmissionPermit, AdmissionError> {
        self.generation.enter(cancel).await
    }

    pub fn transcription_gate(&self) -> &AdmissionGate {
        &self.transcription
    }

    pub fn generation_gate(&self) -> &AdmissionGate {
        &self.generation
    }

    pub fn stats(&self) -> AdmissionStats {
        AdmissionStats {
            transcription: self.transcription.stats(),
            generation: self.generation.stats(),
        }
    }
}

impl Default for EngineAdmissionController {
    fn default() -> Self {
        Self::unbounded()
    }
}
