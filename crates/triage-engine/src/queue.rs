//! 分诊队列
//!
//! 进程内唯一的待诊队列。按（紧急程度权重降序，到达时间升序）排序，同一键值按入队顺序。
//! 所有操作都在同一把互斥锁内完成；需要把存储写入和队列修改放进同一临界区时使用
//! [`TriageQueue::transaction`]。

use crate::admission::Admission;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex, MutexGuard};
use triage_core::{Result, TriageError};

/// 排序键：入队时计算一次
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityKey {
    pub weight: u8,
    pub arrived_at: DateTime<Utc>,
}

impl PriorityKey {
    pub fn of(admission: &Admission) -> Self {
        Self {
            weight: admission.urgency().weight(),
            arrived_at: admission.arrived_at(),
        }
    }
}

impl Ord for PriorityKey {
    /// 更大 = 更优先：权重高者优先，权重相同则先到者优先
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .cmp(&other.weight)
            .then_with(|| other.arrived_at.cmp(&self.arrived_at))
    }
}

impl PartialOrd for PriorityKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
struct QueueEntry {
    key: PriorityKey,
    seq: u64,
    admission: Arc<Admission>,
}

impl QueueEntry {
    fn matches(&self, admission: &Admission) -> bool {
        std::ptr::eq(self.admission.as_ref(), admission) || self.admission.same_admission(admission)
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

#[derive(Debug, Default)]
struct QueueState {
    heap: BinaryHeap<QueueEntry>,
    next_seq: u64,
}

fn ensure_queueable(admission: &Admission) -> Result<()> {
    if !admission.can_be_treated() {
        return Err(TriageError::InvalidInput(format!(
            "admission {:?} in state {} cannot wait in the triage queue",
            admission.id(),
            admission.status()
        )));
    }
    Ok(())
}

impl QueueState {
    fn push(&mut self, admission: Arc<Admission>) {
        let entry = QueueEntry {
            key: PriorityKey::of(&admission),
            seq: self.next_seq,
            admission,
        };
        self.next_seq += 1;
        self.heap.push(entry);
    }

    fn insert(&mut self, admission: Arc<Admission>) -> Result<()> {
        ensure_queueable(&admission)?;
        tracing::debug!("Queueing admission {:?} ({})", admission.id(), admission.urgency());
        self.push(admission);
        Ok(())
    }

    fn snapshot(&self) -> Vec<Arc<Admission>> {
        let mut entries: Vec<&QueueEntry> = self.heap.iter().collect();
        entries.sort_by(|a, b| b.cmp(a));
        entries.into_iter().map(|e| e.admission.clone()).collect()
    }

    fn pop(&mut self) -> Option<Arc<Admission>> {
        self.heap.pop().map(|e| e.admission)
    }

    fn peek(&self) -> Option<Arc<Admission>> {
        self.heap.peek().map(|e| e.admission.clone())
    }

    fn contains(&self, admission: &Admission) -> bool {
        self.heap.iter().any(|e| e.matches(admission))
    }

    /// 移除一个匹配项（优先级最高的那个）
    fn remove(&mut self, admission: &Admission) -> bool {
        let mut entries = std::mem::take(&mut self.heap).into_vec();
        let position = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.matches(admission))
            .max_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(i, _)| i);
        if let Some(i) = position {
            entries.swap_remove(i);
        }
        self.heap = BinaryHeap::from(entries);
        if position.is_some() {
            tracing::debug!("Removed admission {:?} from triage queue", admission.id());
        }
        position.is_some()
    }

    fn replace(&mut self, old: &Admission, new: Arc<Admission>) -> Result<bool> {
        ensure_queueable(&new)?;
        let removed = self.remove(old);
        self.push(new);
        Ok(removed)
    }

    fn clear(&mut self) {
        self.heap.clear();
    }

    fn rebuild(&mut self, admissions: Vec<Arc<Admission>>) -> Result<usize> {
        for admission in &admissions {
            ensure_queueable(admission)?;
        }
        self.heap.clear();
        let count = admissions.len();
        for admission in admissions {
            self.push(admission);
        }
        Ok(count)
    }
}

/// 分诊队列
#[derive(Debug, Default)]
pub struct TriageQueue {
    state: Mutex<QueueState>,
}

/// 持有队列锁期间的操作句柄
pub struct QueueTransaction<'a> {
    guard: MutexGuard<'a, QueueState>,
}

impl<'a> QueueTransaction<'a> {
    pub fn insert(&mut self, admission: Arc<Admission>) -> Result<()> {
        self.guard.insert(admission)
    }

    pub fn pop_highest_priority(&mut self) -> Option<Arc<Admission>> {
        self.guard.pop()
    }

    pub fn peek_highest_priority(&self) -> Option<Arc<Admission>> {
        self.guard.peek()
    }

    pub fn remove(&mut self, admission: &Admission) -> bool {
        self.guard.remove(admission)
    }

    pub fn replace(&mut self, old: &Admission, new: Arc<Admission>) -> Result<bool> {
        self.guard.replace(old, new)
    }

    pub fn contains(&self, admission: &Admission) -> bool {
        self.guard.contains(admission)
    }

    pub fn count(&self) -> usize {
        self.guard.heap.len()
    }

    pub fn snapshot(&self) -> Vec<Arc<Admission>> {
        self.guard.snapshot()
    }

    pub fn rebuild(&mut self, admissions: Vec<Arc<Admission>>) -> Result<usize> {
        self.guard.rebuild(admissions)
    }
}

impl TriageQueue {
    /// 创建空队列
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, QueueState>> {
        self.state.lock().map_err(|_| TriageError::poisoned("triage queue"))
    }

    /// 获取队列锁，在同一临界区内执行多个操作
    pub fn transaction(&self) -> Result<QueueTransaction<'_>> {
        Ok(QueueTransaction { guard: self.lock()? })
    }

    /// 入队；非待诊记录返回 `InvalidInput`
    pub fn insert(&self, admission: Arc<Admission>) -> Result<()> {
        self.lock()?.insert(admission)
    }

    /// 按优先级排序的副本，不修改队列
    pub fn snapshot(&self) -> Result<Vec<Arc<Admission>>> {
        Ok(self.lock()?.snapshot())
    }

    /// 取出优先级最高的记录；队列为空时返回 `None`
    pub fn pop_highest_priority(&self) -> Result<Option<Arc<Admission>>> {
        Ok(self.lock()?.pop())
    }

    pub fn peek_highest_priority(&self) -> Result<Option<Arc<Admission>>> {
        Ok(self.lock()?.peek())
    }

    /// 移除指定记录，返回它是否在队列中
    pub fn remove(&self, admission: &Admission) -> Result<bool> {
        Ok(self.lock()?.remove(admission))
    }

    /// 原子地移除旧记录（若存在）并插入新记录
    pub fn replace(&self, old: &Admission, new: Arc<Admission>) -> Result<bool> {
        self.lock()?.replace(old, new)
    }

    pub fn contains(&self, admission: &Admission) -> Result<bool> {
        Ok(self.lock()?.contains(admission))
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.lock()?.heap.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.count()? == 0)
    }

    /// 清空队列（仅用于管理和测试）
    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        tracing::info!("Triage queue cleared");
        Ok(())
    }

    /// 清空并批量装载，用于重启后与存储重新同步。任一记录不可入队时队列保持不变。
    pub fn rebuild(&self, admissions: Vec<Arc<Admission>>) -> Result<usize> {
        let count = self.lock()?.rebuild(admissions)?;
        tracing::info!("Triage queue rebuilt with {} admissions", count);
        Ok(count)
    }
}
