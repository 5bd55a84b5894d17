//! 入院状态机
//!
//! 管理入院记录的生命周期：待诊 → 就诊中 → 已完成

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use triage_core::{Result, TriageError};

/// 入院状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AdmissionStatus {
    #[serde(rename = "PENDIENTE")]
    Pending, // 待诊
    #[serde(rename = "EN_PROCESO")]
    InProgress, // 就诊中
    #[serde(rename = "FINALIZADO")]
    Finalized, // 已完成
}

impl fmt::Display for AdmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            AdmissionStatus::Pending => "PENDIENTE",
            AdmissionStatus::InProgress => "EN_PROCESO",
            AdmissionStatus::Finalized => "FINALIZADO",
        };
        f.write_str(code)
    }
}

/// 状态转换事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AdmissionEvent {
    StartTreatment,
    Finalize,
}

/// 入院状态机
#[derive(Debug)]
pub struct AdmissionStateMachine {
    transitions: HashMap<(AdmissionStatus, AdmissionEvent), AdmissionStatus>,
}

impl AdmissionStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        // 不允许跳过状态，也没有回退
        transitions.insert(
            (AdmissionStatus::Pending, AdmissionEvent::StartTreatment),
            AdmissionStatus::InProgress,
        );
        transitions.insert(
            (AdmissionStatus::InProgress, AdmissionEvent::Finalize),
            AdmissionStatus::Finalized,
        );

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: AdmissionStatus, event: AdmissionEvent) -> bool {
        self.transitions.contains_key(&(from, event))
    }

    /// 执行状态转换
    pub fn transition(&self, from: AdmissionStatus, event: AdmissionEvent) -> Result<AdmissionStatus> {
        self.transitions.get(&(from, event)).copied().ok_or_else(|| {
            TriageError::InvalidState(format!(
                "cannot apply {:?} to an admission in state {}",
                event, from
            ))
        })
    }

    /// 获取所有可能的状态
    pub fn get_all_states() -> Vec<AdmissionStatus> {
        vec![
            AdmissionStatus::Pending,
            AdmissionStatus::InProgress,
            AdmissionStatus::Finalized,
        ]
    }

    /// 获取状态的所有可能事件
    pub fn get_possible_events(&self, current_state: AdmissionStatus) -> Vec<AdmissionEvent> {
        self.transitions
            .keys()
            .filter(|(state, _)| *state == current_state)
            .map(|(_, event)| *event)
            .collect()
    }

    /// 进程内共享的状态机实例
    pub fn shared() -> &'static AdmissionStateMachine {
        static MACHINE: std::sync::OnceLock<AdmissionStateMachine> = std::sync::OnceLock::new();
        MACHINE.get_or_init(AdmissionStateMachine::new)
    }
}

impl Default for AdmissionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
