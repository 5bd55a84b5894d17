//! 紧急程度
//!
//! 五个固定等级，各自带有不同的优先级权重，权重越高越紧急。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 紧急程度
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UrgencyLevel {
    #[serde(rename = "CRITICA")]
    Critical, // 危急
    #[serde(rename = "EMERGENCIA")]
    Emergency, // 紧急
    #[serde(rename = "URGENCIA")]
    Urgent, // 急诊
    #[serde(rename = "URGENCIA_MENOR")]
    MinorUrgency, // 轻度急诊
    #[serde(rename = "SIN_URGENCIA")]
    NonUrgent, // 非紧急
}

impl UrgencyLevel {
    /// 按权重从高到低排列的全部等级
    pub const ALL: [UrgencyLevel; 5] = [
        UrgencyLevel::Critical,
        UrgencyLevel::Emergency,
        UrgencyLevel::Urgent,
        UrgencyLevel::MinorUrgency,
        UrgencyLevel::NonUrgent,
    ];

    /// 优先级权重
    pub fn weight(self) -> u8 {
        match self {
            UrgencyLevel::Critical => 5,
            UrgencyLevel::Emergency => 4,
            UrgencyLevel::Urgent => 3,
            UrgencyLevel::MinorUrgency => 2,
            UrgencyLevel::NonUrgent => 1,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            UrgencyLevel::Critical => "CRITICA",
            UrgencyLevel::Emergency => "EMERGENCIA",
            UrgencyLevel::Urgent => "URGENCIA",
            UrgencyLevel::MinorUrgency => "URGENCIA_MENOR",
            UrgencyLevel::NonUrgent => "SIN_URGENCIA",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.code() == code)
    }
}

impl PartialOrd for UrgencyLevel {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// 按权重排序：`Critical` 最大
impl Ord for UrgencyLevel {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.weight().cmp(&other.weight())
    }
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
