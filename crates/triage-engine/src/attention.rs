//! 就诊报告
//!
//! 医生完成诊治后为一次入院出具的医疗报告

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use triage_core::{Result, TriageError};
use uuid::Uuid;

/// 就诊报告 (atención)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionReport {
    pub id: Option<Uuid>, // 持久化时分配
    pub admission_id: Uuid,
    pub doctor_id: Uuid,
    pub report: String,
    pub attended_at: DateTime<Utc>,
}

impl AttentionReport {
    /// 创建尚未持久化的报告，报告正文去除首尾空白后不能为空
    pub fn new(
        admission_id: Uuid,
        doctor_id: Uuid,
        report: &str,
        attended_at: DateTime<Utc>,
    ) -> Result<Self> {
        let report = report.trim();
        if report.is_empty() {
            return Err(TriageError::InvalidInput("medical report is required".into()));
        }
        if admission_id.is_nil() || doctor_id.is_nil() {
            return Err(TriageError::InvalidInput(
                "report must reference an admission and a doctor".into(),
            ));
        }
        Ok(Self {
            id: None,
            admission_id,
            doctor_id,
            report: report.to_string(),
            attended_at,
        })
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}
