//! 入院记录聚合
//!
//! 持有患者、护士、生命体征、紧急程度、到达时间和生命周期状态。状态只能通过
//! 命名的转换操作修改；从存储恢复时使用单独的 [`Admission::rehydrate`] 路径。

use crate::attention::AttentionReport;
use crate::state_machine::{AdmissionEvent, AdmissionStateMachine, AdmissionStatus};
use crate::urgency::UrgencyLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use triage_core::{Result, Staff, TriageError, VitalSigns};
use uuid::Uuid;

/// 入院记录 (ingreso)
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    id: Option<Uuid>,
    patient_id: Uuid,
    nurse_id: Uuid,
    description: String,
    arrived_at: DateTime<Utc>,
    vitals: VitalSigns,
    urgency: UrgencyLevel,
    status: AdmissionStatus,
    attention_id: Option<Uuid>,
}

/// 入院记录的持久化形式
///
/// 存储适配器写入并读回这个结构；读回时必须经过 [`Admission::rehydrate`]。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionRecord {
    pub id: Option<Uuid>,
    pub patient_id: Uuid,
    pub nurse_id: Uuid,
    pub description: String,
    pub arrived_at: DateTime<Utc>,
    pub vitals: VitalSigns,
    pub urgency: UrgencyLevel,
    pub status: AdmissionStatus,
    pub attention_id: Option<Uuid>,
}

fn required_description(description: &str) -> Result<String> {
    let description = description.trim();
    if description.is_empty() {
        return Err(TriageError::InvalidInput("admission description cannot be empty".into()));
    }
    Ok(description.to_string())
}

fn required_reference(id: Uuid, what: &str) -> Result<Uuid> {
    if id.is_nil() {
        return Err(TriageError::InvalidInput(format!("{} reference is required", what)));
    }
    Ok(id)
}

impl Admission {
    /// 创建处于待诊状态的新入院记录。到达时间只在此处设置一次。
    pub fn new(
        patient_id: Uuid,
        nurse_id: Uuid,
        description: &str,
        vitals: VitalSigns,
        urgency: UrgencyLevel,
        arrived_at: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            id: None,
            patient_id: required_reference(patient_id, "patient")?,
            nurse_id: required_reference(nurse_id, "nurse")?,
            description: required_description(description)?,
            arrived_at,
            vitals,
            urgency,
            status: AdmissionStatus::Pending,
            attention_id: None,
        })
    }

    /// 从持久化形式恢复，不重新执行状态转换检查
    pub fn rehydrate(record: AdmissionRecord) -> Result<Self> {
        match (record.status, record.attention_id) {
            (AdmissionStatus::Pending, Some(_)) => {
                return Err(TriageError::Storage(format!(
                    "stored admission {:?} is pending but carries a report",
                    record.id
                )))
            }
            (AdmissionStatus::Finalized, None) => {
                return Err(TriageError::Storage(format!(
                    "stored admission {:?} is finalized without a report",
                    record.id
                )))
            }
            _ => {}
        }
        Ok(Self {
            id: record.id,
            patient_id: record.patient_id,
            nurse_id: record.nurse_id,
            description: record.description,
            arrived_at: record.arrived_at,
            vitals: record.vitals,
            urgency: record.urgency,
            status: record.status,
            attention_id: record.attention_id,
        })
    }

    /// 转换为持久化形式
    pub fn to_record(&self) -> AdmissionRecord {
        AdmissionRecord {
            id: self.id,
            patient_id: self.patient_id,
            nurse_id: self.nurse_id,
            description: self.description.clone(),
            arrived_at: self.arrived_at,
            vitals: self.vitals,
            urgency: self.urgency,
            status: self.status,
            attention_id: self.attention_id,
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn patient_id(&self) -> Uuid {
        self.patient_id
    }

    pub fn nurse_id(&self) -> Uuid {
        self.nurse_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn arrived_at(&self) -> DateTime<Utc> {
        self.arrived_at
    }

    pub fn vitals(&self) -> &VitalSigns {
        &self.vitals
    }

    pub fn urgency(&self) -> UrgencyLevel {
        self.urgency
    }

    pub fn status(&self) -> AdmissionStatus {
        self.status
    }

    pub fn attention_id(&self) -> Option<Uuid> {
        self.attention_id
    }

    /// 两条记录是否指向同一次入院（按持久化标识）
    pub fn same_admission(&self, other: &Admission) -> bool {
        matches!((self.id, other.id), (Some(a), Some(b)) if a == b)
    }

    // ========== 状态转换 ==========

    /// 开始诊治：仅允许从待诊状态
    pub fn start_treatment(&mut self) -> Result<()> {
        self.status = AdmissionStateMachine::shared().transition(self.status, AdmissionEvent::StartTreatment)?;
        Ok(())
    }

    /// 关联就诊报告：仅允许在就诊中且尚无报告时，不改变状态
    pub fn attach_report(&mut self, report: &AttentionReport) -> Result<()> {
        if self.status != AdmissionStatus::InProgress {
            return Err(TriageError::InvalidState(format!(
                "reports can only be attached to admissions in EN_PROCESO, current state: {}",
                self.status
            )));
        }
        if self.attention_id.is_some() {
            return Err(TriageError::InvalidState("admission already has a report attached".into()));
        }
        let report_id = report
            .id
            .ok_or_else(|| TriageError::InvalidInput("report must be persisted before attaching".into()))?;
        if self.id != Some(report.admission_id) {
            return Err(TriageError::InvalidInput(format!(
                "report belongs to admission {}, not {:?}",
                report.admission_id, self.id
            )));
        }
        self.attention_id = Some(report_id);
        Ok(())
    }

    /// 关联报告并结束入院
    pub fn finalize(&mut self, report: &AttentionReport) -> Result<()> {
        let machine = AdmissionStateMachine::shared();
        if !machine.can_transition(self.status, AdmissionEvent::Finalize) {
            return Err(TriageError::InvalidState(format!(
                "only admissions in EN_PROCESO can be finalized, current state: {}",
                self.status
            )));
        }
        self.attach_report(report)?;
        self.status = machine.transition(self.status, AdmissionEvent::Finalize)?;
        Ok(())
    }

    // ========== 状态查询 ==========

    pub fn is_pending(&self) -> bool {
        self.status == AdmissionStatus::Pending
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == AdmissionStatus::InProgress
    }

    pub fn is_finalized(&self) -> bool {
        self.status == AdmissionStatus::Finalized
    }

    pub fn has_report(&self) -> bool {
        self.attention_id.is_some()
    }

    /// 待诊且患者、护士引用齐全
    pub fn can_be_treated(&self) -> bool {
        self.is_pending() && !self.patient_id.is_nil() && !self.nurse_id.is_nil()
    }

    // ========== 数据修改 ==========

    fn ensure_editable(&self) -> Result<()> {
        if self.is_finalized() {
            return Err(TriageError::InvalidState(format!(
                "admission {:?} is finalized and cannot be modified",
                self.id
            )));
        }
        Ok(())
    }

    pub fn update_vitals(&mut self, vitals: VitalSigns) -> Result<()> {
        self.ensure_editable()?;
        self.vitals = vitals;
        Ok(())
    }

    pub fn update_description(&mut self, description: &str) -> Result<()> {
        self.ensure_editable()?;
        self.description = required_description(description)?;
        Ok(())
    }

    /// 修改紧急程度；调用方负责同步队列位置
    pub fn update_urgency(&mut self, urgency: UrgencyLevel) -> Result<()> {
        self.ensure_editable()?;
        self.urgency = urgency;
        Ok(())
    }

    pub fn update_patient(&mut self, patient_id: Uuid) -> Result<()> {
        self.ensure_editable()?;
        self.patient_id = required_reference(patient_id, "patient")?;
        Ok(())
    }

    pub fn update_nurse(&mut self, nurse: &Staff) -> Result<()> {
        self.ensure_editable()?;
        if !nurse.is_nurse() {
            return Err(TriageError::InvalidInput(format!(
                "staff member {} is not a nurse",
                nurse.cuil
            )));
        }
        self.nurse_id = required_reference(nurse.id, "nurse")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::{Cuil, ErrorKind, StaffRole};

    fn vitals() -> VitalSigns {
        VitalSigns::from_raw(37.0, 120, 80, 75, 16).unwrap()
    }

    fn pending() -> Admission {
        Admission::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "dolor abdominal",
            vitals(),
            UrgencyLevel::Urgent,
            Utc::now(),
        )
        .unwrap()
    }

    fn persisted(admission: &Admission) -> Admission {
        let mut record = admission.to_record();
        record.id = Some(Uuid::new_v4());
        Admission::rehydrate(record).unwrap()
    }

    fn report_for(admission: &Admission) -> AttentionReport {
        let mut report =
            AttentionReport::new(admission.id().unwrap(), Uuid::new_v4(), "alta médica", Utc::now()).unwrap();
        report.id = Some(Uuid::new_v4());
        report
    }

    #[test]
    fn test_new_admission_is_pending() {
        let admission = pending();
        assert!(admission.is_pending());
        assert!(admission.can_be_treated());
        assert!(!admission.has_report());
        assert_eq!(admission.id(), None);
    }

    #[test]
    fn test_new_admission_rejects_missing_references() {
        let err = Admission::new(Uuid::nil(), Uuid::new_v4(), "x", vitals(), UrgencyLevel::Urgent, Utc::now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(Admission::new(Uuid::new_v4(), Uuid::new_v4(), "  ", vitals(), UrgencyLevel::Urgent, Utc::now())
            .is_err());
    }

    #[test]
    fn test_full_lifecycle() {
        let mut admission = persisted(&pending());
        admission.start_treatment().unwrap();
        assert!(admission.is_in_progress());
        assert!(!admission.can_be_treated());

        let report = report_for(&admission);
        admission.finalize(&report).unwrap();
        assert!(admission.is_finalized());
        assert_eq!(admission.attention_id(), report.id);
    }

    #[test]
    fn test_start_treatment_twice_is_invalid_state() {
        let mut admission = persisted(&pending());
        admission.start_treatment().unwrap();
        let err = admission.start_treatment().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_attach_report_requires_in_progress() {
        let mut admission = persisted(&pending());
        let report = report_for(&admission);
        assert_eq!(admission.attach_report(&report).unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(admission.finalize(&report).unwrap_err().kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_attach_report_only_once() {
        let mut admission = persisted(&pending());
        admission.start_treatment().unwrap();
        admission.attach_report(&report_for(&admission)).unwrap();
        assert!(admission.is_in_progress());

        let err = admission.attach_report(&report_for(&admission)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_attach_report_rejects_foreign_or_unsaved_report() {
        let mut admission = persisted(&pending());
        admission.start_treatment().unwrap();

        let mut unsaved = report_for(&admission);
        unsaved.id = None;
        assert_eq!(admission.attach_report(&unsaved).unwrap_err().kind(), ErrorKind::InvalidInput);

        let mut foreign = report_for(&admission);
        foreign.admission_id = Uuid::new_v4();
        assert_eq!(admission.attach_report(&foreign).unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_finalized_admission_cannot_be_edited() {
        let mut admission = persisted(&pending());
        admission.start_treatment().unwrap();
        let report = report_for(&admission);
        admission.finalize(&report).unwrap();

        assert_eq!(admission.update_urgency(UrgencyLevel::Critical).unwrap_err().kind(), ErrorKind::InvalidState);
        assert!(admission.update_description("otra").is_err());
    }

    #[test]
    fn test_update_nurse_requires_nurse_role() {
        let mut admission = pending();
        let doctor = Staff {
            id: Uuid::new_v4(),
            cuil: Cuil::parse("20-12345678-6").unwrap(),
            name: "Gregorio".into(),
            surname: "Casa".into(),
            license: "MP-1".into(),
            role: StaffRole::Doctor,
        };
        assert_eq!(admission.update_nurse(&doctor).unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_rehydrate_keeps_arrival_and_state() {
        let mut admission = persisted(&pending());
        admission.start_treatment().unwrap();
        let record = admission.to_record();
        let restored = Admission::rehydrate(record.clone()).unwrap();
        assert_eq!(restored, admission);
        assert_eq!(restored.arrived_at(), admission.arrived_at());

        let mut corrupt = record;
        corrupt.status = AdmissionStatus::Finalized;
        assert_eq!(Admission::rehydrate(corrupt).unwrap_err().kind(), ErrorKind::Infrastructure);
    }
}
