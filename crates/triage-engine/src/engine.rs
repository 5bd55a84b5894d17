//! 入院工作流
//!
//! 协调分诊队列、入院记录存储和状态机的唯一入口。
//!
//! 所有会写入入院记录的操作都在队列锁内完成（先写存储，再同步队列），
//! 因此队列内容与存储中的待诊记录保持一致，并且同一条记录不会被两次出诊。

use crate::{
    admission::Admission,
    attention::AttentionReport,
    ports::{AdmissionStore, Clock, PatientDirectory, ReportStore, StaffDirectory, SystemClock},
    queue::TriageQueue,
    requests::AdmissionRequest,
    urgency::UrgencyLevel,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use triage_core::utils::{non_blank, UNKNOWN_NAME};
use triage_core::{Cuil, ErrorKind, NewPatient, Patient, Result, Staff, TriageError};
use uuid::Uuid;

/// 入院工作流服务
pub struct AdmissionWorkflow {
    patients: Arc<dyn PatientDirectory>,
    staff: Arc<dyn StaffDirectory>,
    admissions: Arc<dyn AdmissionStore>,
    reports: Arc<dyn ReportStore>,
    queue: Arc<TriageQueue>,
    clock: Arc<dyn Clock>,
}

impl AdmissionWorkflow {
    /// 创建工作流服务，使用系统时钟
    pub fn new(
        patients: Arc<dyn PatientDirectory>,
        staff: Arc<dyn StaffDirectory>,
        admissions: Arc<dyn AdmissionStore>,
        reports: Arc<dyn ReportStore>,
        queue: Arc<TriageQueue>,
    ) -> Self {
        Self {
            patients,
            staff,
            admissions,
            reports,
            queue,
            clock: Arc::new(SystemClock),
        }
    }

    /// 替换时间来源
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 获取分诊队列实例
    pub fn queue(&self) -> &Arc<TriageQueue> {
        &self.queue
    }

    // ========== 登记与队列 ==========

    /// 登记入院
    ///
    /// 患者不存在时按请求中的资料创建；护士必须存在且角色为护士。
    /// 记录先写入存储，再进入分诊队列。
    pub fn register_admission(&self, request: &AdmissionRequest) -> Result<Admission> {
        let patient_cuil = Cuil::parse(&request.patient_cuil)?;
        let vitals = request.vitals.to_vitals()?;
        let nurse = self.require_nurse(&request.nurse_cuil)?;
        let patient = self.resolve_patient(&patient_cuil, request)?;

        let admission = Admission::new(
            patient.id,
            nurse.id,
            &request.description,
            vitals,
            request.urgency,
            self.clock.now(),
        )?;

        let mut txn = self.queue.transaction()?;
        let saved = self.admissions.create(&admission)?;
        txn.insert(Arc::new(saved.clone()))?;
        let waiting = txn.count();
        drop(txn);

        tracing::info!(
            "Registered admission {:?} for patient {} with urgency {} ({} waiting)",
            saved.id(),
            patient.cuil,
            saved.urgency(),
            waiting
        );
        Ok(saved)
    }

    /// 按分诊顺序列出待诊记录
    pub fn list_queue(&self) -> Result<Vec<Admission>> {
        Ok(self.queue.snapshot()?.iter().map(|a| Admission::clone(a)).collect())
    }

    /// 查看下一位患者但不出队
    pub fn peek_next_patient(&self) -> Result<Option<Admission>> {
        Ok(self.queue.peek_highest_priority()?.map(|a| Admission::clone(&a)))
    }

    /// 叫号：取出优先级最高的记录，开始诊治并持久化
    ///
    /// 队列为空时返回 `None`。存储写入失败时记录放回队列。
    pub fn dispatch_next_patient(&self) -> Result<Option<Admission>> {
        let mut txn = self.queue.transaction()?;
        let Some(next) = txn.pop_highest_priority() else {
            tracing::debug!("Dispatch requested with an empty triage queue");
            return Ok(None);
        };

        let mut admission = Admission::clone(&next);
        admission.start_treatment()?;
        if let Err(e) = self.admissions.update(&admission) {
            tracing::warn!("Failed to persist dispatch of admission {:?}: {}", admission.id(), e);
            txn.insert(next)?;
            return Err(e);
        }
        let waiting = txn.count();
        drop(txn);

        tracing::info!(
            "Dispatched admission {:?} ({}) to treatment, {} still waiting",
            admission.id(),
            admission.urgency(),
            waiting
        );
        Ok(Some(admission))
    }

    /// 待诊人数
    pub fn pending_count(&self) -> Result<usize> {
        self.queue.count()
    }

    // ========== 修改与删除 ==========

    /// 修改入院记录
    ///
    /// 患者和护士必须已存在。仍在待诊的记录在队列中按新的紧急程度重新排序。
    pub fn update_admission(&self, id: Uuid, request: &AdmissionRequest) -> Result<Admission> {
        let patient_cuil = Cuil::parse(&request.patient_cuil)?;
        let vitals = request.vitals.to_vitals()?;
        let patient = self
            .patients
            .find_by_cuil(&patient_cuil)?
            .ok_or_else(|| TriageError::NotFound(format!("patient with CUIL {}", patient_cuil)))?;
        let nurse = self.require_nurse(&request.nurse_cuil)?;

        let mut txn = self.queue.transaction()?;
        let existing = self.load(id)?;
        let mut updated = existing.clone();
        updated.update_patient(patient.id)?;
        updated.update_nurse(&nurse)?;
        updated.update_description(&request.description)?;
        updated.update_vitals(vitals)?;
        updated.update_urgency(request.urgency)?;

        self.admissions.update(&updated)?;
        if updated.is_pending() {
            txn.replace(&existing, Arc::new(updated.clone()))?;
        } else {
            txn.remove(&existing);
        }
        drop(txn);

        tracing::info!(
            "Updated admission {} (urgency {} -> {})",
            id,
            existing.urgency(),
            updated.urgency()
        );
        Ok(updated)
    }

    /// 删除入院记录；记录不在队列中时仅从存储删除
    pub fn delete_admission(&self, id: Uuid) -> Result<()> {
        let mut txn = self.queue.transaction()?;
        let existing = self.load(id)?;
        let was_queued = txn.remove(&existing);

        if let Err(e) = self.admissions.delete(id) {
            if was_queued {
                txn.insert(Arc::new(existing))?;
            }
            return Err(e);
        }
        drop(txn);

        tracing::info!("Deleted admission {} (was queued: {})", id, was_queued);
        Ok(())
    }

    // ========== 诊治 ==========

    /// 医生出具报告并结束入院
    pub fn attend_admission(&self, admission_id: Uuid, doctor_cuil: &str, report: &str) -> Result<AttentionReport> {
        if report.trim().is_empty() {
            return Err(TriageError::InvalidInput("medical report is required".into()));
        }
        let doctor = self.require_doctor(doctor_cuil)?;

        let _txn = self.queue.transaction()?;
        let mut admission = self.load(admission_id)?;
        if !admission.is_in_progress() {
            return Err(TriageError::InvalidState(format!(
                "admission {} is {} and cannot be attended",
                admission_id,
                admission.status()
            )));
        }
        if admission.has_report() {
            return Err(TriageError::InvalidState(format!(
                "admission {} already has a report attached",
                admission_id
            )));
        }
        // 上次报告已保存但入院记录未写入时，同一医生重试可以继续结束
        let saved = match self.reports.find_by_admission(admission_id)? {
            Some(stored) if stored.doctor_id == doctor.id => {
                tracing::warn!(
                    "Resuming finalization of admission {} with stored report {:?}",
                    admission_id,
                    stored.id
                );
                stored
            }
            Some(_) => {
                return Err(TriageError::Conflict(format!(
                    "a report is already registered for admission {}",
                    admission_id
                )));
            }
            None => {
                let draft = AttentionReport::new(admission_id, doctor.id, report, self.clock.now())?;
                self.reports.create(&draft)?
            }
        };
        admission.finalize(&saved)?;
        if let Err(e) = self.admissions.update(&admission) {
            tracing::warn!(
                "Report {:?} stored but admission {} could not be finalized: {}",
                saved.id,
                admission_id,
                e
            );
            return Err(e);
        }

        tracing::info!(
            "Admission {} finalized by doctor {} with report {:?}",
            admission_id,
            doctor.cuil,
            saved.id
        );
        Ok(saved)
    }

    /// 查询入院记录的就诊报告
    pub fn report_for_admission(&self, admission_id: Uuid) -> Result<AttentionReport> {
        self.reports
            .find_by_admission(admission_id)?
            .ok_or_else(|| TriageError::NotFound(format!("report for admission {}", admission_id)))
    }

    pub fn get_report(&self, report_id: Uuid) -> Result<AttentionReport> {
        self.reports
            .find_by_id(report_id)?
            .ok_or_else(|| TriageError::NotFound(format!("report {}", report_id)))
    }

    // ========== 查询与维护 ==========

    pub fn get_admission(&self, id: Uuid) -> Result<Admission> {
        self.load(id)
    }

    /// 全部入院记录，按到达时间排序
    pub fn list_admissions(&self) -> Result<Vec<Admission>> {
        self.admissions.list_all()
    }

    /// 用存储中的全部待诊记录重建队列，返回入队数量
    pub fn rebuild_queue(&self) -> Result<usize> {
        let mut txn = self.queue.transaction()?;
        let pending: Vec<Arc<Admission>> = self.admissions.list_pending()?.into_iter().map(Arc::new).collect();
        let count = txn.rebuild(pending)?;
        drop(txn);

        tracing::info!("Triage queue rebuilt from store with {} pending admissions", count);
        Ok(count)
    }

    /// 获取队列概览
    pub fn overview(&self) -> Result<QueueOverview> {
        let waiting = self.queue.snapshot()?;
        let waiting_by_urgency = UrgencyLevel::ALL
            .into_iter()
            .map(|level| (level, waiting.iter().filter(|a| a.urgency() == level).count()))
            .collect();

        Ok(QueueOverview {
            total_waiting: waiting.len(),
            waiting_by_urgency,
            next_admission: waiting.first().and_then(|a| a.id()),
        })
    }

    // ========== 内部辅助 ==========

    fn load(&self, id: Uuid) -> Result<Admission> {
        self.admissions
            .find_by_id(id)?
            .ok_or_else(|| TriageError::NotFound(format!("admission {}", id)))
    }

    fn find_staff(&self, cuil: &str) -> Result<Staff> {
        let cuil = Cuil::parse(cuil)?;
        self.staff
            .find_by_cuil(&cuil)?
            .ok_or_else(|| TriageError::NotFound(format!("staff member with CUIL {}", cuil)))
    }

    fn require_nurse(&self, cuil: &str) -> Result<Staff> {
        let staff = self.find_staff(cuil)?;
        if !staff.is_nurse() {
            return Err(TriageError::InvalidInput(format!("staff member {} is not a nurse", staff.cuil)));
        }
        Ok(staff)
    }

    fn require_doctor(&self, cuil: &str) -> Result<Staff> {
        let staff = self.find_staff(cuil)?;
        if !staff.is_doctor() {
            return Err(TriageError::InvalidInput(format!("staff member {} is not a doctor", staff.cuil)));
        }
        Ok(staff)
    }

    /// 查找患者，不存在时用请求中的资料创建
    fn resolve_patient(&self, cuil: &Cuil, request: &AdmissionRequest) -> Result<Patient> {
        if let Some(patient) = self.patients.find_by_cuil(cuil)? {
            return Ok(patient);
        }

        let address = request.address.as_ref().map(|a| a.to_address()).transpose()?;
        let affiliation = request.insurance.as_ref().map(|i| i.to_affiliation()).transpose()?;
        let created = self.patients.create(NewPatient {
            cuil: cuil.clone(),
            name: non_blank(request.patient_name.as_deref()).unwrap_or(UNKNOWN_NAME).to_string(),
            surname: non_blank(request.patient_surname.as_deref()).unwrap_or(UNKNOWN_NAME).to_string(),
            address,
            affiliation,
        });
        let patient = match created {
            Ok(patient) => patient,
            // 并发登记同一患者时，另一个请求已经创建
            Err(e) if e.kind() == ErrorKind::Conflict => match self.patients.find_by_cuil(cuil)? {
                Some(patient) => return Ok(patient),
                None => return Err(e),
            },
            Err(e) => return Err(e),
        };

        tracing::info!("Created patient {} ({}) during admission", patient.cuil, patient.full_name());
        Ok(patient)
    }
}

/// 队列概览
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueOverview {
    pub total_waiting: usize,
    pub waiting_by_urgency: Vec<(UrgencyLevel, usize)>,
    pub next_admission: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{
        InMemoryAdmissionStore, InMemoryPatientDirectory, InMemoryReportStore, InMemoryStaffDirectory,
        ManualClock,
    };
    use crate::requests::VitalsInput;
    use chrono::{Duration, TimeZone, Utc};
    use triage_core::StaffRole;

    const NURSE: &str = "27-11111111-7";
    const PATIENT: &str = "20-12345678-6";

    struct FailingStore;

    impl AdmissionStore for FailingStore {
        fn create(&self, admission: &Admission) -> Result<Admission> {
            InMemoryAdmissionStore::new().create(admission)
        }
        fn find_by_id(&self, _id: Uuid) -> Result<Option<Admission>> {
            Ok(None)
        }
        fn update(&self, _admission: &Admission) -> Result<()> {
            Err(TriageError::Storage("disk full".into()))
        }
        fn delete(&self, _id: Uuid) -> Result<bool> {
            Ok(false)
        }
        fn list_all(&self) -> Result<Vec<Admission>> {
            Ok(Vec::new())
        }
    }

    fn staff() -> Arc<InMemoryStaffDirectory> {
        let staff = InMemoryStaffDirectory::new();
        staff
            .add(Staff {
                id: Uuid::new_v4(),
                cuil: Cuil::parse(NURSE).unwrap(),
                name: "Lucía".into(),
                surname: "Gómez".into(),
                license: "E-1".into(),
                role: StaffRole::Nurse,
            })
            .unwrap();
        Arc::new(staff)
    }

    fn workflow_with(store: Arc<dyn AdmissionStore>) -> (AdmissionWorkflow, Arc<InMemoryPatientDirectory>) {
        let patients = Arc::new(InMemoryPatientDirectory::new());
        let start = Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap();
        let workflow = AdmissionWorkflow::new(
            patients.clone(),
            staff(),
            store,
            Arc::new(InMemoryReportStore::new()),
            Arc::new(TriageQueue::new()),
        )
        .with_clock(Arc::new(ManualClock::stepping(start, Duration::minutes(1))));
        (workflow, patients)
    }

    fn request(urgency: UrgencyLevel) -> AdmissionRequest {
        AdmissionRequest {
            patient_cuil: PATIENT.into(),
            patient_name: None,
            patient_surname: Some("Pérez".into()),
            address: None,
            insurance: None,
            nurse_cuil: NURSE.into(),
            description: "mareos".into(),
            vitals: VitalsInput {
                temperature: 36.8,
                systolic: 120,
                diastolic: 80,
                heart_rate: 80,
                respiratory_rate: 16,
            },
            urgency,
        }
    }

    #[test]
    fn test_register_creates_unknown_patient_with_defaults() {
        let (workflow, patients) = workflow_with(Arc::new(InMemoryAdmissionStore::new()));
        let admission = workflow.register_admission(&request(UrgencyLevel::Urgent)).unwrap();

        let patient = patients.find_by_cuil(&Cuil::parse(PATIENT).unwrap()).unwrap().unwrap();
        assert_eq!(patient.name, UNKNOWN_NAME);
        assert_eq!(patient.surname, "Pérez");
        assert_eq!(admission.patient_id(), patient.id);
        assert_eq!(workflow.pending_count().unwrap(), 1);

        // 第二次登记复用已有患者
        let again = workflow.register_admission(&request(UrgencyLevel::Urgent)).unwrap();
        assert_eq!(again.patient_id(), patient.id);
    }

    #[test]
    fn test_register_rejects_unknown_nurse_and_bad_vitals() {
        let (workflow, patients) = workflow_with(Arc::new(InMemoryAdmissionStore::new()));

        let mut unknown = request(UrgencyLevel::Urgent);
        unknown.nurse_cuil = "20-12345678-6".into();
        assert_eq!(workflow.register_admission(&unknown).unwrap_err().kind(), ErrorKind::NotFound);

        let mut bad = request(UrgencyLevel::Urgent);
        bad.vitals.respiratory_rate = -4;
        assert_eq!(workflow.register_admission(&bad).unwrap_err().kind(), ErrorKind::InvalidInput);

        assert_eq!(workflow.pending_count().unwrap(), 0);
        assert!(patients.find_by_cuil(&Cuil::parse(PATIENT).unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_dispatch_failure_puts_record_back() {
        let (workflow, _) = workflow_with(Arc::new(FailingStore));
        workflow.register_admission(&request(UrgencyLevel::Critical)).unwrap();

        let err = workflow.dispatch_next_patient().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert_eq!(workflow.pending_count().unwrap(), 1);
        assert!(workflow.peek_next_patient().unwrap().unwrap().is_pending());
    }

    #[test]
    fn test_overview_counts_by_urgency() {
        let (workflow, _) = workflow_with(Arc::new(InMemoryAdmissionStore::new()));
        workflow.register_admission(&request(UrgencyLevel::Urgent)).unwrap();
        let critical = workflow.register_admission(&request(UrgencyLevel::Critical)).unwrap();

        let overview = workflow.overview().unwrap();
        assert_eq!(overview.total_waiting, 2);
        assert_eq!(overview.next_admission, critical.id());
        assert!(overview.waiting_by_urgency.contains(&(UrgencyLevel::Urgent, 1)));
        assert!(overview.waiting_by_urgency.contains(&(UrgencyLevel::NonUrgent, 0)));
    }
}
