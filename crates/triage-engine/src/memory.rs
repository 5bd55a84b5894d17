//! 内存实现
//!
//! 各端口的进程内实现，用于本地运行和测试，不具备持久性。

use crate::admission::{Admission, AdmissionRecord};
use crate::attention::AttentionReport;
use crate::ports::{AdmissionStore, Clock, PatientDirectory, ReportStore, StaffDirectory};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use triage_core::{Cuil, NewPatient, Patient, Result, Staff, TriageError};
use uuid::Uuid;

fn lock<'a, T>(m: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>> {
    m.lock().map_err(|_| TriageError::poisoned(what))
}

/// 内存患者目录
#[derive(Debug, Default)]
pub struct InMemoryPatientDirectory {
    patients: Mutex<HashMap<Uuid, Patient>>,
}

impl InMemoryPatientDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PatientDirectory for InMemoryPatientDirectory {
    fn find_by_cuil(&self, cuil: &Cuil) -> Result<Option<Patient>> {
        let patients = lock(&self.patients, "patient directory")?;
        Ok(patients.values().find(|p| &p.cuil == cuil).cloned())
    }

    fn create(&self, patient: NewPatient) -> Result<Patient> {
        let mut patients = lock(&self.patients, "patient directory")?;
        if patients.values().any(|p| p.cuil == patient.cuil) {
            return Err(TriageError::Conflict(format!("patient with CUIL {} already exists", patient.cuil)));
        }
        let created = Patient {
            id: Uuid::new_v4(),
            cuil: patient.cuil,
            name: patient.name,
            surname: patient.surname,
            address: patient.address,
            affiliation: patient.affiliation,
        };
        patients.insert(created.id, created.clone());
        Ok(created)
    }
}

/// 内存医护人员目录
#[derive(Debug, Default)]
pub struct InMemoryStaffDirectory {
    staff: Mutex<HashMap<Uuid, Staff>>,
}

impl InMemoryStaffDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记医护人员；CUIL 重复时返回 `Conflict`
    pub fn add(&self, member: Staff) -> Result<()> {
        let mut staff = lock(&self.staff, "staff directory")?;
        if staff.values().any(|s| s.cuil == member.cuil) {
            return Err(TriageError::Conflict(format!("staff member with CUIL {} already exists", member.cuil)));
        }
        staff.insert(member.id, member);
        Ok(())
    }
}

impl StaffDirectory for InMemoryStaffDirectory {
    fn find_by_cuil(&self, cuil: &Cuil) -> Result<Option<Staff>> {
        let staff = lock(&self.staff, "staff directory")?;
        Ok(staff.values().find(|s| &s.cuil == cuil).cloned())
    }
}

/// 内存入院记录存储，保存持久化形式并在读取时恢复
#[derive(Debug, Default)]
pub struct InMemoryAdmissionStore {
    records: Mutex<HashMap<Uuid, AdmissionRecord>>,
}

impl InMemoryAdmissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AdmissionStore for InMemoryAdmissionStore {
    fn create(&self, admission: &Admission) -> Result<Admission> {
        if admission.id().is_some() {
            return Err(TriageError::InvalidInput(format!(
                "admission {:?} is already persisted",
                admission.id()
            )));
        }
        let id = Uuid::new_v4();
        let mut record = admission.to_record();
        record.id = Some(id);
        lock(&self.records, "admission store")?.insert(id, record.clone());
        Admission::rehydrate(record)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Admission>> {
        let record = lock(&self.records, "admission store")?.get(&id).cloned();
        record.map(Admission::rehydrate).transpose()
    }

    fn update(&self, admission: &Admission) -> Result<()> {
        let id = admission
            .id()
            .ok_or_else(|| TriageError::InvalidInput("cannot update an admission that was never persisted".into()))?;
        let mut records = lock(&self.records, "admission store")?;
        match records.get_mut(&id) {
            Some(slot) => {
                *slot = admission.to_record();
                Ok(())
            }
            None => Err(TriageError::NotFound(format!("admission {}", id))),
        }
    }

    fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(lock(&self.records, "admission store")?.remove(&id).is_some())
    }

    fn list_all(&self) -> Result<Vec<Admission>> {
        let mut records: Vec<AdmissionRecord> = lock(&self.records, "admission store")?.values().cloned().collect();
        records.sort_by_key(|r| r.arrived_at);
        records.into_iter().map(Admission::rehydrate).collect()
    }
}

/// 内存就诊报告存储
#[derive(Debug, Default)]
pub struct InMemoryReportStore {
    reports: Mutex<HashMap<Uuid, AttentionReport>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportStore for InMemoryReportStore {
    fn create(&self, report: &AttentionReport) -> Result<AttentionReport> {
        let mut reports = lock(&self.reports, "report store")?;
        if reports.values().any(|r| r.admission_id == report.admission_id) {
            return Err(TriageError::Conflict(format!(
                "admission {} already has a report",
                report.admission_id
            )));
        }
        let mut stored = report.clone();
        let id = Uuid::new_v4();
        stored.id = Some(id);
        reports.insert(id, stored.clone());
        Ok(stored)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<AttentionReport>> {
        Ok(lock(&self.reports, "report store")?.get(&id).cloned())
    }

    fn find_by_admission(&self, admission_id: Uuid) -> Result<Option<AttentionReport>> {
        let reports = lock(&self.reports, "report store")?;
        Ok(reports.values().find(|r| r.admission_id == admission_id).cloned())
    }
}

/// 手动时钟：每次读取后前进固定步长，用于确定性的到达时间
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl ManualClock {
    /// 固定在 `start`，直到调用 [`ManualClock::advance`]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::stepping(start, Duration::zero())
    }

    pub fn stepping(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            current: Mutex::new(start),
            step,
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let now = *current;
        *current += self.step;
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::urgency::UrgencyLevel;
    use chrono::TimeZone;
    use triage_core::{ErrorKind, StaffRole, VitalSigns};

    fn new_admission(minute: i64) -> Admission {
        let vitals = VitalSigns::from_raw(36.5, 110, 70, 72, 14).unwrap();
        let arrived = Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap() + Duration::minutes(minute);
        Admission::new(Uuid::new_v4(), Uuid::new_v4(), "fiebre", vitals, UrgencyLevel::MinorUrgency, arrived).unwrap()
    }

    #[test]
    fn test_admission_store_assigns_id_and_lists_by_arrival() {
        let store = InMemoryAdmissionStore::new();
        let late = store.create(&new_admission(10)).unwrap();
        let early = store.create(&new_admission(1)).unwrap();
        assert!(late.id().is_some());

        let listed: Vec<_> = store.list_all().unwrap().iter().map(|a| a.id()).collect();
        assert_eq!(listed, vec![early.id(), late.id()]);
        assert_eq!(store.find_by_id(late.id().unwrap()).unwrap(), Some(late));
    }

    #[test]
    fn test_admission_store_rejects_double_create_and_unknown_update() {
        let store = InMemoryAdmissionStore::new();
        let saved = store.create(&new_admission(0)).unwrap();
        assert_eq!(store.create(&saved).unwrap_err().kind(), ErrorKind::InvalidInput);

        let other = InMemoryAdmissionStore::new();
        assert_eq!(other.update(&saved).unwrap_err().kind(), ErrorKind::NotFound);
        assert!(store.delete(saved.id().unwrap()).unwrap());
        assert!(!store.delete(saved.id().unwrap()).unwrap());
    }

    #[test]
    fn test_list_pending_skips_started_admissions() {
        let store = InMemoryAdmissionStore::new();
        let mut started = store.create(&new_admission(0)).unwrap();
        let waiting = store.create(&new_admission(1)).unwrap();
        started.start_treatment().unwrap();
        store.update(&started).unwrap();

        let pending = store.list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id(), waiting.id());
    }

    #[test]
    fn test_report_store_one_report_per_admission() {
        let store = InMemoryReportStore::new();
        let admission_id = Uuid::new_v4();
        let report = AttentionReport::new(admission_id, Uuid::new_v4(), "reposo", Utc::now()).unwrap();

        let saved = store.create(&report).unwrap();
        assert!(saved.is_persisted());
        assert_eq!(store.find_by_admission(admission_id).unwrap(), Some(saved.clone()));
        assert_eq!(store.find_by_id(saved.id.unwrap()).unwrap(), Some(saved));
        assert_eq!(store.create(&report).unwrap_err().kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_directories_lookup_by_cuil() {
        let patients = InMemoryPatientDirectory::new();
        let cuil = Cuil::parse("20-12345678-6").unwrap();
        let created = patients
            .create(NewPatient {
                cuil: cuil.clone(),
                name: "Ana".into(),
                surname: "Paz".into(),
                address: None,
                affiliation: None,
            })
            .unwrap();
        assert_eq!(patients.find_by_cuil(&cuil).unwrap(), Some(created));

        let staff = InMemoryStaffDirectory::new();
        let nurse = Staff {
            id: Uuid::new_v4(),
            cuil: Cuil::parse("27-11111111-7").unwrap(),
            name: "Lucía".into(),
            surname: "Gómez".into(),
            license: "E-100".into(),
            role: StaffRole::Nurse,
        };
        staff.add(nurse.clone()).unwrap();
        assert_eq!(staff.add(nurse.clone()).unwrap_err().kind(), ErrorKind::Conflict);
        assert_eq!(staff.find_by_cuil(&nurse.cuil).unwrap(), Some(nurse));
    }

    #[test]
    fn test_manual_clock_steps() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::stepping(start, Duration::seconds(30));
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start + Duration::seconds(30));
        clock.advance(Duration::minutes(1));
        assert_eq!(clock.now(), start + Duration::seconds(120));
        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
