//! 持久化与查询端口
//!
//! 工作流服务通过这些 trait 访问患者、医护人员、入院记录和就诊报告的存储。
//! 具体实现见 [`crate::memory`]；数据库适配器可以实现同一组 trait。

use crate::admission::Admission;
use crate::attention::AttentionReport;
use chrono::{DateTime, Utc};
use triage_core::{Cuil, NewPatient, Patient, Result, Staff};
use uuid::Uuid;

/// 患者目录
pub trait PatientDirectory: Send + Sync {
    /// 按 CUIL 查找患者
    fn find_by_cuil(&self, cuil: &Cuil) -> Result<Option<Patient>>;

    /// 创建患者并分配标识；CUIL 已存在时返回 `Conflict`
    fn create(&self, patient: NewPatient) -> Result<Patient>;
}

/// 医护人员目录（只读）
pub trait StaffDirectory: Send + Sync {
    fn find_by_cuil(&self, cuil: &Cuil) -> Result<Option<Staff>>;
}

/// 入院记录存储
///
/// 每个方法对单条记录是原子的；读回的记录都经过 [`Admission::rehydrate`]。
pub trait AdmissionStore: Send + Sync {
    /// 持久化新记录并分配标识，返回带标识的记录
    fn create(&self, admission: &Admission) -> Result<Admission>;

    fn find_by_id(&self, id: Uuid) -> Result<Option<Admission>>;

    /// 覆盖已有记录；记录不存在时返回 `NotFound`
    fn update(&self, admission: &Admission) -> Result<()>;

    /// 删除记录，返回记录是否存在
    fn delete(&self, id: Uuid) -> Result<bool>;

    /// 全部记录，按到达时间升序
    fn list_all(&self) -> Result<Vec<Admission>>;

    /// 全部待诊记录，按到达时间升序
    fn list_pending(&self) -> Result<Vec<Admission>> {
        Ok(self.list_all()?.into_iter().filter(Admission::is_pending).collect())
    }
}

/// 就诊报告存储
pub trait ReportStore: Send + Sync {
    /// 持久化报告并分配标识；同一入院已有报告时返回 `Conflict`
    fn create(&self, report: &AttentionReport) -> Result<AttentionReport>;

    fn find_by_id(&self, id: Uuid) -> Result<Option<AttentionReport>>;

    fn find_by_admission(&self, admission_id: Uuid) -> Result<Option<AttentionReport>>;
}

/// 时间来源
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
