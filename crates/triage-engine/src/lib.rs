//! # 急诊分诊工作流模块
//!
//! 提供急诊入院的分诊与诊治流程，包括：
//! - 紧急程度：五个带权重的分诊等级
//! - 入院状态机：待诊、就诊中、已完成
//! - 分诊队列：按紧急程度和到达时间排序的进程内待诊列表
//! - 工作流服务：登记、叫号、修改、删除和出具报告

pub mod admission;
pub mod attention;
pub mod engine;
pub mod memory;
pub mod ports;
pub mod queue;
pub mod requests;
pub mod state_machine;
pub mod urgency;

// 重新导出主要类型
pub use admission::{Admission, AdmissionRecord};
pub use attention::AttentionReport;
pub use engine::{AdmissionWorkflow, QueueOverview};
pub use memory::{
    InMemoryAdmissionStore, InMemoryPatientDirectory, InMemoryReportStore, InMemoryStaffDirectory,
    ManualClock,
};
pub use ports::{AdmissionStore, Clock, PatientDirectory, ReportStore, StaffDirectory, SystemClock};
pub use queue::{PriorityKey, QueueTransaction, TriageQueue};
pub use requests::{AddressInput, AdmissionRequest, InsuranceInput, VitalsInput};
pub use state_machine::{AdmissionEvent, AdmissionStateMachine, AdmissionStatus};
pub use urgency::UrgencyLevel;
