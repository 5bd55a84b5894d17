//! 工作流输入
//!
//! 登记和修改入院使用同一结构；修改时忽略患者的可选资料。

use crate::urgency::UrgencyLevel;
use serde::{Deserialize, Serialize};
use triage_core::utils::non_blank;
use triage_core::{Address, Affiliation, Insurer, Result, VitalSigns};

/// 住址输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressInput {
    pub street: String,
    pub number: i64,
    pub locality: String,
}

impl AddressInput {
    pub fn to_address(&self) -> Result<Address> {
        Address::new(&self.street, self.number, &self.locality)
    }
}

/// 医保输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceInput {
    pub insurer_id: u32,
    #[serde(default)]
    pub insurer_name: Option<String>,
    pub member_number: String,
}

impl InsuranceInput {
    pub fn to_affiliation(&self) -> Result<Affiliation> {
        let insurer = Insurer::new(self.insurer_id, non_blank(self.insurer_name.as_deref()));
        Affiliation::new(insurer, &self.member_number)
    }
}

/// 生命体征原始读数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalsInput {
    pub temperature: f64,
    pub systolic: i32,
    pub diastolic: i32,
    pub heart_rate: i32,
    pub respiratory_rate: i32,
}

impl VitalsInput {
    pub fn to_vitals(&self) -> Result<VitalSigns> {
        VitalSigns::from_raw(
            self.temperature,
            self.systolic,
            self.diastolic,
            self.heart_rate,
            self.respiratory_rate,
        )
    }
}

/// 入院登记 / 修改请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionRequest {
    pub patient_cuil: String,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub patient_surname: Option<String>,
    #[serde(default)]
    pub address: Option<AddressInput>,
    #[serde(default)]
    pub insurance: Option<InsuranceInput>,
    pub nurse_cuil: String,
    pub description: String,
    #[serde(flatten)]
    pub vitals: VitalsInput,
    pub urgency: UrgencyLevel,
}
