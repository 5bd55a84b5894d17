//! 核心数据模型定义

use crate::error::{Result, TriageError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use uuid::Uuid;

/// 有效的 CUIL 前缀
pub const CUIL_PREFIXES: [&str; 7] = ["20", "23", "24", "27", "30", "33", "34"];

const CUIL_MULTIPLIERS: [u32; 10] = [5, 4, 3, 2, 7, 6, 5, 4, 3, 2];

fn cuil_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{2}-[0-9]{8}-[0-9]$").expect("static CUIL pattern"))
}

/// 税号/身份号 (CUIL)，格式 XX-XXXXXXXX-X
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cuil(String);

impl Cuil {
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(TriageError::InvalidInput("CUIL cannot be empty".into()));
        }
        if !cuil_pattern().is_match(value) {
            return Err(TriageError::InvalidInput(format!(
                "CUIL '{}' must match XX-XXXXXXXX-X",
                value
            )));
        }
        if !CUIL_PREFIXES.contains(&&value[0..2]) {
            return Err(TriageError::InvalidInput(format!(
                "CUIL prefix '{}' is not one of {}",
                &value[0..2],
                CUIL_PREFIXES.join(", ")
            )));
        }
        if !Self::check_digit_matches(value) {
            return Err(TriageError::InvalidInput(format!(
                "CUIL '{}' has an invalid check digit",
                value
            )));
        }
        Ok(Self(value.to_string()))
    }

    fn check_digit_matches(value: &str) -> bool {
        let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
        if digits.len() != 11 {
            return false;
        }
        let sum: u32 = digits[..10]
            .iter()
            .zip(CUIL_MULTIPLIERS.iter())
            .map(|(d, m)| d * m)
            .sum();
        let expected = match 11 - sum % 11 {
            11 => 0,
            10 => 9,
            other => other,
        };
        expected == digits[10]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 去掉连字符后的 11 位数字
    pub fn digits(&self) -> String {
        self.0.replace('-', "")
    }

    /// 中间 8 位 DNI
    pub fn dni(&self) -> &str {
        &self.0[3..11]
    }

    pub fn prefix(&self) -> &str {
        &self.0[0..2]
    }
}

impl TryFrom<String> for Cuil {
    type Error = TriageError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Cuil> for String {
    fn from(value: Cuil) -> Self {
        value.0
    }
}

impl fmt::Display for Cuil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 住址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    street: String,
    number: u32,
    locality: String,
}

impl Address {
    pub fn new(street: &str, number: i64, locality: &str) -> Result<Self> {
        let street = street.trim();
        let locality = locality.trim();
        if street.is_empty() {
            return Err(TriageError::InvalidInput("street cannot be empty".into()));
        }
        if number <= 0 || number > u32::MAX as i64 {
            return Err(TriageError::InvalidInput("street number must be greater than zero".into()));
        }
        if locality.is_empty() {
            return Err(TriageError::InvalidInput("locality cannot be empty".into()));
        }
        Ok(Self {
            street: street.to_string(),
            number: number as u32,
            locality: locality.to_string(),
        })
    }

    pub fn street(&self) -> &str {
        &self.street
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn locality(&self) -> &str {
        &self.locality
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}, {}", self.street, self.number, self.locality)
    }
}

/// 医保机构 (obra social)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Insurer {
    pub id: u32,
    pub name: String,
}

impl Insurer {
    /// 名称缺失时使用占位名称
    pub fn new(id: u32, name: Option<&str>) -> Self {
        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => crate::utils::insurer_placeholder_name(id),
        };
        Self { id, name }
    }
}

/// 医保参保信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affiliation {
    insurer: Insurer,
    member_number: String,
}

impl Affiliation {
    pub fn new(insurer: Insurer, member_number: &str) -> Result<Self> {
        let member_number = member_number.trim();
        if member_number.is_empty() {
            return Err(TriageError::InvalidInput("affiliate number cannot be empty".into()));
        }
        Ok(Self {
            insurer,
            member_number: member_number.to_string(),
        })
    }

    pub fn insurer(&self) -> &Insurer {
        &self.insurer
    }

    pub fn member_number(&self) -> &str {
        &self.member_number
    }
}

/// 患者基本信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub cuil: Cuil,
    pub name: String,
    pub surname: String,
    pub address: Option<Address>,
    pub affiliation: Option<Affiliation>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{}, {}", self.surname, self.name)
    }
}

/// 待创建的患者
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPatient {
    pub cuil: Cuil,
    pub name: String,
    pub surname: String,
    pub address: Option<Address>,
    pub affiliation: Option<Affiliation>,
}

/// 医护人员角色
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StaffRole {
    #[serde(rename = "ENFERMERO")]
    Nurse,
    #[serde(rename = "MEDICO")]
    Doctor,
}

/// 医护人员
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub id: Uuid,
    pub cuil: Cuil,
    pub name: String,
    pub surname: String,
    pub license: String, // 执业编号 (matrícula)
    pub role: StaffRole,
}

impl Staff {
    pub fn is_nurse(&self) -> bool {
        self.role == StaffRole::Nurse
    }

    pub fn is_doctor(&self) -> bool {
        self.role == StaffRole::Doctor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuil_accepts_valid_numbers() {
        let cuil = Cuil::parse("20-12345678-6").unwrap();
        assert_eq!(cuil.prefix(), "20");
        assert_eq!(cuil.dni(), "12345678");
        assert_eq!(cuil.digits(), "20123456786");
        assert!(Cuil::parse(" 27-11111111-7 ").is_ok());
    }

    #[test]
    fn test_cuil_rejects_bad_format_prefix_and_digit() {
        assert!(Cuil::parse("").is_err());
        assert!(Cuil::parse("20123456786").is_err());
        assert!(Cuil::parse("21-12345678-6").is_err());
        assert!(Cuil::parse("20-12345678-5").is_err());
    }

    #[test]
    fn test_cuil_rejects_non_ascii_digits() {
        // 全角数字和阿拉伯-印度数字
        let err = Cuil::parse("2\u{FF10}-12345678-6").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);
        assert!(Cuil::parse("\u{0662}\u{0660}-12345678-6").is_err());
        assert!(serde_json::from_str::<Cuil>("\"2\u{FF10}-12345678-6\"").is_err());
    }

    #[test]
    fn test_address_validation() {
        let address = Address::new(" Av. Siempre Viva ", 742, "Tucumán").unwrap();
        assert_eq!(address.to_string(), "Av. Siempre Viva 742, Tucumán");
        assert!(Address::new("", 1, "X").is_err());
        assert!(Address::new("Calle", 0, "X").is_err());
        assert!(Address::new("Calle", 10, " ").is_err());
    }

    #[test]
    fn test_insurer_placeholder_name() {
        assert_eq!(Insurer::new(7, None).name, "Obra Social 7");
        assert_eq!(Insurer::new(7, Some("  ")).name, "Obra Social 7");
        assert_eq!(Insurer::new(1, Some("OSDE")).name, "OSDE");
        assert!(Affiliation::new(Insurer::new(1, None), " ").is_err());
    }
}
