//! 生命体征值对象
//!
//! 体温、血压、心率、呼吸频率。构造时校验一次，之后不可变，相等性和格式化都基于数值。

use crate::error::{Result, TriageError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 绝对零度（摄氏度），低于此值的体温物理上不可能
pub const ABSOLUTE_ZERO_CELSIUS: f64 = -273.15;
/// 血压上限（mmHg）
pub const PRESSURE_MAX_MMHG: i32 = 300;

/// 体温
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Temperature(f64);

impl Temperature {
    pub fn new(celsius: f64) -> Result<Self> {
        if !celsius.is_finite() {
            return Err(TriageError::InvalidInput("temperature must be a finite number".into()));
        }
        if celsius < ABSOLUTE_ZERO_CELSIUS {
            return Err(TriageError::InvalidInput(format!(
                "temperature {} °C is below absolute zero",
                celsius
            )));
        }
        Ok(Self(celsius))
    }

    pub fn celsius(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Temperature {
    type Error = TriageError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Temperature> for f64 {
    fn from(value: Temperature) -> Self {
        value.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} °C", self.0)
    }
}

/// 单个血压读数（收缩压或舒张压）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Pressure(u16);

impl Pressure {
    pub fn new(mmhg: i32) -> Result<Self> {
        if mmhg < 0 {
            return Err(TriageError::InvalidInput("pressure cannot be negative".into()));
        }
        if mmhg > PRESSURE_MAX_MMHG {
            return Err(TriageError::InvalidInput(format!(
                "pressure cannot exceed {} mmHg",
                PRESSURE_MAX_MMHG
            )));
        }
        Ok(Self(mmhg as u16))
    }

    pub fn mmhg(&self) -> u16 {
        self.0
    }
}

impl TryFrom<i32> for Pressure {
    type Error = TriageError;

    fn try_from(value: i32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Pressure> for i32 {
    fn from(value: Pressure) -> Self {
        value.0 as i32
    }
}

impl fmt::Display for Pressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mmHg", self.0)
    }
}

/// 血压
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BloodPressure {
    systolic: Pressure,
    diastolic: Pressure,
}

impl BloodPressure {
    pub fn new(systolic: i32, diastolic: i32) -> Result<Self> {
        Ok(Self {
            systolic: Pressure::new(systolic)?,
            diastolic: Pressure::new(diastolic)?,
        })
    }

    pub fn systolic(&self) -> Pressure {
        self.systolic
    }

    pub fn diastolic(&self) -> Pressure {
        self.diastolic
    }
}

impl fmt::Display for BloodPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.systolic.0, self.diastolic.0)
    }
}

macro_rules! rate_type {
    ($(#[$meta:meta])* $name:ident, $label:literal, $unit:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "i32", into = "i32")]
        pub struct $name(u32);

        impl $name {
            pub fn new(per_minute: i32) -> Result<Self> {
                if per_minute < 0 {
                    return Err(TriageError::InvalidInput(
                        concat!($label, " cannot be negative").into(),
                    ));
                }
                Ok(Self(per_minute as u32))
            }

            pub fn per_minute(&self) -> u32 {
                self.0
            }
        }

        impl TryFrom<i32> for $name {
            type Error = TriageError;

            fn try_from(value: i32) -> Result<Self> {
                Self::new(value)
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> Self {
                value.0 as i32
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!("{} ", $unit), self.0)
            }
        }
    };
}

rate_type!(
    /// 心率（次/分）
    HeartRate,
    "heart rate",
    "lpm"
);

rate_type!(
    /// 呼吸频率（次/分）
    RespiratoryRate,
    "respiratory rate",
    "rpm"
);

/// 一次入院登记的四项生命体征
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalSigns {
    pub temperature: Temperature,
    pub blood_pressure: BloodPressure,
    pub heart_rate: HeartRate,
    pub respiratory_rate: RespiratoryRate,
}

impl VitalSigns {
    /// 从原始数值构造并校验全部生命体征
    pub fn from_raw(
        temperature: f64,
        systolic: i32,
        diastolic: i32,
        heart_rate: i32,
        respiratory_rate: i32,
    ) -> Result<Self> {
        Ok(Self {
            temperature: Temperature::new(temperature)?,
            blood_pressure: BloodPressure::new(systolic, diastolic)?,
            heart_rate: HeartRate::new(heart_rate)?,
            respiratory_rate: RespiratoryRate::new(respiratory_rate)?,
        })
    }
}
