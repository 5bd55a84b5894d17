//! 通用工具函数

/// 未提供姓名时使用的占位值
pub const UNKNOWN_NAME: &str = "Desconocido";

/// 医保机构名称缺失时的占位名称
pub fn insurer_placeholder_name(insurer_id: u32) -> String {
    format!("Obra Social {}", insurer_id)
}

/// 去除首尾空白后非空则返回，否则返回 `None`
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
