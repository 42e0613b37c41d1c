//! 通用工具函数

use crate::models::{Quadrant, ToothNumber};

/// 规范化治疗标识：去除首尾空白、转小写、空白与连字符替换为下划线
pub fn normalize_key(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if c.is_whitespace() || c == '-' { '_' } else { c })
        .collect::<String>()
        .to_lowercase()
}

/// 验证FDI牙位编号
pub fn is_valid_tooth_number(number: u8) -> bool {
    ToothNumber::new(number).is_ok()
}

/// 全口牙位（恒牙32颗 + 乳牙20颗），按象限和显示顺序排列
pub fn all_tooth_numbers() -> Vec<ToothNumber> {
    Quadrant::ALL
        .iter()
        .flat_map(|quadrant| quadrant.display_numbers())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Root Canal"), "root_canal");
        assert_eq!(normalize_key(" bridge-start "), "bridge_start");
    }

    #[test]
    fn test_is_valid_tooth_number() {
        assert!(is_valid_tooth_number(21));
        assert!(is_valid_tooth_number(75));
        assert!(!is_valid_tooth_number(76));
        assert!(!is_valid_tooth_number(49));
    }

    #[test]
    fn test_all_tooth_numbers_unique() {
        let numbers = all_tooth_numbers();
        assert_eq!(numbers.len(), 52);

        let unique: HashSet<_> = numbers.iter().collect();
        assert_eq!(unique.len(), numbers.len());
    }
}
