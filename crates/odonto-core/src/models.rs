//! 核心数据模型定义

use crate::error::{OdontoError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 象限（FDI编号的第一位数字）
///
/// 牙位图按患者方位命名：患者右侧画在观察者左侧。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    UpperRight,          // 1 恒牙右上
    UpperLeft,           // 2 恒牙左上
    LowerLeft,           // 3 恒牙左下
    LowerRight,          // 4 恒牙右下
    TemporaryUpperRight, // 5 乳牙右上
    TemporaryUpperLeft,  // 6 乳牙左上
    TemporaryLowerLeft,  // 7 乳牙左下
    TemporaryLowerRight, // 8 乳牙右下
}

impl Quadrant {
    /// 全部象限，按FDI编号顺序
    pub const ALL: [Quadrant; 8] = [
        Quadrant::UpperRight,
        Quadrant::UpperLeft,
        Quadrant::LowerLeft,
        Quadrant::LowerRight,
        Quadrant::TemporaryUpperRight,
        Quadrant::TemporaryUpperLeft,
        Quadrant::TemporaryLowerLeft,
        Quadrant::TemporaryLowerRight,
    ];

    /// 恒牙象限
    pub const PERMANENT: [Quadrant; 4] = [
        Quadrant::UpperRight,
        Quadrant::UpperLeft,
        Quadrant::LowerLeft,
        Quadrant::LowerRight,
    ];

    /// FDI象限数字
    pub fn digit(self) -> u8 {
        match self {
            Quadrant::UpperRight => 1,
            Quadrant::UpperLeft => 2,
            Quadrant::LowerLeft => 3,
            Quadrant::LowerRight => 4,
            Quadrant::TemporaryUpperRight => 5,
            Quadrant::TemporaryUpperLeft => 6,
            Quadrant::TemporaryLowerLeft => 7,
            Quadrant::TemporaryLowerRight => 8,
        }
    }

    /// 由FDI象限数字构造
    pub fn from_digit(digit: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|q| q.digit() == digit)
    }

    pub fn is_temporary(self) -> bool {
        self.digit() >= 5
    }

    pub fn is_upper(self) -> bool {
        matches!(self.digit(), 1 | 2 | 5 | 6)
    }

    /// 是否画在牙位图的观察者左侧（患者右侧）
    pub fn is_drawn_on_left(self) -> bool {
        matches!(self.digit(), 1 | 4 | 5 | 8)
    }

    /// 象限内牙齿数量：恒牙8颗，乳牙5颗
    pub fn tooth_count(self) -> u8 {
        if self.is_temporary() {
            5
        } else {
            8
        }
    }

    /// 按牙位图显示顺序（从左到右）列出该象限的全部牙位
    pub fn display_numbers(self) -> Vec<ToothNumber> {
        let positions: Vec<u8> = if self.is_drawn_on_left() {
            (1..=self.tooth_count()).rev().collect()
        } else {
            (1..=self.tooth_count()).collect()
        };

        positions
            .into_iter()
            .map(|position| ToothNumber(self.digit() * 10 + position))
            .collect()
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Quadrant::UpperRight => "upper_right",
            Quadrant::UpperLeft => "upper_left",
            Quadrant::LowerLeft => "lower_left",
            Quadrant::LowerRight => "lower_right",
            Quadrant::TemporaryUpperRight => "temporary_upper_right",
            Quadrant::TemporaryUpperLeft => "temporary_upper_left",
            Quadrant::TemporaryLowerLeft => "temporary_lower_left",
            Quadrant::TemporaryLowerRight => "temporary_lower_right",
        };
        write!(f, "{}", name)
    }
}

/// FDI牙位编号
///
/// 恒牙 11–48（象限1–4，位置1–8），乳牙 51–85（象限5–8，位置1–5）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub struct ToothNumber(u8);

impl ToothNumber {
    /// 校验并创建牙位编号
    pub fn new(number: u8) -> Result<Self> {
        let quadrant = Quadrant::from_digit(number / 10)
            .ok_or_else(|| OdontoError::InvalidToothNumber(number.to_string()))?;
        let position = number % 10;

        if position == 0 || position > quadrant.tooth_count() {
            return Err(OdontoError::InvalidToothNumber(number.to_string()));
        }

        Ok(Self(number))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn quadrant(self) -> Quadrant {
        // 构造时已校验
        Quadrant::from_digit(self.0 / 10).unwrap_or(Quadrant::UpperRight)
    }

    /// 象限内的位置（1 = 中切牙）
    pub fn position(self) -> u8 {
        self.0 % 10
    }

    pub fn is_temporary(self) -> bool {
        self.quadrant().is_temporary()
    }

    pub fn is_upper(self) -> bool {
        self.quadrant().is_upper()
    }
}

impl TryFrom<u8> for ToothNumber {
    type Error = OdontoError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ToothNumber> for u8 {
    fn from(number: ToothNumber) -> Self {
        number.0
    }
}

impl FromStr for ToothNumber {
    type Err = OdontoError;

    fn from_str(s: &str) -> Result<Self> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| OdontoError::InvalidToothNumber(s.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for ToothNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 牙齿上可独立记录治疗的区域
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Top,
    Bottom,
    Left,
    Right,
    Center,
    Full,
}

impl Slot {
    /// 五个分面区域（不含整牙）
    pub const SURFACES: [Slot; 5] = [Slot::Top, Slot::Bottom, Slot::Left, Slot::Right, Slot::Center];

    pub const ALL: [Slot; 6] = [
        Slot::Top,
        Slot::Bottom,
        Slot::Left,
        Slot::Right,
        Slot::Center,
        Slot::Full,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Top => "top",
            Slot::Bottom => "bottom",
            Slot::Left => "left",
            Slot::Right => "right",
            Slot::Center => "center",
            Slot::Full => "full",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = OdontoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Slot::Top),
            "bottom" => Ok(Slot::Bottom),
            "left" => Ok(Slot::Left),
            "right" => Ok(Slot::Right),
            "center" | "centre" => Ok(Slot::Center),
            "full" | "whole" => Ok(Slot::Full),
            other => Err(OdontoError::Validation(format!("Unknown slot: {}", other))),
        }
    }
}

/// 解剖学牙面，仅用于龋齿/树脂类治疗的分面选择
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ToothFace {
    Lingual,    // 舌侧/腭侧
    Distal,     // 远中
    Vestibular, // 唇颊侧
    Mesial,     // 近中
    Incisal,    // 切缘/咬合面
}

impl ToothFace {
    pub const ALL: [ToothFace; 5] = [
        ToothFace::Lingual,
        ToothFace::Distal,
        ToothFace::Vestibular,
        ToothFace::Mesial,
        ToothFace::Incisal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToothFace::Lingual => "lingual",
            ToothFace::Distal => "distal",
            ToothFace::Vestibular => "vestibular",
            ToothFace::Mesial => "mesial",
            ToothFace::Incisal => "incisal",
        }
    }

    /// 将牙面投影到牙位图上的区域
    ///
    /// 上颌唇颊侧朝上、下颌唇颊侧朝下；近中总是朝向中线。
    pub fn slot_for(self, number: ToothNumber) -> Slot {
        let quadrant = number.quadrant();
        match self {
            ToothFace::Incisal => Slot::Center,
            ToothFace::Vestibular if quadrant.is_upper() => Slot::Top,
            ToothFace::Vestibular => Slot::Bottom,
            ToothFace::Lingual if quadrant.is_upper() => Slot::Bottom,
            ToothFace::Lingual => Slot::Top,
            ToothFace::Mesial if quadrant.is_drawn_on_left() => Slot::Right,
            ToothFace::Mesial => Slot::Left,
            ToothFace::Distal if quadrant.is_drawn_on_left() => Slot::Left,
            ToothFace::Distal => Slot::Right,
        }
    }
}

impl fmt::Display for ToothFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToothFace {
    type Err = OdontoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lingual" | "palatal" => Ok(ToothFace::Lingual),
            "distal" => Ok(ToothFace::Distal),
            "vestibular" | "buccal" => Ok(ToothFace::Vestibular),
            "mesial" => Ok(ToothFace::Mesial),
            "incisal" | "occlusal" => Ok(ToothFace::Incisal),
            other => Err(OdontoError::Validation(format!("Unknown tooth face: {}", other))),
        }
    }
}

/// 治疗的稳定标识（小写、下划线分隔）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(from = "String", into = "String")]
pub struct TreatmentKey(String);

impl TreatmentKey {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(crate::utils::normalize_key(key.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TreatmentKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for TreatmentKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<TreatmentKey> for String {
    fn from(key: TreatmentKey) -> Self {
        key.0
    }
}

impl fmt::Display for TreatmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// 治疗适用条件标记
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ConditionFlag {
    BridgeStart,      // 桥体起点
    BridgeEnd,        // 桥体终点
    Face(ToothFace),  // 可选择的牙面
}

/// 后端返回的治疗条件记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreatmentCondition {
    pub id: i64,
    pub name: String,
    pub color: Option<String>,
}

/// 治疗定义
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Treatment {
    pub key: TreatmentKey,
    pub label: String,
    pub icons: Vec<String>,
    pub color: Option<String>,
    pub flags: BTreeSet<ConditionFlag>,
    #[serde(default)]
    pub conditions: Vec<TreatmentCondition>,
}

impl Treatment {
    pub fn new(key: impl Into<TreatmentKey>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            icons: Vec::new(),
            color: None,
            flags: BTreeSet::new(),
            conditions: Vec::new(),
        }
    }

    pub fn with_icons<I, S>(mut self, icons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.icons = icons.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_flag(mut self, flag: ConditionFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    /// 允许在全部五个牙面上选择
    pub fn with_all_faces(mut self) -> Self {
        self.flags
            .extend(ToothFace::ALL.iter().map(|face| ConditionFlag::Face(*face)));
        self
    }

    /// 是否支持分面选择（龋齿/树脂类）
    pub fn is_surface_capable(&self) -> bool {
        self.flags.iter().any(|flag| matches!(flag, ConditionFlag::Face(_)))
    }

    pub fn supports_face(&self, face: ToothFace) -> bool {
        self.flags.contains(&ConditionFlag::Face(face))
    }

    pub fn is_bridge_anchor(&self) -> bool {
        self.flags.contains(&ConditionFlag::BridgeStart) || self.flags.contains(&ConditionFlag::BridgeEnd)
    }
}

/// 病史风险条目（疾病、用药、类型、描述）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicalRisk {
    pub id: Uuid,
    pub disease: String,
    pub medication: Option<String>,
    pub risk_type: String,
    pub description: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl MedicalRisk {
    pub fn new(disease: impl Into<String>, risk_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            disease: disease.into(),
            medication: None,
            risk_type: risk_type.into(),
            description: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_medication(mut self, medication: impl Into<String>) -> Self {
        self.medication = Some(medication.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tooth_number_ranges() {
        assert!(ToothNumber::new(11).is_ok());
        assert!(ToothNumber::new(48).is_ok());
        assert!(ToothNumber::new(55).is_ok());
        assert!(ToothNumber::new(85).is_ok());

        assert!(ToothNumber::new(10).is_err());
        assert!(ToothNumber::new(19).is_err());
        assert!(ToothNumber::new(56).is_err());
        assert!(ToothNumber::new(91).is_err());
        assert!(ToothNumber::new(0).is_err());
    }

    #[test]
    fn test_tooth_number_parts() {
        let number = ToothNumber::new(64).unwrap();
        assert_eq!(number.quadrant(), Quadrant::TemporaryUpperLeft);
        assert_eq!(number.position(), 4);
        assert!(number.is_temporary());
        assert!(number.is_upper());
    }

    #[test]
    fn test_tooth_number_serde_rejects_invalid() {
        let number: ToothNumber = serde_json::from_str("36").unwrap();
        assert_eq!(number.value(), 36);
        assert_eq!(serde_json::to_string(&number).unwrap(), "36");
        assert!(serde_json::from_str::<ToothNumber>("39").is_err());
    }

    #[test]
    fn test_display_order() {
        let upper_right: Vec<u8> = Quadrant::UpperRight
            .display_numbers()
            .into_iter()
            .map(u8::from)
            .collect();
        assert_eq!(upper_right, vec![18, 17, 16, 15, 14, 13, 12, 11]);

        let lower_left: Vec<u8> = Quadrant::TemporaryLowerLeft
            .display_numbers()
            .into_iter()
            .map(u8::from)
            .collect();
        assert_eq!(lower_left, vec![71, 72, 73, 74, 75]);
    }

    #[test]
    fn test_face_projection() {
        let upper_right = ToothNumber::new(16).unwrap();
        assert_eq!(ToothFace::Vestibular.slot_for(upper_right), Slot::Top);
        assert_eq!(ToothFace::Lingual.slot_for(upper_right), Slot::Bottom);
        assert_eq!(ToothFace::Mesial.slot_for(upper_right), Slot::Right);
        assert_eq!(ToothFace::Distal.slot_for(upper_right), Slot::Left);
        assert_eq!(ToothFace::Incisal.slot_for(upper_right), Slot::Center);

        let lower_left = ToothNumber::new(36).unwrap();
        assert_eq!(ToothFace::Vestibular.slot_for(lower_left), Slot::Bottom);
        assert_eq!(ToothFace::Lingual.slot_for(lower_left), Slot::Top);
        assert_eq!(ToothFace::Mesial.slot_for(lower_left), Slot::Left);
        assert_eq!(ToothFace::Distal.slot_for(lower_left), Slot::Right);
    }

    #[test]
    fn test_treatment_key_normalization() {
        assert_eq!(TreatmentKey::new("  Root Canal "), TreatmentKey::new("root_canal"));
        let key: TreatmentKey = serde_json::from_str("\"Crown\"").unwrap();
        assert_eq!(key.as_str(), "crown");
    }

    #[test]
    fn test_surface_capability() {
        let caries = Treatment::new("caries", "Caries").with_all_faces();
        assert!(caries.is_surface_capable());
        assert!(caries.supports_face(ToothFace::Mesial));

        let sealant = Treatment::new("sealant", "Sellante")
            .with_flag(ConditionFlag::Face(ToothFace::Incisal));
        assert!(sealant.supports_face(ToothFace::Incisal));
        assert!(!sealant.supports_face(ToothFace::Lingual));

        let crown = Treatment::new("crown", "Corona");
        assert!(!crown.is_surface_capable());
    }

    #[test]
    fn test_slot_and_face_parsing() {
        assert_eq!("Center".parse::<Slot>().unwrap(), Slot::Center);
        assert_eq!("occlusal".parse::<ToothFace>().unwrap(), ToothFace::Incisal);
        assert!("side".parse::<Slot>().is_err());
    }
}
