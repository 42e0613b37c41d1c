//! 牙齿与牙面状态
//!
//! 整牙治疗与分面治疗互斥，由状态枚举在结构上保证

use odonto_core::{Slot, ToothNumber, TreatmentKey};
use serde::{Deserialize, Serialize};

/// 五个分面区域的治疗记录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceTreatments {
    pub top: Option<TreatmentKey>,
    pub bottom: Option<TreatmentKey>,
    pub left: Option<TreatmentKey>,
    pub right: Option<TreatmentKey>,
    pub center: Option<TreatmentKey>,
}

impl SurfaceTreatments {
    /// 五个区域均为同一治疗
    pub fn uniform(treatment: TreatmentKey) -> Self {
        Self {
            top: Some(treatment.clone()),
            bottom: Some(treatment.clone()),
            left: Some(treatment.clone()),
            right: Some(treatment.clone()),
            center: Some(treatment),
        }
    }

    /// 读取分面区域；`Slot::Full` 不属于分面，总是返回 `None`
    pub fn get(&self, slot: Slot) -> Option<&TreatmentKey> {
        match slot {
            Slot::Top => self.top.as_ref(),
            Slot::Bottom => self.bottom.as_ref(),
            Slot::Left => self.left.as_ref(),
            Slot::Right => self.right.as_ref(),
            Slot::Center => self.center.as_ref(),
            Slot::Full => None,
        }
    }

    fn set(&mut self, slot: Slot, treatment: Option<TreatmentKey>) {
        match slot {
            Slot::Top => self.top = treatment,
            Slot::Bottom => self.bottom = treatment,
            Slot::Left => self.left = treatment,
            Slot::Right => self.right = treatment,
            Slot::Center => self.center = treatment,
            Slot::Full => {}
        }
    }

    pub fn is_empty(&self) -> bool {
        Slot::SURFACES.iter().all(|slot| self.get(*slot).is_none())
    }
}

/// 牙齿治疗状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToothState {
    /// 无治疗
    #[default]
    Unset,
    /// 整牙治疗，覆盖全部五个分面
    Whole { treatment: TreatmentKey },
    /// 分面治疗，至少一个分面有记录
    PerSurface(SurfaceTreatments),
}

impl ToothState {
    /// 空的分面记录归一为 `Unset`
    fn normalized(self) -> Self {
        match self {
            ToothState::PerSurface(surfaces) if surfaces.is_empty() => ToothState::Unset,
            other => other,
        }
    }
}

/// 牙齿
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tooth {
    number: ToothNumber,
    #[serde(default)]
    state: ToothState,
}

impl Tooth {
    pub fn new(number: ToothNumber) -> Self {
        Self {
            number,
            state: ToothState::Unset,
        }
    }

    pub fn with_state(number: ToothNumber, state: ToothState) -> Self {
        Self {
            number,
            state: state.normalized(),
        }
    }

    pub fn number(&self) -> ToothNumber {
        self.number
    }

    pub fn state(&self) -> &ToothState {
        &self.state
    }

    /// 读取某一区域的治疗
    ///
    /// 整牙治疗对五个分面和 `Full` 都可见；分面治疗下 `Full` 为空。
    pub fn treatment_at(&self, slot: Slot) -> Option<&TreatmentKey> {
        match &self.state {
            ToothState::Unset => None,
            ToothState::Whole { treatment } => Some(treatment),
            ToothState::PerSurface(surfaces) => surfaces.get(slot),
        }
    }

    pub fn full_treatment(&self) -> Option<&TreatmentKey> {
        self.treatment_at(Slot::Full)
    }

    pub fn is_treated(&self) -> bool {
        !matches!(self.state, ToothState::Unset)
    }

    /// 写入单个区域，不向其它区域级联
    ///
    /// 对整牙治疗的牙齿写分面时，先展开为五个相同的分面记录再覆盖该分面。
    pub fn set_slot(&mut self, slot: Slot, treatment: Option<TreatmentKey>) {
        if slot == Slot::Full {
            self.set_whole(treatment);
            return;
        }

        let mut surfaces = match std::mem::take(&mut self.state) {
            ToothState::Unset => SurfaceTreatments::default(),
            ToothState::Whole { treatment } => SurfaceTreatments::uniform(treatment),
            ToothState::PerSurface(surfaces) => surfaces,
        };
        surfaces.set(slot, treatment);

        self.state = ToothState::PerSurface(surfaces).normalized();
    }

    /// 设置或清除整牙治疗
    pub fn set_whole(&mut self, treatment: Option<TreatmentKey>) {
        self.state = match treatment {
            Some(treatment) => ToothState::Whole { treatment },
            None => ToothState::Unset,
        };
    }

    pub fn clear(&mut self) {
        self.state = ToothState::Unset;
    }

    /// 当前记录的全部 (区域, 治疗)
    pub fn treatments(&self) -> Vec<(Slot, &TreatmentKey)> {
        match &self.state {
            ToothState::Unset => Vec::new(),
            ToothState::Whole { treatment } => vec![(Slot::Full, treatment)],
            ToothState::PerSurface(surfaces) => Slot::SURFACES
                .iter()
                .filter_map(|slot| surfaces.get(*slot).map(|key| (*slot, key)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tooth(number: u8) -> Tooth {
        Tooth::new(ToothNumber::new(number).unwrap())
    }

    fn key(name: &str) -> TreatmentKey {
        TreatmentKey::new(name)
    }

    #[test]
    fn test_whole_covers_every_surface() {
        let mut t = tooth(21);
        t.set_whole(Some(key("crown")));

        for slot in Slot::ALL {
            assert_eq!(t.treatment_at(slot), Some(&key("crown")));
        }
    }

    #[test]
    fn test_partial_write_on_whole_does_not_cascade() {
        let mut t = tooth(11);
        t.set_whole(Some(key("crown")));
        t.set_slot(Slot::Left, Some(key("caries")));

        assert_eq!(t.treatment_at(Slot::Left), Some(&key("caries")));
        assert_eq!(t.treatment_at(Slot::Top), Some(&key("crown")));
        assert_eq!(t.full_treatment(), None);
    }

    #[test]
    fn test_full_write_overrides_partial() {
        let mut t = tooth(36);
        t.set_slot(Slot::Top, Some(key("caries")));
        t.set_slot(Slot::Full, Some(key("crown")));

        assert_eq!(t.treatment_at(Slot::Top), Some(&key("crown")));
        assert_eq!(t.state(), &ToothState::Whole { treatment: key("crown") });
    }

    #[test]
    fn test_clearing_last_surface_normalizes_to_unset() {
        let mut t = tooth(47);
        t.set_slot(Slot::Center, Some(key("caries")));
        assert!(t.is_treated());

        t.set_slot(Slot::Center, None);
        assert_eq!(t.state(), &ToothState::Unset);
        assert!(!t.is_treated());
    }

    #[test]
    fn test_empty_per_surface_state_is_normalized() {
        let t = Tooth::with_state(
            ToothNumber::new(12).unwrap(),
            ToothState::PerSurface(SurfaceTreatments::default()),
        );
        assert_eq!(t.state(), &ToothState::Unset);
    }

    #[test]
    fn test_treatments_listing() {
        let mut t = tooth(14);
        t.set_slot(Slot::Right, Some(key("composite")));
        t.set_slot(Slot::Center, Some(key("caries")));

        let listed: Vec<(Slot, &str)> = t
            .treatments()
            .into_iter()
            .map(|(slot, key)| (slot, key.as_str()))
            .collect();
        assert_eq!(listed, vec![(Slot::Right, "composite"), (Slot::Center, "caries")]);
    }

    #[test]
    fn test_state_serde_shape() {
        let mut t = tooth(11);
        t.set_whole(Some(key("crown")));

        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["number"], 11);
        assert_eq!(json["state"]["kind"], "whole");
        assert_eq!(json["state"]["treatment"], "crown");

        let back: Tooth = serde_json::from_value(json).unwrap();
        assert_eq!(back, t);
    }
}
