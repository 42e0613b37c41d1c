//! 牙位图聚合
//!
//! 持有八个象限的牙齿序列，按牙位编号查找和修改

use crate::tooth::Tooth;
use odonto_core::{OdontoError, Quadrant, Result, Slot, ToothNumber, TreatmentKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 牙位图
///
/// 构造（包括反序列化）时校验：每个象限恰好包含其应有的牙位，全图牙位编号唯一。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OdontogramSnapshot", into = "OdontogramSnapshot")]
pub struct Odontogram {
    quadrants: BTreeMap<Quadrant, Vec<Tooth>>,
}

/// 牙位图的序列化形式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OdontogramSnapshot {
    pub quadrants: BTreeMap<Quadrant, Vec<Tooth>>,
}

impl Odontogram {
    /// 创建全部牙齿无治疗的牙位图
    pub fn new() -> Self {
        let quadrants = Quadrant::ALL
            .iter()
            .map(|quadrant| {
                let teeth = quadrant.display_numbers().into_iter().map(Tooth::new).collect();
                (*quadrant, teeth)
            })
            .collect();

        Self { quadrants }
    }

    /// 由外部提供的象限数据创建，校验牙位集合
    pub fn from_quadrants(quadrants: BTreeMap<Quadrant, Vec<Tooth>>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        let mut normalized = BTreeMap::new();

        for quadrant in Quadrant::ALL {
            let teeth = quadrants.get(&quadrant).ok_or_else(|| {
                OdontoError::InvalidOdontogram(format!("Missing quadrant {}", quadrant))
            })?;

            let expected: BTreeSet<ToothNumber> = quadrant.display_numbers().into_iter().collect();
            let mut present = BTreeSet::new();

            for tooth in teeth {
                let number = tooth.number();
                if !seen.insert(number) {
                    return Err(OdontoError::InvalidOdontogram(format!(
                        "Duplicate tooth number {}",
                        number
                    )));
                }
                if number.quadrant() != quadrant {
                    return Err(OdontoError::InvalidOdontogram(format!(
                        "Tooth {} does not belong to quadrant {}",
                        number, quadrant
                    )));
                }
                present.insert(number);
            }

            if present != expected {
                let missing: Vec<String> = expected
                    .difference(&present)
                    .map(|number| number.to_string())
                    .collect();
                return Err(OdontoError::InvalidOdontogram(format!(
                    "Quadrant {} is missing teeth: {}",
                    quadrant,
                    missing.join(", ")
                )));
            }

            let teeth = teeth
                .iter()
                .map(|tooth| Tooth::with_state(tooth.number(), tooth.state().clone()))
                .collect();
            normalized.insert(quadrant, teeth);
        }

        Ok(Self {
            quadrants: normalized,
        })
    }

    /// 演示用牙位图模板，治疗均按标识引用
    pub fn standard_template() -> Self {
        let mut odontogram = Self::new();
        let entries: [(u8, Slot, &str); 8] = [
            (11, Slot::Full, "crown"),
            (14, Slot::Right, "composite"),
            (16, Slot::Center, "caries"),
            (26, Slot::Full, "root_canal"),
            (36, Slot::Full, "extraction"),
            (45, Slot::Full, "bridge"),
            (46, Slot::Full, "missing"),
            (85, Slot::Center, "sealant"),
        ];

        for (number, slot, key) in entries {
            if let Some(tooth) = odontogram.find_tooth_mut(number) {
                tooth.set_slot(slot, Some(TreatmentKey::new(key)));
            }
        }

        odontogram
    }

    /// 按编号查找牙齿，按象限1到8的顺序搜索
    pub fn find_tooth(&self, number: impl Into<u8>) -> Option<&Tooth> {
        let number = number.into();
        self.quadrants
            .values()
            .flat_map(|teeth| teeth.iter())
            .find(|tooth| tooth.number().value() == number)
    }

    fn find_tooth_mut(&mut self, number: u8) -> Option<&mut Tooth> {
        self.quadrants
            .values_mut()
            .flat_map(|teeth| teeth.iter_mut())
            .find(|tooth| tooth.number().value() == number)
    }

    /// 写入单个区域；牙位不存在时返回 `NotFound` 且不做任何修改
    pub fn set_surface_treatment(
        &mut self,
        number: impl Into<u8>,
        slot: Slot,
        treatment: Option<TreatmentKey>,
    ) -> Result<()> {
        let number = number.into();
        let tooth = self
            .find_tooth_mut(number)
            .ok_or_else(|| OdontoError::tooth_not_found(number))?;

        tracing::debug!("Tooth {} slot {} set to {:?}", number, slot, treatment);
        tooth.set_slot(slot, treatment);
        Ok(())
    }

    /// 设置整牙治疗；牙位不存在时返回 `NotFound`
    pub fn set_full_tooth_treatment(
        &mut self,
        number: impl Into<u8>,
        treatment: Option<TreatmentKey>,
    ) -> Result<()> {
        let number = number.into();
        let tooth = self
            .find_tooth_mut(number)
            .ok_or_else(|| OdontoError::tooth_not_found(number))?;

        tracing::debug!("Tooth {} full treatment set to {:?}", number, treatment);
        tooth.set_whole(treatment);
        Ok(())
    }

    /// 清除全部象限（含乳牙）所有牙齿的治疗
    pub fn clear_all(&mut self) {
        for tooth in self.quadrants.values_mut().flat_map(|teeth| teeth.iter_mut()) {
            tooth.clear();
        }
    }

    pub fn quadrant(&self, quadrant: Quadrant) -> &[Tooth] {
        self.quadrants
            .get(&quadrant)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 需要显示的象限；乳牙象限由外部的 `show_temporaries` 控制
    pub fn visible_quadrants(&self, show_temporaries: bool) -> Vec<(Quadrant, &[Tooth])> {
        Quadrant::ALL
            .iter()
            .filter(|quadrant| show_temporaries || !quadrant.is_temporary())
            .map(|quadrant| (*quadrant, self.quadrant(*quadrant)))
            .collect()
    }

    pub fn teeth(&self) -> impl Iterator<Item = &Tooth> {
        self.quadrants.values().flat_map(|teeth| teeth.iter())
    }

    pub fn treated_count(&self) -> usize {
        self.teeth().filter(|tooth| tooth.is_treated()).count()
    }

    /// 牙位图中引用到的全部治疗标识
    pub fn referenced_treatments(&self) -> BTreeSet<&TreatmentKey> {
        self.teeth()
            .flat_map(|tooth| tooth.treatments().into_iter().map(|(_, key)| key))
            .collect()
    }
}

impl Default for Odontogram {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<OdontogramSnapshot> for Odontogram {
    type Error = OdontoError;

    fn try_from(snapshot: OdontogramSnapshot) -> Result<Self> {
        Self::from_quadrants(snapshot.quadrants)
    }
}

impl From<Odontogram> for OdontogramSnapshot {
    fn from(odontogram: Odontogram) -> Self {
        Self {
            quadrants: odontogram.quadrants,
        }
    }
}
