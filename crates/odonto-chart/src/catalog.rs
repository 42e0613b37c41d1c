//! 治疗目录
//!
//! 提供可用于牙位图标记的固定治疗定义列表，按标识查找，不依赖列表位置

use odonto_core::{ConditionFlag, OdontoError, Result, ToothFace, Treatment, TreatmentKey};
use std::collections::HashMap;

/// 治疗目录
#[derive(Debug, Clone, Default)]
pub struct TreatmentCatalog {
    treatments: Vec<Treatment>,
    index: HashMap<TreatmentKey, usize>,
}

impl TreatmentCatalog {
    /// 创建治疗目录，拒绝重复标识
    pub fn new(treatments: Vec<Treatment>) -> Result<Self> {
        let mut index = HashMap::with_capacity(treatments.len());
        for (position, treatment) in treatments.iter().enumerate() {
            if index.insert(treatment.key.clone(), position).is_some() {
                return Err(OdontoError::InvalidCatalog(format!(
                    "Duplicate treatment key: {}",
                    treatment.key
                )));
            }
        }

        tracing::debug!("Treatment catalog built with {} entries", treatments.len());
        Ok(Self { treatments, index })
    }

    /// 内置标准治疗目录
    pub fn standard() -> Self {
        let treatments = standard_treatments();
        let index = treatments
            .iter()
            .enumerate()
            .map(|(position, treatment)| (treatment.key.clone(), position))
            .collect();
        Self { treatments, index }
    }

    /// 按声明顺序返回全部治疗
    pub fn list_treatments(&self) -> &[Treatment] {
        &self.treatments
    }

    /// 筛选可用于指定牙面的分面治疗（龋齿/树脂类）
    pub fn find_by_surface_capability(&self, face: ToothFace) -> Vec<&Treatment> {
        self.treatments
            .iter()
            .filter(|treatment| treatment.supports_face(face))
            .collect()
    }

    pub fn get(&self, key: &TreatmentKey) -> Option<&Treatment> {
        self.index.get(key).map(|&position| &self.treatments[position])
    }

    /// 查找治疗，不存在时返回 `UnknownTreatment`
    pub fn require(&self, key: &TreatmentKey) -> Result<&Treatment> {
        self.get(key)
            .ok_or_else(|| OdontoError::UnknownTreatment(key.to_string()))
    }

    pub fn contains(&self, key: &TreatmentKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.treatments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.treatments.is_empty()
    }
}

fn standard_treatments() -> Vec<Treatment> {
    vec![
        Treatment::new("caries", "Caries")
            .with_icons(["caries"])
            .with_color("#d32f2f")
            .with_all_faces(),
        Treatment::new("composite", "Resina compuesta")
            .with_icons(["composite"])
            .with_color("#1976d2")
            .with_all_faces(),
        Treatment::new("sealant", "Sellante")
            .with_icons(["sealant"])
            .with_color("#00897b")
            .with_flag(ConditionFlag::Face(ToothFace::Incisal)),
        Treatment::new("crown", "Corona")
            .with_icons(["crown"])
            .with_color("#fbc02d"),
        Treatment::new("root_canal", "Endodoncia")
            .with_icons(["root_canal"])
            .with_color("#7b1fa2"),
        Treatment::new("extraction", "Extracción indicada")
            .with_icons(["extraction", "cross"])
            .with_color("#c62828"),
        Treatment::new("missing", "Ausente")
            .with_icons(["missing"])
            .with_color("#616161"),
        Treatment::new("implant", "Implante")
            .with_icons(["implant"])
            .with_color("#455a64"),
        Treatment::new("bridge", "Puente")
            .with_icons(["bridge_left", "bridge_right"])
            .with_color("#1565c0")
            .with_flag(ConditionFlag::BridgeStart)
            .with_flag(ConditionFlag::BridgeEnd),
        Treatment::new("fracture", "Fractura")
            .with_icons(["fracture"])
            .with_color("#ef6c00"),
    ]
}
