//! 病史风险列表
//!
//! 可重复添加、删除的病史条目（疾病、用药、类型、描述）

use odonto_core::{MedicalRisk, OdontoError, Result};
use uuid::Uuid;

/// 病史风险列表
#[derive(Debug, Clone, Default)]
pub struct MedicalRiskList {
    risks: Vec<MedicalRisk>,
}

impl MedicalRiskList {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由已有条目构建，条目按 `add` 的规则逐一校验
    pub fn from_risks(risks: Vec<MedicalRisk>) -> Result<Self> {
        let mut list = Self::new();
        for risk in risks {
            list.add(risk)?;
        }
        Ok(list)
    }

    /// 添加条目，返回其ID
    ///
    /// 疾病名称不能为空，ID 不能与已有条目重复。
    pub fn add(&mut self, risk: MedicalRisk) -> Result<Uuid> {
        if risk.disease.trim().is_empty() {
            return Err(OdontoError::Validation("Disease must not be empty".to_string()));
        }
        if self.get(risk.id).is_some() {
            tracing::warn!("Rejected duplicate medical risk {}", risk.id);
            return Err(OdontoError::Validation(format!(
                "Medical risk {} already exists",
                risk.id
            )));
        }

        let id = risk.id;
        self.risks.push(risk);
        tracing::debug!("Medical risk {} added", id);
        Ok(id)
    }

    pub fn get(&self, id: Uuid) -> Option<&MedicalRisk> {
        self.risks.iter().find(|risk| risk.id == id)
    }

    /// 修改条目
    pub fn update<F>(&mut self, id: Uuid, change: F) -> Result<()>
    where
        F: FnOnce(&mut MedicalRisk),
    {
        let risk = self
            .risks
            .iter_mut()
            .find(|risk| risk.id == id)
            .ok_or_else(|| OdontoError::NotFound(format!("Medical risk {} not found", id)))?;

        change(risk);
        Ok(())
    }

    /// 删除条目
    pub fn remove(&mut self, id: Uuid) -> Result<MedicalRisk> {
        let position = self
            .risks
            .iter()
            .position(|risk| risk.id == id)
            .ok_or_else(|| OdontoError::NotFound(format!("Medical risk {} not found", id)))?;

        Ok(self.risks.remove(position))
    }

    /// 删除全部条目，返回删除数量
    pub fn clear(&mut self) -> usize {
        let removed = self.risks.len();
        self.risks.clear();
        removed
    }

    pub fn list(&self) -> &[MedicalRisk] {
        &self.risks
    }

    pub fn len(&self) -> usize {
        self.risks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.risks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_update_remove() {
        let mut list = MedicalRiskList::new();
        let id = list
            .add(MedicalRisk::new("Diabetes", "chronic").with_medication("Metformin"))
            .unwrap();
        list.add(MedicalRisk::new("Hypertension", "chronic")).unwrap();
        assert_eq!(list.len(), 2);

        list.update(id, |risk| risk.description = Some("Controlled".to_string()))
            .unwrap();
        assert_eq!(list.get(id).unwrap().description.as_deref(), Some("Controlled"));

        let removed = list.remove(id).unwrap();
        assert_eq!(removed.disease, "Diabetes");
        assert_eq!(list.list()[0].disease, "Hypertension");
    }

    #[test]
    fn test_missing_entry_not_found() {
        let mut list = MedicalRiskList::new();
        assert!(matches!(list.remove(Uuid::new_v4()), Err(OdontoError::NotFound(_))));
        assert!(list.update(Uuid::new_v4(), |_| {}).is_err());
    }

    #[test]
    fn test_empty_disease_rejected() {
        let mut list = MedicalRiskList::new();
        assert!(matches!(
            list.add(MedicalRisk::new("  ", "allergy")),
            Err(OdontoError::Validation(_))
        ));
        assert!(list.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut list = MedicalRiskList::from_risks(vec![
            MedicalRisk::new("Penicillin allergy", "allergy"),
            MedicalRisk::new("Anticoagulants", "medication"),
        ])
        .unwrap();
        assert_eq!(list.clear(), 2);
        assert!(list.is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut list = MedicalRiskList::new();
        let risk = MedicalRisk::new("Diabetes", "chronic");
        let id = list.add(risk.clone()).unwrap();

        assert!(matches!(list.add(risk.clone()), Err(OdontoError::Validation(_))));
        assert_eq!(list.len(), 1);

        list.remove(id).unwrap();
        assert!(list.get(id).is_none());
        assert!(MedicalRiskList::from_risks(vec![risk.clone(), risk]).is_err());
    }
}
