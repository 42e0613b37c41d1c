//! 牙位图会话引擎
//!
//! 协调治疗目录、牙位图、病史风险列表和确认门的核心引擎

use crate::{
    catalog::TreatmentCatalog,
    medical_risk::MedicalRiskList,
    odontogram::Odontogram,
    state_machine::{ConfirmationGate, ConfirmationOutcome, ConfirmationTicket, Confirmer},
    tooth::Tooth,
};
use odonto_core::{
    MedicalRisk, OdontoError, Quadrant, Result, Slot, ToothFace, TreatmentKey,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

/// 清空牙位图时展示给用户的确认消息
pub const CLEAR_ODONTOGRAM_MESSAGE: &str = "Clear every treatment from the odontogram?";

/// 清空病史风险时展示给用户的确认消息
pub const CLEAR_MEDICAL_RISKS_MESSAGE: &str = "Delete every medical risk entry?";

/// 会话选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOptions {
    /// 是否显示乳牙象限
    pub show_temporaries: bool,
    /// 分面区域只接受可分面的治疗
    pub strict_surface_validation: bool,
    /// 等待确认的上限，`None` 表示无限等待
    pub confirm_timeout: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            show_temporaries: true,
            strict_surface_validation: false,
            confirm_timeout: Some(Duration::from_secs(120)),
        }
    }
}

/// 批量清除的结果
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared,
    Declined,
    TimedOut,
}

impl From<ConfirmationOutcome> for ClearOutcome {
    fn from(outcome: ConfirmationOutcome) -> Self {
        match outcome {
            ConfirmationOutcome::Confirmed => ClearOutcome::Cleared,
            ConfirmationOutcome::Declined => ClearOutcome::Declined,
            ConfirmationOutcome::TimedOut => ClearOutcome::TimedOut,
        }
    }
}

/// 牙位图会话
///
/// 一个患者的一次记录会话，在内存中修改牙位图
#[derive(Debug)]
pub struct ChartingSession {
    catalog: TreatmentCatalog,
    odontogram: Odontogram,
    risks: MedicalRiskList,
    clear_gate: ConfirmationGate,
    risk_gate: ConfirmationGate,
    options: SessionOptions,
}

impl ChartingSession {
    /// 创建会话，牙位图引用的治疗必须都在目录中
    pub fn new(
        catalog: TreatmentCatalog,
        odontogram: Odontogram,
        options: SessionOptions,
    ) -> Result<Self> {
        if let Some(unknown) = odontogram
            .referenced_treatments()
            .into_iter()
            .find(|key| !catalog.contains(key))
        {
            return Err(OdontoError::UnknownTreatment(unknown.to_string()));
        }

        tracing::info!(
            "Charting session started: {} treatments, {} treated teeth",
            catalog.len(),
            odontogram.treated_count()
        );

        Ok(Self {
            catalog,
            odontogram,
            risks: MedicalRiskList::new(),
            clear_gate: ConfirmationGate::new("clear_odontogram"),
            risk_gate: ConfirmationGate::new("clear_medical_risks"),
            options,
        })
    }

    pub fn catalog(&self) -> &TreatmentCatalog {
        &self.catalog
    }

    pub fn odontogram(&self) -> &Odontogram {
        &self.odontogram
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn medical_risks(&self) -> &MedicalRiskList {
        &self.risks
    }

    pub fn into_odontogram(self) -> Odontogram {
        self.odontogram
    }

    pub fn find_tooth(&self, number: impl Into<u8>) -> Option<&Tooth> {
        self.odontogram.find_tooth(number)
    }

    /// 需要显示的象限
    pub fn visible_quadrants(&self) -> Vec<(Quadrant, &[Tooth])> {
        self.odontogram.visible_quadrants(self.options.show_temporaries)
    }

    /// 写入单个区域，治疗标识需在目录中
    pub fn set_surface_treatment(
        &mut self,
        number: impl Into<u8>,
        slot: Slot,
        treatment: Option<TreatmentKey>,
    ) -> Result<()> {
        let number = number.into();

        if let Some(key) = &treatment {
            let definition = self.catalog.require(key)?;
            if self.options.strict_surface_validation
                && slot != Slot::Full
                && !definition.is_surface_capable()
            {
                tracing::warn!("Rejected {} on tooth {} slot {}", key, number, slot);
                return Err(OdontoError::InvalidSurfaceForTreatment {
                    treatment: key.to_string(),
                    surface: slot.to_string(),
                });
            }
        }

        self.odontogram.set_surface_treatment(number, slot, treatment)?;
        tracing::info!("Tooth {} slot {} updated", number, slot);
        Ok(())
    }

    /// 设置整牙治疗
    pub fn set_full_tooth_treatment(
        &mut self,
        number: impl Into<u8>,
        treatment: Option<TreatmentKey>,
    ) -> Result<()> {
        let number = number.into();

        if let Some(key) = &treatment {
            self.catalog.require(key)?;
        }

        self.odontogram.set_full_tooth_treatment(number, treatment)?;
        tracing::info!("Tooth {} full treatment updated", number);
        Ok(())
    }

    /// 按解剖学牙面记录分面治疗
    ///
    /// 治疗必须支持该牙面，否则返回 `InvalidSurfaceForTreatment`。
    pub fn set_face_treatment(
        &mut self,
        number: impl Into<u8>,
        face: ToothFace,
        treatment: TreatmentKey,
    ) -> Result<Slot> {
        let number = number.into();
        let tooth_number = self
            .odontogram
            .find_tooth(number)
            .map(Tooth::number)
            .ok_or_else(|| OdontoError::tooth_not_found(number))?;

        let definition = self.catalog.require(&treatment)?;
        if !definition.supports_face(face) {
            tracing::warn!("Rejected {} on tooth {} face {}", treatment, number, face);
            return Err(OdontoError::InvalidSurfaceForTreatment {
                treatment: treatment.to_string(),
                surface: face.to_string(),
            });
        }

        let slot = face.slot_for(tooth_number);
        self.odontogram
            .set_surface_treatment(number, slot, Some(treatment))?;
        tracing::info!("Tooth {} face {} recorded on slot {}", number, face, slot);
        Ok(slot)
    }

    /// 发起清空牙位图的确认请求
    pub fn request_clear_odontogram(&mut self) -> Result<ConfirmationTicket> {
        self.clear_gate.request(CLEAR_ODONTOGRAM_MESSAGE)
    }

    /// 提交清空牙位图的确认结果
    pub fn resolve_clear_odontogram(
        &mut self,
        ticket_id: Uuid,
        confirmed: bool,
    ) -> Result<ClearOutcome> {
        if self.clear_gate.resolve(ticket_id, confirmed)? {
            self.odontogram.clear_all();
            tracing::info!("Odontogram cleared");
            Ok(ClearOutcome::Cleared)
        } else {
            Ok(ClearOutcome::Declined)
        }
    }

    /// 经确认后清空牙位图
    pub async fn clear_odontogram(&mut self, confirmer: &dyn Confirmer) -> Result<ClearOutcome> {
        let outcome = self
            .clear_gate
            .run(CLEAR_ODONTOGRAM_MESSAGE, confirmer, self.options.confirm_timeout)
            .await?;

        if outcome == ConfirmationOutcome::Confirmed {
            self.odontogram.clear_all();
            tracing::info!("Odontogram cleared");
        }
        Ok(outcome.into())
    }

    /// 放弃待确认的清空牙位图请求
    pub fn cancel_clear_odontogram(&mut self) -> Result<()> {
        self.clear_gate.cancel()?;
        tracing::info!("Odontogram clear cancelled");
        Ok(())
    }

    pub fn is_clear_pending(&self) -> bool {
        self.clear_gate.is_pending()
    }

    pub fn add_medical_risk(&mut self, risk: MedicalRisk) -> Result<Uuid> {
        self.risks.add(risk)
    }

    pub fn update_medical_risk<F>(&mut self, id: Uuid, change: F) -> Result<()>
    where
        F: FnOnce(&mut MedicalRisk),
    {
        self.risks.update(id, change)
    }

    pub fn remove_medical_risk(&mut self, id: Uuid) -> Result<MedicalRisk> {
        self.risks.remove(id)
    }

    /// 经确认后删除全部病史风险
    pub async fn clear_medical_risks(&mut self, confirmer: &dyn Confirmer) -> Result<ClearOutcome> {
        let outcome = self
            .risk_gate
            .run(CLEAR_MEDICAL_RISKS_MESSAGE, confirmer, self.options.confirm_timeout)
            .await?;

        if outcome == ConfirmationOutcome::Confirmed {
            let removed = self.risks.clear();
            tracing::info!("Removed {} medical risk entries", removed);
        }
        Ok(outcome.into())
    }

    /// 放弃待确认的清空病史风险请求
    pub fn cancel_clear_medical_risks(&mut self) -> Result<()> {
        self.risk_gate.cancel()?;
        tracing::info!("Medical risk clear cancelled");
        Ok(())
    }

    /// 会话概览
    pub fn summary(&self) -> ChartSummary {
        let mut treatment_usage = BTreeMap::new();
        for tooth in self.odontogram.teeth() {
            for (_, key) in tooth.treatments() {
                *treatment_usage.entry(key.to_string()).or_insert(0) += 1;
            }
        }

        ChartSummary {
            total_teeth: self.odontogram.teeth().count(),
            visible_teeth: self
                .visible_quadrants()
                .iter()
                .map(|(_, teeth)| teeth.len())
                .sum(),
            treated_teeth: self.odontogram.treated_count(),
            treatment_usage,
            medical_risks: self.risks.len(),
            clear_pending: self.clear_gate.is_pending(),
        }
    }
}

/// 会话概览
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSummary {
    pub total_teeth: usize,
    pub visible_teeth: usize,
    pub treated_teeth: usize,
    /// 治疗标识 -> 记录次数（整牙计一次，每个分面各计一次）
    pub treatment_usage: BTreeMap<String, usize>,
    pub medical_risks: usize,
    pub clear_pending: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Answer(bool);

    #[async_trait]
    impl Confirmer for Answer {
        async fn confirm(&self, _message: &str) -> bool {
            self.0
        }
    }

    struct NeverAnswers;

    #[async_trait]
    impl Confirmer for NeverAnswers {
        async fn confirm(&self, _message: &str) -> bool {
            std::future::pending::<bool>().await
        }
    }

    fn key(name: &str) -> TreatmentKey {
        TreatmentKey::new(name)
    }

    fn session() -> ChartingSession {
        ChartingSession::new(
            TreatmentCatalog::standard(),
            Odontogram::standard_template(),
            SessionOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_treatment_rejected() {
        let mut session = session();
        let result = session.set_surface_treatment(21u8, Slot::Top, Some(key("veneer")));
        assert!(matches!(result, Err(OdontoError::UnknownTreatment(_))));

        let result = session.set_full_tooth_treatment(21u8, Some(key("veneer")));
        assert!(matches!(result, Err(OdontoError::UnknownTreatment(_))));
    }

    #[test]
    fn test_template_must_match_catalog() {
        let catalog = TreatmentCatalog::new(vec![odonto_core::Treatment::new("caries", "Caries")])
            .unwrap();
        let result = ChartingSession::new(
            catalog,
            Odontogram::standard_template(),
            SessionOptions::default(),
        );
        assert!(matches!(result, Err(OdontoError::UnknownTreatment(_))));
    }

    #[test]
    fn test_permissive_surfaces_by_default() {
        let mut session = session();
        session
            .set_surface_treatment(21u8, Slot::Top, Some(key("crown")))
            .unwrap();
        assert_eq!(
            session.find_tooth(21u8).unwrap().treatment_at(Slot::Top),
            Some(&key("crown"))
        );
    }

    #[test]
    fn test_strict_surfaces() {
        let mut session = ChartingSession::new(
            TreatmentCatalog::standard(),
            Odontogram::new(),
            SessionOptions {
                strict_surface_validation: true,
                ..SessionOptions::default()
            },
        )
        .unwrap();

        let result = session.set_surface_treatment(21u8, Slot::Top, Some(key("crown")));
        assert!(matches!(result, Err(OdontoError::InvalidSurfaceForTreatment { .. })));

        session
            .set_surface_treatment(21u8, Slot::Top, Some(key("caries")))
            .unwrap();
        session
            .set_surface_treatment(21u8, Slot::Full, Some(key("crown")))
            .unwrap();
        session.set_surface_treatment(21u8, Slot::Top, None).unwrap();
    }

    #[test]
    fn test_face_treatment_projection_and_validation() {
        let mut session = session();

        let slot = session
            .set_face_treatment(36u8, ToothFace::Mesial, key("caries"))
            .unwrap();
        assert_eq!(slot, Slot::Left);

        let result = session.set_face_treatment(36u8, ToothFace::Lingual, key("sealant"));
        assert!(matches!(result, Err(OdontoError::InvalidSurfaceForTreatment { .. })));

        let result = session.set_face_treatment(36u8, ToothFace::Lingual, key("crown"));
        assert!(matches!(result, Err(OdontoError::InvalidSurfaceForTreatment { .. })));

        let result = session.set_face_treatment(19u8, ToothFace::Lingual, key("caries"));
        assert!(matches!(result, Err(OdontoError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_clear_declined_leaves_chart() {
        let mut session = session();
        let before = session.odontogram().clone();

        let outcome = session.clear_odontogram(&Answer(false)).await.unwrap();
        assert_eq!(outcome, ClearOutcome::Declined);
        assert!(!session.is_clear_pending());
        assert_eq!(session.odontogram(), &before);
    }

    #[tokio::test]
    async fn test_clear_confirmed_empties_chart() {
        let mut session = session();

        let outcome = session.clear_odontogram(&Answer(true)).await.unwrap();
        assert_eq!(outcome, ClearOutcome::Cleared);

        for tooth in session.odontogram().teeth() {
            for slot in Slot::ALL {
                assert!(tooth.treatment_at(slot).is_none());
            }
        }
    }

    #[test]
    fn test_two_phase_clear_guards_reentry() {
        let mut session = session();
        let ticket = session.request_clear_odontogram().unwrap();
        assert!(session.summary().clear_pending);

        assert!(matches!(
            session.request_clear_odontogram(),
            Err(OdontoError::ConfirmationPending(_))
        ));
        assert!(session.odontogram().treated_count() > 0);

        let outcome = session.resolve_clear_odontogram(ticket.id, true).unwrap();
        assert_eq!(outcome, ClearOutcome::Cleared);
        assert_eq!(session.odontogram().treated_count(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_clear_does_not_block_next_clear() {
        let mut session = session();
        let before = session.odontogram().clone();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            session.clear_odontogram(&NeverAnswers),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(!session.is_clear_pending());
        assert_eq!(session.odontogram(), &before);

        let outcome = session.clear_odontogram(&Answer(true)).await.unwrap();
        assert_eq!(outcome, ClearOutcome::Cleared);
    }

    #[test]
    fn test_cancel_pending_clear() {
        let mut session = session();
        let ticket = session.request_clear_odontogram().unwrap();

        session.cancel_clear_odontogram().unwrap();
        assert!(!session.is_clear_pending());
        assert!(session.resolve_clear_odontogram(ticket.id, true).is_err());
        assert!(session.odontogram().treated_count() > 0);

        assert!(session.cancel_clear_odontogram().is_err());
        assert!(session.cancel_clear_medical_risks().is_err());
    }

    #[tokio::test]
    async fn test_clear_medical_risks() {
        let mut session = session();
        session
            .add_medical_risk(MedicalRisk::new("Diabetes", "chronic"))
            .unwrap();

        let outcome = session.clear_medical_risks(&Answer(false)).await.unwrap();
        assert_eq!(outcome, ClearOutcome::Declined);
        assert_eq!(session.medical_risks().len(), 1);

        let outcome = session.clear_medical_risks(&Answer(true)).await.unwrap();
        assert_eq!(outcome, ClearOutcome::Cleared);
        assert!(session.medical_risks().is_empty());
    }

    #[test]
    fn test_summary() {
        let mut session = ChartingSession::new(
            TreatmentCatalog::standard(),
            Odontogram::standard_template(),
            SessionOptions {
                show_temporaries: false,
                ..SessionOptions::default()
            },
        )
        .unwrap();
        session
            .set_surface_treatment(14u8, Slot::Center, Some(key("caries")))
            .unwrap();

        let summary = session.summary();
        assert_eq!(summary.total_teeth, 52);
        assert_eq!(summary.visible_teeth, 32);
        assert_eq!(summary.treated_teeth, 8);
        assert_eq!(summary.treatment_usage.get("caries"), Some(&2));
        assert_eq!(summary.treatment_usage.get("crown"), Some(&1));
    }
}
