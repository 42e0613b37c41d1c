//! 牙位图记录演示程序
//!
//! 展示治疗目录、整牙与分面治疗、病史风险以及经确认的清空操作

use odonto::chart::{ChartingSession, ClearOutcome, Odontogram, SessionOptions};
use odonto::core::{MedicalRisk, Slot, ToothFace, TreatmentKey};
use odonto::integration::{AutoConfirmer, StaticTreatmentSource, TreatmentSource};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    println!("🦷 牙位图记录演示\n");

    // 1. 加载治疗目录
    let catalog = StaticTreatmentSource.fetch_catalog().await?;
    println!("✅ 治疗目录加载完成: {} 项", catalog.len());
    for treatment in catalog.find_by_surface_capability(ToothFace::Mesial) {
        println!("   可分面治疗: {} ({})", treatment.label, treatment.key);
    }

    // 2. 创建会话
    let mut session = ChartingSession::new(
        catalog,
        Odontogram::standard_template(),
        SessionOptions::default(),
    )?;

    // 3. 记录治疗
    session.set_full_tooth_treatment(21u8, Some(TreatmentKey::new("crown")))?;
    session.set_surface_treatment(11u8, Slot::Left, Some(TreatmentKey::new("caries")))?;
    let slot = session.set_face_treatment(36u8, ToothFace::Mesial, TreatmentKey::new("composite"))?;
    println!("✅ 牙位36近中面记录在区域: {}", slot);

    if let Err(e) = session.set_surface_treatment(19u8, Slot::Top, Some(TreatmentKey::new("caries"))) {
        println!("⚠️  预期的错误: {}", e);
    }

    // 4. 病史风险
    session.add_medical_risk(
        MedicalRisk::new("Diabetes", "chronic").with_medication("Metformin"),
    )?;

    let summary = session.summary();
    println!("\n📊 会话概览:");
    println!("   已治疗牙齿: {}/{}", summary.treated_teeth, summary.total_teeth);
    for (key, count) in &summary.treatment_usage {
        println!("   - {}: {}", key, count);
    }

    // 5. 清空牙位图：先拒绝，再确认
    let outcome = session.clear_odontogram(&AutoConfirmer(false)).await?;
    println!("\n🧹 拒绝清空: {:?}, 已治疗牙齿仍为 {}", outcome, session.odontogram().treated_count());

    let outcome = session.clear_odontogram(&AutoConfirmer(true)).await?;
    assert_eq!(outcome, ClearOutcome::Cleared);
    println!("🧹 确认清空: {:?}, 已治疗牙齿 {}", outcome, session.odontogram().treated_count());

    Ok(())
}
