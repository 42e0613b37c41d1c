//! 牙位图命令行工具

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use odonto_admin::{ChartTemplate, ConfigManager, OdontoConfig, SourceKind};
use odonto_chart::{ChartingSession, ClearOutcome, Odontogram, SessionOptions, Tooth, ToothState};
use odonto_core::{Slot, ToothFace, TreatmentKey};
use odonto_integration::{
    AutoConfirmer, RestTreatmentSource, StaticTreatmentSource, TerminalConfirmer, TreatmentSource,
};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "odonto")]
#[command(about = "牙位图（Odontogram）记录工具")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long)]
    log_level: Option<String>,

    /// 牙位图JSON文件，存在时加载，修改后写回
    #[arg(long)]
    chart: Option<PathBuf>,

    /// 治疗数据源 (static | rest)，覆盖配置文件
    #[arg(long)]
    source: Option<SourceKind>,

    /// REST数据源地址
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 列出治疗目录
    Catalog {
        /// 只列出支持该牙面的治疗
        #[arg(long)]
        face: Option<ToothFace>,
    },
    /// 显示牙位图
    Show {
        /// 显示乳牙象限
        #[arg(long)]
        temporaries: bool,
    },
    /// 查看单颗牙齿
    Find { number: u8 },
    /// 设置或清除单个区域的治疗
    Set {
        number: u8,
        slot: Slot,
        /// 省略时清除该区域
        key: Option<String>,
    },
    /// 设置或清除整牙治疗
    Full {
        number: u8,
        /// 省略时清除整牙
        key: Option<String>,
    },
    /// 按解剖学牙面记录分面治疗
    Face {
        number: u8,
        face: ToothFace,
        key: String,
    },
    /// 清空牙位图（需要确认）
    Clear {
        /// 跳过确认提示
        #[arg(long)]
        yes: bool,
    },
    /// 导出牙位图JSON
    Export { file: PathBuf },
    /// 显示生效的配置
    Config {
        /// 点分路径，如 chart.show_temporaries
        path: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 先初始化日志，配置加载过程的事件也能输出；配置加载后再切换到配置的级别
    let initial_level = args.log_level.clone().unwrap_or_else(|| "info".to_string());
    let (filter, filter_handle) = reload::Layer::new(EnvFilter::new(&initial_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let manager = ConfigManager::new(args.config.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {:#}", e);
        e
    })?;
    let mut config = manager.get_config().await;
    apply_overrides(&mut config, &args);

    if let Some(level) = configured_log_level(&args, &config) {
        filter_handle
            .reload(EnvFilter::new(level))
            .context("Failed to apply configured log level")?;
    }

    if let Err(e) = run(args, manager, config).await {
        error!("Command failed: {:#}", e);
        return Err(e);
    }

    Ok(())
}

/// 命令行未指定级别时，日志改用配置文件中的级别
fn configured_log_level<'a>(args: &Args, config: &'a OdontoConfig) -> Option<&'a str> {
    match args.log_level {
        Some(_) => None,
        None => Some(config.logging.level.as_str()),
    }
}

fn apply_overrides(config: &mut OdontoConfig, args: &Args) {
    if let Some(source) = args.source {
        config.treatments.source = source;
    }
    if let Some(url) = &args.base_url {
        config.treatments.base_url = Some(url.clone());
    }
}

async fn run(args: Args, manager: ConfigManager, config: OdontoConfig) -> Result<()> {
    if let Command::Config { path } = &args.command {
        return print_config(&manager, &config, path.as_deref()).await;
    }

    let source = treatment_source(&config)?;
    info!("Loading treatments from {} source", source.name());
    let catalog = source.fetch_catalog().await?;

    let odontogram = load_odontogram(args.chart.as_deref(), config.chart.template)?;
    let options = SessionOptions {
        show_temporaries: config.chart.show_temporaries,
        strict_surface_validation: config.chart.strict_surface_validation,
        confirm_timeout: config.chart.confirm_timeout(),
    };
    let mut session = ChartingSession::new(catalog, odontogram, options)?;

    let changed = match args.command {
        Command::Catalog { face } => {
            print_catalog(&session, face);
            false
        }
        Command::Show { temporaries } => {
            print_chart(&session, temporaries);
            false
        }
        Command::Find { number } => {
            match session.find_tooth(number) {
                Some(tooth) => println!("{}", describe_tooth(tooth)),
                None => println!("tooth {} not found", number),
            }
            false
        }
        Command::Set { number, slot, key } => {
            session.set_surface_treatment(number, slot, key.map(TreatmentKey::new))?;
            true
        }
        Command::Full { number, key } => {
            session.set_full_tooth_treatment(number, key.map(TreatmentKey::new))?;
            true
        }
        Command::Face { number, face, key } => {
            let slot = session.set_face_treatment(number, face, TreatmentKey::new(key))?;
            println!("tooth {} {} recorded on {}", number, face, slot);
            true
        }
        Command::Clear { yes } => {
            let outcome = if yes {
                session.clear_odontogram(&AutoConfirmer(true)).await?
            } else {
                session.clear_odontogram(&TerminalConfirmer).await?
            };
            println!("{:?}", outcome);
            outcome == ClearOutcome::Cleared
        }
        Command::Export { file } => {
            save_odontogram(&file, session.odontogram())?;
            false
        }
        Command::Config { .. } => false,
    };

    if changed {
        match &args.chart {
            Some(path) => save_odontogram(path, session.odontogram())?,
            None => print_chart(&session, false),
        }
    }

    Ok(())
}

fn treatment_source(config: &OdontoConfig) -> Result<Box<dyn TreatmentSource>> {
    match config.treatments.source {
        SourceKind::Static => Ok(Box::new(StaticTreatmentSource)),
        SourceKind::Rest => {
            let base_url = config
                .treatments
                .base_url
                .clone()
                .context("REST treatment source requires --base-url or treatments.base_url")?;
            Ok(Box::new(RestTreatmentSource::new(
                base_url,
                config.treatments.request_timeout(),
            )?))
        }
    }
}

fn load_odontogram(path: Option<&Path>, template: ChartTemplate) -> Result<Odontogram> {
    if let Some(path) = path.filter(|path| path.exists()) {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read chart {}", path.display()))?;
        let odontogram = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid chart file {}", path.display()))?;
        info!("Chart loaded from {}", path.display());
        return Ok(odontogram);
    }

    Ok(match template {
        ChartTemplate::Empty => Odontogram::new(),
        ChartTemplate::Standard => Odontogram::standard_template(),
    })
}

fn save_odontogram(path: &Path, odontogram: &Odontogram) -> Result<()> {
    let contents = serde_json::to_string_pretty(odontogram)?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write chart {}", path.display()))?;
    info!("Chart saved to {}", path.display());
    Ok(())
}

async fn print_config(manager: &ConfigManager, config: &OdontoConfig, path: Option<&str>) -> Result<()> {
    match path {
        Some(path) => {
            let value: serde_json::Value = manager.get_value(path).await?;
            println!("{}", value);
        }
        None => println!("{}", toml::to_string_pretty(config)?),
    }
    Ok(())
}

fn print_catalog(session: &ChartingSession, face: Option<ToothFace>) {
    let treatments = match face {
        Some(face) => session.catalog().find_by_surface_capability(face),
        None => session.catalog().list_treatments().iter().collect(),
    };

    for treatment in treatments {
        let faces: Vec<&str> = ToothFace::ALL
            .iter()
            .filter(|face| treatment.supports_face(**face))
            .map(|face| face.as_str())
            .collect();
        println!(
            "{:<12} {:<22} {:<8} {}",
            treatment.key,
            treatment.label,
            treatment.color.as_deref().unwrap_or("-"),
            faces.join(",")
        );
    }
}

fn print_chart(session: &ChartingSession, temporaries: bool) {
    let quadrants = if temporaries {
        session.odontogram().visible_quadrants(true)
    } else {
        session.visible_quadrants()
    };

    for (quadrant, teeth) in quadrants {
        let cells: Vec<String> = teeth.iter().map(describe_tooth).collect();
        println!("{:<22} {}", quadrant.to_string(), cells.join(" "));
    }

    let summary = session.summary();
    println!(
        "treated {}/{} teeth, {} medical risks",
        summary.treated_teeth, summary.total_teeth, summary.medical_risks
    );
}

fn describe_tooth(tooth: &Tooth) -> String {
    match tooth.state() {
        ToothState::Unset => format!("{}[-]", tooth.number()),
        ToothState::Whole { treatment } => format!("{}[{}]", tooth.number(), treatment),
        ToothState::PerSurface(_) => {
            let parts: Vec<String> = tooth
                .treatments()
                .into_iter()
                .map(|(slot, key)| format!("{}={}", slot, key))
                .collect();
            format!("{}[{}]", tooth.number(), parts.join(","))
        }
    }
}
