//! 确认协作者
//!
//! 为确认门提供用户确认：脚本化的固定应答，或终端上的 y/N 提示

use async_trait::async_trait;
use odonto_chart::Confirmer;
use std::io::{BufRead, Write};
use tracing::warn;

/// 固定应答的确认者，用于脚本和 `--yes`
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirmer(pub bool);

#[async_trait]
impl Confirmer for AutoConfirmer {
    async fn confirm(&self, _message: &str) -> bool {
        self.0
    }
}

/// 终端确认者
///
/// 在阻塞线程中读取标准输入，只有 `y`/`yes` 视为确认。
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirmer;

#[async_trait]
impl Confirmer for TerminalConfirmer {
    async fn confirm(&self, message: &str) -> bool {
        let prompt = format!("{} [y/N] ", message);

        let answer = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
            let mut stderr = std::io::stderr();
            stderr.write_all(prompt.as_bytes())?;
            stderr.flush()?;

            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_affirmative(&line),
            Ok(Err(e)) => {
                warn!("Failed to read confirmation: {}", e);
                false
            }
            Err(e) => {
                warn!("Confirmation prompt aborted: {}", e);
                false
            }
        }
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
