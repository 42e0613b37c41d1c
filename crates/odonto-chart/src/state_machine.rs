//! 确认门状态机
//!
//! 破坏性批量操作（清空牙位图、清空病史风险）必须先经用户确认

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use odonto_core::{OdontoError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// 确认门状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GateState {
    Idle,
    ConfirmPending,
}

/// 确认门事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GateEvent {
    Requested,
    Confirmed,
    Declined,
    Cancelled,
}

/// 一次待确认请求
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfirmationTicket {
    pub id: Uuid,
    pub message: String,
    pub requested_at: DateTime<Utc>,
}

/// 确认结果
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Confirmed,
    Declined,
    TimedOut,
}

/// 确认协作者（如界面上的模态对话框）
///
/// 取消视为拒绝。
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

/// 确认门
///
/// 同一时刻最多一个待确认请求，重复请求会被拒绝而不是再弹出对话框。
#[derive(Debug)]
pub struct ConfirmationGate {
    action: String,
    state: GateState,
    pending: Option<ConfirmationTicket>,
    transitions: HashMap<(GateState, GateEvent), GateState>,
}

impl ConfirmationGate {
    /// 为指定操作创建确认门
    pub fn new(action: impl Into<String>) -> Self {
        let mut transitions = HashMap::new();

        transitions.insert((GateState::Idle, GateEvent::Requested), GateState::ConfirmPending);
        transitions.insert((GateState::ConfirmPending, GateEvent::Confirmed), GateState::Idle);
        transitions.insert((GateState::ConfirmPending, GateEvent::Declined), GateState::Idle);
        transitions.insert((GateState::ConfirmPending, GateEvent::Cancelled), GateState::Idle);

        Self {
            action: action.into(),
            state: GateState::Idle,
            pending: None,
            transitions,
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == GateState::ConfirmPending
    }

    pub fn pending_ticket(&self) -> Option<&ConfirmationTicket> {
        self.pending.as_ref()
    }

    pub fn can_transition(&self, event: GateEvent) -> bool {
        self.transitions.contains_key(&(self.state, event))
    }

    fn apply(&mut self, event: GateEvent) -> Result<GateState> {
        match self.transitions.get(&(self.state, event)) {
            Some(to) => {
                self.state = *to;
                Ok(*to)
            }
            None => Err(OdontoError::InvalidStateTransition {
                from: format!("{:?}", self.state),
                event: format!("{:?}", event),
            }),
        }
    }

    /// 发起确认：`Idle -> ConfirmPending`
    pub fn request(&mut self, message: impl Into<String>) -> Result<ConfirmationTicket> {
        if !self.can_transition(GateEvent::Requested) {
            tracing::warn!("Confirmation for {} already pending", self.action);
            return Err(OdontoError::ConfirmationPending(self.action.clone()));
        }

        self.apply(GateEvent::Requested)?;
        let ticket = ConfirmationTicket {
            id: Uuid::new_v4(),
            message: message.into(),
            requested_at: Utc::now(),
        };
        self.pending = Some(ticket.clone());

        tracing::debug!("Confirmation {} requested for {}", ticket.id, self.action);
        Ok(ticket)
    }

    /// 提交确认结果并回到 `Idle`，返回是否应执行操作
    pub fn resolve(&mut self, ticket_id: Uuid, confirmed: bool) -> Result<bool> {
        match &self.pending {
            Some(ticket) if ticket.id == ticket_id => {}
            _ => {
                return Err(OdontoError::InvalidStateTransition {
                    from: format!("{:?}", self.state),
                    event: format!("Resolve({})", ticket_id),
                })
            }
        }

        let event = if confirmed {
            GateEvent::Confirmed
        } else {
            GateEvent::Declined
        };
        self.apply(event)?;
        self.pending = None;

        tracing::debug!("Confirmation {} for {} resolved: {}", ticket_id, self.action, confirmed);
        Ok(confirmed)
    }

    /// 放弃待确认请求，不执行操作
    pub fn cancel(&mut self) -> Result<()> {
        self.apply(GateEvent::Cancelled)?;
        self.pending = None;
        Ok(())
    }

    /// 发起确认并等待确认协作者的结果
    ///
    /// `timeout` 为 `None` 时无限等待；超时后请求被取消。
    /// 返回的 future 在得到结果前被丢弃时，请求同样被取消。
    pub async fn run(
        &mut self,
        message: &str,
        confirmer: &dyn Confirmer,
        timeout: Option<Duration>,
    ) -> Result<ConfirmationOutcome> {
        let ticket = self.request(message)?;
        let mut guard = CancelOnDrop {
            gate: self,
            ticket: ticket.id,
        };

        let answer = match timeout {
            Some(limit) => tokio::time::timeout(limit, confirmer.confirm(&ticket.message))
                .await
                .ok(),
            None => Some(confirmer.confirm(&ticket.message).await),
        };

        match answer {
            Some(confirmed) => {
                guard.gate.resolve(ticket.id, confirmed)?;
                Ok(if confirmed {
                    ConfirmationOutcome::Confirmed
                } else {
                    ConfirmationOutcome::Declined
                })
            }
            None => {
                tracing::warn!("Confirmation for {} timed out", guard.gate.action);
                guard.gate.cancel()?;
                Ok(ConfirmationOutcome::TimedOut)
            }
        }
    }
}

/// 仍持有该请求时在析构中取消
struct CancelOnDrop<'a> {
    gate: &'a mut ConfirmationGate,
    ticket: Uuid,
}

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        let still_pending = self
            .gate
            .pending
            .as_ref()
            .map_or(false, |ticket| ticket.id == self.ticket);

        if still_pending && self.gate.cancel().is_ok() {
            tracing::warn!("Confirmation for {} abandoned", self.gate.action);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_request_and_resolve() {
        let mut gate = ConfirmationGate::new("clear_odontogram");
        assert_eq!(gate.state(), GateState::Idle);

        let ticket = gate.request("Clear?").unwrap();
        assert_eq!(gate.state(), GateState::ConfirmPending);
        assert_eq!(gate.pending_ticket(), Some(&ticket));

        assert!(gate.resolve(ticket.id, true).unwrap());
        assert_eq!(gate.state(), GateState::Idle);
        assert!(gate.pending_ticket().is_none());
    }

    #[test]
    fn test_second_request_rejected_while_pending() {
        let mut gate = ConfirmationGate::new("clear_odontogram");
        let first = gate.request("Clear?").unwrap();

        let second = gate.request("Clear?");
        assert!(matches!(second, Err(OdontoError::ConfirmationPending(_))));
        assert_eq!(gate.pending_ticket().map(|t| t.id), Some(first.id));
    }

    #[test]
    fn test_stale_ticket_rejected() {
        let mut gate = ConfirmationGate::new("clear_odontogram");
        let ticket = gate.request("Clear?").unwrap();
        gate.resolve(ticket.id, false).unwrap();

        let result = gate.resolve(ticket.id, true);
        assert!(matches!(result, Err(OdontoError::InvalidStateTransition { .. })));
        assert!(gate.cancel().is_err());
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let mut gate = ConfirmationGate::new("clear_medical_risks");
        gate.request("Delete all?").unwrap();
        gate.cancel().unwrap();
        assert_eq!(gate.state(), GateState::Idle);
        assert!(gate.request("Delete all?").is_ok());
    }

    #[tokio::test]
    async fn test_run_with_confirmer() {
        let mut gate = ConfirmationGate::new("clear_odontogram");

        let outcome = gate.run("Clear?", &Answer(true), None).await.unwrap();
        assert_eq!(outcome, ConfirmationOutcome::Confirmed);

        let outcome = gate.run("Clear?", &Answer(false), None).await.unwrap();
        assert_eq!(outcome, ConfirmationOutcome::Declined);
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let mut gate = ConfirmationGate::new("clear_odontogram");

        let outcome = gate
            .run("Clear?", &NeverAnswers, Some(Duration::from_millis(20)))
            .await
            .unwrap();
        assert_eq!(outcome, ConfirmationOutcome::TimedOut);
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[tokio::test]
    async fn test_dropped_run_returns_to_idle() {
        let mut gate = ConfirmationGate::new("clear_odontogram");

        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            gate.run("Clear?", &NeverAnswers, None),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(gate.state(), GateState::Idle);
        assert!(gate.pending_ticket().is_none());

        let outcome = gate.run("Clear?", &Answer(true), None).await.unwrap();
        assert_eq!(outcome, ConfirmationOutcome::Confirmed);
    }
}
