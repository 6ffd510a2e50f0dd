//! Subsidy deadline tracker.
//!
//! Holds the deadline list for one screen activation. Writes go to the
//! backend and are followed by a full re-fetch; the local list is never
//! patched optimistically.

use async_trait::async_trait;
use chrono::NaiveDate;
use krishi_core::models::{parse_deadline_input, DeadlineRecord, NewDeadline, Session, SubsidyDetails};
use krishi_core::{KrishiBackend, KrishiError};
use serde::Serialize;
use std::sync::Arc;

/// Yes/no prompt shown before a destructive action.
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Answers every prompt the same way.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

#[async_trait]
impl Confirm for AutoConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingDeadline {
    pub record: DeadlineRecord,
    pub days_remaining: i64,
}

pub struct DeadlineTracker {
    backend: Arc<dyn KrishiBackend>,
    session: Session,
    fallback_name: String,
    deadlines: Vec<DeadlineRecord>,
    error: Option<String>,
}

impl DeadlineTracker {
    pub fn new(
        backend: Arc<dyn KrishiBackend>,
        session: Session,
        fallback_name: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            session,
            fallback_name: fallback_name.into(),
            deadlines: Vec::new(),
            error: None,
        }
    }

    pub fn deadlines(&self) -> &[DeadlineRecord] {
        &self.deadlines
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Message from the most recent failed list, save, or delete.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Load the list for this activation.
    pub async fn activate(&mut self) -> Result<&[DeadlineRecord], KrishiError> {
        self.refresh().await?;
        Ok(&self.deadlines)
    }

    async fn refresh(&mut self) -> Result<(), KrishiError> {
        match self.backend.list_deadlines(self.session.username()).await {
            Ok(list) => {
                tracing::debug!(username = self.session.username(), count = list.len(), "Deadlines loaded");
                self.deadlines = list;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                tracing::error!(username = self.session.username(), error = %e, "Failed to load deadlines");
                let e = KrishiError::from(e);
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Save a deadline taken from `date_input`, named after the latest
    /// subsidy analysis when it found a name.
    pub async fn save(
        &mut self,
        details: Option<&SubsidyDetails>,
        date_input: &str,
    ) -> Result<NewDeadline, KrishiError> {
        let deadline = parse_deadline_input(date_input)?;
        let subsidy_name = details
            .map(|d| d.name_or(&self.fallback_name).to_string())
            .unwrap_or_else(|| self.fallback_name.clone());

        let new = NewDeadline {
            username: self.session.username().to_string(),
            subsidy_name,
            deadline,
        };

        if let Err(e) = self.backend.save_deadline(&new).await {
            tracing::error!(username = %new.username, error = %e, "Failed to save deadline");
            let e = KrishiError::from(e);
            self.error = Some(e.user_message());
            return Err(e);
        }
        tracing::info!(
            username = %new.username,
            subsidy = %new.subsidy_name,
            deadline = %new.deadline,
            "Deadline saved"
        );

        // The save itself succeeded; a failed re-fetch only leaves the list stale.
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "Deadline saved but list refresh failed");
        }
        Ok(new)
    }

    /// Delete by backend id once `confirm` agrees. Declining sends nothing.
    pub async fn delete(
        &mut self,
        id: &str,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome, KrishiError> {
        let prompt = match self.deadlines.iter().find(|d| d.id == id) {
            Some(d) => format!("Delete deadline for \"{}\"?", d.subsidy_name),
            None => "Delete this deadline?".to_string(),
        };

        if !confirm.confirm(&prompt).await {
            tracing::debug!(id = %id, "Deadline deletion declined");
            return Ok(DeleteOutcome::Declined);
        }

        if let Err(e) = self.backend.delete_deadline(id).await {
            tracing::error!(id = %id, error = %e, "Failed to delete deadline");
            let e = KrishiError::from(e);
            self.error = Some(e.user_message());
            return Err(e);
        }
        tracing::info!(id = %id, "Deadline deleted");

        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "Deadline deleted but list refresh failed");
        }
        Ok(DeleteOutcome::Deleted)
    }

    /// Deadlines due on or after `today`, soonest first.
    pub fn upcoming(&self, today: NaiveDate) -> Vec<UpcomingDeadline> {
        let mut upcoming: Vec<UpcomingDeadline> = self
            .deadlines
            .iter()
            .filter(|d| d.deadline >= today)
            .map(|d| UpcomingDeadline {
                record: d.clone(),
                days_remaining: (d.deadline - today).num_days(),
            })
            .collect();
        upcoming.sort_by_key(|u| u.days_remaining);
        upcoming
    }
}
