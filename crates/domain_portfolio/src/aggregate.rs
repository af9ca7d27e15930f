//! Portfolio Aggregate Root
//!
//! The Portfolio aggregate is the consistency boundary for a portfolio's
//! name, description and lifecycle.
//!
//! # Invariants
//!
//! - The name is never blank and never longer than [`MAX_NAME_LENGTH`]
//! - A closed portfolio accepts no further commands
//! - Every successful command records exactly one event and bumps the
//!   version by one

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{Currency, DomainEvent, OwnerId, PortfolioId, UserId};

use crate::error::PortfolioError;
use crate::events::PortfolioEvent;

/// Maximum length of a portfolio name, in characters
pub const MAX_NAME_LENGTH: usize = 100;

/// Portfolio lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortfolioStatus {
    /// Portfolio accepts commands
    Active,
    /// Portfolio is read-only
    Closed,
}

/// The Portfolio aggregate root
///
/// State is only ever changed by [`Portfolio::apply`]. Command methods
/// validate, build an event and hand it to `apply`, keeping the event in a
/// pending list until the caller takes it for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    id: PortfolioId,
    owner_id: OwnerId,
    name: String,
    description: Option<String>,
    currency: Currency,
    is_closed: bool,
    close_reason: Option<String>,
    closed_at: Option<DateTime<Utc>>,
    closed_by: Option<UserId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Number of events applied, committed or not
    version: u64,
    /// Events recorded since the aggregate was loaded
    #[serde(skip)]
    pending_events: Vec<PortfolioEvent>,
}

impl Portfolio {
    /// Returns the zero-value aggregate that replay starts from
    pub fn empty() -> Self {
        Self {
            id: PortfolioId::NIL,
            owner_id: OwnerId::NIL,
            name: String::new(),
            description: None,
            currency: Currency::default(),
            is_closed: false,
            close_reason: None,
            closed_at: None,
            closed_by: None,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
            version: 0,
            pending_events: Vec::new(),
        }
    }

    /// Creates a new portfolio
    ///
    /// # Errors
    ///
    /// Returns [`PortfolioError::EmptyName`] or [`PortfolioError::NameTooLong`]
    /// if the name is invalid.
    pub fn create(
        id: PortfolioId,
        owner_id: OwnerId,
        name: &str,
        description: Option<String>,
        currency: Currency,
    ) -> Result<Self, PortfolioError> {
        let name = validate_name(name)?;

        let mut portfolio = Self::empty();
        portfolio.record(PortfolioEvent::PortfolioCreated {
            portfolio_id: id,
            owner_id,
            name,
            description: normalize_description(description),
            currency,
            timestamp: Utc::now(),
        });
        Ok(portfolio)
    }

    /// Rebuilds a portfolio by replaying its event stream in order
    ///
    /// # Errors
    ///
    /// Fails if the stream is empty, does not start with
    /// `PortfolioCreated`, or contains events of another portfolio.
    pub fn from_events<'a, I>(events: I) -> Result<Self, PortfolioError>
    where
        I: IntoIterator<Item = &'a PortfolioEvent>,
    {
        let mut portfolio = Self::empty();
        for event in events {
            match (portfolio.version, event) {
                (0, PortfolioEvent::PortfolioCreated { .. }) => {}
                (0, other) => {
                    return Err(PortfolioError::InvalidEventSequence(format!(
                        "stream starts with {} instead of PortfolioCreated",
                        other.event_type()
                    )));
                }
                (_, PortfolioEvent::PortfolioCreated { .. }) => {
                    return Err(PortfolioError::InvalidEventSequence(
                        "PortfolioCreated after the start of the stream".to_string(),
                    ));
                }
                (_, other) if other.portfolio_id() != portfolio.id => {
                    return Err(PortfolioError::InvalidEventSequence(format!(
                        "event for {} in stream of {}",
                        other.portfolio_id(),
                        portfolio.id
                    )));
                }
                _ => {}
            }
            portfolio.apply(event);
        }

        if portfolio.version == 0 {
            return Err(PortfolioError::EmptyStream);
        }
        Ok(portfolio)
    }

    /// Applies an event to the aggregate state
    ///
    /// This is the single, exhaustive state transition function used both for
    /// new events and for replay. It never fails: events are facts.
    pub fn apply(&mut self, event: &PortfolioEvent) {
        match event {
            PortfolioEvent::PortfolioCreated {
                portfolio_id,
                owner_id,
                name,
                description,
                currency,
                timestamp,
            } => {
                self.id = *portfolio_id;
                self.owner_id = *owner_id;
                self.name = name.clone();
                self.description = description.clone();
                self.currency = *currency;
                self.created_at = *timestamp;
                self.updated_at = *timestamp;
            }
            PortfolioEvent::PortfolioRenamed {
                new_name,
                timestamp,
                ..
            } => {
                self.name = new_name.clone();
                self.updated_at = *timestamp;
            }
            PortfolioEvent::PortfolioDetailsUpdated {
                name,
                description,
                timestamp,
                ..
            } => {
                self.name = name.clone();
                self.description = description.clone();
                self.updated_at = *timestamp;
            }
            PortfolioEvent::PortfolioClosed {
                reason,
                closed_by,
                timestamp,
                ..
            } => {
                self.is_closed = true;
                self.close_reason = reason.clone();
                self.closed_by = Some(*closed_by);
                self.closed_at = Some(*timestamp);
                self.updated_at = *timestamp;
            }
        }
        self.version += 1;
    }

    /// Renames the portfolio
    ///
    /// # Errors
    ///
    /// Fails if the portfolio is closed, the new name is invalid, or it
    /// equals the current name.
    pub fn rename(&mut self, new_name: &str) -> Result<(), PortfolioError> {
        self.ensure_active()?;
        let new_name = validate_name(new_name)?;
        if new_name == self.name {
            return Err(PortfolioError::SameName(new_name));
        }

        debug!(portfolio_id = %self.id, old = %self.name, new = %new_name, "Renaming portfolio");
        self.record(PortfolioEvent::PortfolioRenamed {
            portfolio_id: self.id,
            old_name: self.name.clone(),
            new_name,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Replaces name and description
    pub fn update_details(
        &mut self,
        name: &str,
        description: Option<String>,
    ) -> Result<(), PortfolioError> {
        self.ensure_active()?;
        let name = validate_name(name)?;

        self.record(PortfolioEvent::PortfolioDetailsUpdated {
            portfolio_id: self.id,
            name,
            description: normalize_description(description),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Closes the portfolio; terminal
    ///
    /// # Errors
    ///
    /// Returns [`PortfolioError::AlreadyClosed`] if the portfolio is closed.
    pub fn close(&mut self, reason: Option<String>, closed_by: UserId) -> Result<(), PortfolioError> {
        if self.is_closed {
            return Err(PortfolioError::AlreadyClosed);
        }

        debug!(portfolio_id = %self.id, %closed_by, "Closing portfolio");
        self.record(PortfolioEvent::PortfolioClosed {
            portfolio_id: self.id,
            reason: normalize_description(reason),
            closed_by,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Returns recorded events and clears them
    pub fn take_events(&mut self) -> Vec<PortfolioEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Returns events recorded but not yet taken
    pub fn pending_events(&self) -> &[PortfolioEvent] {
        &self.pending_events
    }

    /// Version of the stream as it was loaded, before pending events
    pub fn committed_version(&self) -> u64 {
        self.version - self.pending_events.len() as u64
    }

    pub fn id(&self) -> PortfolioId {
        self.id
    }

    pub fn owner_id(&self) -> OwnerId {
        self.owner_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_closed(&self) -> bool {
        self.is_closed
    }

    pub fn status(&self) -> PortfolioStatus {
        if self.is_closed {
            PortfolioStatus::Closed
        } else {
            PortfolioStatus::Active
        }
    }

    pub fn close_reason(&self) -> Option<&str> {
        self.close_reason.as_deref()
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn closed_by(&self) -> Option<UserId> {
        self.closed_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Number of events applied, including pending ones
    pub fn version(&self) -> u64 {
        self.version
    }

    fn record(&mut self, event: PortfolioEvent) {
        self.apply(&event);
        self.pending_events.push(event);
    }

    fn ensure_active(&self) -> Result<(), PortfolioError> {
        if self.is_closed {
            return Err(PortfolioError::Closed);
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String, PortfolioError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PortfolioError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(PortfolioError::NameTooLong {
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(name.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}
