//! The immutable ledger event and its validation rules.

use compact_str::CompactString;
use rust_decimal::Decimal;
use slrec_sdk::objects::{EventKind as WireEventKind, InboundEvent};

/// Maximum decimal scale accepted for monetary amounts.
///
/// Amounts are fixed-point with two-digit scale; anything finer would be
/// silently widened downstream, so it is rejected at the boundary instead.
pub const MONEY_SCALE: u32 = 2;

/// Direction of a ledger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Credit,
    Debit,
}

impl EventKind {
    /// Apply the sign convention of this kind to an amount:
    /// `+amount` for credits, `-amount` for debits.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            EventKind::Credit => amount,
            EventKind::Debit => -amount,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Credit => "credit",
            EventKind::Debit => "debit",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(EventKind::Credit),
            "debit" => Ok(EventKind::Debit),
            other => Err(ValidationError::UnknownKind(other.to_owned())),
        }
    }
}

impl From<WireEventKind> for EventKind {
    fn from(value: WireEventKind) -> Self {
        match value {
            WireEventKind::Credit => EventKind::Credit,
            WireEventKind::Debit => EventKind::Debit,
        }
    }
}

impl From<EventKind> for WireEventKind {
    fn from(value: EventKind) -> Self {
        match value {
            EventKind::Credit => WireEventKind::Credit,
            EventKind::Debit => WireEventKind::Debit,
        }
    }
}

/// Reasons an event fails boundary validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("event id must not be empty")]
    EmptyEventId,
    #[error("account id must not be empty")]
    EmptyAccountId,
    #[error("amount must be greater than 0")]
    NonPositiveAmount,
    #[error("amount scale exceeds {MONEY_SCALE} decimal digits")]
    ExcessiveScale,
    #[error("unknown event kind: {0}")]
    UnknownKind(String),
}

/// A single immutable transaction record.
///
/// Once persisted a `LedgerEvent` is never mutated or deleted; `event_id`
/// is the sole deduplication key.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEvent {
    pub event_id: CompactString,
    pub account_id: CompactString,
    pub kind: EventKind,
    pub amount: Decimal,
    /// Logical event time in epoch milliseconds.
    pub occurred_at: i64,
    /// Populated on correction events.
    pub reason: Option<String>,
}

impl LedgerEvent {
    /// Check the input constraints of the event-apply contract.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.event_id.is_empty() {
            return Err(ValidationError::EmptyEventId);
        }
        if self.account_id.is_empty() {
            return Err(ValidationError::EmptyAccountId);
        }
        if self.amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount);
        }
        if self.amount.scale() > MONEY_SCALE {
            return Err(ValidationError::ExcessiveScale);
        }
        Ok(())
    }

    /// The signed balance contribution of this event.
    pub fn signed_amount(&self) -> Decimal {
        self.kind.signed(self.amount)
    }

    /// Canonical ordering key for balance computation.
    ///
    /// `occurred_at` ascending, ties broken by `event_id` ascending, so the
    /// order is deterministic across replays regardless of delivery order.
    pub fn ordering_key(&self) -> (i64, &str) {
        (self.occurred_at, self.event_id.as_str())
    }
}

impl From<InboundEvent> for LedgerEvent {
    fn from(event: InboundEvent) -> Self {
        Self {
            event_id: event.event_id,
            account_id: event.account_id,
            kind: event.kind.into(),
            amount: event.amount,
            occurred_at: event.occurred_at,
            reason: event.reason,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn event(amount: Decimal) -> LedgerEvent {
        LedgerEvent {
            event_id: "E1".into(),
            account_id: "ACC-1".into(),
            kind: EventKind::Credit,
            amount,
            occurred_at: 1000,
            reason: None,
        }
    }

    #[test]
    fn accepts_two_digit_scale() {
        assert_eq!(event(Decimal::new(100050, 2)).validate(), Ok(()));
    }

    #[test]
    fn rejects_non_positive_amounts() {
        assert_eq!(
            event(Decimal::ZERO).validate(),
            Err(ValidationError::NonPositiveAmount)
        );
        assert_eq!(
            event(Decimal::new(-100, 2)).validate(),
            Err(ValidationError::NonPositiveAmount)
        );
    }

    #[test]
    fn rejects_excessive_scale() {
        assert_eq!(
            event(Decimal::new(10001, 3)).validate(),
            Err(ValidationError::ExcessiveScale)
        );
    }

    #[test]
    fn rejects_empty_identifiers() {
        let mut e = event(Decimal::ONE);
        e.event_id = "".into();
        assert_eq!(e.validate(), Err(ValidationError::EmptyEventId));

        let mut e = event(Decimal::ONE);
        e.account_id = "".into();
        assert_eq!(e.validate(), Err(ValidationError::EmptyAccountId));
    }

    #[test]
    fn signed_amount_follows_kind() {
        let credit = event(Decimal::new(500, 2));
        assert_eq!(credit.signed_amount(), Decimal::new(500, 2));

        let mut debit = event(Decimal::new(500, 2));
        debit.kind = EventKind::Debit;
        assert_eq!(debit.signed_amount(), Decimal::new(-500, 2));
    }
}
