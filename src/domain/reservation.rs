use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{BookId, CancelReservationError, MemberId, ReservationId};

/// 予約ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Active,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Active => "active",
            ReservationStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(ReservationStatus::Active),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            _ => Err(format!("Invalid reservation status: {}", s)),
        }
    }
}

/// 予約 - 貸出状況とは独立した、会員の借用希望
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub reservation_id: ReservationId,
    pub member_id: MemberId,
    pub book_id: BookId,
    pub status: ReservationStatus,
    pub reserved_at: DateTime<Utc>,
}

impl Reservation {
    pub fn place(member_id: MemberId, book_id: BookId, reserved_at: DateTime<Utc>) -> Self {
        Self {
            reservation_id: ReservationId::new(),
            member_id,
            book_id,
            status: ReservationStatus::Active,
            reserved_at,
        }
    }

    pub fn cancel(&self) -> Result<Self, CancelReservationError> {
        if self.status == ReservationStatus::Cancelled {
            return Err(CancelReservationError::AlreadyCancelled);
        }
        Ok(Self {
            status: ReservationStatus::Cancelled,
            ..self.clone()
        })
    }
}
