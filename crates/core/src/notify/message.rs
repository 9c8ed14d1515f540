//! Message texts for a newly found lot.

use chrono::NaiveDateTime;

use super::{Attachment, Notification};
use crate::source::CandidateLot;

/// Chat announcement: `Новый лот от {trustee}: {lot number}`.
pub fn new_lot_message(lot: &CandidateLot) -> Notification {
    Notification::text(format!(
        "Новый лот от {}: {}",
        lot.tracked_entity,
        lot.lot_number_or_na()
    ))
}

/// Application email carrying the rendered document.
pub fn application_email(
    lot: &CandidateLot,
    document: Attachment,
    sent_at: NaiveDateTime,
) -> Notification {
    Notification {
        subject: format!("Заявка на {}", lot.lot_number_or_na()),
        text: format!(
            "Заявка на участие в торгах.\n\nДата: {}",
            sent_at.format("%d.%m.%Y %H:%M")
        ),
        attachment: Some(document),
    }
}
