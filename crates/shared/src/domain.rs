use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);
id_newtype!(DeliveryId);
id_newtype!(DeliverymanId);
id_newtype!(RecipientId);
id_newtype!(ProblemId);
id_newtype!(NotificationId);
id_newtype!(FileId);

pub const PROBLEMS_PAGE_SIZE: u32 = 10;

/// A delivery counts as finished once it has been both ended and signed.
pub fn is_finished(end_date: Option<DateTime<Utc>>, signature_id: Option<FileId>) -> bool {
    end_date.is_some() && signature_id.is_some()
}

/// Zero-based row offset for a one-based page number. Pages below 1 clamp to 1.
pub fn page_offset(page: Option<i64>) -> u32 {
    let page = page.unwrap_or(1).max(1);
    let offset = (page - 1).saturating_mul(i64::from(PROBLEMS_PAGE_SIZE));
    u32::try_from(offset).unwrap_or(u32::MAX)
}
