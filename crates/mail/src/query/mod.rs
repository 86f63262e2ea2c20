//! Mail query engine
//!
//! Lists the unread messages received today under a label, following
//! pagination, and resolves configured label names against the catalog.

mod labels;

pub use labels::{LabelError, ResolvedLabel, find_label_id, resolve_labels};

use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveTime, TimeDelta, TimeZone};
use log::{debug, warn};

use crate::models::{LabelId, MessageSummary};
use crate::provider::MailProvider;

/// Local midnight at the start of `now`'s day
pub fn start_of_day(now: DateTime<Local>) -> DateTime<Local> {
    first_instant_of(&Local, now.date_naive()).unwrap_or(now)
}

fn first_instant_of<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        // Midnight skipped by a DST jump; gaps are one hour, so the day starts at 01:00
        LocalResult::None => tz
            .from_local_datetime(&(midnight + TimeDelta::hours(1)))
            .earliest(),
    }
}

/// Gmail `after:` clause for messages received since `since`.
///
/// Gmail only honours whole epoch seconds here; a fractional part such as
/// `1700000000.0` makes it match almost nothing, so none is ever emitted.
pub fn received_after_query(since: DateTime<Local>) -> String {
    format!("after:{}", since.timestamp())
}

/// List every unread message received today under `label_id`.
///
/// Pages are followed until the provider stops returning a continuation
/// token. A failing page ends the listing early: the summaries gathered so
/// far are returned instead of an error.
pub async fn list_unread(
    provider: &dyn MailProvider,
    label_id: &LabelId,
    now: DateTime<Local>,
) -> Vec<MessageSummary> {
    let query = received_after_query(start_of_day(now));
    let label_ids = [label_id.clone(), LabelId::new(LabelId::UNREAD)];

    let mut summaries = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = match provider
            .list_messages(&label_ids, &query, page_token.as_deref())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    "Listing unread messages for {} failed after {} results: {:#}",
                    label_id,
                    summaries.len(),
                    e
                );
                break;
            }
        };

        summaries.extend(page.messages);

        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    debug!("{} unread messages under {} ({})", summaries.len(), label_id, query);
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;
    use crate::provider::InMemoryMailbox;
    use chrono::{FixedOffset, NaiveDateTime, Timelike, Utc};
    use tokio_test::block_on;

    /// UTC, except that local midnight does not exist
    #[derive(Debug, Clone, Copy)]
    struct MidnightGap;

    impl TimeZone for MidnightGap {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            MidnightGap
        }

        fn offset_from_local_date(&self, _: &NaiveDate) -> LocalResult<FixedOffset> {
            LocalResult::Single(FixedOffset::east_opt(0).unwrap())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            if local.hour() == 0 {
                LocalResult::None
            } else {
                LocalResult::Single(FixedOffset::east_opt(0).unwrap())
            }
        }

        fn offset_from_utc_date(&self, _: &NaiveDate) -> FixedOffset {
            FixedOffset::east_opt(0).unwrap()
        }

        fn offset_from_utc_datetime(&self, _: &NaiveDateTime) -> FixedOffset {
            FixedOffset::east_opt(0).unwrap()
        }
    }

    fn mailbox(count: usize, page_size: usize) -> InMemoryMailbox {
        let mailbox = InMemoryMailbox::with_page_size(page_size);
        for i in 0..count {
            mailbox.insert_message(Message::new(format!("m{}", i)), &["Label_1", "UNREAD"]);
        }
        mailbox
    }

    fn ids(summaries: &[MessageSummary]) -> Vec<&str> {
        summaries.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_received_after_query_has_whole_seconds() {
        let since = Local.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        let query = received_after_query(since);

        assert_eq!(query, format!("after:{}", since.timestamp()));
        assert!(!query.contains('.'));
        assert!(!query.ends_with("after:"));
    }

    #[test]
    fn test_start_of_day() {
        let now = Local.with_ymd_and_hms(2024, 3, 5, 17, 42, 9).unwrap();
        let start = start_of_day(now);
        assert_eq!(start.date_naive(), now.date_naive());
        assert_eq!((start.hour(), start.minute(), start.second()), (0, 0, 0));
    }

    #[test]
    fn test_day_without_midnight_starts_at_one() {
        let date = NaiveDate::from_ymd_opt(2024, 9, 8).unwrap();

        let start = first_instant_of(&MidnightGap, date).unwrap();
        assert_eq!(start.naive_utc(), date.and_hms_opt(1, 0, 0).unwrap());

        let start = first_instant_of(&Utc, date).unwrap();
        assert_eq!(start.naive_utc(), date.and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn test_list_unread_unions_all_pages_in_order() {
        let mailbox = mailbox(7, 3);
        let summaries = block_on(list_unread(&mailbox, &LabelId::new("Label_1"), Local::now()));

        assert_eq!(ids(&summaries), vec!["m0", "m1", "m2", "m3", "m4", "m5", "m6"]);
        // One query per page, all with the same lower bound
        let queries = mailbox.queries();
        assert_eq!(queries.len(), 3);
        assert!(queries.iter().all(|q| q == &queries[0]));
    }

    #[test]
    fn test_list_unread_keeps_results_before_failed_page() {
        let mailbox = mailbox(6, 2);
        mailbox.fail_page(2);

        let summaries = block_on(list_unread(&mailbox, &LabelId::new("Label_1"), Local::now()));
        assert_eq!(ids(&summaries), vec!["m0", "m1"]);
    }

    #[test]
    fn test_list_unread_first_page_failure_is_empty() {
        let mailbox = mailbox(3, 2);
        mailbox.fail_page(1);

        let summaries = block_on(list_unread(&mailbox, &LabelId::new("Label_1"), Local::now()));
        assert!(summaries.is_empty());
    }

    #[test]
    fn test_list_unread_skips_read_messages() {
        let mailbox = mailbox(2, 10);
        mailbox.insert_message(Message::new("read"), &["Label_1"]);

        let summaries = block_on(list_unread(&mailbox, &LabelId::new("Label_1"), Local::now()));
        assert_eq!(ids(&summaries), vec!["m0", "m1"]);
    }
}
