//! Renewal history and the renewal action.

use crate::errors::MemberError;
use crate::models::{format_date, parse_date, RenewalRecord, Term};
use crate::repository::MemberRepository;
use crate::sheet::SheetBackend;
use crate::status::{add_months, evaluate};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Fixed layout of the history tab. The renewal date is written twice
/// (Renewal Date and Renewed On) to stay compatible with existing sheets.
pub const RENEWAL_HEADER: [&str; 8] = [
    "Member ID",
    "Name",
    "Phone",
    "Renewal Date",
    "Renewed On",
    "Duration",
    "New End Date",
    "Notes",
];

/// Append-only log of renewals.
#[derive(Clone)]
pub struct RenewalLog {
    backend: Arc<dyn SheetBackend>,
    tab: String,
}

impl RenewalLog {
    pub async fn open(backend: Arc<dyn SheetBackend>, tab: impl Into<String>) -> Result<Self, MemberError> {
        let tab = tab.into();
        let header = backend.ensure_tab(&tab, &RENEWAL_HEADER).await?;
        if header.iter().map(String::as_str).ne(RENEWAL_HEADER) {
            warn!(tab = %tab, "renewal history header differs from the expected layout");
        }
        Ok(Self { backend, tab })
    }

    pub async fn append(&self, record: &RenewalRecord) -> Result<(), MemberError> {
        let renewal_date = format_date(record.renewal_date);
        let row = vec![
            record.member_id.to_string(),
            record.name.clone(),
            record.phone.clone(),
            renewal_date.clone(),
            renewal_date,
            record.term.label().to_string(),
            format_date(record.new_end_date),
            String::new(),
        ];
        self.backend.append_row(&self.tab, row).await?;
        Ok(())
    }

    /// All records in insertion order. Rows that cannot be read back are skipped.
    pub async fn list_all(&self) -> Result<Vec<RenewalRecord>, MemberError> {
        let rows = self.backend.rows(&self.tab).await?;
        Ok(rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| {
                let record = parse_record(row);
                if record.is_none() {
                    warn!(tab = %self.tab, row = index, "skipping unreadable renewal row");
                }
                record
            })
            .collect())
    }

    pub async fn list_for(&self, member_id: u32) -> Result<Vec<RenewalRecord>, MemberError> {
        let mut records = self.list_all().await?;
        records.retain(|record| record.member_id == member_id);
        Ok(records)
    }
}

fn parse_record(row: &[String]) -> Option<RenewalRecord> {
    let cell = |index: usize| row.get(index).map(String::as_str).unwrap_or("");
    Some(RenewalRecord {
        member_id: cell(0).trim().parse().ok()?,
        name: cell(1).to_string(),
        phone: cell(2).to_string(),
        renewal_date: parse_date(cell(3))?,
        term: cell(5).parse().ok()?,
        new_end_date: parse_date(cell(6))?,
    })
}

/// Reads the renewal date (default `today`) and term from form or JSON input.
pub fn parse_renewal(
    renewal_date: Option<&str>,
    duration: &str,
    today: NaiveDate,
) -> Result<(NaiveDate, Term), MemberError> {
    let renewal_date = match renewal_date.map(str::trim) {
        None | Some("") => today,
        Some(value) => {
            parse_date(value).ok_or_else(|| MemberError::validation(format!("invalid renewal date '{value}'")))?
        }
    };
    let term = duration
        .parse::<Term>()
        .map_err(|err| MemberError::validation(err.to_string()))?;
    Ok((renewal_date, term))
}

pub struct RenewalRecorder<'a> {
    members: &'a MemberRepository,
    history: &'a RenewalLog,
}

impl<'a> RenewalRecorder<'a> {
    pub fn new(members: &'a MemberRepository, history: &'a RenewalLog) -> Self {
        Self { members, history }
    }

    /// Starts a new term for `member_id` on `renewal_date`.
    ///
    /// The history row is appended before the member row is rewritten and
    /// nothing is undone if the second step fails, so the two tabs can
    /// disagree after an error.
    pub async fn renew(
        &self,
        member_id: u32,
        renewal_date: NaiveDate,
        term: Term,
        today: NaiveDate,
    ) -> Result<RenewalRecord, MemberError> {
        let member = self.members.find_by_identifier(member_id).await?;
        let new_end_date = add_months(renewal_date, term.months())
            .ok_or_else(|| MemberError::validation("renewal end date out of range"))?;
        let status = evaluate(Some(new_end_date), today);

        let record = RenewalRecord {
            member_id: member.id,
            name: member.name,
            phone: member.phone,
            renewal_date,
            term,
            new_end_date,
        };
        self.history.append(&record).await?;

        if let Err(err) = self
            .members
            .apply_renewal(member_id, renewal_date, term, new_end_date, status)
            .await
        {
            error!(member_id, error = %err, "renewal recorded in history but member row was not updated");
            return Err(err);
        }

        info!(
            member_id,
            term = term.label(),
            new_end_date = %new_end_date,
            "membership renewed"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Member, MemberStatus};
    use crate::sheet::testing::MemorySheet;

    const MEMBERS: &str = "Current Members";
    const RENEWALS: &str = "Renewal History";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn setup() -> (Arc<MemorySheet>, MemberRepository, RenewalLog) {
        let sheet = Arc::new(MemorySheet::default());
        let members = MemberRepository::open(sheet.clone(), MEMBERS).await.unwrap();
        let history = RenewalLog::open(sheet.clone(), RENEWALS).await.unwrap();
        members
            .append(
                &Member {
                    id: 101,
                    name: "Asha".into(),
                    phone: "9876500101".into(),
                    start_date: Some(date(2023, 10, 15)),
                    term: Some(Term::ThreeMonths),
                    end_date: Some(date(2024, 1, 15)),
                    renewed_on: None,
                    renewals: 0,
                },
                date(2024, 1, 15),
            )
            .await
            .unwrap();
        (sheet, members, history)
    }

    #[test]
    fn renewal_input_defaults_to_today() {
        let today = date(2024, 1, 15);
        assert_eq!(parse_renewal(None, "6 Months", today).unwrap(), (today, Term::SixMonths));
        assert_eq!(
            parse_renewal(Some("01-Feb-2024"), "12", today).unwrap(),
            (date(2024, 2, 1), Term::TwelveMonths)
        );
        assert!(matches!(parse_renewal(Some("soon"), "3 Months", today), Err(MemberError::Validation(_))));
        assert!(matches!(parse_renewal(None, "", today), Err(MemberError::Validation(_))));
    }

    #[tokio::test]
    async fn renew_extends_term_and_logs_history() {
        let (sheet, members, history) = setup().await;
        let recorder = RenewalRecorder::new(&members, &history);

        let record = recorder
            .renew(101, date(2024, 1, 15), Term::ThreeMonths, date(2024, 1, 15))
            .await
            .unwrap();

        assert_eq!(record.new_end_date, date(2024, 4, 15));
        assert_eq!(record.name, "Asha");

        let stored = sheet.snapshot(RENEWALS).await;
        assert_eq!(
            stored.rows[0],
            vec![
                "101",
                "Asha",
                "9876500101",
                "15-Jan-2024",
                "15-Jan-2024",
                "3 Months",
                "15-Apr-2024",
                ""
            ]
        );

        let member = members.find_by_identifier(101).await.unwrap();
        assert_eq!(member.start_date, Some(date(2024, 1, 15)));
        assert_eq!(member.end_date, Some(date(2024, 4, 15)));
        assert_eq!(member.renewed_on, Some(date(2024, 1, 15)));
        assert_eq!(member.renewals, 1);
        assert_eq!(sheet.snapshot(MEMBERS).await.rows[0][6], MemberStatus::Active.label());
    }

    #[tokio::test]
    async fn renewals_accumulate_in_history() {
        let (_, members, history) = setup().await;
        let recorder = RenewalRecorder::new(&members, &history);
        let today = date(2024, 1, 15);

        recorder.renew(101, today, Term::ThreeMonths, today).await.unwrap();
        recorder
            .renew(101, date(2024, 4, 15), Term::TwelveMonths, today)
            .await
            .unwrap();

        let records = history.list_for(101).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].new_end_date, date(2025, 4, 15));
        assert!(history.list_for(102).await.unwrap().is_empty());
        assert_eq!(members.find_by_identifier(101).await.unwrap().renewals, 2);
    }

    #[tokio::test]
    async fn unknown_member_writes_nothing() {
        let (sheet, members, history) = setup().await;
        let recorder = RenewalRecorder::new(&members, &history);
        let before = sheet.append_count();

        let result = recorder
            .renew(999, date(2024, 1, 15), Term::SixMonths, date(2024, 1, 15))
            .await;

        assert!(matches!(result, Err(MemberError::NotFound(999))));
        assert_eq!(sheet.append_count(), before);
    }

    #[tokio::test]
    async fn member_deleted_mid_renewal_is_not_found_and_history_stays() {
        let (sheet, members, history) = setup().await;
        let recorder = RenewalRecorder::new(&members, &history);
        sheet.clear_after_next_append(MEMBERS);

        let result = recorder
            .renew(101, date(2024, 1, 15), Term::SixMonths, date(2024, 1, 15))
            .await;

        assert!(matches!(result, Err(MemberError::NotFound(101))));
        let records = history.list_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].member_id, 101);
        assert_eq!(records[0].new_end_date, date(2024, 7, 15));
        assert!(members.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_member_update_keeps_history_row() {
        let (sheet, members, history) = setup().await;
        let recorder = RenewalRecorder::new(&members, &history);
        sheet.set_failing_updates(true);

        let result = recorder
            .renew(101, date(2024, 1, 15), Term::SixMonths, date(2024, 1, 15))
            .await;

        assert!(matches!(result, Err(MemberError::DataSource(_))));
        assert_eq!(history.list_all().await.unwrap().len(), 1);
        let member = members.find_by_identifier(101).await.unwrap();
        assert_eq!(member.end_date, Some(date(2024, 1, 15)));
    }
}
