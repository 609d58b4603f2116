use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Date format used in both tabs, e.g. `05-Mar-2024`.
pub const DATE_FORMAT: &str = "%d-%b-%Y";
const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_optional_date(date: Option<NaiveDate>) -> String {
    date.map(format_date).unwrap_or_else(|| "N/A".to_string())
}

/// Parses `DD-Mon-YYYY`, falling back to ISO `YYYY-MM-DD`. Blank or
/// unparseable text yields `None`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(value, ISO_DATE_FORMAT))
        .ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    #[serde(rename = "3 Months")]
    ThreeMonths,
    #[serde(rename = "6 Months")]
    SixMonths,
    #[serde(rename = "12 Months")]
    TwelveMonths,
}

impl Term {
    pub const ALL: [Term; 3] = [Term::ThreeMonths, Term::SixMonths, Term::TwelveMonths];

    pub fn months(self) -> u32 {
        match self {
            Term::ThreeMonths => 3,
            Term::SixMonths => 6,
            Term::TwelveMonths => 12,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Term::ThreeMonths => "3 Months",
            Term::SixMonths => "6 Months",
            Term::TwelveMonths => "12 Months",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTerm(pub String);

impl fmt::Display for UnknownTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown duration '{}', expected 3, 6 or 12 Months", self.0)
    }
}

impl std::error::Error for UnknownTerm {}

impl FromStr for Term {
    type Err = UnknownTerm;

    /// Only the leading integer token matters: `"6 Months"`, `"6"` and
    /// `"6 mo"` all parse as six months.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let months = value
            .split_whitespace()
            .next()
            .and_then(|token| token.parse::<u32>().ok());
        match months {
            Some(3) => Ok(Term::ThreeMonths),
            Some(6) => Ok(Term::SixMonths),
            Some(12) => Ok(Term::TwelveMonths),
            _ => Err(UnknownTerm(value.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberStatus {
    Active,
    #[serde(rename = "Expiring Soon")]
    ExpiringSoon,
    Expired,
    Unknown,
}

impl MemberStatus {
    pub fn label(self) -> &'static str {
        match self {
            MemberStatus::Active => "Active",
            MemberStatus::ExpiringSoon => "Expiring Soon",
            MemberStatus::Expired => "Expired",
            MemberStatus::Unknown => "Unknown",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            MemberStatus::Active => "active",
            MemberStatus::ExpiringSoon => "expiring",
            MemberStatus::Expired => "expired",
            MemberStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Current-state row of one member. Status is not stored here; it is
/// derived from `end_date` whenever it is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: u32,
    pub name: String,
    pub phone: String,
    pub start_date: Option<NaiveDate>,
    pub term: Option<Term>,
    pub end_date: Option<NaiveDate>,
    pub renewed_on: Option<NaiveDate>,
    pub renewals: u32,
}

/// Append-only history entry written on every renewal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenewalRecord {
    pub member_id: u32,
    pub name: String,
    pub phone: String,
    pub renewal_date: NaiveDate,
    pub term: Term,
    pub new_end_date: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MemberResponse {
    pub id: u32,
    pub name: String,
    pub phone: String,
    pub start_date: String,
    pub duration: String,
    pub end_date: String,
    pub status: MemberStatus,
    pub renewed_on: String,
    pub renewals: u32,
}

impl MemberResponse {
    pub fn new(member: &Member, status: MemberStatus) -> Self {
        Self {
            id: member.id,
            name: member.name.clone(),
            phone: member.phone.clone(),
            start_date: format_optional_date(member.start_date),
            duration: member.term.map(Term::label).unwrap_or("N/A").to_string(),
            end_date: format_optional_date(member.end_date),
            status,
            renewed_on: format_optional_date(member.renewed_on),
            renewals: member.renewals,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RenewalResponse {
    pub member_id: u32,
    pub name: String,
    pub phone: String,
    pub renewal_date: String,
    pub duration: Term,
    pub new_end_date: String,
}

impl From<&RenewalRecord> for RenewalResponse {
    fn from(record: &RenewalRecord) -> Self {
        Self {
            member_id: record.member_id,
            name: record.name.clone(),
            phone: record.phone.clone(),
            renewal_date: format_date(record.renewal_date),
            duration: record.term,
            new_end_date: format_date(record.new_end_date),
        }
    }
}

/// Body of the add-member form and `POST /api/members`. Dates and the
/// duration arrive as text and are checked by the action itself.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NewMemberRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub duration: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditRequest {
    pub field: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RenewRequest {
    #[serde(default)]
    pub renewal_date: Option<String>,
    #[serde(default)]
    pub duration: String,
}

/// The dashboard's renewal form names the member in the body.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RenewForm {
    #[serde(default)]
    pub member_id: Option<u32>,
    #[serde(default)]
    pub renewal_date: Option<String>,
    #[serde(default)]
    pub duration: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct DashboardQuery {
    pub q: Option<String>,
    pub notice: Option<String>,
}
