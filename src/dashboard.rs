use crate::models::{Member, MemberResponse, MemberStatus};
use crate::status::evaluate;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub date: String,
    pub total: usize,
    pub active: usize,
    pub expiring_soon: usize,
    pub expired: usize,
    pub unknown: usize,
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn build_summary_at(today: NaiveDate, members: &[Member]) -> Summary {
    let mut summary = Summary {
        date: today.to_string(),
        total: members.len(),
        ..Summary::default()
    };
    for member in members {
        match evaluate(member.end_date, today) {
            MemberStatus::Active => summary.active += 1,
            MemberStatus::ExpiringSoon => summary.expiring_soon += 1,
            MemberStatus::Expired => summary.expired += 1,
            MemberStatus::Unknown => summary.unknown += 1,
        }
    }
    summary
}

/// Members annotated with their status as of `today`.
pub fn member_views(today: NaiveDate, members: &[Member]) -> Vec<MemberResponse> {
    members
        .iter()
        .map(|member| MemberResponse::new(member, evaluate(member.end_date, today)))
        .collect()
}

/// Case-insensitive substring match on id, name or phone. A blank query
/// matches nothing.
pub fn search<'a>(members: &'a [Member], query: &str) -> Vec<&'a Member> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    members
        .iter()
        .filter(|member| {
            member.id.to_string().contains(&query)
                || member.name.to_lowercase().contains(&query)
                || member.phone.to_lowercase().contains(&query)
        })
        .collect()
}
