use crate::errors::MemberError;
use crate::models::{parse_date, Member, NewMemberRequest, Term};
use crate::repository::{next_identifier, MemberRepository};
use crate::status::add_months;
use chrono::NaiveDate;

/// A validated add-member request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMember {
    pub name: String,
    pub phone: String,
    pub start_date: NaiveDate,
    pub term: Term,
}

impl NewMember {
    /// Presence checks on the raw request. A missing start date means
    /// `today`.
    pub fn from_request(request: &NewMemberRequest, today: NaiveDate) -> Result<Self, MemberError> {
        let name = request.name.trim();
        let phone = request.phone.trim();
        if name.is_empty() || phone.is_empty() {
            return Err(MemberError::validation("name and phone are required"));
        }

        let start_date = match request.start_date.as_deref().map(str::trim) {
            None | Some("") => today,
            Some(value) => {
                parse_date(value).ok_or_else(|| MemberError::validation(format!("invalid start date '{value}'")))?
            }
        };
        let term = request
            .duration
            .parse::<Term>()
            .map_err(|err| MemberError::validation(err.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            phone: phone.to_string(),
            start_date,
            term,
        })
    }
}

/// Validates `request`, assigns the next id and appends the member.
/// Nothing is written when validation fails.
pub async fn add_member(
    repo: &MemberRepository,
    request: &NewMemberRequest,
    today: NaiveDate,
) -> Result<Member, MemberError> {
    let input = NewMember::from_request(request, today)?;
    let end_date = add_months(input.start_date, input.term.months())
        .ok_or_else(|| MemberError::validation("end date out of range"))?;

    let existing = repo.list_all().await?;
    let id = next_identifier(&existing)
        .ok_or_else(|| MemberError::validation("no member id left above the current maximum"))?;
    let member = Member {
        id,
        name: input.name,
        phone: input.phone,
        start_date: Some(input.start_date),
        term: Some(input.term),
        end_date: Some(end_date),
        renewed_on: None,
        renewals: 0,
    };
    repo.append(&member, today).await?;
    Ok(member)
}
