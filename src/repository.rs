//! Member Repository over the "Current Members" tab.
//!
//! Column positions are resolved against the live header once, when the
//! repository is opened. Every operation reads the tab afresh; the only
//! thing held between calls is the backend handle.

use crate::errors::MemberError;
use crate::models::{format_date, parse_date, Member, MemberStatus, Term};
use crate::sheet::SheetBackend;
use crate::status::{add_months, evaluate};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

pub const FIRST_MEMBER_ID: u32 = 101;
const COLUMN_COUNT: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    MemberId,
    Name,
    Phone,
    StartDate,
    Duration,
    EndDate,
    Status,
    RenewedOn,
    Renewals,
}

impl Column {
    pub const ALL: [Column; COLUMN_COUNT] = [
        Column::MemberId,
        Column::Name,
        Column::Phone,
        Column::StartDate,
        Column::Duration,
        Column::EndDate,
        Column::Status,
        Column::RenewedOn,
        Column::Renewals,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Column::MemberId => "Member ID",
            Column::Name => "Name",
            Column::Phone => "Phone",
            Column::StartDate => "Start Date",
            Column::Duration => "Duration",
            Column::EndDate => "End Date",
            Column::Status => "Status",
            Column::RenewedOn => "Renewed On",
            Column::Renewals => "Renewals",
        }
    }

    pub fn from_header(name: &str) -> Option<Column> {
        let name = name.trim();
        Column::ALL.into_iter().find(|column| column.header() == name)
    }

    fn slot(self) -> usize {
        Column::ALL
            .iter()
            .position(|column| *column == self)
            .unwrap_or_default()
    }
}

/// Columns a user may overwrite directly. End Date and Status follow
/// from Start Date and Duration; the rest are bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditableField {
    Name,
    Phone,
    StartDate,
    Duration,
}

impl EditableField {
    pub const ALL: [EditableField; 4] = [
        EditableField::Name,
        EditableField::Phone,
        EditableField::StartDate,
        EditableField::Duration,
    ];

    pub fn column(self) -> Column {
        match self {
            EditableField::Name => Column::Name,
            EditableField::Phone => Column::Phone,
            EditableField::StartDate => Column::StartDate,
            EditableField::Duration => Column::Duration,
        }
    }

    pub fn header(self) -> &'static str {
        self.column().header()
    }

    /// Unknown headers are `FieldNotFound`; known but derived columns
    /// are a validation failure.
    pub fn from_header(name: &str) -> Result<Self, MemberError> {
        let column =
            Column::from_header(name).ok_or_else(|| MemberError::FieldNotFound(name.trim().to_string()))?;
        EditableField::ALL
            .into_iter()
            .find(|field| field.column() == column)
            .ok_or_else(|| MemberError::validation(format!("{} cannot be edited directly", column.header())))
    }
}

#[derive(Debug, Clone)]
struct ColumnMap {
    positions: [usize; COLUMN_COUNT],
    width: usize,
}

impl ColumnMap {
    fn resolve(header: &[String]) -> Result<Self, MemberError> {
        let mut positions = [0; COLUMN_COUNT];
        for column in Column::ALL {
            positions[column.slot()] = header
                .iter()
                .position(|name| name.trim() == column.header())
                .ok_or_else(|| MemberError::FieldNotFound(column.header().to_string()))?;
        }
        Ok(Self {
            positions,
            width: header.len(),
        })
    }

    fn index(&self, column: Column) -> usize {
        self.positions[column.slot()]
    }

    fn cell<'a>(&self, row: &'a [String], column: Column) -> &'a str {
        row.get(self.index(column)).map(String::as_str).unwrap_or("")
    }
}

/// `101` for an empty table, otherwise one past the largest id present.
/// `None` once the largest id is `u32::MAX`. Two callers working from the
/// same snapshot get the same answer.
pub fn next_identifier(existing: &[Member]) -> Option<u32> {
    match existing.iter().map(|member| member.id).max() {
        None => Some(FIRST_MEMBER_ID),
        Some(max) => max.checked_add(1),
    }
}

fn parse_id(value: &str) -> Option<u32> {
    value.trim().parse().ok()
}

fn parse_count(value: &str) -> Option<u32> {
    match value.trim() {
        "" => Some(0),
        value => value.parse().ok(),
    }
}

#[derive(Clone)]
pub struct MemberRepository {
    backend: Arc<dyn SheetBackend>,
    tab: String,
    columns: ColumnMap,
}

impl MemberRepository {
    pub async fn open(backend: Arc<dyn SheetBackend>, tab: impl Into<String>) -> Result<Self, MemberError> {
        let tab = tab.into();
        let defaults: Vec<&str> = Column::ALL.iter().map(|column| column.header()).collect();
        let header = backend.ensure_tab(&tab, &defaults).await?;
        let columns = ColumnMap::resolve(&header)?;
        Ok(Self { backend, tab, columns })
    }

    pub async fn list_all(&self) -> Result<Vec<Member>, MemberError> {
        let rows = self.backend.rows(&self.tab).await?;
        Ok(rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| {
                let member = self.to_member(row);
                if member.is_none() {
                    warn!(tab = %self.tab, row = index, "skipping row without a member id");
                }
                member
            })
            .collect())
    }

    pub async fn find_by_identifier(&self, id: u32) -> Result<Member, MemberError> {
        let (_, row) = self.locate(id).await?;
        self.to_member(&row).ok_or(MemberError::NotFound(id))
    }

    /// Writes `member` as a new row with its status as of `today`. Id
    /// uniqueness is the caller's business.
    pub async fn append(&self, member: &Member, today: NaiveDate) -> Result<(), MemberError> {
        let status = evaluate(member.end_date, today);
        self.backend
            .append_row(&self.tab, self.to_row(member, status))
            .await?;
        info!(member_id = member.id, "member appended");
        Ok(())
    }

    /// Overwrites one editable column of member `id`. Changing Start Date
    /// or Duration also rewrites End Date and Status.
    pub async fn update_field(&self, id: u32, field: &str, value: &str, today: NaiveDate) -> Result<(), MemberError> {
        let field = EditableField::from_header(field)?;
        let value = value.trim();
        if value.is_empty() {
            return Err(MemberError::validation(format!("{} cannot be blank", field.header())));
        }

        let parsed_start = match field {
            EditableField::StartDate => Some(
                parse_date(value)
                    .ok_or_else(|| MemberError::validation(format!("invalid date '{value}'")))?,
            ),
            _ => None,
        };
        let parsed_term = match field {
            EditableField::Duration => Some(
                value
                    .parse::<Term>()
                    .map_err(|err| MemberError::validation(err.to_string()))?,
            ),
            _ => None,
        };

        let (index, row) = self.locate(id).await?;
        let mut cells = Vec::new();
        match field {
            EditableField::Name | EditableField::Phone => {
                cells.push((field.column(), value.to_string()));
            }
            EditableField::StartDate | EditableField::Duration => {
                let start = parsed_start.or_else(|| parse_date(self.columns.cell(&row, Column::StartDate)));
                let term = parsed_term.or_else(|| self.columns.cell(&row, Column::Duration).parse().ok());
                if let Some(start) = parsed_start {
                    cells.push((Column::StartDate, format_date(start)));
                }
                if let Some(term) = parsed_term {
                    cells.push((Column::Duration, term.label().to_string()));
                }
                let (Some(start), Some(term)) = (start, term) else {
                    let missing = if start.is_none() { Column::StartDate } else { Column::Duration };
                    return Err(MemberError::validation(format!(
                        "cannot derive End Date: stored {} is missing or unreadable",
                        missing.header()
                    )));
                };
                let end = add_months(start, term.months())
                    .ok_or_else(|| MemberError::validation("end date out of range"))?;
                cells.push((Column::EndDate, format_date(end)));
                cells.push((Column::Status, evaluate(Some(end), today).label().to_string()));
            }
        }

        self.write_cells(index, cells).await?;
        info!(member_id = id, field = field.header(), "member updated");
        Ok(())
    }

    pub async fn delete(&self, id: u32) -> Result<(), MemberError> {
        let (index, _) = self.locate(id).await?;
        self.backend.delete_row(&self.tab, index).await?;
        info!(member_id = id, "member deleted");
        Ok(())
    }

    /// Rewrites the current-term columns of member `id` after a renewal.
    pub(crate) async fn apply_renewal(
        &self,
        id: u32,
        renewal_date: NaiveDate,
        term: Term,
        new_end_date: NaiveDate,
        status: MemberStatus,
    ) -> Result<(), MemberError> {
        let (index, row) = self.locate(id).await?;
        let renewed_on = format_date(renewal_date);
        let mut cells = vec![
            (Column::StartDate, renewed_on.clone()),
            (Column::Duration, term.label().to_string()),
            (Column::EndDate, format_date(new_end_date)),
            (Column::Status, status.label().to_string()),
            (Column::RenewedOn, renewed_on),
        ];
        // An unreadable count is left as it is rather than reset.
        match parse_count(self.columns.cell(&row, Column::Renewals)) {
            Some(renewals) => cells.push((Column::Renewals, renewals.saturating_add(1).to_string())),
            None => warn!(member_id = id, "renewal count is unreadable, leaving it unchanged"),
        }
        self.write_cells(index, cells).await
    }

    async fn locate(&self, id: u32) -> Result<(usize, Vec<String>), MemberError> {
        let rows = self.backend.rows(&self.tab).await?;
        rows.into_iter()
            .enumerate()
            .find(|(_, row)| parse_id(self.columns.cell(row, Column::MemberId)) == Some(id))
            .ok_or(MemberError::NotFound(id))
    }

    // One cell per call; a failure part-way leaves earlier cells written.
    async fn write_cells(&self, index: usize, cells: Vec<(Column, String)>) -> Result<(), MemberError> {
        for (column, value) in cells {
            self.backend
                .update_cell(&self.tab, index, self.columns.index(column), value)
                .await?;
        }
        Ok(())
    }

    fn to_member(&self, row: &[String]) -> Option<Member> {
        let cell = |column| self.columns.cell(row, column);
        Some(Member {
            id: parse_id(cell(Column::MemberId))?,
            name: cell(Column::Name).to_string(),
            phone: cell(Column::Phone).to_string(),
            start_date: parse_date(cell(Column::StartDate)),
            term: cell(Column::Duration).parse().ok(),
            end_date: parse_date(cell(Column::EndDate)),
            renewed_on: parse_date(cell(Column::RenewedOn)),
            renewals: cell(Column::Renewals).trim().parse().unwrap_or(0),
        })
    }

    fn to_row(&self, member: &Member, status: MemberStatus) -> Vec<String> {
        let mut row = vec![String::new(); self.columns.width];
        let optional = |date: Option<NaiveDate>| date.map(format_date).unwrap_or_default();
        let values = [
            (Column::MemberId, member.id.to_string()),
            (Column::Name, member.name.clone()),
            (Column::Phone, member.phone.clone()),
            (Column::StartDate, optional(member.start_date)),
            (Column::Duration, member.term.map(|term| term.label().to_string()).unwrap_or_default()),
            (Column::EndDate, optional(member.end_date)),
            (Column::Status, status.label().to_string()),
            (Column::RenewedOn, optional(member.renewed_on)),
            (
                Column::Renewals,
                if member.renewals == 0 { String::new() } else { member.renewals.to_string() },
            ),
        ];
        for (column, value) in values {
            row[self.columns.index(column)] = value;
        }
        row
    }
}
