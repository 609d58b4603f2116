use crate::dashboard::{build_summary_at, member_views, search, today, Summary};
use crate::errors::{AppError, MemberError};
use crate::membership::add_member;
use crate::models::{
    DashboardQuery, EditRequest, MemberResponse, NewMemberRequest, RenewForm, RenewRequest, RenewalResponse,
};
use crate::renewal::parse_renewal;
use crate::state::AppState;
use crate::status::evaluate;
use crate::ui::{render_index, DashboardPage, Notice, SearchHit};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use tracing::{error, warn};

pub async fn index(State(state): State<AppState>, Query(query): Query<DashboardQuery>) -> Response {
    let notice = query.notice.as_deref().and_then(Notice::from_key);
    render_dashboard(&state, query.q.as_deref().unwrap_or(""), notice, StatusCode::OK).await
}

pub async fn add_member_form(State(state): State<AppState>, Form(form): Form<NewMemberRequest>) -> Response {
    let result = add_member(&state.members, &form, today()).await.map(|_| ());
    finish_action(&state, "add member", "added", result).await
}

pub async fn edit_member_form(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Form(form): Form<EditRequest>,
) -> Response {
    let result = state
        .members
        .update_field(id, &form.field, &form.value, today())
        .await;
    finish_action(&state, "update member", "updated", result).await
}

pub async fn delete_member_form(State(state): State<AppState>, Path(id): Path<u32>) -> Response {
    let result = state.members.delete(id).await;
    finish_action(&state, "delete member", "deleted", result).await
}

pub async fn renew_member_form(State(state): State<AppState>, Form(form): Form<RenewForm>) -> Response {
    let today = today();
    let result = async {
        let member_id = form
            .member_id
            .ok_or_else(|| MemberError::validation("select a member to renew"))?;
        let (renewal_date, term) = parse_renewal(form.renewal_date.as_deref(), &form.duration, today)?;
        state.recorder().renew(member_id, renewal_date, term, today).await?;
        Ok::<(), MemberError>(())
    }
    .await;
    finish_action(&state, "renew membership", "renewed", result).await
}

pub async fn get_summary(State(state): State<AppState>) -> Result<Json<Summary>, AppError> {
    let members = state.members.list_all().await?;
    Ok(Json(build_summary_at(today(), &members)))
}

pub async fn list_members(State(state): State<AppState>) -> Result<Json<Vec<MemberResponse>>, AppError> {
    let members = state.members.list_all().await?;
    Ok(Json(member_views(today(), &members)))
}

pub async fn create_member(
    State(state): State<AppState>,
    Json(payload): Json<NewMemberRequest>,
) -> Result<(StatusCode, Json<MemberResponse>), AppError> {
    let today = today();
    let member = add_member(&state.members, &payload, today).await?;
    let status = evaluate(member.end_date, today);
    Ok((StatusCode::CREATED, Json(MemberResponse::new(&member, status))))
}

pub async fn get_member(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<MemberResponse>, AppError> {
    member_response(&state, id).await
}

pub async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Json(payload): Json<EditRequest>,
) -> Result<Json<MemberResponse>, AppError> {
    state
        .members
        .update_field(id, &payload.field, &payload.value, today())
        .await?;
    member_response(&state, id).await
}

pub async fn delete_member(State(state): State<AppState>, Path(id): Path<u32>) -> Result<StatusCode, AppError> {
    state.members.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn renew_member(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Json(payload): Json<RenewRequest>,
) -> Result<Json<RenewalResponse>, AppError> {
    let today = today();
    let (renewal_date, term) = parse_renewal(payload.renewal_date.as_deref(), &payload.duration, today)?;
    let record = state.recorder().renew(id, renewal_date, term, today).await?;
    Ok(Json(RenewalResponse::from(&record)))
}

pub async fn member_renewals(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<Vec<RenewalResponse>>, AppError> {
    let records = state.history.list_for(id).await?;
    Ok(Json(records.iter().map(RenewalResponse::from).collect()))
}

async fn member_response(state: &AppState, id: u32) -> Result<Json<MemberResponse>, AppError> {
    let member = state.members.find_by_identifier(id).await?;
    let status = evaluate(member.end_date, today());
    Ok(Json(MemberResponse::new(&member, status)))
}

/// Every form action ends here: success redirects back to the dashboard,
/// failure re-renders it with the error shown.
async fn finish_action(state: &AppState, action: &str, notice_key: &str, result: Result<(), MemberError>) -> Response {
    match result {
        Ok(()) => Redirect::to(&format!("/?notice={notice_key}")).into_response(),
        Err(err) => {
            match &err {
                MemberError::DataSource(_) => error!(action, error = %err, "action failed"),
                _ => warn!(action, error = %err, "action rejected"),
            }
            let notice = Notice::error(format!("Failed to {action}: {err}"));
            render_dashboard(state, "", Some(notice), err.status_code()).await
        }
    }
}

async fn render_dashboard(state: &AppState, query: &str, notice: Option<Notice>, status: StatusCode) -> Response {
    let today = today();
    let (members, notice, status) = match state.members.list_all().await {
        Ok(members) => (members, notice, status),
        Err(err) => {
            error!(error = %err, "failed to load members");
            let notice = Notice::error(format!("Could not load members: {err}"));
            (Vec::new(), Some(notice), err.status_code())
        }
    };

    let summary = build_summary_at(today, &members);
    let views = member_views(today, &members);
    let matches = search(&members, query);
    let history = if matches.is_empty() {
        Vec::new()
    } else {
        state.history.list_all().await.unwrap_or_else(|err| {
            warn!(error = %err, "failed to load renewal history");
            Vec::new()
        })
    };
    let hits: Vec<SearchHit> = matches
        .into_iter()
        .map(|member| SearchHit {
            member: MemberResponse::new(member, evaluate(member.end_date, today)),
            renewals: history
                .iter()
                .filter(|record| record.member_id == member.id)
                .map(RenewalResponse::from)
                .collect(),
        })
        .collect();

    let page = DashboardPage {
        today,
        summary: &summary,
        members: &views,
        query,
        hits: &hits,
        notice: notice.as_ref(),
    };
    (status, Html(render_index(&page))).into_response()
}
