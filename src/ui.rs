use crate::dashboard::Summary;
use crate::models::{MemberResponse, RenewalResponse, Term};
use crate::repository::EditableField;
use chrono::NaiveDate;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

impl NoticeKind {
    fn class(self) -> &'static str {
        match self {
            NoticeKind::Success => "ok",
            NoticeKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    /// Messages behind the `?notice=` keys used by post-redirect-get.
    pub fn from_key(key: &str) -> Option<Self> {
        let message = match key {
            "added" => "Member added successfully!",
            "updated" => "Member updated successfully!",
            "deleted" => "Member deleted successfully!",
            "renewed" => "Membership renewed successfully!",
            _ => return None,
        };
        Some(Self::success(message))
    }
}

pub struct SearchHit {
    pub member: MemberResponse,
    pub renewals: Vec<RenewalResponse>,
}

pub struct DashboardPage<'a> {
    pub today: NaiveDate,
    pub summary: &'a Summary,
    pub members: &'a [MemberResponse],
    pub query: &'a str,
    pub hits: &'a [SearchHit],
    pub notice: Option<&'a Notice>,
}

pub fn render_index(page: &DashboardPage<'_>) -> String {
    INDEX_HTML
        .replace("{{NOTICE}}", &render_notice(page.notice))
        .replace("{{ACTIVE}}", &page.summary.active.to_string())
        .replace("{{EXPIRING}}", &page.summary.expiring_soon.to_string())
        .replace("{{EXPIRED}}", &page.summary.expired.to_string())
        .replace("{{TOTAL}}", &page.summary.total.to_string())
        .replace("{{MEMBER_TABLE}}", &render_member_table(page.members))
        .replace("{{SEARCH}}", &render_search(page.query, page.hits))
        .replace("{{TERM_OPTIONS}}", &term_options())
        .replace("{{MEMBER_OPTIONS}}", &member_options(page.members))
        .replace("{{TODAY}}", &page.today.to_string())
        .replace("{{QUERY}}", &encode_double_quoted_attribute(page.query))
}

fn render_notice(notice: Option<&Notice>) -> String {
    match notice {
        Some(notice) => format!(
            r#"<p class="notice" data-type="{}">{}</p>"#,
            notice.kind.class(),
            encode_text(&notice.message)
        ),
        None => String::new(),
    }
}

fn render_member_table(members: &[MemberResponse]) -> String {
    if members.is_empty() {
        return r#"<p class="hint">No member data available.</p>"#.to_string();
    }
    let mut html = String::from(
        "<table><thead><tr><th>ID</th><th>Name</th><th>Phone</th><th>Start Date</th>\
         <th>Duration</th><th>End Date</th><th>Status</th><th>Renewed On</th></tr></thead><tbody>",
    );
    for member in members {
        let _ = write!(
            html,
            r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><span class="badge {}">{}</span></td><td>{}</td></tr>"#,
            member.id,
            encode_text(&member.name),
            encode_text(&member.phone),
            member.start_date,
            member.duration,
            member.end_date,
            member.status.css_class(),
            member.status.label(),
            member.renewed_on,
        );
    }
    html.push_str("</tbody></table>");
    html
}

fn render_search(query: &str, hits: &[SearchHit]) -> String {
    if query.trim().is_empty() {
        return String::new();
    }
    if hits.is_empty() {
        return r#"<p class="notice" data-type="warn">No matching member found.</p>"#.to_string();
    }
    hits.iter().map(render_hit).collect()
}

fn render_hit(hit: &SearchHit) -> String {
    let member = &hit.member;
    let mut html = String::new();
    let _ = write!(
        html,
        r#"<details class="card" open>
  <summary>{name} - ID: {id}</summary>
  <dl>
    <dt>Phone</dt><dd>{phone}</dd>
    <dt>Start Date</dt><dd>{start}</dd>
    <dt>End Date</dt><dd>{end}</dd>
    <dt>Status</dt><dd><span class="badge {class}">{status}</span></dd>
    <dt>Renewed On</dt><dd>{renewed}</dd>
    <dt>Renewals</dt><dd>{renewals}</dd>
  </dl>
  <form method="post" action="/members/{id}/edit" class="inline">
    <label>Field <select name="field">{fields}</select></label>
    <label>New value <input name="value" required /></label>
    <button type="submit">Update</button>
  </form>
  <form method="post" action="/members/{id}/delete" class="inline">
    <button type="submit" class="danger">Delete {name}</button>
  </form>
"#,
        name = encode_text(&member.name),
        id = member.id,
        phone = encode_text(&member.phone),
        start = member.start_date,
        end = member.end_date,
        class = member.status.css_class(),
        status = member.status.label(),
        renewed = member.renewed_on,
        renewals = member.renewals,
        fields = field_options(),
    );
    if !hit.renewals.is_empty() {
        html.push_str("  <table><thead><tr><th>Renewal Date</th><th>Duration</th><th>New End Date</th></tr></thead><tbody>");
        for renewal in &hit.renewals {
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                renewal.renewal_date, renewal.duration, renewal.new_end_date
            );
        }
        html.push_str("</tbody></table>\n");
    }
    html.push_str("</details>");
    html
}

fn field_options() -> String {
    EditableField::ALL
        .iter()
        .map(|field| format!(r#"<option value="{0}">{0}</option>"#, field.header()))
        .collect()
}

fn term_options() -> String {
    Term::ALL
        .iter()
        .map(|term| format!(r#"<option value="{0}">{0}</option>"#, term.label()))
        .collect()
}

fn member_options(members: &[MemberResponse]) -> String {
    members
        .iter()
        .map(|member| {
            format!(
                r#"<option value="{}">{} (ID {}, ends {})</option>"#,
                member.id,
                encode_text(&member.name),
                member.id,
                member.end_date
            )
        })
        .collect()
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Membership Tracker</title>
  <style>
    :root {
      --bg: #000000;
      --card: #141414;
      --field: #1c1c1c;
      --ink: #ffffff;
      --muted: #a3a3a3;
      --ok: #3fb56d;
      --warn: #e0a82e;
      --bad: #e0523f;
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      display: grid;
      place-items: start center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(1080px, 100%);
      display: grid;
      gap: 28px;
    }

    header {
      text-align: center;
    }

    h1 {
      margin: 0;
      white-space: nowrap;
    }

    h2 {
      margin: 0 0 12px;
      font-size: 1.3rem;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 16px;
    }

    .stat,
    .card {
      background: var(--card);
      border-radius: 16px;
      padding: 18px;
      border: 1px solid rgba(255, 255, 255, 0.08);
    }

    .stat .label {
      display: block;
      font-size: 0.85rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: var(--muted);
    }

    .stat .value {
      font-size: 1.8rem;
      font-weight: 600;
    }

    table {
      width: 100%;
      border-collapse: collapse;
      font-size: 0.92rem;
    }

    th,
    td {
      text-align: left;
      padding: 8px 10px;
      border-bottom: 1px solid rgba(255, 255, 255, 0.08);
    }

    .badge {
      padding: 2px 10px;
      border-radius: 999px;
      font-size: 0.8rem;
      font-weight: 600;
    }

    .badge.active { background: var(--ok); color: #000; }
    .badge.expiring { background: var(--warn); color: #000; }
    .badge.expired { background: var(--bad); color: #fff; }
    .badge.unknown { background: #444; color: #fff; }

    form {
      display: grid;
      gap: 12px;
    }

    form.inline {
      display: flex;
      flex-wrap: wrap;
      align-items: end;
      gap: 12px;
      margin-top: 12px;
    }

    label {
      display: grid;
      gap: 4px;
      color: var(--muted);
      font-size: 0.9rem;
    }

    input,
    select {
      background: var(--field);
      color: var(--ink);
      border: 1px solid #333;
      border-radius: 8px;
      padding: 8px 10px;
      font-size: 1rem;
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 10px 18px;
      font-size: 0.95rem;
      font-weight: 600;
      cursor: pointer;
      background: #ffffff;
      color: #000000;
    }

    button.danger {
      background: var(--bad);
      color: #fff;
    }

    .forms {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(300px, 1fr));
      gap: 16px;
    }

    .notice {
      margin: 0;
      padding: 12px 16px;
      border-radius: 12px;
      background: var(--card);
    }

    .notice[data-type="ok"] { color: var(--ok); }
    .notice[data-type="warn"] { color: var(--warn); }
    .notice[data-type="error"] { color: var(--bad); }

    .hint {
      margin: 0;
      color: var(--muted);
    }

    summary {
      cursor: pointer;
      font-weight: 600;
    }

    dl {
      display: grid;
      grid-template-columns: max-content 1fr;
      gap: 4px 16px;
    }

    dt {
      color: var(--muted);
    }

    dd {
      margin: 0;
    }

    @media (max-width: 600px) {
      h1 {
        white-space: normal;
      }
      button {
        width: 100%;
      }
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Membership Tracker</h1>
    </header>

    {{NOTICE}}

    <section class="panel">
      <div class="stat">
        <span class="label">Active Members</span>
        <span id="active" class="value">{{ACTIVE}}</span>
      </div>
      <div class="stat">
        <span class="label">Expiring Soon</span>
        <span id="expiring" class="value">{{EXPIRING}}</span>
      </div>
      <div class="stat">
        <span class="label">Expired</span>
        <span id="expired" class="value">{{EXPIRED}}</span>
      </div>
      <div class="stat">
        <span class="label">Total</span>
        <span id="total" class="value">{{TOTAL}}</span>
      </div>
    </section>

    <details class="card">
      <summary>Full Member List</summary>
      {{MEMBER_TABLE}}
    </details>

    <section class="card">
      <h2>Search Member</h2>
      <form method="get" action="/" class="inline">
        <label>Member ID, Name or Phone <input name="q" value="{{QUERY}}" /></label>
        <button type="submit">Search</button>
      </form>
      {{SEARCH}}
    </section>

    <section class="forms">
      <form class="card" method="post" action="/members">
        <h2>Add New Member</h2>
        <label>Name <input name="name" /></label>
        <label>Phone <input name="phone" /></label>
        <label>Start Date <input type="date" name="start_date" value="{{TODAY}}" /></label>
        <label>Duration <select name="duration">{{TERM_OPTIONS}}</select></label>
        <button type="submit">Add Member</button>
      </form>

      <form class="card" method="post" action="/renew">
        <h2>Renew Membership</h2>
        <label>Member <select name="member_id">{{MEMBER_OPTIONS}}</select></label>
        <label>Renewal Date <input type="date" name="renewal_date" value="{{TODAY}}" /></label>
        <label>Renewal Duration <select name="duration">{{TERM_OPTIONS}}</select></label>
        <button type="submit">Renew Membership</button>
      </form>
    </section>
  </main>
</body>
</html>
"#;
