//! Email templates for workflow transitions and reminders

use chrono::{DateTime, Utc};

use crate::models::SubWorkflow;

/// Rendered subject and HTML body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailContent {
    pub subject: String,
    pub html_body: String,
}

/// Context shared by all workflow emails
#[derive(Debug, Clone)]
pub struct WorkflowMailContext<'a> {
    pub workflow: SubWorkflow,
    pub owner_name: &'a str,
    pub actor_name: &'a str,
    pub quarter: &'a str,
    pub cycle: i64,
}

impl WorkflowMailContext<'_> {
    fn document(&self) -> String {
        format!(
            "{} {} {} ({})",
            possessive(self.owner_name),
            self.quarter,
            self.workflow,
            self.cycle
        )
    }
}

pub fn submitted(ctx: &WorkflowMailContext<'_>) -> MailContent {
    render(
        format!("{} submitted for your approval", title(ctx.workflow)),
        format!(
            "<p>{} submitted {} for your approval.</p>",
            escape_html(ctx.owner_name),
            escape_html(&ctx.document())
        ),
    )
}

pub fn recalled(ctx: &WorkflowMailContext<'_>) -> MailContent {
    render(
        format!("{} recalled", title(ctx.workflow)),
        format!(
            "<p>{} recalled {}. No action is needed.</p>",
            escape_html(ctx.owner_name),
            escape_html(&ctx.document())
        ),
    )
}

pub fn approved(ctx: &WorkflowMailContext<'_>) -> MailContent {
    render(
        format!("{} approved", title(ctx.workflow)),
        format!(
            "<p>{} approved {}.</p>",
            escape_html(ctx.actor_name),
            escape_html(&ctx.document())
        ),
    )
}

/// To the owner: the document needs rework
pub fn sent_back(ctx: &WorkflowMailContext<'_>, reason: &str) -> MailContent {
    render(
        format!("{} sent back for changes", title(ctx.workflow)),
        format!(
            "<p>{} sent back {}.</p><blockquote>{}</blockquote>",
            escape_html(ctx.actor_name),
            escape_html(&ctx.document()),
            escape_html(reason)
        ),
    )
}

/// To the actor: confirmation of their send-back
pub fn send_back_confirmation(ctx: &WorkflowMailContext<'_>, reason: &str) -> MailContent {
    render(
        format!("You sent back an {}", ctx.workflow),
        format!(
            "<p>You sent back {} with this message:</p><blockquote>{}</blockquote>",
            escape_html(&ctx.document()),
            escape_html(reason)
        ),
    )
}

pub fn committee_accepted(ctx: &WorkflowMailContext<'_>) -> MailContent {
    render(
        format!("{} reviewed by committee", title(ctx.workflow)),
        format!(
            "<p>The committee reviewed {}. Nothing further is required.</p>",
            escape_html(&ctx.document())
        ),
    )
}

pub fn committee_sent_back(ctx: &WorkflowMailContext<'_>, reason: &str) -> MailContent {
    render(
        format!("{} sent back by committee", title(ctx.workflow)),
        format!(
            "<p>The committee sent back {}.</p><blockquote>{}</blockquote>",
            escape_html(&ctx.document()),
            escape_html(reason)
        ),
    )
}

pub fn reopened(ctx: &WorkflowMailContext<'_>) -> MailContent {
    render(
        format!("{} reopened", title(ctx.workflow)),
        format!(
            "<p>{} reopened {} for editing.</p>",
            escape_html(ctx.actor_name),
            escape_html(&ctx.document())
        ),
    )
}

pub fn feedback_reminder(
    subject_name: Option<&str>,
    description: &str,
    due_at: DateTime<Utc>,
) -> MailContent {
    let about = subject_name
        .map(|name| format!(" about {}", escape_html(name)))
        .unwrap_or_default();

    render(
        "Reminder: feedback requested".to_string(),
        format!(
            "<p>Your feedback{} is due {}.</p><p>{}</p>",
            about,
            due_at.format("%Y-%m-%d"),
            escape_html(description)
        ),
    )
}

/// One email per team lead listing every pending obligation of the team
pub fn compliance_reminder(lead_name: &str, titles: &[&str], due_at: DateTime<Utc>) -> MailContent {
    let items: String = titles
        .iter()
        .map(|t| format!("<li>{}</li>", escape_html(t)))
        .collect();

    render(
        format!("Reminder: {} compliance item(s) pending", titles.len()),
        format!(
            "<p>Hi {},</p><p>Your team has compliance items due by {}:</p><ul>{}</ul>",
            escape_html(lead_name),
            due_at.format("%Y-%m-%d"),
            items
        ),
    )
}

fn render(subject: String, html_body: String) -> MailContent {
    MailContent { subject, html_body }
}

fn title(workflow: SubWorkflow) -> &'static str {
    match workflow {
        SubWorkflow::Agreement => "Agreement",
        SubWorkflow::Assessment => "Assessment",
    }
}

fn possessive(name: &str) -> String {
    if name.ends_with('s') {
        format!("{}'", name)
    } else {
        format!("{}'s", name)
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ctx() -> WorkflowMailContext<'static> {
        WorkflowMailContext {
            workflow: SubWorkflow::Agreement,
            owner_name: "Alice",
            actor_name: "Bob",
            quarter: "Q1",
            cycle: 2026,
        }
    }

    #[test]
    fn test_submitted_names_document() {
        let mail = submitted(&ctx());
        assert_eq!(mail.subject, "Agreement submitted for your approval");
        assert!(mail.html_body.contains("Alice&#39;s Q1 agreement (2026)"));
    }

    #[test]
    fn test_reason_is_escaped() {
        let mail = sent_back(&ctx(), "<script>alert(1)</script>");
        assert!(!mail.html_body.contains("<script>"));
        assert!(mail.html_body.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_compliance_reminder_lists_titles() {
        let due = Utc.with_ymd_and_hms(2026, 3, 31, 0, 0, 0).unwrap();
        let mail = compliance_reminder("Carol", &["Fire drill", "Data audit"], due);
        assert_eq!(mail.subject, "Reminder: 2 compliance item(s) pending");
        assert!(mail.html_body.contains("<li>Fire drill</li><li>Data audit</li>"));
        assert!(mail.html_body.contains("2026-03-31"));
    }
}
