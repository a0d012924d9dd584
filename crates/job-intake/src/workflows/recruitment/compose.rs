use super::domain::{Applicant, AttachmentSlot, EducationTier, TierKind};
use super::files::TransportableFile;

pub const NOT_APPLICABLE_LINE: &str = "Not Applicable";

const PERSONAL_SECTION: &str = "Personal Information";
const CONTACT_SECTION: &str = "Contact Information";
const EDUCATION_SECTION: &str = "Educational Information";
const PROFESSIONAL_SECTION: &str = "Professional Information";
const RULE: &str = "--------------------";
const NOT_PROVIDED: &str = "Not provided";

/// An attachment paired with the label shown to the recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledAttachment {
    pub label: String,
    pub file: TransportableFile,
}

/// Transport-agnostic message handed to a delivery strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: String,
    pub reply_to: Option<String>,
    pub sender_name: String,
    pub subject: String,
    pub body: String,
    pub html_body: String,
    pub attachments: Vec<LabeledAttachment>,
}

impl OutboundMessage {
    pub fn attachment_labels(&self) -> Vec<String> {
        self.attachments
            .iter()
            .map(|attachment| attachment.label.clone())
            .collect()
    }
}

/// Builds the outbound message for a validated applicant. The recipient is
/// fixed at construction; the applicant's address only ever appears as
/// reply-to.
#[derive(Debug, Clone)]
pub struct SubmissionComposer {
    recipient: String,
}

impl SubmissionComposer {
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
        }
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn compose(
        &self,
        applicant: &Applicant,
        files: Vec<(AttachmentSlot, TransportableFile)>,
    ) -> OutboundMessage {
        let mut files = files;
        files.sort_by_key(|(slot, _)| *slot);

        let email = applicant.email.trim();
        OutboundMessage {
            to: self.recipient.clone(),
            reply_to: (!email.is_empty()).then(|| email.to_string()),
            sender_name: applicant.display_name(),
            subject: subject_for(applicant),
            body: render_text_body(applicant),
            html_body: render_html_body(applicant),
            attachments: files
                .into_iter()
                .map(|(slot, file)| LabeledAttachment {
                    label: slot.label().to_string(),
                    file,
                })
                .collect(),
        }
    }
}

pub fn subject_for(applicant: &Applicant) -> String {
    format!(
        "Job Application - {} {}",
        applicant.first_name.trim(),
        applicant.last_name.trim()
    )
}

fn sections(applicant: &Applicant) -> [(&'static str, Vec<(&'static str, String)>); 3] {
    let yes_no = if applicant.disability { "Yes" } else { "No" };
    let experience = match single_line(&applicant.experience).as_str() {
        "" => NOT_PROVIDED.to_string(),
        years => format!("{years} years"),
    };
    [
        (
            PERSONAL_SECTION,
            vec![
                ("Name", single_line(&applicant.display_name())),
                ("Father's Name", or_not_provided(&applicant.father_name)),
                ("Date of Birth", or_not_provided(&applicant.date_of_birth)),
                (
                    "Gender",
                    applicant
                        .gender
                        .map(|gender| gender.label().to_string())
                        .unwrap_or_else(|| NOT_PROVIDED.to_string()),
                ),
                (
                    "Category",
                    applicant
                        .category
                        .map(|category| category.label().to_string())
                        .unwrap_or_else(|| NOT_PROVIDED.to_string()),
                ),
                ("Physically Handicapped", yes_no.to_string()),
                ("Aadhar Number", or_not_provided(&applicant.national_id)),
            ],
        ),
        (
            CONTACT_SECTION,
            vec![
                ("Email", or_not_provided(&applicant.email)),
                ("Phone", or_not_provided(&applicant.phone)),
                ("Address", or_not_provided(&applicant.address)),
                ("City", or_not_provided(&applicant.city)),
                ("Pincode", or_not_provided(&applicant.postal_code)),
            ],
        ),
        (
            PROFESSIONAL_SECTION,
            vec![
                ("Position Applied For", or_not_provided(&applicant.position)),
                ("Total Experience", experience),
            ],
        ),
    ]
}

fn tier_rows(tier: &EducationTier) -> Option<[(&'static str, String); 3]> {
    tier.applicability.is_applicable().then(|| {
        [
            ("Institution", or_not_provided(&tier.institution)),
            ("Year", or_not_provided(&tier.year)),
            ("Percentage", or_not_provided(&tier.percentage)),
        ]
    })
}

fn or_not_provided(value: &str) -> String {
    match single_line(value) {
        value if value.is_empty() => NOT_PROVIDED.to_string(),
        value => value,
    }
}

/// Folds embedded line breaks into single spaces so a value always stays on
/// its own body line.
fn single_line(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Plain-text body: personal, contact, education, professional, in that order.
pub fn render_text_body(applicant: &Applicant) -> String {
    let [personal, contact, professional] = sections(applicant);
    let mut body = String::from("Job Application Details\n\n");

    for (title, rows) in [personal, contact] {
        push_heading(&mut body, title);
        for (label, value) in rows {
            body.push_str(&format!("{label}: {value}\n"));
        }
        body.push('\n');
    }

    push_heading(&mut body, EDUCATION_SECTION);
    for (kind, tier) in applicant.education.iter() {
        body.push_str(&format!("{} Details:\n", kind.heading()));
        match tier_rows(tier) {
            Some(rows) => {
                for (label, value) in rows {
                    body.push_str(&format!("{label}: {value}\n"));
                }
            }
            None => {
                body.push_str(NOT_APPLICABLE_LINE);
                body.push('\n');
            }
        }
        body.push('\n');
    }

    let (title, rows) = professional;
    push_heading(&mut body, title);
    for (label, value) in rows {
        body.push_str(&format!("{label}: {value}\n"));
    }
    body
}

fn push_heading(body: &mut String, title: &str) {
    body.push_str(title);
    body.push_str(":\n");
    body.push_str(RULE);
    body.push('\n');
}

/// HTML rendering of the same four sections for transports that support it.
pub fn render_html_body(applicant: &Applicant) -> String {
    let [personal, contact, professional] = sections(applicant);
    let mut html = String::from(
        "<html><head><style>table{border-collapse:collapse;width:100%}\
         th,td{border:1px solid #ddd;padding:8px;text-align:left}\
         th{background-color:#f2f2f2}</style></head><body>\
         <h1>New Job Application</h1>",
    );

    for (title, rows) in [personal, contact] {
        push_table(&mut html, title, &rows);
    }

    html.push_str(&format!("<h2>{EDUCATION_SECTION}</h2>"));
    for (kind, tier) in applicant.education.iter() {
        html.push_str(&format!("<h3>{}</h3>", kind.heading()));
        match tier_rows(tier) {
            Some(rows) => push_rows(&mut html, &rows),
            None => html.push_str(&format!("<p>{NOT_APPLICABLE_LINE}</p>")),
        }
    }

    let (title, rows) = professional;
    push_table(&mut html, title, &rows);
    html.push_str("</body></html>");
    html
}

fn push_table(html: &mut String, title: &str, rows: &[(&'static str, String)]) {
    html.push_str(&format!("<h2>{}</h2>", escape_html(title)));
    push_rows(html, rows);
}

fn push_rows(html: &mut String, rows: &[(&'static str, String)]) {
    html.push_str("<table>");
    for (label, value) in rows {
        html.push_str(&format!(
            "<tr><th>{}</th><td>{}</td></tr>",
            escape_html(label),
            escape_html(value)
        ));
    }
    html.push_str("</table>");
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
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

/// Per-tier state as it reads back out of a composed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierSummary {
    NotApplicable,
    Populated {
        institution: String,
        year: String,
        percentage: String,
    },
}

impl TierSummary {
    pub fn of(tier: &EducationTier) -> Self {
        match tier_rows(tier) {
            Some([institution, year, percentage]) => TierSummary::Populated {
                institution: institution.1,
                year: year.1,
                percentage: percentage.1,
            },
            None => TierSummary::NotApplicable,
        }
    }
}

/// Recovers the education blocks from a plain-text body, relying on the
/// fixed section ordering. Tiers missing from the body are omitted.
pub fn read_tier_blocks(body: &str) -> Vec<(TierKind, TierSummary)> {
    let education_heading = format!("{EDUCATION_SECTION}:");
    let professional_heading = format!("{PROFESSIONAL_SECTION}:");
    let section = body
        .lines()
        .skip_while(|line| line.trim() != education_heading)
        .skip(1)
        .take_while(|line| line.trim() != professional_heading);

    let mut blocks = Vec::new();
    let mut current: Option<PendingBlock> = None;

    for line in section {
        let line = line.trim();
        if let Some(heading) = line.strip_suffix(" Details:") {
            if let Some(kind) = TierKind::from_key(heading) {
                finish_block(current.take(), &mut blocks);
                current = Some((kind, Vec::new(), false));
                continue;
            }
        }
        let Some((_, rows, not_applicable)) = current.as_mut() else {
            continue;
        };
        if line == NOT_APPLICABLE_LINE {
            *not_applicable = true;
        } else if let Some((label, value)) = line.split_once(": ") {
            rows.push((label.to_string(), value.to_string()));
        }
    }
    finish_block(current.take(), &mut blocks);
    blocks
}

type PendingBlock = (TierKind, Vec<(String, String)>, bool);

fn finish_block(entry: Option<PendingBlock>, blocks: &mut Vec<(TierKind, TierSummary)>) {
    let Some((kind, rows, not_applicable)) = entry else {
        return;
    };
    let summary = if not_applicable {
        TierSummary::NotApplicable
    } else {
        let value = |label: &str| {
            rows.iter()
                .find(|(key, _)| key == label)
                .map(|(_, value)| value.clone())
                .unwrap_or_default()
        };
        TierSummary::Populated {
            institution: value("Institution"),
            year: value("Year"),
            percentage: value("Percentage"),
        }
    };
    blocks.push((kind, summary));
}
