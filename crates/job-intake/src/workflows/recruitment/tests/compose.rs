use super::common::*;

use crate::workflows::recruitment::compose::{read_tier_blocks, SubmissionComposer, TierSummary};
use crate::workflows::recruitment::domain::{AttachmentSlot, TierKind};
use crate::workflows::recruitment::files::TransportableFile;

fn transportable(name: &str) -> TransportableFile {
    TransportableFile {
        file_name: name.to_string(),
        content_type: "application/pdf".to_string(),
        data: vec![1, 2, 3],
    }
}

#[test]
fn addresses_and_subject() {
    let composer = SubmissionComposer::new(RECIPIENT);
    let message = composer.compose(&asha_rao(), Vec::new());

    assert_eq!(message.to, RECIPIENT);
    assert_eq!(message.reply_to.as_deref(), Some("asha.rao@example.com"));
    assert_eq!(message.subject, "Job Application - Asha Rao");
    assert_eq!(message.sender_name, "Asha Rao");
}

#[test]
fn sections_appear_in_fixed_order() {
    let message = SubmissionComposer::new(RECIPIENT).compose(&graduate(), Vec::new());
    let body = &message.body;

    let positions: Vec<usize> = [
        "Personal Information:",
        "Contact Information:",
        "Educational Information:",
        "10th Details:",
        "Intermediate Details:",
        "Diploma Details:",
        "Graduation Details:",
        "Professional Information:",
    ]
    .iter()
    .map(|heading| body.find(heading).unwrap_or_else(|| panic!("missing {heading}")))
    .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));

    assert!(body.contains("Position Applied For: Lascar"));
    assert!(body.contains("Total Experience: 3 years"));
    assert!(message.html_body.contains("<h2>Educational Information</h2>"));
}

#[test]
fn round_trip_reproduces_each_tier_state() {
    for applicant in [asha_rao(), graduate()] {
        let message = SubmissionComposer::new(RECIPIENT).compose(&applicant, Vec::new());
        let expected: Vec<(TierKind, TierSummary)> = applicant
            .education
            .iter()
            .map(|(kind, tier)| (kind, TierSummary::of(tier)))
            .collect();

        assert_eq!(read_tier_blocks(&message.body), expected);
    }
}

#[test]
fn line_breaks_in_values_cannot_forge_tier_blocks() {
    let mut applicant = graduate();
    applicant.education.tenth.institution = "ZP High School\nNot Applicable".to_string();
    applicant.education.intermediate.institution =
        "Govt Junior College\r\nProfessional Information:".to_string();
    applicant.first_name = "Asha\nEducational Information:".to_string();

    let message = SubmissionComposer::new(RECIPIENT).compose(&applicant, Vec::new());
    let blocks = read_tier_blocks(&message.body);
    let expected: Vec<(TierKind, TierSummary)> = applicant
        .education
        .iter()
        .map(|(kind, tier)| (kind, TierSummary::of(tier)))
        .collect();

    assert_eq!(blocks, expected);
    assert_eq!(
        blocks[0].1,
        TierSummary::Populated {
            institution: "ZP High School Not Applicable".to_string(),
            year: applicant.education.tenth.year.clone(),
            percentage: applicant.education.tenth.percentage.clone(),
        }
    );
    assert!(message
        .body
        .contains("Institution: Govt Junior College Professional Information:"));
}

#[test]
fn single_populated_tier_and_three_not_applicable_blocks() {
    let message = SubmissionComposer::new(RECIPIENT).compose(&asha_rao(), Vec::new());
    let blocks = read_tier_blocks(&message.body);

    assert_eq!(blocks.len(), 4);
    assert_eq!(
        blocks[0],
        (
            TierKind::Tenth,
            TierSummary::Populated {
                institution: "ZP High School".to_string(),
                year: "2010".to_string(),
                percentage: "78.50".to_string(),
            }
        )
    );
    assert!(blocks[1..]
        .iter()
        .all(|(_, summary)| *summary == TierSummary::NotApplicable));
}

#[test]
fn attachments_are_labelled_in_slot_order() {
    let files = vec![
        (
            AttachmentSlot::Certificate(TierKind::Graduation),
            transportable("degree.pdf"),
        ),
        (AttachmentSlot::Photo, transportable("asha.jpg")),
        (
            AttachmentSlot::Certificate(TierKind::Tenth),
            transportable("tenth.pdf"),
        ),
    ];
    let message = SubmissionComposer::new(RECIPIENT).compose(&graduate(), files);

    assert_eq!(
        message.attachment_labels(),
        vec!["Passport Photo", "10th Memo", "Graduation Memo"]
    );
}

#[test]
fn html_body_escapes_applicant_input() {
    let mut applicant = asha_rao();
    applicant.address = "<script>alert(1)</script>".to_string();
    let message = SubmissionComposer::new(RECIPIENT).compose(&applicant, Vec::new());

    assert!(!message.html_body.contains("<script>"));
    assert!(message.html_body.contains("&lt;script&gt;"));
    assert!(message.body.contains("Address: <script>alert(1)</script>"));
}
