//! Section-to-prose templates for Common Data Set records.
//!
//! Each known section of a [`StructuredRecord`](crate::record::StructuredRecord)
//! has a fixed English-language template that renders it as a field-labeled,
//! multi-line text block suitable for embedding. The templates are total:
//! every field renders even when absent, substituting a "not available"
//! sentinel, so chunks keep a stable shape across institutions and their
//! embeddings stay comparable. Empty lists render "none", which is kept
//! distinct from "not available".
//!
//! Dispatch is table-driven: [`FORMATTERS`] maps section names to formatter
//! functions, and [`format_section`] falls back to a generic serialized
//! representation for names it does not know, so no section is ever silently
//! dropped.

use itertools::Itertools;
use serde_json::Value;

/// Sentinel rendered for a field that is missing, null, or blank.
pub const NOT_AVAILABLE: &str = "not available";

/// Sentinel rendered for a list field that is present but empty.
pub const NONE_MARKER: &str = "none";

/// Signature shared by all per-section formatters.
type SectionFormatter = fn(&str, &Value) -> String;

/// Known CDS sections, in the order the extraction schema defines them.
static FORMATTERS: &[(&str, SectionFormatter)] = &[
    ("general_info", format_general_info),
    ("admission_factors", format_admission_factors),
    ("admissions_statistics", format_admissions_statistics),
    ("test_scores", format_test_scores),
    ("high_school_profile", format_high_school_profile),
    ("cost_and_financial_aid", format_cost_and_financial_aid),
    ("student_life_and_faculty", format_student_life_and_faculty),
    ("deadlines", format_deadlines),
];

/// Render one section of a record as a human-readable text block.
///
/// Known section names go through their fixed template; unknown names fall
/// back to a generic serialized representation. The output is never empty.
pub fn format_section(institution_name: &str, section_name: &str, value: &Value) -> String {
    match FORMATTERS.iter().find(|(name, _)| *name == section_name) {
        Some((_, formatter)) => formatter(institution_name, value),
        None => format_fallback(institution_name, section_name, value),
    }
}

/// Generic representation for sections with no dedicated template.
pub fn format_fallback(institution_name: &str, section_name: &str, value: &Value) -> String {
    format!("INFO FOR {institution_name} - SECTION {section_name}: {value}")
}

// --- scalar rendering helpers ---

/// Render a scalar JSON value; null/blank becomes the sentinel.
fn scalar(value: &Value) -> String {
    match value {
        Value::Null => NOT_AVAILABLE.to_string(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if s.trim().is_empty() => NOT_AVAILABLE.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Look up `key` in an object-valued section and render it as a scalar.
fn field(section: &Value, key: &str) -> String {
    scalar(section.get(key).unwrap_or(&Value::Null))
}

/// Like [`field`], but suffixes `%` when a numeric value is present.
fn percent_field(section: &Value, key: &str) -> String {
    match section.get(key) {
        Some(Value::Number(n)) => format!("{n}%"),
        Some(other) => scalar(other),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Render a list field comma-joined; empty lists become "none" so they stay
/// distinguishable from a field that was never extracted.
fn list_field(section: &Value, key: &str) -> String {
    match section.get(key) {
        Some(Value::Array(items)) if items.is_empty() => NONE_MARKER.to_string(),
        Some(Value::Array(items)) => items.iter().map(scalar).join(", "),
        Some(other) => scalar(other),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Append a two-level sub-block for a nested sub-record: a header line
/// followed by indented labeled bullets. A missing sub-record renders as a
/// single sentinel line so the block never disappears.
fn push_sub_block(out: &mut String, title: &str, sub: Option<&Value>, fields: &[(&str, &str)]) {
    match sub {
        Some(sub) if sub.is_object() => {
            out.push_str(&format!("{title}:\n"));
            for (key, label) in fields {
                out.push_str(&format!("  - {label}: {}\n", field(sub, key)));
            }
        }
        _ => out.push_str(&format!("{title}: {NOT_AVAILABLE}\n")),
    }
}

// --- per-section templates ---

fn format_general_info(institution: &str, v: &Value) -> String {
    let mut out = format!("General information for {institution}:\n");
    out.push_str(&format!("- Institution name: {}\n", field(v, "institution_name")));
    out.push_str(&format!("- School type: {}\n", field(v, "school_type")));
    out.push_str(&format!("- School category: {}\n", field(v, "school_category")));
    out.push_str(&format!("- Academic calendar: {}\n", field(v, "academic_calendar")));
    out.push_str(&format!("- Website: {}\n", field(v, "website")));
    out.push_str(&format!("- City: {}\n", field(v, "city")));
    out.push_str(&format!("- State: {}\n", field(v, "state")));
    out
}

fn format_admission_factors(institution: &str, v: &Value) -> String {
    let mut out = format!("Admission factors considered by {institution}:\n");
    out.push_str(&format!("- Very important: {}\n", list_field(v, "very_important")));
    out.push_str(&format!("- Important: {}\n", list_field(v, "important")));
    out.push_str(&format!("- Considered: {}\n", list_field(v, "considered")));
    out.push_str(&format!("- Not considered: {}\n", list_field(v, "not_considered")));
    out
}

const GENDER_FIELDS: &[(&str, &str)] = &[
    ("total", "Total"),
    ("men", "Men"),
    ("women", "Women"),
    ("another_gender", "Another gender"),
    ("unknown_gender", "Unknown gender"),
];

fn format_admissions_statistics(institution: &str, v: &Value) -> String {
    let mut out = format!("Admissions statistics for {institution}:\n");
    out.push_str(&format!("- Cohort year: {}\n", field(v, "cohort_year")));
    out.push_str(&format!("- Acceptance rate: {}\n", percent_field(v, "acceptance_rate")));
    out.push_str(&format!("- Yield rate: {}\n", percent_field(v, "yield_rate")));
    push_sub_block(&mut out, "Applicants", v.get("applicants"), GENDER_FIELDS);
    push_sub_block(&mut out, "Admitted students", v.get("admitted"), GENDER_FIELDS);
    push_sub_block(
        &mut out,
        "Enrolled students",
        v.get("enrolled"),
        &[
            ("total", "Total"),
            ("full_time", "Full-time"),
            ("part_time", "Part-time"),
        ],
    );
    push_sub_block(
        &mut out,
        "Waitlist",
        v.get("waitlist"),
        &[
            ("has_policy", "Waitlist offered"),
            ("offered_spot", "Offered a spot"),
            ("accepted_spot", "Accepted a spot"),
            ("admitted_from_waitlist", "Admitted from waitlist"),
        ],
    );
    out
}

fn format_test_scores(institution: &str, v: &Value) -> String {
    let mut out = format!("Standardized test scores at {institution}:\n");
    out.push_str(&format!("- Testing policy: {}\n", field(v, "policy")));
    out.push_str(&format!("- SAT submission rate: {}\n", field(v, "submission_rate_sat")));
    out.push_str(&format!("- ACT submission rate: {}\n", field(v, "submission_rate_act")));
    push_sub_block(
        &mut out,
        "SAT score distribution",
        v.get("sat"),
        &[
            ("composite_25th", "Composite 25th percentile"),
            ("composite_50th", "Composite 50th percentile"),
            ("composite_75th", "Composite 75th percentile"),
            ("ebrw_25th", "EBRW 25th percentile"),
            ("ebrw_75th", "EBRW 75th percentile"),
            ("math_25th", "Math 25th percentile"),
            ("math_75th", "Math 75th percentile"),
        ],
    );
    push_sub_block(
        &mut out,
        "ACT score distribution",
        v.get("act"),
        &[
            ("composite_25th", "Composite 25th percentile"),
            ("composite_50th", "Composite 50th percentile"),
            ("composite_75th", "Composite 75th percentile"),
            ("math_25th", "Math 25th percentile"),
            ("math_75th", "Math 75th percentile"),
            ("english_25th", "English 25th percentile"),
            ("english_75th", "English 75th percentile"),
        ],
    );
    out
}

fn format_high_school_profile(institution: &str, v: &Value) -> String {
    let mut out = format!("High school profile of admitted students at {institution}:\n");
    out.push_str(&format!("- Average GPA: {}\n", field(v, "average_gpa")));
    out.push_str(&format!("- GPA submission rate: {}\n", field(v, "gpa_submission_rate")));
    out.push_str(&format!(
        "- Class rank submission rate: {}\n",
        field(v, "class_rank_submission_rate")
    ));
    out.push_str(&format!("- Top 10% of class: {}\n", field(v, "percent_top_10")));
    out.push_str(&format!("- Top 25% of class: {}\n", field(v, "percent_top_25")));
    out.push_str(&format!("- Top 50% of class: {}\n", field(v, "percent_top_50")));
    out
}

fn format_cost_and_financial_aid(institution: &str, v: &Value) -> String {
    let mut out = format!("Cost and financial aid at {institution}:\n");
    out.push_str(&format!("- Tuition structure: {}\n", field(v, "tuition_structure")));
    push_sub_block(
        &mut out,
        "Annual expenses (USD)",
        v.get("expenses"),
        &[
            ("tuition_in_state", "Tuition (in-state)"),
            ("tuition_out_of_state", "Tuition (out-of-state)"),
            ("fees", "Required fees"),
            ("room_and_board", "Room and board"),
            ("books_and_supplies", "Books and supplies"),
            ("other_expenses", "Other expenses"),
        ],
    );
    push_sub_block(
        &mut out,
        "Financial aid",
        v.get("financial_aid"),
        &[
            (
                "international_students_eligible",
                "International students eligible",
            ),
            ("average_need_based_package", "Average need-based package"),
            ("percent_need_met", "Percent of need met"),
        ],
    );
    out
}

fn format_student_life_and_faculty(institution: &str, v: &Value) -> String {
    let mut out = format!("Student life and faculty at {institution}:\n");
    out.push_str(&format!(
        "- Student-faculty ratio: {}\n",
        field(v, "student_faculty_ratio")
    ));
    out.push_str(&format!(
        "- Undergraduate enrollment: {}\n",
        field(v, "undergraduate_enrollment")
    ));
    out.push_str(&format!(
        "- Classes under 20 students: {}\n",
        field(v, "class_size_under_20_percent")
    ));
    push_sub_block(
        &mut out,
        "Demographics",
        v.get("demographics"),
        &[
            ("out_of_state_percent", "Out-of-state students"),
            ("international_percent", "International students"),
        ],
    );
    out
}

const DEADLINE_FIELDS: &[(&str, &str)] = &[
    ("deadline", "Application deadline"),
    ("notification_date", "Notification date"),
    ("is_binding", "Binding"),
    ("type", "Plan type"),
];

fn format_deadlines(institution: &str, v: &Value) -> String {
    let mut out = format!("Application deadlines for {institution}:\n");
    push_sub_block(&mut out, "Early Decision I", v.get("early_decision_1"), DEADLINE_FIELDS);
    push_sub_block(&mut out, "Early Decision II", v.get("early_decision_2"), DEADLINE_FIELDS);
    push_sub_block(&mut out, "Early Action", v.get("early_action"), DEADLINE_FIELDS);
    push_sub_block(&mut out, "Regular Decision", v.get("regular_decision"), DEADLINE_FIELDS);
    push_sub_block(
        &mut out,
        "Transfer admission",
        v.get("transfer_admission"),
        &[
            ("deadline", "Application deadline"),
            ("is_rolling", "Rolling admission"),
        ],
    );
    out
}
