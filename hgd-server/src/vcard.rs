//! vCard 3.0 rendering for stored contacts
//!
//! The output is the text a browser encodes into a contact QR code, so it
//! stays compact: the profile image is never embedded.

use crate::models::contact::{non_blank, ContactRecord};

/// Escape a TEXT value (RFC 2426 §4)
fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            ';' => out.push_str("\\;"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\\n");
            }
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

/// `@handle` → `<base>/handle`; anything else is used as-is
fn expand_handle(value: &str, base: &str) -> String {
    match value.strip_prefix('@') {
        Some(handle) => format!("{}/{}", base, handle),
        None => value.to_string(),
    }
}

/// Render a contact as a vCard 3.0 document, lines joined with `\n`
pub fn render_vcard(contact: &ContactRecord) -> String {
    let first = contact.first_name.trim();
    let last = contact.last_name.trim();

    let mut lines = vec![
        "BEGIN:VCARD".to_string(),
        "VERSION:3.0".to_string(),
        format!("N:{};{};;;", escape_text(last), escape_text(first)),
        format!("FN:{}", escape_text(&contact.full_name())),
    ];

    if let Some(company) = non_blank(&contact.company) {
        lines.push(format!("ORG:{}", escape_text(company)));
    }
    if let Some(title) = non_blank(&contact.job_title) {
        lines.push(format!("TITLE:{}", escape_text(title)));
    }

    let email = contact.email.trim();
    if !email.is_empty() {
        lines.push(format!("EMAIL;type=INTERNET;type=HOME:{}", email));
    }
    if let Some(work_email) = non_blank(&contact.work_email).filter(|w| *w != email) {
        lines.push(format!("EMAIL;type=INTERNET;type=WORK:{}", work_email));
    }

    let phone = contact.phone.trim();
    if !phone.is_empty() {
        lines.push(format!("TEL;type=CELL:{}", phone));
    }
    if let Some(work_phone) = non_blank(&contact.work_phone) {
        lines.push(format!("TEL;type=WORK:{}", work_phone));
    }
    if let Some(address) = non_blank(&contact.work_address) {
        lines.push(format!("ADR;type=WORK:;;{};;;;", escape_text(address)));
    }
    if let Some(website) = non_blank(&contact.website) {
        lines.push(format!("URL:{}", website));
    }
    if let Some(birthday) = non_blank(&contact.birthday) {
        lines.push(format!("BDAY:{}", birthday.replace('-', "")));
    }
    if let Some(notes) = non_blank(&contact.notes) {
        lines.push(format!("NOTE:{}", escape_text(notes)));
    }

    if let Some(linkedin) = non_blank(&contact.linkedin) {
        lines.push(format!("URL;type=linkedin:{}", linkedin));
    }
    if let Some(twitter) = non_blank(&contact.twitter) {
        lines.push(format!(
            "URL;type=twitter:{}",
            expand_handle(twitter, "https://twitter.com")
        ));
    }
    if let Some(facebook) = non_blank(&contact.facebook) {
        lines.push(format!("URL;type=facebook:{}", facebook));
    }
    if let Some(instagram) = non_blank(&contact.instagram) {
        lines.push(format!(
            "URL;type=instagram:{}",
            expand_handle(instagram, "https://instagram.com")
        ));
    }

    lines.push("END:VCARD".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> ContactRecord {
        ContactRecord {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "555-0100".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_contact() {
        assert_eq!(
            render_vcard(&minimal()),
            "BEGIN:VCARD\n\
             VERSION:3.0\n\
             N:Lovelace;Ada;;;\n\
             FN:Ada Lovelace\n\
             EMAIL;type=INTERNET;type=HOME:ada@example.com\n\
             TEL;type=CELL:555-0100\n\
             END:VCARD"
        );
    }

    #[test]
    fn test_full_contact_line_order() {
        let contact = ContactRecord {
            company: Some("Analytical Engines, Ltd".into()),
            job_title: Some("Programmer".into()),
            work_email: Some("ada@engines.example".into()),
            work_phone: Some("555-0199".into()),
            work_address: Some("12 St James's Sq; London".into()),
            website: Some("https://ada.example".into()),
            birthday: Some("1815-12-10".into()),
            notes: Some("First line\nSecond line".into()),
            linkedin: Some("https://linkedin.com/in/ada".into()),
            twitter: Some("@ada".into()),
            facebook: Some("https://facebook.com/ada".into()),
            instagram: Some("@ada.codes".into()),
            ..minimal()
        };

        let rendered = render_vcard(&contact);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(
            lines,
            vec![
                "BEGIN:VCARD",
                "VERSION:3.0",
                "N:Lovelace;Ada;;;",
                "FN:Ada Lovelace",
                "ORG:Analytical Engines\\, Ltd",
                "TITLE:Programmer",
                "EMAIL;type=INTERNET;type=HOME:ada@example.com",
                "EMAIL;type=INTERNET;type=WORK:ada@engines.example",
                "TEL;type=CELL:555-0100",
                "TEL;type=WORK:555-0199",
                "ADR;type=WORK:;;12 St James's Sq\\; London;;;;",
                "URL:https://ada.example",
                "BDAY:18151210",
                "NOTE:First line\\nSecond line",
                "URL;type=linkedin:https://linkedin.com/in/ada",
                "URL;type=twitter:https://twitter.com/ada",
                "URL;type=facebook:https://facebook.com/ada",
                "URL;type=instagram:https://instagram.com/ada.codes",
                "END:VCARD",
            ]
        );
    }

    #[test]
    fn test_work_email_equal_to_email_is_omitted() {
        let contact = ContactRecord {
            work_email: Some("ada@example.com".into()),
            ..minimal()
        };
        assert!(!render_vcard(&contact).contains("type=WORK:ada@example.com"));
    }

    #[test]
    fn test_blank_optionals_are_omitted() {
        let contact = ContactRecord {
            company: Some("  ".into()),
            notes: Some(String::new()),
            ..minimal()
        };
        let rendered = render_vcard(&contact);
        assert!(!rendered.contains("ORG:"));
        assert!(!rendered.contains("NOTE:"));
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text(r"a\b,c;d"), r"a\\b\,c\;d");
        assert_eq!(escape_text("x\r\ny"), "x\\ny");
    }
}
