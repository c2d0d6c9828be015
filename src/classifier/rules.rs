//! Rule-based keyword matcher — the always-available classification tier.

use crate::classifier::Verdict;
use crate::mailbox::MailMessage;

/// Phrases that flag a job invite on their own, regardless of keyword count.
const HIGH_CONFIDENCE_PHRASES: [&str; 3] = [
    "interview invitation",
    "we would like to interview",
    "application shortlisted",
];

/// How many distinct keyword hits it takes to call a match.
const MIN_KEYWORD_HITS: usize = 2;

/// At most this many matched keywords are listed in the reason.
const MAX_LISTED_KEYWORDS: usize = 4;

/// Classify by substring matching over the lowercased subject + sender + body.
///
/// A match needs at least [`MIN_KEYWORD_HITS`] configured keywords, or any
/// single high-confidence phrase. Keywords are assumed pre-lowercased (the
/// config loader guarantees it).
pub fn keyword_verdict(keywords: &[String], message: &MailMessage) -> Verdict {
    let searchable = format!("{} {} {}", message.subject, message.sender, message.body)
        .to_lowercase();

    let matched: Vec<&str> = keywords
        .iter()
        .filter(|kw| searchable.contains(kw.as_str()))
        .map(String::as_str)
        .collect();

    let is_match = matched.len() >= MIN_KEYWORD_HITS
        || HIGH_CONFIDENCE_PHRASES
            .iter()
            .any(|phrase| searchable.contains(phrase));

    let listed = if matched.is_empty() {
        "none".to_string()
    } else {
        matched[..matched.len().min(MAX_LISTED_KEYWORDS)].join(", ")
    };

    Verdict {
        is_match,
        reason: format!("matched keywords: {listed}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_KEYWORDS;

    fn message(subject: &str, body: &str) -> MailMessage {
        MailMessage {
            uid: 1,
            subject: subject.to_string(),
            sender: "someone@example.com".to_string(),
            date: "2026-08-30T10:00:00Z".to_string(),
            body: body.to_string(),
        }
    }

    fn default_keywords() -> Vec<String> {
        DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn two_keywords_match_and_are_listed() {
        let keywords = vec!["interview".to_string(), "recruiter".to_string()];
        let msg = message(
            "Next steps",
            "We would like to schedule an interview with our recruiter",
        );
        let verdict = keyword_verdict(&keywords, &msg);
        assert!(verdict.is_match);
        assert!(verdict.reason.contains("interview"), "{}", verdict.reason);
        assert!(verdict.reason.contains("recruiter"), "{}", verdict.reason);
    }

    #[test]
    fn single_keyword_is_not_enough() {
        let keywords = vec!["interview".to_string(), "recruiter".to_string()];
        let msg = message("One interview mention", "nothing else relevant");
        let verdict = keyword_verdict(&keywords, &msg);
        assert!(!verdict.is_match);
        assert_eq!(verdict.reason, "matched keywords: interview");
    }

    #[test]
    fn newsletter_does_not_match_default_keywords() {
        let msg = message("newsletter weekly digest", "newsletter weekly digest");
        let verdict = keyword_verdict(&default_keywords(), &msg);
        assert!(!verdict.is_match, "{}", verdict.reason);
    }

    #[test]
    fn high_confidence_phrase_matches_alone() {
        let keywords = vec!["unrelated".to_string()];
        let msg = message("Re: your application", "Your application shortlisted for review");
        let verdict = keyword_verdict(&keywords, &msg);
        assert!(verdict.is_match);
        assert_eq!(verdict.reason, "matched keywords: none");
    }

    #[test]
    fn matching_is_case_insensitive() {
        let keywords = vec!["interview".to_string(), "hiring".to_string()];
        let msg = message("INTERVIEW", "HIRING manager will reach out");
        assert!(keyword_verdict(&keywords, &msg).is_match);
    }

    #[test]
    fn reason_lists_at_most_four_keywords() {
        let keywords: Vec<String> = ["a1", "b2", "c3", "d4", "e5", "f6"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let msg = message("a1 b2 c3", "d4 e5 f6");
        let verdict = keyword_verdict(&keywords, &msg);
        assert!(verdict.is_match);
        assert_eq!(verdict.reason, "matched keywords: a1, b2, c3, d4");
    }

    #[test]
    fn keywords_match_in_sender_field() {
        let keywords = vec!["recruiter".to_string(), "talent".to_string()];
        let msg = MailMessage {
            uid: 2,
            subject: "Hello".to_string(),
            sender: "Talent Team <recruiter@corp.com>".to_string(),
            date: String::new(),
            body: "short note".to_string(),
        };
        assert!(keyword_verdict(&keywords, &msg).is_match);
    }
}
