/// What an inbound radio packet asks the station to do, per the textual
/// rules applied to its raw text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    /// `@<targetId> <text>` — relay `text` to `target_id`.
    Relay { target_id: String, text: String },
    /// The exact word `instructions` or `help`.
    Instructions,
    /// The exact word `status`.
    Status,
    /// The exact word `nodes` or `list nodes`.
    Nodes,
    /// Anything else: echoed back to the sender.
    Echo,
}

/// Classifies a packet's raw text into an [`Intent`].
pub fn classify(text: &str) -> Intent {
    let trimmed = text.trim();

    if let Some(rest) = trimmed.strip_prefix('@') {
        let mut parts = rest.splitn(2, char::is_whitespace);
        let target_id = parts.next().unwrap_or_default().to_string();
        let body = parts.next().unwrap_or_default().trim().to_string();
        return Intent::Relay {
            target_id,
            text: body,
        };
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "instructions" | "help" => Intent::Instructions,
        "status" => Intent::Status,
        "nodes" | "list nodes" => Intent::Nodes,
        _ => Intent::Echo,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_prefix_splits_target_and_text() {
        let intent = classify("@bob ping");
        assert_eq!(
            intent,
            Intent::Relay {
                target_id: "bob".into(),
                text: "ping".into(),
            }
        );
    }

    #[test]
    fn commands_are_case_insensitive() {
        assert_eq!(classify("HELP"), Intent::Instructions);
        assert_eq!(classify("Status"), Intent::Status);
        assert_eq!(classify("List Nodes"), Intent::Nodes);
    }

    #[test]
    fn anything_else_is_echo() {
        assert_eq!(classify("hello"), Intent::Echo);
    }

    #[test]
    fn relay_with_no_body_yields_empty_text() {
        assert_eq!(
            classify("@bob"),
            Intent::Relay {
                target_id: "bob".into(),
                text: "".into(),
            }
        );
    }
}
