//! Model reply parsing: action tags and sanitization.

/// One action the model can request.
///
/// Closed sum; unknown tags fall through to sanitization and are spoken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Look up the caller's shifts; payload is the free-form date query.
    GetShifts(String),
    /// The caller confirmed a cancellation; payload is the shift id.
    ConfirmCancel(String),
    /// The caller gave a cancellation reason.
    Reason(String),
    /// Transfer: login trouble.
    Login,
    /// Transfer: caller asked for a person.
    Real,
    /// Out-of-scope request.
    Deny,
}

const TAG_GETSHIFTS: &str = "<GETSHIFTS>";
const TAG_CONFIRM_CANCEL: &str = "<CONFIRM_CANCEL>";
const TAG_REASON: &str = "<REASON>";
const TAG_LOGIN: &str = "<LOGIN>";
const TAG_REAL: &str = "<REAL>";
const TAG_DENY: &str = "<DENY>";

/// Scan a raw model reply for the first recognized action tag, in
/// priority order. Tag markers match exactly (no extra whitespace, no
/// case folding).
pub fn parse_action(reply: &str) -> Option<Action> {
    if let Some(payload) = payload_after(reply, TAG_GETSHIFTS) {
        return Some(Action::GetShifts(payload));
    }
    if let Some(payload) = payload_after(reply, TAG_CONFIRM_CANCEL) {
        return Some(Action::ConfirmCancel(shift_id_token(&payload)));
    }
    if let Some(payload) = payload_after(reply, TAG_REASON) {
        return Some(Action::Reason(payload));
    }
    if reply.contains(TAG_LOGIN) {
        return Some(Action::Login);
    }
    if reply.contains(TAG_REAL) {
        return Some(Action::Real);
    }
    if reply.contains(TAG_DENY) {
        return Some(Action::Deny);
    }
    None
}

/// Text after the tag's first occurrence, up to end of line, trimmed.
fn payload_after(reply: &str, tag: &str) -> Option<String> {
    let idx = reply.find(tag)?;
    let rest = &reply[idx + tag.len()..];
    let line = rest.split('\n').next().unwrap_or("");
    Some(line.trim().to_string())
}

/// First whitespace-delimited token of the payload, with surrounding
/// punctuation and a stray `shift_` prefix removed. The model mangles
/// ids in exactly these two ways in practice.
fn shift_id_token(payload: &str) -> String {
    let token = payload.split_whitespace().next().unwrap_or("");
    let token = token.trim_matches(|c: char| !c.is_alphanumeric());
    let token = token.strip_prefix("shift_").unwrap_or(token);
    token.to_string()
}

/// Strip speculative multi-turn narration before synthesis: cut at the
/// first `User:`, drop a leading `You:`, trim.
pub fn sanitize(raw: &str) -> String {
    let cut = match raw.find("User:") {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    let trimmed = cut.trim();
    let stripped = trimmed.strip_prefix("You:").unwrap_or(trimmed);
    stripped.trim().to_string()
}
