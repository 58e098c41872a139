use once_cell::sync::Lazy;
use regex::Regex;

/// One `email:password` pair taken from the input list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub email: String,
    pub password: String,
}

impl Credential {
    /// Account part of the address, before the `@`.
    pub fn account(&self) -> &str {
        self.email.split_once('@').map(|(a, _)| a).unwrap_or(&self.email)
    }

    /// Domain part of the address, after the `@`.
    pub fn domain(&self) -> &str {
        self.email.split_once('@').map(|(_, d)| d).unwrap_or("")
    }

    /// The literal `email:password` line, as persisted for successes.
    pub fn combo(&self) -> String {
        format!("{}:{}", self.email, self.password)
    }
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_+&*-]+(?:\.[a-zA-Z0-9_+&*-]+)*@(?:[a-zA-Z0-9-]+\.)+[a-zA-Z]{2,7}$")
        .unwrap()
});

/// Split a raw input line on the first `:` into a credential pair.
///
/// The address is lower-cased; the password keeps internal whitespace but is
/// stripped of leading/trailing whitespace and line endings, so a password
/// containing further `:` characters survives intact. Returns `None` when
/// the separator is missing or either side comes out empty.
pub fn parse_line(line: &str) -> Option<Credential> {
    let (email, password) = line.split_once(':')?;
    let email = email.to_ascii_lowercase();
    let password = password.trim().to_string();
    if email.is_empty() || password.is_empty() {
        return None;
    }
    Some(Credential { email, password })
}

/// Cheap syntax gate applied before any network action.
///
/// Deliberately narrower than the full address grammar: the point is to
/// reject garbage rows without a round trip, not to accept every address
/// the grammar allows.
pub fn email_is_valid(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}
