use crate::{ChallengeId, ChallengeResponse, ChallengeType};
use serde::{Deserialize, Serialize};

pub const EMAIL_MAX_LEN: usize = 255;
pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 30;
pub const CHALLENGE_TITLE_MAX_LEN: usize = 100;
pub const CHALLENGE_DESCRIPTION_MAX_LEN: usize = 1000;

/// Challenges run for a week unless the challenger says otherwise.
pub const DEFAULT_DURATION_DAYS: i32 = 7;
pub const MAX_DURATION_DAYS: i32 = 365;
pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 20;
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;

/// Validation result for usernames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsernameValidation {
    Valid,
    TooShort,
    TooLong,
    InvalidCharacters,
    MustStartWithLetter,
}

impl UsernameValidation {
    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            Self::Valid => None,
            Self::TooShort => Some("Username must be at least 3 characters"),
            Self::TooLong => Some("Username must be at most 30 characters"),
            Self::InvalidCharacters => Some(
                "Username can only contain letters, numbers, and underscores",
            ),
            Self::MustStartWithLetter => {
                Some("Username must start with a letter")
            }
        }
    }
}

/// Validate a username.
///
/// Rules:
/// - 3-30 characters
/// - ASCII letters, numbers, and underscores only
/// - Must start with a letter
pub fn validate_username(username: &str) -> UsernameValidation {
    if username.len() < USERNAME_MIN_LEN {
        return UsernameValidation::TooShort;
    }
    if username.len() > USERNAME_MAX_LEN {
        return UsernameValidation::TooLong;
    }

    let mut chars = username.chars();

    if let Some(first) = chars.next()
        && !first.is_ascii_alphabetic()
    {
        return UsernameValidation::MustStartWithLetter;
    }

    for c in chars {
        if !c.is_ascii_alphanumeric() && c != '_' {
            return UsernameValidation::InvalidCharacters;
        }
    }

    UsernameValidation::Valid
}

#[derive(Serialize, Deserialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct CreateAccount {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Challenge another user to a 1v1 contest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChallenge {
    pub challenged_username: String,
    pub challenge_type: ChallengeType,
    pub title: String,
    pub description: Option<String>,
    /// Informational only; scoring never looks at it.
    pub target_value: Option<f64>,
    /// Defaults to [`DEFAULT_DURATION_DAYS`] when omitted.
    pub duration_days: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondToChallenge {
    pub challenge_id: ChallengeId,
    pub response: ChallengeResponse,
}

/// Both fields are optional so a bare `{}` returns the first page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaderboardPage {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
