use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use crate::models::Launcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CustomDifficulty {
    Lowest,
    Low,
    Medium,
    High,
    Highest,
}

impl CustomDifficulty {
    pub const CHOICES: [&'static str; 5] = ["LOWEST", "LOW", "MEDIUM", "HIGH", "HIGHEST"];

    pub fn parse(value: &str) -> Option<CustomDifficulty> {
        match value {
            "LOWEST" => Some(CustomDifficulty::Lowest),
            "LOW" => Some(CustomDifficulty::Low),
            "MEDIUM" => Some(CustomDifficulty::Medium),
            "HIGH" => Some(CustomDifficulty::High),
            "HIGHEST" => Some(CustomDifficulty::Highest),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CustomDifficulty::Lowest => "LOWEST",
            CustomDifficulty::Low => "LOW",
            CustomDifficulty::Medium => "MEDIUM",
            CustomDifficulty::High => "HIGH",
            CustomDifficulty::Highest => "HIGHEST",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: &'static str,
    pub error: String,
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "field": self.field,
            "error": self.error,
        }));

        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

// Wraps a nullable field so that a key absent from the payload (leave the
// stored value untouched) deserializes to None, while an explicit null (clear
// the value) deserializes to Some(None).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LauncherUpdatePayload {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notify_missing_partials_hours: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub referrer: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub fcm_token: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub push_missing_partials_hours: Option<Option<String>>,
    pub push_block_farmed: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub custom_difficulty: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub minimum_payout: Option<Option<u64>>,
}

#[derive(Debug, Clone)]
pub struct ValidatedLauncherUpdate {
    pub name: Option<String>,
    pub email: Option<Option<String>>,
    pub notify_missing_partials_hours: Option<Option<i32>>,
    pub referrer: Option<Option<String>>,
    pub fcm_token: Option<Option<String>>,
    pub push_missing_partials_hours: Option<Option<i32>>,
    pub push_block_farmed: Option<bool>,
    pub custom_difficulty: Option<Option<CustomDifficulty>>,
    pub minimum_payout: Option<Option<u64>>,
}

impl LauncherUpdatePayload {
    // All-or-nothing: the first offending field fails the whole payload and
    // no field of it may be applied downstream.
    pub fn validate(self) -> Result<ValidatedLauncherUpdate, ValidationError> {
        let email = match self.email {
            Some(Some(email)) => {
                if !is_valid_email(&email) {
                    return Err(ValidationError {
                        field: "email",
                        error: format!("'{}' is not a valid email address", email),
                    });
                }
                Some(Some(email))
            }
            other => other,
        };

        let notify_missing_partials_hours = parse_hours(
            self.notify_missing_partials_hours,
            "notify_missing_partials_hours",
        )?;
        let push_missing_partials_hours = parse_hours(
            self.push_missing_partials_hours,
            "push_missing_partials_hours",
        )?;

        let custom_difficulty = match self.custom_difficulty {
            Some(Some(value)) => match CustomDifficulty::parse(&value) {
                Some(difficulty) => Some(Some(difficulty)),
                None => {
                    return Err(ValidationError {
                        field: "custom_difficulty",
                        error: format!(
                            "'{}' is not one of {}",
                            value,
                            CustomDifficulty::CHOICES.join(", ")
                        ),
                    });
                }
            },
            Some(None) => Some(None),
            None => None,
        };

        Ok(ValidatedLauncherUpdate {
            name: self.name,
            email,
            notify_missing_partials_hours,
            referrer: self.referrer,
            fcm_token: self.fcm_token,
            push_missing_partials_hours,
            push_block_farmed: self.push_block_farmed,
            custom_difficulty,
            minimum_payout: self.minimum_payout,
        })
    }
}

impl ValidatedLauncherUpdate {
    // Overlay onto the stored row: absent fields keep the stored value,
    // present-null fields clear it. Referrer is applied separately against
    // the referrals relation.
    pub fn apply_to(&self, launcher: &Launcher) -> Launcher {
        Launcher {
            name: self.name.clone().or_else(|| launcher.name.clone()),
            email: self.email.clone().unwrap_or_else(|| launcher.email.clone()),
            notify_missing_partials_hours: self
                .notify_missing_partials_hours
                .unwrap_or(launcher.notify_missing_partials_hours),
            push_missing_partials_hours: self
                .push_missing_partials_hours
                .unwrap_or(launcher.push_missing_partials_hours),
            push_block_farmed: self.push_block_farmed.unwrap_or(launcher.push_block_farmed),
            fcm_token: self
                .fcm_token
                .clone()
                .unwrap_or_else(|| launcher.fcm_token.clone()),
            custom_difficulty: self
                .custom_difficulty
                .map(|d| d.map(|d| d.as_str().to_string()))
                .unwrap_or_else(|| launcher.custom_difficulty.clone()),
            minimum_payout: self.minimum_payout.unwrap_or(launcher.minimum_payout),
            ..launcher.clone()
        }
    }
}

fn parse_hours(
    value: Option<Option<String>>,
    field: &'static str,
) -> Result<Option<Option<i32>>, ValidationError> {
    match value {
        Some(Some(text)) => match text.trim().parse::<i32>() {
            Ok(hours) if hours >= 0 => Ok(Some(Some(hours))),
            _ => Err(ValidationError {
                field,
                error: format!("'{}' is not a non-negative number of hours", text),
            }),
        },
        Some(None) => Ok(Some(None)),
        None => Ok(None),
    }
}

fn is_valid_email(value: &str) -> bool {
    if value.chars().any(|c| c.is_whitespace()) {
        return false;
    }
    let parts: Vec<&str> = value.split('@').collect();
    if parts.len() != 2 {
        return false;
    }
    let (local, domain) = (parts[0], parts[1]);
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> LauncherUpdatePayload {
        serde_json::from_value(value).unwrap()
    }

    fn stored_launcher() -> Launcher {
        Launcher {
            launcher_id: "0xaaa1".to_string(),
            name: Some("old name".to_string()),
            p2_singleton_puzzle_hash: "0xp2hash".to_string(),
            points: 10,
            points_pplns: 10,
            share_pplns: 0.1,
            difficulty: 1,
            custom_difficulty: None,
            is_pool_member: true,
            estimated_size: 0,
            joined_at: NaiveDateTime::parse_from_str("2023-05-01 10:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            email: Some("old@example.com".to_string()),
            notify_missing_partials_hours: Some(2),
            push_missing_partials_hours: None,
            push_block_farmed: false,
            fcm_token: None,
            minimum_payout: None,
        }
    }

    #[test]
    fn absent_fields_deserialize_distinct_from_null() {
        let absent = payload(json!({}));
        assert_eq!(absent.email, None);

        let null = payload(json!({ "email": null }));
        assert_eq!(null.email, Some(None));

        let value = payload(json!({ "email": "new@example.com" }));
        assert_eq!(value.email, Some(Some("new@example.com".to_string())));
    }

    #[test]
    fn email_null_clears_while_absent_keeps_stored_value() {
        let stored = stored_launcher();

        let cleared = payload(json!({ "email": null })).validate().unwrap();
        assert_eq!(cleared.apply_to(&stored).email, None);

        let untouched = payload(json!({ "name": "renamed" })).validate().unwrap();
        assert_eq!(
            untouched.apply_to(&stored).email,
            Some("old@example.com".to_string())
        );
    }

    #[test]
    fn out_of_enum_difficulty_fails_whole_payload() {
        let result = payload(json!({
            "name": "perfectly valid",
            "custom_difficulty": "EXTREME",
        }))
        .validate();

        let err = result.unwrap_err();
        assert_eq!(err.field, "custom_difficulty");
        assert!(err.error.contains("EXTREME"));
        // Err means nothing reaches apply_to: name is not applied either.
    }

    #[test]
    fn every_difficulty_choice_is_accepted() {
        for choice in CustomDifficulty::CHOICES {
            let validated = payload(json!({ "custom_difficulty": choice }))
                .validate()
                .unwrap();
            let applied = validated.apply_to(&stored_launcher());
            assert_eq!(applied.custom_difficulty.as_deref(), Some(choice));
        }
    }

    #[test]
    fn difficulty_null_clears_the_override() {
        let mut stored = stored_launcher();
        stored.custom_difficulty = Some("HIGH".to_string());

        let validated = payload(json!({ "custom_difficulty": null }))
            .validate()
            .unwrap();
        assert_eq!(validated.apply_to(&stored).custom_difficulty, None);
    }

    #[test]
    fn malformed_email_is_a_field_error() {
        for bad in ["not-an-email", "a@b", "@example.com", "a b@example.com", "a@@example.com"] {
            let err = payload(json!({ "email": bad })).validate().unwrap_err();
            assert_eq!(err.field, "email", "accepted {}", bad);
        }

        assert!(payload(json!({ "email": "farmer@pool.example.com" }))
            .validate()
            .is_ok());
    }

    #[test]
    fn hours_fields_are_text_typed_numerics() {
        let validated = payload(json!({ "notify_missing_partials_hours": "6" }))
            .validate()
            .unwrap();
        assert_eq!(validated.notify_missing_partials_hours, Some(Some(6)));

        let err = payload(json!({ "notify_missing_partials_hours": "soon" }))
            .validate()
            .unwrap_err();
        assert_eq!(err.field, "notify_missing_partials_hours");

        let err = payload(json!({ "push_missing_partials_hours": "-2" }))
            .validate()
            .unwrap_err();
        assert_eq!(err.field, "push_missing_partials_hours");
    }

    #[test]
    fn empty_payload_validates_and_applies_nothing() {
        let stored = stored_launcher();
        let validated = payload(json!({})).validate().unwrap();
        let applied = validated.apply_to(&stored);

        assert_eq!(applied.name, stored.name);
        assert_eq!(applied.email, stored.email);
        assert_eq!(applied.push_block_farmed, stored.push_block_farmed);
        assert_eq!(applied.minimum_payout, stored.minimum_payout);
    }

    #[test]
    fn minimum_payout_and_push_flag_apply() {
        let stored = stored_launcher();
        let validated = payload(json!({
            "minimum_payout": 1_000_000,
            "push_block_farmed": true,
        }))
        .validate()
        .unwrap();
        let applied = validated.apply_to(&stored);

        assert_eq!(applied.minimum_payout, Some(1_000_000));
        assert!(applied.push_block_farmed);
    }
}
