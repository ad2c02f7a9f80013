use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const MAX_GOAL_NOTES_LEN: usize = 1000;

/// Preference tags a user can pick during onboarding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserGoalId {
    ExpandMusicTastes,
    FindMoreMusicILike,
    BalanceComfortAndNew,
}

/// A goal as rendered by clients
#[derive(Debug, Clone, Serialize)]
pub struct UserGoalOption {
    pub id: UserGoalId,
    pub label: &'static str,
    pub emoji: &'static str,
}

impl UserGoalId {
    pub const ALL: [UserGoalId; 3] = [
        UserGoalId::ExpandMusicTastes,
        UserGoalId::FindMoreMusicILike,
        UserGoalId::BalanceComfortAndNew,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserGoalId::ExpandMusicTastes => "expand-music-tastes",
            UserGoalId::FindMoreMusicILike => "find-more-music-i-like",
            UserGoalId::BalanceComfortAndNew => "balance-comfort-and-new",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UserGoalId::ExpandMusicTastes => "Expand my music tastes",
            UserGoalId::FindMoreMusicILike => "Find more music I like",
            UserGoalId::BalanceComfortAndNew => "Balance comfort listens with new sounds",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            UserGoalId::ExpandMusicTastes => "🌍",
            UserGoalId::FindMoreMusicILike => "🎯",
            UserGoalId::BalanceComfortAndNew => "⚖️",
        }
    }

    pub fn from_id(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == s)
    }
}

pub fn goal_options() -> Vec<UserGoalOption> {
    UserGoalId::ALL
        .into_iter()
        .map(|id| UserGoalOption {
            id,
            label: id.label(),
            emoji: id.emoji(),
        })
        .collect()
}

/// Raw goals body as posted by clients
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalsPayload {
    pub selected_goals: Option<serde_json::Value>,
    pub notes: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGoalsInput {
    pub selected_goals: Vec<UserGoalId>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGoals {
    pub selected_goals: Vec<UserGoalId>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GoalsPayload {
    pub fn validate(self) -> AppResult<UserGoalsInput> {
        let raw_goals = match self.selected_goals {
            Some(serde_json::Value::Array(goals)) if !goals.is_empty() => goals,
            _ => {
                return Err(AppError::InvalidInput(
                    "selectedGoals must be a non-empty array".to_string(),
                ))
            }
        };

        let mut selected_goals = Vec::with_capacity(raw_goals.len());
        for raw in &raw_goals {
            let goal = raw.as_str().and_then(UserGoalId::from_id).ok_or_else(|| {
                AppError::InvalidInput(
                    "selectedGoals contains one or more invalid goal ids".to_string(),
                )
            })?;
            if !selected_goals.contains(&goal) {
                selected_goals.push(goal);
            }
        }

        let notes = match self.notes {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(notes)) => notes.trim().to_string(),
            Some(_) => {
                return Err(AppError::InvalidInput(
                    "notes must be a string when provided".to_string(),
                ))
            }
        };

        if notes.chars().count() > MAX_GOAL_NOTES_LEN {
            return Err(AppError::InvalidInput(format!(
                "notes must be {} characters or fewer",
                MAX_GOAL_NOTES_LEN
            )));
        }

        Ok(UserGoalsInput {
            selected_goals,
            notes,
        })
    }
}
