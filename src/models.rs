use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a chore is marked off: a plain done/not-done checkbox, or a
/// three-face rating (happy/neutral/sad).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingType {
    #[default]
    Binary,
    Rating,
}

impl RatingType {
    pub fn is_binary(&self) -> bool {
        matches!(self, RatingType::Binary)
    }

    pub fn as_str(&self) -> &str {
        match self {
            RatingType::Binary => "binary",
            RatingType::Rating => "rating",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "rating" => RatingType::Rating,
            _ => RatingType::Binary,
        }
    }
}

/// One entry in a user's chore list. The id is assigned by the client
/// (max-plus-one) and is unique within a single user's list. On the wire
/// `ratingType` is omitted for plain binary chores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chore {
    pub id: i64,
    pub name: String,
    #[serde(
        rename = "ratingType",
        default,
        skip_serializing_if = "RatingType::is_binary"
    )]
    pub rating_type: RatingType,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbChore {
    pub chore_id: Option<i64>,
    pub name: Option<String>,
    pub rating_type: Option<String>,
}

impl From<DbChore> for Chore {
    fn from(chore: DbChore) -> Self {
        Self {
            id: chore.chore_id.unwrap_or_default(),
            name: chore.name.unwrap_or_default(),
            rating_type: RatingType::from_str(&chore.rating_type.unwrap_or_default()),
        }
    }
}

/// A registry entry for one calendar week, keyed by its start date
/// ("YYYY-MM-DD", a Sunday by household convention). The snapshot is only
/// present once the week has been frozen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Week {
    #[serde(rename = "startDate")]
    pub start_date: String,
    pub frozen: bool,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbWeek {
    pub start_date: Option<String>,
    pub frozen: Option<bool>,
}

impl From<DbWeek> for Week {
    fn from(week: DbWeek) -> Self {
        Self {
            start_date: week.start_date.unwrap_or_default(),
            frozen: week.frozen.unwrap_or_default(),
        }
    }
}

/// Frozen chore lists captured at freeze time: username -> ordered list.
pub type ChoresSnapshot = HashMap<String, Vec<Chore>>;

/// day ("YYYY-MM-DD") -> chore id -> completion value. Values are stored
/// as-is: `true`/`false` for binary chores, `null`/"happy"/"neutral"/"sad"
/// for rating chores.
pub type CompletionMap = HashMap<String, HashMap<i64, serde_json::Value>>;

/// Everything the chore board needs for one user: the chore list that
/// applies to the requested week (frozen snapshot or live list), the full
/// completion ledger, and the user's note.
#[derive(Debug, Serialize)]
pub struct WeekView {
    pub chores: Vec<Chore>,
    pub completions: CompletionMap,
    pub note: String,
}
