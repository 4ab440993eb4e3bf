use std::fmt::{Display, Formatter};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// An election cycle. Votes and candidates belong to exactly one term.
///
/// Either bound may be absent, meaning the term is open on that side.
/// Both bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl Term {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            id: Id::new(),
            start,
            end,
        }
    }

    /// Is the given day inside this term?
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start.map_or(true, |start| start <= day) && self.end.map_or(true, |end| day <= end)
    }

    /// Pick the active term for `day`: among the terms containing it, the one
    /// that started last. Open-started terms lose to any dated one.
    pub fn active_on<'a>(terms: impl IntoIterator<Item = &'a Term>, day: NaiveDate) -> Option<&'a Term> {
        terms
            .into_iter()
            .filter(|term| term.contains(day))
            .max_by_key(|term| term.start)
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let year = |date: Option<NaiveDate>| date.map_or_else(|| "?".to_string(), |d| d.year().to_string());
        write!(f, "{} - {}", year(self.start), year(self.end))
    }
}
