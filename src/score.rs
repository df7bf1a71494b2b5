//! Judge scores and their aggregation.
//!
//! Every provider answer is rated on five fixed categories (0-100). A
//! record's overall score is the rounded mean of its categories; corpus
//! summaries average each category across records first and then score
//! the averaged categories the same way.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One of the five judged categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Relevance,
    Accuracy,
    Completeness,
    Freshness,
    Actionability,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 5] = [
        Category::Relevance,
        Category::Accuracy,
        Category::Completeness,
        Category::Freshness,
        Category::Actionability,
    ];

    /// Field name as it appears in the datasets.
    pub fn name(&self) -> &'static str {
        match self {
            Category::Relevance => "relevance",
            Category::Accuracy => "accuracy",
            Category::Completeness => "completeness",
            Category::Freshness => "freshness",
            Category::Actionability => "actionability",
        }
    }

    /// Capitalized label used in chart data.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Relevance => "Relevance",
            Category::Accuracy => "Accuracy",
            Category::Completeness => "Completeness",
            Category::Freshness => "Freshness",
            Category::Actionability => "Actionability",
        }
    }
}

/// Scores for the five categories.
///
/// A category that is missing, `null` or not a number reads as 0;
/// fractional values are rounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScores {
    #[serde(default, deserialize_with = "lenient_score")]
    pub relevance: u32,
    #[serde(default, deserialize_with = "lenient_score")]
    pub accuracy: u32,
    #[serde(default, deserialize_with = "lenient_score")]
    pub completeness: u32,
    #[serde(default, deserialize_with = "lenient_score")]
    pub freshness: u32,
    #[serde(default, deserialize_with = "lenient_score")]
    pub actionability: u32,
}

fn lenient_score<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_f64)
        .map(|v| v.round().max(0.0) as u32)
        .unwrap_or(0))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl CategoryScores {
    pub fn new(
        relevance: u32,
        accuracy: u32,
        completeness: u32,
        freshness: u32,
        actionability: u32,
    ) -> Self {
        Self {
            relevance,
            accuracy,
            completeness,
            freshness,
            actionability,
        }
    }

    pub fn get(&self, category: Category) -> u32 {
        match category {
            Category::Relevance => self.relevance,
            Category::Accuracy => self.accuracy,
            Category::Completeness => self.completeness,
            Category::Freshness => self.freshness,
            Category::Actionability => self.actionability,
        }
    }

    fn get_mut(&mut self, category: Category) -> &mut u32 {
        match category {
            Category::Relevance => &mut self.relevance,
            Category::Accuracy => &mut self.accuracy,
            Category::Completeness => &mut self.completeness,
            Category::Freshness => &mut self.freshness,
            Category::Actionability => &mut self.actionability,
        }
    }

    /// Sum of all five categories (0-500).
    pub fn total(&self) -> u32 {
        Category::ALL.iter().map(|c| self.get(*c)).sum()
    }

    /// Overall score: `round(total / 5)`.
    ///
    /// A fifth of an integer never lands on .5, so adding 2 before the
    /// integer division rounds to nearest.
    pub fn score(&self) -> u32 {
        (self.total() + 2) / 5
    }

    /// Clamp every category into 0-100.
    pub fn clamped(&self) -> Self {
        let mut out = *self;
        for category in Category::ALL {
            let value = out.get_mut(category);
            *value = (*value).min(100);
        }
        out
    }

    /// Per-category arithmetic mean across records, rounded half-up.
    ///
    /// Returns all zeros for an empty input.
    pub fn mean<'a>(scores: impl IntoIterator<Item = &'a CategoryScores>) -> Self {
        let mut sums = [0u64; 5];
        let mut count = 0u64;

        for s in scores {
            for (i, category) in Category::ALL.iter().enumerate() {
                sums[i] += u64::from(s.get(*category));
            }
            count += 1;
        }

        let mut out = CategoryScores::default();
        if count == 0 {
            return out;
        }

        for (i, category) in Category::ALL.iter().enumerate() {
            *out.get_mut(*category) = ((2 * sums[i] + count) / (2 * count)) as u32;
        }
        out
    }
}

/// Judge output for one provider on one prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JudgeScore {
    #[serde(flatten)]
    pub categories: CategoryScores,
    #[serde(default, deserialize_with = "lenient_text")]
    pub feedback: String,
}

/// Which provider the judge preferred.
///
/// Judge files label the providers by vendor; the published report shows
/// the web search side under a generic name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    #[serde(rename = "kirha")]
    DataApi,
    #[serde(rename = "exa", alias = "websearch")]
    WebSearch,
    #[serde(rename = "tie")]
    Tie,
}

impl Winner {
    /// Decide the winner from category totals.
    pub fn from_totals(web_search: u32, data_api: u32) -> Self {
        if web_search > data_api {
            Winner::WebSearch
        } else if data_api > web_search {
            Winner::DataApi
        } else {
            Winner::Tie
        }
    }

    /// Label used in the published report.
    pub fn report_label(&self) -> &'static str {
        match self {
            Winner::DataApi => "kirha",
            Winner::WebSearch => "websearch",
            Winner::Tie => "tie",
        }
    }
}
