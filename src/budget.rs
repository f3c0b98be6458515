//! Travel budget tracking.
//!
//! Expenses are recorded against a stored plan on the backend. Locally we
//! derive the spent-vs-budget overview and per-category totals, and turn a
//! spoken or typed sentence such as "打车花了35元" into a draft expense.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, instrument};

use crate::backend::BackendClient;
use crate::models::lenient;
use crate::{Result, TravelMapError};

/// Share of the budget above which the overview warns
pub const WARNING_PERCENT: f64 = 90.0;

static AMOUNT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d*)?)\s*(?:元|块|rmb)").ok());

/// Expense category, stored by the backend under its Chinese label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExpenseCategory {
    Transport,
    Accommodation,
    Food,
    Tickets,
    Shopping,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 6] = [
        ExpenseCategory::Transport,
        ExpenseCategory::Accommodation,
        ExpenseCategory::Food,
        ExpenseCategory::Tickets,
        ExpenseCategory::Shopping,
        ExpenseCategory::Other,
    ];

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ExpenseCategory::Transport => "交通",
            ExpenseCategory::Accommodation => "住宿",
            ExpenseCategory::Food => "餐饮",
            ExpenseCategory::Tickets => "门票",
            ExpenseCategory::Shopping => "购物",
            ExpenseCategory::Other => "其他",
        }
    }

    #[must_use]
    pub fn icon(&self) -> &'static str {
        match self {
            ExpenseCategory::Transport => "🚗",
            ExpenseCategory::Accommodation => "🏨",
            ExpenseCategory::Food => "🍽️",
            ExpenseCategory::Tickets => "🎫",
            ExpenseCategory::Shopping => "🛍️",
            ExpenseCategory::Other => "📦",
        }
    }

    /// Unknown labels count as [`ExpenseCategory::Other`]
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.label() == label)
            .unwrap_or(ExpenseCategory::Other)
    }

    /// Guess the category from keywords, checked in a fixed order
    #[must_use]
    pub fn infer(text: &str) -> Self {
        let has = |words: &[&str]| words.iter().any(|w| text.contains(w));
        if has(&["交通", "打车", "车费"]) {
            ExpenseCategory::Transport
        } else if has(&["住宿", "酒店", "宾馆"]) {
            ExpenseCategory::Accommodation
        } else if has(&["吃", "饭", "餐", "喝"]) {
            ExpenseCategory::Food
        } else if has(&["门票", "票"]) {
            ExpenseCategory::Tickets
        } else if has(&["买", "购物"]) || text.to_lowercase().contains("shopping") {
            ExpenseCategory::Shopping
        } else {
            ExpenseCategory::Other
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for ExpenseCategory {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<ExpenseCategory> for String {
    fn from(category: ExpenseCategory) -> Self {
        category.label().to_string()
    }
}

/// A recorded expense
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub plan_id: String,
    #[serde(default = "other", deserialize_with = "category_or_other")]
    pub category: ExpenseCategory,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub amount: f64,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub date: Option<String>,
}

fn other() -> ExpenseCategory {
    ExpenseCategory::Other
}

fn category_or_other<'de, D>(deserializer: D) -> std::result::Result<ExpenseCategory, D::Error>
where
    D: serde::Deserializer<'de>,
{
    lenient::string_or_empty(deserializer).map(|label| ExpenseCategory::from_label(&label))
}

impl Expense {
    /// Calendar day of the expense, `未知日期` when absent
    #[must_use]
    pub fn day(&self) -> &str {
        self.date
            .as_deref()
            .map(|date| date.split('T').next().unwrap_or(date))
            .unwrap_or("未知日期")
    }
}

/// Body of `POST /budget/expense`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewExpense {
    pub plan_id: String,
    pub category: ExpenseCategory,
    pub amount: f64,
    pub description: String,
    /// `YYYY-MM-DD`; today when not given
    pub date: Option<String>,
}

impl NewExpense {
    pub fn validate(&self) -> Result<()> {
        if self.plan_id.trim().is_empty() {
            return Err(TravelMapError::validation("an expense needs a plan"));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(TravelMapError::validation("amount must be positive"));
        }
        if self.description.trim().is_empty() {
            return Err(TravelMapError::validation("description must not be empty"));
        }
        Ok(())
    }

    fn with_date(&self) -> Self {
        let date = self
            .date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
        Self {
            date: Some(date),
            ..self.clone()
        }
    }
}

/// Spent against budget for one plan
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct BudgetOverview {
    pub total_budget: f64,
    pub total_spent: f64,
    pub remaining: f64,
    pub percent_used: f64,
}

impl BudgetOverview {
    #[must_use]
    pub fn new(total_budget: f64, expenses: &[Expense]) -> Self {
        let total_spent: f64 = expenses.iter().map(|e| e.amount).sum();
        let percent_used = if total_budget > 0.0 {
            total_spent * 100.0 / total_budget
        } else {
            0.0
        };
        Self {
            total_budget,
            total_spent,
            remaining: total_budget - total_spent,
            percent_used,
        }
    }

    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.percent_used > WARNING_PERCENT
    }

    /// Progress bar fill, capped at 100
    #[must_use]
    pub fn fill_percent(&self) -> f64 {
        self.percent_used.min(100.0)
    }

    #[must_use]
    pub fn usage_text(&self) -> String {
        format!("已使用 {:.1}%", self.percent_used)
    }
}

/// One bar of the category chart
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryTotal {
    pub category: ExpenseCategory,
    pub amount: f64,
    /// Relative to the largest category, 0..=100
    pub share_of_max: f64,
}

/// Totals per category, largest first
#[must_use]
pub fn category_totals(expenses: &[Expense]) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<ExpenseCategory, f64> = BTreeMap::new();
    for expense in expenses {
        *totals.entry(expense.category).or_default() += expense.amount;
    }

    let max = totals.values().copied().fold(0.0, f64::max);
    let mut chart: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, amount)| CategoryTotal {
            category,
            amount,
            share_of_max: if max > 0.0 { amount * 100.0 / max } else { 0.0 },
        })
        .collect();
    chart.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    chart
}

/// Response of `GET /budget/analysis/{plan_id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BudgetAnalysis {
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub total_budget: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub total_spent: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub remaining: f64,
    #[serde(default)]
    pub category_breakdown: BTreeMap<String, f64>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub recommendations: Vec<String>,
}

/// Draft expense read from free text
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDraft {
    pub category: ExpenseCategory,
    pub amount: Option<f64>,
    pub description: String,
}

impl ExpenseDraft {
    /// An amount was found; the category always has a value
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.amount.is_some()
    }

    /// Turn the draft into a request; fails without an amount
    pub fn into_expense(self, plan_id: &str, date: Option<String>) -> Result<NewExpense> {
        let amount = self
            .amount
            .ok_or_else(|| TravelMapError::validation("no amount found, please add one"))?;
        Ok(NewExpense {
            plan_id: plan_id.to_string(),
            category: self.category,
            amount,
            description: self.description,
            date,
        })
    }
}

/// Read a draft expense from a sentence like `吃饭花了200元` or `住宿1000块`.
/// Amounts need a currency word after them; the whole sentence becomes the
/// description.
#[must_use]
pub fn parse_expense_text(text: &str) -> ExpenseDraft {
    let text = text.trim();
    let amount = AMOUNT
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|amount| *amount > 0.0);

    let draft = ExpenseDraft {
        category: ExpenseCategory::infer(text),
        amount,
        description: text.to_string(),
    };
    debug!("Parsed expense text {:?} as {:?}", text, draft);
    draft
}

#[derive(Debug, Deserialize)]
struct ExpenseList {
    #[serde(default, deserialize_with = "lenient::list_or_empty")]
    expenses: Vec<Expense>,
}

impl BackendClient {
    /// Record an expense against a stored plan
    #[instrument(skip(self, expense), fields(plan_id = %expense.plan_id))]
    pub async fn add_expense(&self, user_id: &str, expense: &NewExpense) -> Result<Expense> {
        expense.validate()?;
        let path = format!("budget/expense?user_id={}", urlencoding::encode(user_id));
        self.post_json(&path, &expense.with_date()).await
    }

    #[instrument(skip(self))]
    pub async fn list_expenses(&self, plan_id: &str, user_id: &str) -> Result<Vec<Expense>> {
        let path = format!(
            "budget/expenses/{}?user_id={}",
            urlencoding::encode(plan_id),
            urlencoding::encode(user_id)
        );
        let list: ExpenseList = self.get_json(&path).await?;
        Ok(list.expenses)
    }

    /// Backend analysis with spending recommendations
    #[instrument(skip(self))]
    pub async fn budget_analysis(&self, plan_id: &str, user_id: &str) -> Result<BudgetAnalysis> {
        let path = format!(
            "budget/analysis/{}?user_id={}",
            urlencoding::encode(plan_id),
            urlencoding::encode(user_id)
        );
        self.get_json(&path).await
    }
}
