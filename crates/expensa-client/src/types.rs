//! Request and response types for the Expensa API.

use expensa_session::Session;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

/// Credentials for `auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Account details for `auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

/// Find the user object in a login or refresh payload.
///
/// The backend is inconsistent about nesting, so this accepts the user at
/// the top level, under `user`, or inside up to two `data` wrappers.
pub(crate) fn extract_user(value: &Value) -> Option<Session> {
    fn walk(value: &Value, depth: usize) -> Option<Session> {
        let object = value.as_object()?;

        if let Some(user) = object.get("user")
            && let Ok(session) = Session::deserialize(user)
        {
            return Some(session);
        }

        if object.contains_key("id")
            && object.contains_key("email")
            && let Ok(session) = Session::deserialize(value)
        {
            return Some(session);
        }

        match object.get("data") {
            Some(data) if depth > 0 => walk(data, depth - 1),
            _ => None,
        }
    }

    walk(value, 2)
}

// ─────────────────────────────────────────────────────────────────────────────
// Expenses
// ─────────────────────────────────────────────────────────────────────────────

/// A new expense for `expense/create-expense`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub title: String,
    pub category: String,
    pub amount: f64,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    /// Emoji shown next to the expense.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Owner summary attached to an expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseOwner {
    #[serde(deserialize_with = "expensa_session::string_or_number")]
    pub id: String,
    pub name: String,
}

/// A stored expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: i64,
    pub title: String,
    pub amount: f64,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub date: String,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub owner: Option<ExpenseOwner>,
}
