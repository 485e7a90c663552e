//! Expenses API.

use crate::client::ExpensaClient;
use crate::error::Result;
use crate::types::{Expense, NewExpense};

/// Expenses API client.
pub struct ExpensesApi {
    client: ExpensaClient,
}

impl ExpensesApi {
    pub(crate) fn new(client: ExpensaClient) -> Self {
        Self { client }
    }

    /// Record a new expense. Returns the stored expense when the server
    /// echoes it back.
    pub async fn create(&self, expense: &NewExpense) -> Result<Option<Expense>> {
        self.client
            .post("expense/create-expense", expense)
            .await?
            .data_opt()
    }

    /// List the current user's expenses.
    pub async fn list(&self) -> Result<Vec<Expense>> {
        self.client.get("expense/all").await
    }

    /// Sum of the current user's expenses.
    pub async fn total(&self) -> Result<f64> {
        self.client.get("expense/total").await
    }
}
