//! The sensitive-field layout of the finance application's own tables.

use super::registry::{FieldKind, FieldRegistry};

use FieldKind::{Number, String as Text};

impl FieldRegistry {
    /// Registry for the application's record types.
    pub fn builtin() -> Self {
        FieldRegistry::new()
            .with_table(
                "transactions",
                [("amount", Number), ("description", Text), ("notes", Text)],
            )
            .with_table("accounts", [("balance", Number)])
            .with_table(
                "credit_cards",
                [
                    ("credit_limit", Number),
                    ("current_bill", Number),
                    ("available_limit", Number),
                ],
            )
            .with_table(
                "recurring_transactions",
                [("amount", Number), ("description", Text)],
            )
            .with_table(
                "goals",
                [
                    ("target_amount", Number),
                    ("current_amount", Number),
                    ("monthly_contribution", Number),
                    ("notes", Text),
                ],
            )
            .with_table(
                "investments",
                [
                    ("quantity", Number),
                    ("purchase_price", Number),
                    ("current_price", Number),
                    ("notes", Text),
                ],
            )
            .with_table("budgets", [("monthly_limit", Number)])
    }
}
