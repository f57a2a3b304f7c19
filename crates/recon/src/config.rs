use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Declarative description of one partner export format.
///
/// ```toml
/// name = "ai_que_fome"
/// required_columns = ["Nro. Pedido", "Data", "Total (R$)", "Desconto (R$)"]
/// order_id_column = "Nro. Pedido"
/// date_column = "Data"
///
/// [amount]
/// columns = ["Total (R$)", "Desconto (R$)"]
/// combine = "sum"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AdapterSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub required_columns: Vec<String>,
    pub order_id_column: String,
    pub date_column: String,
    pub amount: AmountSpec,
    #[serde(default)]
    pub labels: FieldLabels,
    #[serde(default)]
    pub extra_columns: Vec<ExtraColumn>,
    #[serde(default)]
    pub unparsed_amount: UnparsedAmount,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AmountSpec {
    pub columns: Vec<String>,
    #[serde(default)]
    pub combine: AmountCombine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountCombine {
    /// Single amount column.
    #[default]
    First,
    /// Sum of all listed columns; unparseable parts count as zero.
    Sum,
}

/// What an adapter does with an amount it cannot parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnparsedAmount {
    #[default]
    Zero,
    Null,
}

/// Display labels for the canonical fields. Unset labels fall back to the
/// source column name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FieldLabels {
    pub order_id: Option<String>,
    pub date: Option<String>,
    pub amount: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExtraColumn {
    pub column: String,
    /// Defaults to `column`.
    #[serde(default)]
    pub label: Option<String>,
}

impl ExtraColumn {
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.column)
    }
}

impl AdapterSpec {
    /// Parse and validate a single adapter definition.
    pub fn from_toml(s: &str) -> Result<Self, ReconError> {
        let spec: Self = toml::from_str(s).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("adapter name is empty".into()));
        }
        if self.required_columns.is_empty() {
            return Err(ReconError::ConfigValidation(format!(
                "adapter '{}': required_columns is empty",
                self.name
            )));
        }
        if self.amount.columns.is_empty() {
            return Err(ReconError::ConfigValidation(format!(
                "adapter '{}': amount.columns is empty",
                self.name
            )));
        }
        if self.amount.combine == AmountCombine::First && self.amount.columns.len() != 1 {
            return Err(ReconError::ConfigValidation(format!(
                "adapter '{}': combine = \"first\" takes exactly one amount column, got {}",
                self.name,
                self.amount.columns.len()
            )));
        }

        let referenced = [&self.order_id_column, &self.date_column]
            .into_iter()
            .chain(self.amount.columns.iter())
            .chain(self.extra_columns.iter().map(|e| &e.column));
        for column in referenced {
            if !self.required_columns.iter().any(|c| c == column) {
                return Err(ReconError::ConfigValidation(format!(
                    "adapter '{}': column '{column}' is not listed in required_columns",
                    self.name
                )));
            }
        }

        Ok(())
    }

    pub fn order_id_label(&self) -> &str {
        self.labels.order_id.as_deref().unwrap_or(&self.order_id_column)
    }

    pub fn date_label(&self) -> &str {
        self.labels.date.as_deref().unwrap_or(&self.date_column)
    }

    /// Falls back to the first amount column.
    pub fn amount_label(&self) -> &str {
        match &self.labels.amount {
            Some(label) => label,
            None => self.amount.columns.first().map_or("", String::as_str),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
