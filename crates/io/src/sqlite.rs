// Receivables query against a SQLite copy of the point-of-sale database

use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OpenFlags};

use conciliador_recon::normalize::{parse_amount_str, parse_date_str};
use conciliador_recon::query::{QueryFilter, SystemQuery};
use conciliador_recon::{CanonicalRecord, ReconError, SideLabels};

pub const LABEL_ORDER_ID: &str = "ID_Venda";
pub const LABEL_DATE: &str = "Data_Faturamento";
pub const LABEL_AMOUNT: &str = "Valor Bruto";

/// Extra fields attached to each system record, in report order.
pub const EXTRA_LABELS: [&str; 5] = ["Forma de Pagamento", "Nome", "ID_Caixa", "NSU", "RazaoCliente"];

/// A date column as `YYYY-MM-DD HH:MM:SS` text, whatever its storage class:
/// INTEGER is Unix time, REAL is a Julian day number, TEXT is kept as is.
fn date_text(column: &str) -> String {
    format!(
        "CASE typeof({column}) \
WHEN 'integer' THEN datetime({column}, 'unixepoch') \
WHEN 'real' THEN datetime({column}) \
ELSE {column} END"
    )
}

fn base_query() -> String {
    let billed = date_text("VS.Data_Faturamento");
    let registered = date_text("CA.DataCadastro");
    let issued = date_text("CA.Emissao");
    format!(
        "
SELECT
    CA.ID_Venda,
    FP.Descricao,
    U.Nome,
    CA.ID_Caixa,
    CA.Documento_Cartao,
    CA.Valor,
    COALESCE({billed}, {registered}) AS Data_Faturamento,
    C.RazaoCliente
FROM ContasAReceber CA
LEFT JOIN FormasPagamento FP ON FP.ID_Forma = CA.ID_Forma
INNER JOIN Fechamento_Caixas FC ON
    FC.ID_Empresa = CA.ID_Empresa AND
    FC.ID_Caixa = CA.ID_Caixa AND
    FC.ID_Origem_Caixa = CA.ID_Origem_Caixa
INNER JOIN Usuarios U ON U.ID_Usuario = FC.ID_Usuario
LEFT JOIN Vendas_Sorveteria VS ON
    VS.ID_Empresa = CA.ID_Empresa AND
    VS.ID_Venda = CA.ID_Venda
INNER JOIN Empresas E ON E.ID_Empresa = CA.ID_Empresa
INNER JOIN Clientes C ON C.ID_Cliente = CA.ID_Cliente
WHERE E.TipoEmpresa = 'Sorveteria'
  AND COALESCE({issued}, {billed}) >= ?
  AND COALESCE({issued}, {billed}) <= ?
  AND E.ID_Empresa = ?
  AND CA.ID_Origem_Caixa = 1"
    )
}

fn order_by() -> String {
    format!(
        "ORDER BY FP.ID_Forma, CA.Valor, E.NomeFantasia, COALESCE({}, {})",
        date_text("VS.Data_Faturamento"),
        date_text("CA.Emissao")
    )
}

/// System-side records from the receivables tables.
///
/// Date columns may be stored as TEXT, as INTEGER Unix seconds or as REAL
/// Julian day numbers; all three are compared and parsed as text.
pub struct SqliteQuery {
    conn: Connection,
}

impl SqliteQuery {
    /// Open an existing database read-only.
    pub fn open(path: &Path) -> Result<Self, ReconError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| ReconError::Query(format!("{}: {e}", path.display())))?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    fn build_sql(filter: &QueryFilter) -> (String, Vec<Value>) {
        let mut sql = base_query();
        let mut params: Vec<Value> = vec![
            Value::Text(format!("{} 00:00:00", filter.start.format("%Y-%m-%d"))),
            Value::Text(format!("{} 23:59:59", filter.end.format("%Y-%m-%d"))),
            Value::Integer(i64::from(filter.store_id)),
        ];

        for (column, ids) in [
            ("C.ID_Cliente", &filter.client_ids),
            ("FP.ID_Forma", &filter.payment_methods),
        ] {
            if ids.is_empty() {
                continue;
            }
            let placeholders = vec!["?"; ids.len()].join(", ");
            sql.push_str(&format!("\n  AND {column} IN ({placeholders})"));
            params.extend(ids.iter().map(|id| Value::Integer(i64::from(*id))));
        }

        sql.push('\n');
        sql.push_str(&order_by());
        (sql, params)
    }
}

impl SystemQuery for SqliteQuery {
    fn fetch(&self, filter: &QueryFilter) -> Result<Vec<CanonicalRecord>, ReconError> {
        filter.validate()?;
        let (sql, params) = Self::build_sql(filter);

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| ReconError::Query(e.to_string()))?;

        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Ok(RawRow {
                    id: row.get(0)?,
                    payment: row.get(1)?,
                    user: row.get(2)?,
                    register: row.get(3)?,
                    nsu: row.get(4)?,
                    amount: row.get(5)?,
                    date: row.get(6)?,
                    client: row.get(7)?,
                })
            })
            .map_err(|e| ReconError::Query(e.to_string()))?;

        let mut records = Vec::new();
        for (idx, row) in rows.enumerate() {
            let raw = row.map_err(|e| ReconError::Query(e.to_string()))?;
            records.push(raw.into_record(idx + 1));
        }

        log::debug!(
            "receivables query: store {} {}..{}: {} records",
            filter.store_id,
            filter.start,
            filter.end,
            records.len()
        );
        Ok(records)
    }

    fn labels(&self) -> SideLabels {
        system_labels()
    }
}

pub fn system_labels() -> SideLabels {
    SideLabels {
        order_id: LABEL_ORDER_ID.to_string(),
        date: LABEL_DATE.to_string(),
        amount: LABEL_AMOUNT.to_string(),
        extras: EXTRA_LABELS.iter().map(|s| s.to_string()).collect(),
    }
}

struct RawRow {
    id: Value,
    payment: Value,
    user: Value,
    register: Value,
    nsu: Value,
    amount: Value,
    date: Value,
    client: Value,
}

impl RawRow {
    fn into_record(self, row: usize) -> CanonicalRecord {
        let date = match &self.date {
            Value::Text(s) => parse_date_str(s),
            _ => None,
        };
        if date.is_none() {
            log::warn!("system row {row}: unparseable date {:?}", self.date);
        }

        let parsed = match &self.amount {
            Value::Real(v) => Some((v * 100.0).round() as i64),
            Value::Integer(v) => v.checked_mul(100),
            Value::Text(s) => parse_amount_str(s),
            Value::Null | Value::Blob(_) => None,
        };
        let coerced = parsed.is_none();
        if coerced {
            log::warn!("system row {row}: unparseable amount {:?}, using 0", self.amount);
        }

        let mut record = CanonicalRecord::new(value_text(&self.id), date, Some(parsed.unwrap_or(0)))
            .with_source_row(row);
        record.amount_coerced = coerced;

        let extras = [&self.payment, &self.user, &self.register, &self.nsu, &self.client];
        for (label, value) in EXTRA_LABELS.iter().zip(extras) {
            record = record.with_extra(*label, value_text(value));
        }
        record
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Value::Text(s) => s.trim().to_string(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}
