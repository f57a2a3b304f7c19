// End-to-end tests for the `conciliador` binary.
// Run with: cargo test -p conciliador-cli --test run_tests

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const IFOOD_CSV: &str = "\
N° PEDIDO;DATA;VALOR DOS ITENS
1001;05/01/2024;50,00
1002;05/01/2024;30,00
";

const IFOOD_DB_CSV: &str = "\
N° PEDIDO;DATA;VALOR
9001;05/01/2024;50,00
9002;06/01/2024;12,50
9003;05/02/2024;99,00
";

/// Isolated working dir with its own config home, so no user catalog leaks in.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn conciliador(&self) -> Command {
        let home = self.dir.path();
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_conciliador"));
        cmd.current_dir(home)
            .env("HOME", home)
            .env("XDG_CONFIG_HOME", home.join(".config"))
            .env_remove("CONCILIADOR_DB")
            .env_remove("CONCILIADOR_CATALOG")
            .env_remove("RUST_LOG");
        cmd
    }

    /// `run` for iFood at store 58, January 2024, against a system CSV export.
    fn run_ifood(&self, extra: &[&str]) -> Output {
        let delivery = self.write("ifood.csv", IFOOD_CSV);
        let system = self.write("sistema.csv", IFOOD_DB_CSV);
        self.conciliador()
            .arg("run")
            .arg(&delivery)
            .args(["--store", "58", "--partner", "1032"])
            .args(["--start", "01/01/2024", "--end", "31/01/2024"])
            .arg("--system-file")
            .arg(&system)
            .args(extra)
            .output()
            .unwrap()
    }
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
fn run_writes_csv_report() {
    let ws = Workspace::new();
    let out = ws.run_ifood(&["-o", "consolidado.csv"]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));

    let content = fs::read_to_string(ws.path("consolidado.csv")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Pedido Delivery,Data Delivery,Valor Delivery,ID Venda Sistema,Data Sistema,Valor Sistema,Discrepância Inicial,Diferença",
            "1002,05/01/2024,30.00,,,,Diferença,30.00",
            "1001,05/01/2024,50.00,9001,05/01/2024,50.00,Correspondente,0.00",
            ",,,9002,06/01/2024,12.50,Diferença,12.50",
            "Total,,80.00,,,62.50,,42.50",
        ]
    );

    let err = stderr(&out);
    assert!(err.contains("1 matched, 1 delivery only, 1 system only"), "{err}");
}

#[test]
fn run_default_output_is_xlsx_named_after_partner() {
    let ws = Workspace::new();
    let out = ws.run_ifood(&[]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));

    let expected = ws.path("Consolidado_IFood.COM AG REST ONLINE S.A.xlsx");
    let bytes = fs::read(&expected).unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[test]
fn run_json_to_stdout() {
    let ws = Workspace::new();
    let out = ws.run_ifood(&["-o", "-", "-f", "json"]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));

    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(json["summary"]["matched"], 1);
    assert_eq!(json["summary"]["left_only"], 1);
    assert_eq!(json["summary"]["right_only"], 1);
    assert_eq!(json["reconciliation"]["pairs"][1]["kind"], "matched");
    assert_eq!(json["reconciliation"]["pairs"][1]["right"]["order_id"], "9001");
    assert_eq!(json["meta"]["run_name"], "Araguaína II / IFood.COM AG REST ONLINE S.A.");
}

#[test]
fn run_original_labels() {
    let ws = Workspace::new();
    let out = ws.run_ifood(&["-o", "-", "-f", "csv", "--original-labels"]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));

    let text = stdout(&out);
    let header = text.lines().next().unwrap();
    assert!(header.starts_with("N° PEDIDO IFOOD,DATA IFOOD,VALOR IFOOD,N° PEDIDO"), "{header}");
    assert!(header.contains("VALOR IfoodDB"), "{header}");
}

#[test]
fn run_original_labels_with_extras_lists_each_extra_once() {
    let ws = Workspace::new();
    let delivery = ws.write("ifood.csv", IFOOD_CSV);
    let db = ws.path("pdv.sqlite");
    create_db(&db);

    let out = ws
        .conciliador()
        .arg("run")
        .arg(&delivery)
        .args(["--store", "58", "--partner", "1032"])
        .args(["--start", "2024-01-01", "--end", "2024-01-31"])
        .arg("--system-db")
        .arg(&db)
        .args(["-o", "-", "-f", "csv", "--original-labels", "--with-extras"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));

    let text = stdout(&out);
    let headers: Vec<&str> = text.lines().next().unwrap().split(',').collect();
    assert_eq!(headers.iter().filter(|h| **h == "NSU").count(), 1, "{headers:?}");
    assert_eq!(headers.iter().filter(|h| **h == "Forma de Pagamento").count(), 1, "{headers:?}");
    // 3 delivery + 3 system + 5 extras + status + difference
    assert_eq!(headers.len(), 13, "{headers:?}");
}

#[test]
fn run_original_labels_without_extras_flag_has_no_extras() {
    let ws = Workspace::new();
    let delivery = ws.write("ifood.csv", IFOOD_CSV);
    let db = ws.path("pdv.sqlite");
    create_db(&db);

    let out = ws
        .conciliador()
        .arg("run")
        .arg(&delivery)
        .args(["--store", "58", "--partner", "1032"])
        .args(["--start", "2024-01-01", "--end", "2024-01-31"])
        .arg("--system-db")
        .arg(&db)
        .args(["-o", "-", "-f", "csv", "--original-labels"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));

    let text = stdout(&out);
    let header = text.lines().next().unwrap();
    assert!(!header.contains("NSU"), "{header}");
    assert_eq!(header.split(',').count(), 8, "{header}");
}

#[test]
fn missing_system_file_exits_4() {
    let ws = Workspace::new();
    let delivery = ws.write("ifood.csv", IFOOD_CSV);
    let out = ws
        .conciliador()
        .arg("run")
        .arg(&delivery)
        .args(["--store", "58", "--partner", "1032"])
        .args(["--start", "01/01/2024", "--end", "31/01/2024"])
        .args(["--system-file", "nao-existe.csv", "-o", "out.csv"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(4), "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("IO error"), "{}", stderr(&out));
}

#[test]
fn fail_on_unmatched_exits_7() {
    let ws = Workspace::new();
    let out = ws.run_ifood(&["-o", "out.csv", "--fail-on-unmatched"]);
    assert_eq!(out.status.code(), Some(7));
    assert!(stderr(&out).contains("2 unmatched row(s)"));
    // The report is still written
    assert!(ws.path("out.csv").exists());
}

#[test]
fn partner_not_enabled_for_store_exits_3() {
    let ws = Workspace::new();
    let delivery = ws.write("ifood.csv", IFOOD_CSV);
    let out = ws
        .conciliador()
        .arg("run")
        .arg(&delivery)
        .args(["--store", "53", "--partner", "1032"])
        .args(["--start", "01/01/2024", "--end", "31/01/2024"])
        .args(["--system-db", "nao-existe.sqlite"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
    let err = stderr(&out);
    assert!(err.contains("not enabled for store 53"), "{err}");
    assert!(err.contains("hint:"), "{err}");
}

#[test]
fn missing_column_exits_4_with_found_columns() {
    let ws = Workspace::new();
    let delivery = ws.write("ifood.csv", "PEDIDO;DATA;VALOR\n1;05/01/2024;10,00\n");
    let system = ws.write("sistema.csv", IFOOD_DB_CSV);
    let out = ws
        .conciliador()
        .arg("run")
        .arg(&delivery)
        .args(["--store", "58", "--partner", "1032"])
        .args(["--start", "01/01/2024", "--end", "31/01/2024"])
        .arg("--system-file")
        .arg(&system)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(4));
    let err = stderr(&out);
    assert!(err.contains("N° PEDIDO"), "{err}");
    assert!(err.contains("columns found: PEDIDO, DATA, VALOR"), "{err}");
}

#[test]
fn start_after_end_exits_2() {
    let ws = Workspace::new();
    let delivery = ws.write("ifood.csv", IFOOD_CSV);
    let out = ws
        .conciliador()
        .arg("run")
        .arg(&delivery)
        .args(["--store", "58", "--partner", "1032"])
        .args(["--start", "31/01/2024", "--end", "01/01/2024"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn no_system_source_is_usage_error() {
    let ws = Workspace::new();
    let delivery = ws.write("ifood.csv", IFOOD_CSV);
    let out = ws
        .conciliador()
        .arg("run")
        .arg(&delivery)
        .args(["--store", "58", "--partner", "1032"])
        .args(["--start", "01/01/2024", "--end", "31/01/2024"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("CONCILIADOR_DB"));
}

#[test]
fn xlsx_to_stdout_rejected() {
    let ws = Workspace::new();
    let out = ws.run_ifood(&["-o", "-"]);
    assert_eq!(out.status.code(), Some(2));
}

const SCHEMA: &str = "
CREATE TABLE Empresas (ID_Empresa INTEGER, TipoEmpresa TEXT, NomeFantasia TEXT);
CREATE TABLE Clientes (ID_Cliente INTEGER, RazaoCliente TEXT);
CREATE TABLE FormasPagamento (ID_Forma INTEGER, Descricao TEXT);
CREATE TABLE Usuarios (ID_Usuario INTEGER, Nome TEXT);
CREATE TABLE Fechamento_Caixas (ID_Empresa INTEGER, ID_Caixa INTEGER, ID_Origem_Caixa INTEGER, ID_Usuario INTEGER);
CREATE TABLE Vendas_Sorveteria (ID_Empresa INTEGER, ID_Venda INTEGER, Data_Faturamento TEXT);
CREATE TABLE ContasAReceber (
    ID_Venda INTEGER, ID_Forma INTEGER, ID_Caixa INTEGER, ID_Empresa INTEGER,
    ID_Origem_Caixa INTEGER, ID_Cliente INTEGER, Documento_Cartao TEXT,
    Valor REAL, DataCadastro TEXT, Emissao TEXT
);

INSERT INTO Empresas VALUES (58, 'Sorveteria', 'Araguaína II');
INSERT INTO Clientes VALUES (1032, 'IFood.COM AG REST ONLINE S.A.');
INSERT INTO FormasPagamento VALUES (17, 'IFOOD');
INSERT INTO Usuarios VALUES (7, 'MARIA');
INSERT INTO Fechamento_Caixas VALUES (58, 300, 1, 7);
INSERT INTO Vendas_Sorveteria VALUES (58, 5001, '2024-01-05 13:10:00'), (58, 5002, '2024-01-05 19:00:00');

INSERT INTO ContasAReceber VALUES
    (5001, 17, 300, 58, 1, 1032, 'NSU1', 50.0, '2024-01-05 13:00:00', '2024-01-05 13:10:00'),
    (5002, 17, 300, 58, 1, 1032, 'NSU2', 30.0, '2024-01-05 19:00:00', '2024-01-05 19:00:00');
";

fn create_db(path: &Path) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(SCHEMA).unwrap();
}

#[test]
fn run_against_database_fully_reconciled() {
    let ws = Workspace::new();
    let delivery = ws.write("ifood.csv", IFOOD_CSV);
    let db = ws.path("pdv.sqlite");
    create_db(&db);

    let out = ws
        .conciliador()
        .arg("run")
        .arg(&delivery)
        .args(["--store", "58", "--partner", "1032"])
        .args(["--start", "2024-01-01", "--end", "2024-01-31"])
        .env("CONCILIADOR_DB", &db)
        .args(["-o", "-", "-f", "json", "--with-extras", "--fail-on-unmatched"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));

    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(json["summary"]["matched"], 2);
    let headers: Vec<&str> = json["report"]["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["header"].as_str().unwrap())
        .collect();
    assert!(headers.contains(&"NSU"), "{headers:?}");
    assert!(headers.contains(&"Forma de Pagamento"), "{headers:?}");
}

#[test]
fn unreadable_database_exits_5() {
    let ws = Workspace::new();
    let delivery = ws.write("ifood.csv", IFOOD_CSV);
    let out = ws
        .conciliador()
        .arg("run")
        .arg(&delivery)
        .args(["--store", "58", "--partner", "1032"])
        .args(["--start", "2024-01-01", "--end", "2024-01-31"])
        .args(["--system-db", "nao-existe.sqlite"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(5));
}

#[test]
fn preview_prints_both_sides() {
    let ws = Workspace::new();
    let out = ws.run_ifood(&["-o", "out.csv", "--preview", "1"]);
    assert_eq!(out.status.code(), Some(0));
    let err = stderr(&out);
    assert!(err.contains("-- delivery: 2 record(s)"), "{err}");
    assert!(err.contains("-- system: 2 record(s)"), "{err}");
    assert!(err.contains("-- report: 3 row(s)"), "{err}");
}

#[test]
fn stores_lists_partners() {
    let ws = Workspace::new();
    let out = ws.conciliador().arg("stores").output().unwrap();
    assert_eq!(out.status.code(), Some(0));
    let text = stdout(&out);
    assert!(text.contains("Araguaína II"));
    assert!(text.contains("GOOMER"));
}

#[test]
fn partners_for_store() {
    let ws = Workspace::new();
    let out = ws.conciliador().args(["partners", "--store", "59"]).output().unwrap();
    assert_eq!(out.status.code(), Some(0));
    let text = stdout(&out);
    assert!(text.contains("EDVANIA SOBRINHO DA SILVA"));
    assert!(!text.contains("GOOMER"));
}

#[test]
fn adapters_show_sum_columns() {
    let ws = Workspace::new();
    let out = ws.conciliador().arg("adapters").output().unwrap();
    assert_eq!(out.status.code(), Some(0));
    assert!(stdout(&out).contains("Total (R$) + Desconto (R$)"));
}

#[test]
fn validate_reports_bad_adapter_file() {
    let ws = Workspace::new();
    let good = ws.write(
        "bom.toml",
        "name = \"novo\"\nrequired_columns = [\"ID\", \"DIA\", \"TOTAL\"]\norder_id_column = \"ID\"\ndate_column = \"DIA\"\namount = { columns = [\"TOTAL\"] }\n",
    );
    let bad = ws.write(
        "ruim.toml",
        "name = \"ruim\"\nrequired_columns = [\"ID\"]\norder_id_column = \"ID\"\ndate_column = \"DIA\"\namount = { columns = [\"TOTAL\"] }\n",
    );

    let out = ws.conciliador().arg("validate").arg(&good).output().unwrap();
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));

    let out = ws.conciliador().arg("validate").arg(&good).arg(&bad).output().unwrap();
    assert_eq!(out.status.code(), Some(3));
    let err = stderr(&out);
    assert!(err.contains("'DIA' is not listed in required_columns"), "{err}");
}

#[test]
fn init_then_custom_catalog_is_used() {
    let ws = Workspace::new();
    let path = ws.path("catalog.toml");

    let out = ws.conciliador().args(["init", "--path"]).arg(&path).output().unwrap();
    assert_eq!(out.status.code(), Some(0));

    // Second init without --force refuses
    let out = ws.conciliador().args(["init", "--path"]).arg(&path).output().unwrap();
    assert_eq!(out.status.code(), Some(2));

    let edited = fs::read_to_string(&path).unwrap().replace("Araguaína II", "Loja Centro");
    fs::write(&path, edited).unwrap();
    let out = ws.conciliador().arg("stores").arg("--catalog").arg(&path).output().unwrap();
    assert_eq!(out.status.code(), Some(0));
    assert!(stdout(&out).contains("Loja Centro"));
}

#[test]
fn broken_catalog_exits_3() {
    let ws = Workspace::new();
    let path = ws.write("catalog.toml", "[[stores]]\nid = 1\nname = \"X\"\npartners = [7]\n");
    let out = ws.conciliador().arg("stores").env("CONCILIADOR_CATALOG", &path).output().unwrap();
    assert_eq!(out.status.code(), Some(3));
    assert!(stderr(&out).contains("partner 7 is not defined"));
}
