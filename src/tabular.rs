// 🧾 Tabular Projection - Header + row cells for export
//
// Export collaborators (CSV, PDF) receive plain tables, not the nested
// model. Numbers are carried unformatted at full precision; currency and
// thousands separators are the renderer's business.

use crate::balance::ItemBalance;
use crate::financial::{ClientTotals, ContractTotals, ItemFinancials};
use crate::model::Contract;
use crate::projection::{DashboardCommitment, DashboardContract, DashboardInvoice};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

// ============================================================================
// CELL / TABLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
    Integer(i64),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Plain string form used for CSV fields
    pub fn to_field(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Integer(i) => i.to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Integer(i) => Some(*i as f64),
            Cell::Text(_) => None,
        }
    }
}

impl From<u64> for Cell {
    fn from(value: u64) -> Self {
        Cell::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Integer(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Table {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.headers.len(), "row width must match headers");
        self.rows.push(row);
    }

    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Write headers then rows as delimited text
    pub fn write_csv<W: Write>(&self, writer: W, delimiter: u8) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(writer);

        wtr.write_record(&self.headers)
            .context("Failed to write CSV header")?;

        for row in &self.rows {
            wtr.write_record(row.iter().map(Cell::to_field))
                .context("Failed to write CSV row")?;
        }

        wtr.flush().context("Failed to flush CSV writer")?;
        Ok(())
    }
}

// ============================================================================
// TABLE BUILDERS
// ============================================================================

/// One row per contract item with quantity balances and values
pub fn items_table(contract: &Contract) -> Table {
    let mut table = Table::new(&[
        "Item",
        "Description",
        "Unit Value",
        "Qty Bid",
        "Qty Committed",
        "Balance to Commit",
        "Qty Supplied",
        "Balance to Supply",
        "Bid Value",
        "Committed Value",
        "Supplied Value",
    ]);

    for item in &contract.items {
        let balance = ItemBalance::compute(item, &contract.commitments, &contract.invoices);
        let fin = ItemFinancials::from_balance(item, &balance);

        table.push(vec![
            Cell::Integer(i64::from(item.item)),
            Cell::text(item.description.as_str()),
            Cell::Number(item.unit_value),
            balance.quantity_bid.into(),
            balance.quantity_committed.into(),
            balance.balance_to_commit.into(),
            balance.quantity_supplied.into(),
            balance.balance_to_supply.into(),
            fin.bid_value.into(),
            fin.committed_value.into(),
            fin.supplied_value.into(),
        ]);
    }

    table
}

pub fn contracts_table(contracts: &[DashboardContract]) -> Table {
    let mut table = Table::new(&[
        "Client",
        "Bidding",
        "Type",
        "Created",
        "Contract Value",
        "Committed Value",
        "Supplied Value",
        "Paid Value",
        "To Supply",
        "To Receive",
    ]);

    for row in contracts {
        let totals = ContractTotals::compute(&row.contract);
        table.push(vec![
            Cell::text(row.client_name.as_str()),
            Cell::text(row.contract.bidding_id.as_str()),
            Cell::text(row.contract.bidding_type.as_str()),
            Cell::text(row.contract.creation_date.as_str()),
            totals.total_contract_value.into(),
            totals.total_committed_value.into(),
            totals.total_supplied_value.into(),
            totals.total_paid_value.into(),
            totals.total_to_supply_value.into(),
            totals.total_to_receive_value.into(),
        ]);
    }

    table
}

pub fn commitments_table(commitments: &[DashboardCommitment]) -> Table {
    let mut table = Table::new(&[
        "Commitment",
        "Date",
        "Client",
        "Bidding",
        "Quantity",
        "Value",
        "Status",
    ]);

    for row in commitments {
        table.push(vec![
            Cell::text(row.commitment.commitment_number.as_str()),
            Cell::text(row.commitment.date.as_str()),
            Cell::text(row.client_name.as_str()),
            Cell::text(row.bidding_id.as_str()),
            row.commitment.total_quantity().into(),
            row.value().into(),
            Cell::text(if row.is_pending { "Pending" } else { "Fulfilled" }),
        ]);
    }

    table
}

pub fn invoices_table(invoices: &[DashboardInvoice]) -> Table {
    let mut table = Table::new(&["Invoice", "Date", "Client", "Bidding", "Value", "Paid"]);

    for row in invoices {
        table.push(vec![
            Cell::text(row.invoice.invoice_number.as_str()),
            Cell::text(row.invoice.date.as_str()),
            Cell::text(row.client_name.as_str()),
            Cell::text(row.bidding_id.as_str()),
            row.value().into(),
            Cell::text(if row.invoice.is_paid { "Yes" } else { "No" }),
        ]);
    }

    table
}

/// Lines of one commitment with the item's remaining balance to supply.
/// Orphaned lines keep their quantity but show no item and no value.
pub fn commitment_lines_table(record: &DashboardCommitment) -> Table {
    let mut table = Table::new(&[
        "Item",
        "Description",
        "Quantity",
        "Unit Value",
        "Line Value",
        "Balance to Supply",
    ]);

    for line in &record.commitment.items {
        let item = record
            .contract_items
            .iter()
            .find(|i| i.id == line.contract_item_id);

        match item {
            Some(item) => {
                let balance = ItemBalance::compute(
                    item,
                    &record.all_contract_commitments,
                    &record.all_contract_invoices,
                );
                table.push(vec![
                    Cell::Integer(i64::from(item.item)),
                    Cell::text(item.description.as_str()),
                    line.quantity.into(),
                    item.unit_value.into(),
                    (item.unit_value * line.quantity as f64).into(),
                    balance.balance_to_supply.into(),
                ]);
            }
            None => table.push(vec![
                Cell::text(""),
                Cell::text(""),
                line.quantity.into(),
                Cell::Number(0.0),
                Cell::Number(0.0),
                Cell::Integer(0),
            ]),
        }
    }

    table
}

pub fn invoice_lines_table(record: &DashboardInvoice) -> Table {
    let mut table = Table::new(&["Item", "Description", "Quantity Supplied", "Unit Value", "Line Value"]);

    for line in &record.invoice.items {
        let item = record
            .contract_items
            .iter()
            .find(|i| i.id == line.contract_item_id);

        let (number, description, unit_value) = match item {
            Some(item) => (
                Cell::Integer(i64::from(item.item)),
                Cell::text(item.description.as_str()),
                item.unit_value,
            ),
            None => (Cell::text(""), Cell::text(""), 0.0),
        };

        table.push(vec![
            number,
            description,
            line.quantity_supplied.into(),
            unit_value.into(),
            (unit_value * line.quantity_supplied as f64).into(),
        ]);
    }

    table
}

pub fn clients_table(clients: &[ClientTotals]) -> Table {
    let mut table = Table::new(&[
        "Client",
        "Contracts",
        "Contract Value",
        "Committed Value",
        "Supplied Value",
        "Paid Value",
        "To Supply",
        "To Receive",
    ]);

    for row in clients {
        table.push(vec![
            Cell::text(row.client_name.as_str()),
            (row.contract_count as u64).into(),
            row.totals.total_contract_value.into(),
            row.totals.total_committed_value.into(),
            row.totals.total_supplied_value.into(),
            row.totals.total_paid_value.into(),
            row.totals.total_to_supply_value.into(),
            row.totals.total_to_receive_value.into(),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BiddingType, Client, Commitment, CommitmentItem, ContractItem, Invoice, InvoiceItem};
    use crate::period::DateFilter;
    use crate::projection;

    fn scenario_client() -> Client {
        let mut contract = Contract::new("c-1", "PE 1/2024", BiddingType::Pregao, "2024-05-01");
        contract.items.push(ContractItem::new("i-1", 1, "Papel A4", 10.0, 100));
        contract.items.push(ContractItem::new("i-2", 2, "Caneta; azul", 1.25, 8));
        contract.commitments.push(Commitment::new(
            "e-1",
            "2024NE0001",
            "2024-05-02",
            vec![CommitmentItem::new("i-1", 40), CommitmentItem::new("gone", 3)],
        ));
        contract.invoices.push(Invoice::new(
            "n-1",
            "101",
            "2024-05-03",
            vec![InvoiceItem::new("i-1", 15)],
        ));

        let mut client = Client::new("cl-1", "Prefeitura", "925001");
        client.contracts.push(contract);
        client
    }

    #[test]
    fn test_items_table_rows() {
        let client = scenario_client();
        let table = items_table(&client.contracts[0]);

        assert_eq!(table.headers.len(), 11);
        assert_eq!(table.rows.len(), 2);

        let to_commit = table.column("Balance to Commit").unwrap();
        let to_supply = table.column("Balance to Supply").unwrap();
        let committed_value = table.column("Committed Value").unwrap();

        assert_eq!(table.rows[0][to_commit], Cell::Integer(60));
        assert_eq!(table.rows[0][to_supply], Cell::Integer(25));
        assert_eq!(table.rows[0][committed_value], Cell::Number(400.0));
        assert_eq!(table.rows[1][to_commit], Cell::Integer(8));
    }

    #[test]
    fn test_commitment_lines_keep_orphans_at_zero_value() {
        let clients = vec![scenario_client()];
        let dashboard = projection::project(&clients, &DateFilter::all());
        let table = commitment_lines_table(&dashboard.commitments[0]);

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][4], Cell::Number(400.0));
        assert_eq!(table.rows[1][0], Cell::Text(String::new()));
        assert_eq!(table.rows[1][2], Cell::Integer(3));
        assert_eq!(table.rows[1][4], Cell::Number(0.0));

        let listing = commitments_table(&dashboard.commitments);
        assert_eq!(listing.rows[0][5], Cell::Number(400.0));
        assert_eq!(listing.rows[0][6], Cell::text("Pending"));

        let invoices = invoices_table(&dashboard.invoices);
        assert_eq!(invoices.rows[0][4], Cell::Number(150.0));
        assert_eq!(invoices.rows[0][5], Cell::text("No"));

        let lines = invoice_lines_table(&dashboard.invoices[0]);
        assert_eq!(lines.rows[0][4], Cell::Number(150.0));
    }

    #[test]
    fn test_contract_and_client_tables() {
        let clients = vec![scenario_client()];
        let dashboard = projection::project(&clients, &DateFilter::all());

        let contracts = contracts_table(&dashboard.contracts);
        assert_eq!(contracts.rows[0][2], Cell::text("pregão"));
        assert_eq!(contracts.rows[0][4], Cell::Number(1010.0));
        assert_eq!(contracts.rows[0][9], Cell::Number(150.0));

        let per_client = clients_table(&dashboard.client_totals());
        assert_eq!(per_client.rows[0][1], Cell::Integer(1));
        assert_eq!(per_client.rows[0][3], Cell::Number(400.0));
    }

    #[test]
    fn test_write_csv_quotes_and_keeps_precision() {
        let mut table = Table::new(&["Description", "Unit Value"]);
        table.push(vec![Cell::text("Caneta; azul"), Cell::Number(0.1 + 0.2)]);

        let mut out = Vec::new();
        table.write_csv(&mut out, b';').unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            format!("Description;Unit Value\n\"Caneta; azul\";{}\n", 0.1 + 0.2)
        );
    }

    #[test]
    fn test_cells_serialize_untagged() {
        let row = vec![Cell::text("a"), Cell::Integer(3), Cell::Number(1.5)];
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"["a",3,1.5]"#);
        assert_eq!(row[1].as_number(), Some(3.0));
        assert_eq!(row[0].as_number(), None);
    }
}
