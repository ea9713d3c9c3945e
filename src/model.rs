// 📄 Portfolio Model - Clients, contracts, items, commitments, invoices
//
// A portfolio is an ordered list of clients. Each contract owns three
// sibling collections (items, commitments, invoices). Commitment and invoice
// lines point back at items by id only, so a line can outlive its item.
//
// Field names serialize in camelCase so a persisted snapshot is the same
// JSON array of clients the dashboard has always stored.

use crate::period;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Unsigned count of units (bid, committed or supplied).
pub type Quantity = u64;

/// Largest quantity a line or a sum of lines can carry. Keeps every
/// difference of two quantities exact as an `i64` balance.
pub const MAX_QUANTITY: Quantity = i64::MAX as Quantity;

/// Sum quantities, saturating at `MAX_QUANTITY` instead of overflowing
pub fn sum_quantities<I>(quantities: I) -> Quantity
where
    I: IntoIterator<Item = Quantity>,
{
    quantities
        .into_iter()
        .fold(0, |total: Quantity, q| total.saturating_add(q).min(MAX_QUANTITY))
}

// ============================================================================
// BIDDING TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiddingType {
    /// Competitive electronic auction
    #[serde(rename = "pregão")]
    Pregao,

    /// Direct purchase without bidding
    #[serde(rename = "dispensa")]
    Dispensa,
}

impl BiddingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BiddingType::Pregao => "pregão",
            BiddingType::Dispensa => "dispensa",
        }
    }
}

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    pub name: String,

    /// Purchasing-unit registration code (passthrough)
    #[serde(default)]
    pub uasg: String,

    /// 14-digit tax id, formatted or not
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cep: Option<String>,

    #[serde(default)]
    pub contracts: Vec<Contract>,
}

impl Client {
    pub fn new(id: &str, name: &str, uasg: &str) -> Self {
        Client {
            id: id.to_string(),
            name: name.to_string(),
            uasg: uasg.to_string(),
            cnpj: None,
            address: None,
            cep: None,
            contracts: Vec::new(),
        }
    }

    pub fn find_contract(&self, contract_id: &str) -> Option<&Contract> {
        self.contracts.iter().find(|c| c.id == contract_id)
    }
}

// ============================================================================
// CONTRACT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    /// Free-text procurement reference (e.g. "PE 12/2024")
    pub bidding_id: String,

    pub bidding_type: BiddingType,

    /// `YYYY-MM-DD`, no time component
    pub creation_date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uasg: Option<String>,

    #[serde(default)]
    pub items: Vec<ContractItem>,

    #[serde(default)]
    pub commitments: Vec<Commitment>,

    #[serde(default)]
    pub invoices: Vec<Invoice>,
}

impl Contract {
    pub fn new(id: &str, bidding_id: &str, bidding_type: BiddingType, creation_date: &str) -> Self {
        Contract {
            id: id.to_string(),
            bidding_id: bidding_id.to_string(),
            bidding_type,
            creation_date: creation_date.to_string(),
            cnpj: None,
            uasg: None,
            items: Vec::new(),
            commitments: Vec::new(),
            invoices: Vec::new(),
        }
    }

    /// First item carrying this id. Orphaned lines resolve to None.
    pub fn find_item(&self, item_id: &str) -> Option<&ContractItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn find_commitment(&self, commitment_id: &str) -> Option<&Commitment> {
        self.commitments.iter().find(|c| c.id == commitment_id)
    }

    pub fn find_invoice(&self, invoice_id: &str) -> Option<&Invoice> {
        self.invoices.iter().find(|i| i.id == invoice_id)
    }

    /// Creation date as a local calendar date
    pub fn created_on(&self) -> Option<NaiveDate> {
        period::parse_date(&self.creation_date)
    }
}

// ============================================================================
// CONTRACT ITEM
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractItem {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    /// Display sequence number; neither unique nor contiguous
    pub item: u32,

    pub description: String,

    pub unit_value: f64,

    /// Awarded quantity ceiling
    #[serde(deserialize_with = "deserialize_quantity")]
    pub quantity_bid: Quantity,
}

impl ContractItem {
    pub fn new(id: &str, item: u32, description: &str, unit_value: f64, quantity_bid: Quantity) -> Self {
        ContractItem {
            id: id.to_string(),
            item,
            description: description.to_string(),
            unit_value,
            quantity_bid,
        }
    }

    pub fn bid_value(&self) -> f64 {
        self.unit_value * self.quantity_bid as f64
    }
}

// ============================================================================
// COMMITMENT (empenho)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commitment {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    pub commitment_number: String,

    pub date: String,

    #[serde(default)]
    pub items: Vec<CommitmentItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentItem {
    #[serde(deserialize_with = "deserialize_id")]
    pub contract_item_id: String,

    #[serde(deserialize_with = "deserialize_quantity")]
    pub quantity: Quantity,
}

impl Commitment {
    pub fn new(id: &str, commitment_number: &str, date: &str, items: Vec<CommitmentItem>) -> Self {
        Commitment {
            id: id.to_string(),
            commitment_number: commitment_number.to_string(),
            date: date.to_string(),
            items,
        }
    }

    /// Units reserved by this commitment across all of its lines
    pub fn total_quantity(&self) -> Quantity {
        sum_quantities(self.items.iter().map(|ci| ci.quantity))
    }
}

impl CommitmentItem {
    pub fn new(contract_item_id: &str, quantity: Quantity) -> Self {
        CommitmentItem {
            contract_item_id: contract_item_id.to_string(),
            quantity,
        }
    }
}

// ============================================================================
// INVOICE (nota fiscal)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    pub invoice_number: String,

    pub date: String,

    /// Toggled in place by mark paid / unpaid
    #[serde(default)]
    pub is_paid: bool,

    #[serde(default)]
    pub items: Vec<InvoiceItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    #[serde(deserialize_with = "deserialize_id")]
    pub contract_item_id: String,

    #[serde(deserialize_with = "deserialize_quantity")]
    pub quantity_supplied: Quantity,
}

impl Invoice {
    pub fn new(id: &str, invoice_number: &str, date: &str, items: Vec<InvoiceItem>) -> Self {
        Invoice {
            id: id.to_string(),
            invoice_number: invoice_number.to_string(),
            date: date.to_string(),
            is_paid: false,
            items,
        }
    }
}

impl InvoiceItem {
    pub fn new(contract_item_id: &str, quantity_supplied: Quantity) -> Self {
        InvoiceItem {
            contract_item_id: contract_item_id.to_string(),
            quantity_supplied,
        }
    }
}

// ============================================================================
// PORTFOLIO (hierarchy root)
// ============================================================================

/// Snapshot of everything the vendor tracks. Serializes as a bare array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Portfolio {
    pub clients: Vec<Client>,
}

impl Portfolio {
    pub fn new(clients: Vec<Client>) -> Self {
        Portfolio { clients }
    }

    pub fn find_client(&self, client_id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == client_id)
    }

    /// Contract plus its owning client, searched across every client
    pub fn find_contract(&self, contract_id: &str) -> Option<(&Client, &Contract)> {
        self.contracts().find(|(_, contract)| contract.id == contract_id)
    }

    /// Every contract in portfolio order, paired with its client
    pub fn contracts(&self) -> impl Iterator<Item = (&Client, &Contract)> {
        self.clients
            .iter()
            .flat_map(|client| client.contracts.iter().map(move |contract| (client, contract)))
    }

    pub fn contract_count(&self) -> usize {
        self.clients.iter().map(|c| c.contracts.len()).sum()
    }
}

// Ids arrive as strings or as bare timestamp numbers depending on who wrote
// the snapshot. Both are kept as opaque strings.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

fn deserialize_quantity<'de, D>(deserializer: D) -> Result<Quantity, D::Error>
where
    D: Deserializer<'de>,
{
    let quantity = Quantity::deserialize(deserializer)?;
    if quantity > MAX_QUANTITY {
        return Err(serde::de::Error::custom(format!(
            "quantity {} exceeds the maximum of {}",
            quantity, MAX_QUANTITY
        )));
    }
    Ok(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_snapshot_with_numeric_ids() {
        let json = r#"[
            {
                "id": 1714500000000,
                "name": "Prefeitura de Teste",
                "uasg": "925001",
                "cnpj": "12345678000199",
                "contracts": [
                    {
                        "id": "c-1",
                        "biddingId": "PE 12/2024",
                        "biddingType": "pregão",
                        "creationDate": "2024-05-01",
                        "items": [
                            { "id": 17, "item": 1, "description": "Papel A4", "unitValue": 10.5, "quantityBid": 100 }
                        ],
                        "commitments": [
                            { "id": "e-1", "commitmentNumber": "2024NE0001", "date": "2024-05-10",
                              "items": [ { "contractItemId": 17, "quantity": 40 } ] }
                        ],
                        "invoices": [
                            { "id": "n-1", "invoiceNumber": "123", "date": "2024-05-20",
                              "items": [ { "contractItemId": "17", "quantitySupplied": 15 } ] }
                        ]
                    }
                ]
            }
        ]"#;

        let portfolio: Portfolio = serde_json::from_str(json).unwrap();

        assert_eq!(portfolio.clients.len(), 1);
        let client = &portfolio.clients[0];
        assert_eq!(client.id, "1714500000000");
        assert_eq!(client.address, None);

        let contract = &client.contracts[0];
        assert_eq!(contract.bidding_type, BiddingType::Pregao);
        assert_eq!(contract.items[0].id, "17");
        assert_eq!(contract.commitments[0].items[0].contract_item_id, "17");
        assert_eq!(contract.invoices[0].items[0].contract_item_id, "17");
        assert!(!contract.invoices[0].is_paid);
        assert_eq!(
            contract.created_on(),
            NaiveDate::from_ymd_opt(2024, 5, 1)
        );
    }

    #[test]
    fn test_serialize_uses_camel_case_and_bidding_labels() {
        let mut contract = Contract::new("c-1", "DL 3/2024", BiddingType::Dispensa, "2024-01-02");
        contract.invoices.push(Invoice::new("n-1", "9", "2024-01-05", vec![InvoiceItem::new("i-1", 2)]));

        let value = serde_json::to_value(&contract).unwrap();

        assert_eq!(value["biddingType"], "dispensa");
        assert_eq!(value["creationDate"], "2024-01-02");
        assert_eq!(value["invoices"][0]["isPaid"], false);
        assert_eq!(value["invoices"][0]["items"][0]["quantitySupplied"], 2);
        assert!(value.get("cnpj").is_none());
    }

    #[test]
    fn test_portfolio_contract_lookup() {
        let mut a = Client::new("a", "Client A", "1");
        a.contracts.push(Contract::new("c-1", "PE 1", BiddingType::Pregao, "2024-01-01"));
        let mut b = Client::new("b", "Client B", "2");
        b.contracts.push(Contract::new("c-2", "PE 2", BiddingType::Pregao, "2023-01-01"));
        let portfolio = Portfolio::new(vec![a, b]);

        let (client, contract) = portfolio.find_contract("c-2").unwrap();
        assert_eq!(client.name, "Client B");
        assert_eq!(contract.bidding_id, "PE 2");
        assert_eq!(portfolio.contract_count(), 2);
        assert!(portfolio.find_contract("missing").is_none());
    }

    #[test]
    fn test_commitment_total_quantity() {
        let commitment = Commitment::new(
            "e-1",
            "2024NE1",
            "2024-02-01",
            vec![CommitmentItem::new("i-1", 5), CommitmentItem::new("i-2", 7)],
        );
        assert_eq!(commitment.total_quantity(), 12);
    }

    #[test]
    fn test_sum_quantities_saturates() {
        let half = u64::MAX / 2 + 1;
        assert_eq!(sum_quantities([half, half]), MAX_QUANTITY);
        assert_eq!(sum_quantities([MAX_QUANTITY - 1, 1]), MAX_QUANTITY);
        assert_eq!(sum_quantities(Vec::new()), 0);

        let commitment = Commitment::new(
            "e-1",
            "2024NE1",
            "2024-02-01",
            vec![CommitmentItem::new("i-1", half), CommitmentItem::new("i-1", half)],
        );
        assert_eq!(commitment.total_quantity(), MAX_QUANTITY);
    }

    #[test]
    fn test_oversized_quantity_is_rejected_on_load() {
        let json = format!(
            r#"{{ "id": "i-1", "item": 1, "description": "x", "unitValue": 1.0, "quantityBid": {} }}"#,
            u64::MAX
        );
        let err = serde_json::from_str::<ContractItem>(&json).unwrap_err();
        assert!(err.to_string().contains("exceeds the maximum"));

        let line = format!(r#"{{ "contractItemId": "i-1", "quantity": {} }}"#, MAX_QUANTITY);
        let parsed: CommitmentItem = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.quantity, MAX_QUANTITY);
    }
}
