// 💰 Financial Aggregator - Monetary figures from quantity balances
//
// Every amount is unit_value × quantity, summed with full f64 precision.
// Nothing is rounded here; formatting to two decimals happens at display.
//
// Scopes:
//   item      -> ItemFinancials
//   contract  -> ContractTotals
//   client    -> ClientTotals    (contracts passing the period filter)
//   portfolio -> PortfolioTotals (any filtered set of contracts)

use crate::balance::{self, ItemBalance};
use crate::model::{Client, Commitment, Contract, ContractItem, Invoice};
use crate::period::DateFilter;
use serde::Serialize;
use std::collections::HashMap;

// ============================================================================
// UNIT PRICES
// ============================================================================

/// Unit value per item id. The first item wins on duplicated ids, matching
/// `Contract::find_item`.
pub fn unit_prices(items: &[ContractItem]) -> HashMap<&str, f64> {
    let mut prices = HashMap::with_capacity(items.len());
    for item in items {
        prices.entry(item.id.as_str()).or_insert(item.unit_value);
    }
    prices
}

/// Value of one line; zero when the item was deleted
pub fn line_value(prices: &HashMap<&str, f64>, contract_item_id: &str, quantity: u64) -> f64 {
    prices
        .get(contract_item_id)
        .map_or(0.0, |unit_value| unit_value * quantity as f64)
}

pub fn commitment_value(commitment: &Commitment, items: &[ContractItem]) -> f64 {
    let prices = unit_prices(items);
    commitment_value_with(commitment, &prices)
}

pub fn invoice_value(invoice: &Invoice, items: &[ContractItem]) -> f64 {
    let prices = unit_prices(items);
    invoice_value_with(invoice, &prices)
}

fn commitment_value_with(commitment: &Commitment, prices: &HashMap<&str, f64>) -> f64 {
    commitment
        .items
        .iter()
        .map(|ci| line_value(prices, &ci.contract_item_id, ci.quantity))
        .sum()
}

fn invoice_value_with(invoice: &Invoice, prices: &HashMap<&str, f64>) -> f64 {
    invoice
        .items
        .iter()
        .map(|ii| line_value(prices, &ii.contract_item_id, ii.quantity_supplied))
        .sum()
}

// ============================================================================
// ITEM SCOPE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFinancials {
    pub item_id: String,
    pub bid_value: f64,
    pub committed_value: f64,
    pub supplied_value: f64,
    pub to_commit_value: f64,
    pub to_supply_value: f64,
}

impl ItemFinancials {
    pub fn from_balance(item: &ContractItem, balance: &ItemBalance) -> Self {
        let unit = item.unit_value;

        ItemFinancials {
            item_id: item.id.clone(),
            bid_value: unit * balance.quantity_bid as f64,
            committed_value: unit * balance.quantity_committed as f64,
            supplied_value: unit * balance.quantity_supplied as f64,
            to_commit_value: unit * balance.balance_to_commit as f64,
            to_supply_value: unit * balance.balance_to_supply as f64,
        }
    }

    pub fn compute(item: &ContractItem, commitments: &[Commitment], invoices: &[Invoice]) -> Self {
        let balance = ItemBalance::compute(item, commitments, invoices);
        Self::from_balance(item, &balance)
    }
}

// ============================================================================
// CONTRACT SCOPE
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractTotals {
    pub total_contract_value: f64,
    pub total_committed_value: f64,
    pub total_supplied_value: f64,
    pub total_paid_value: f64,
    pub total_to_supply_value: f64,
    pub total_to_receive_value: f64,
}

impl ContractTotals {
    pub fn compute(contract: &Contract) -> Self {
        let prices = unit_prices(&contract.items);

        let total_contract_value: f64 = contract.items.iter().map(|i| i.bid_value()).sum();

        let total_committed_value: f64 = contract
            .commitments
            .iter()
            .map(|c| commitment_value_with(c, &prices))
            .sum();

        let mut total_supplied_value = 0.0;
        let mut total_paid_value = 0.0;
        for invoice in &contract.invoices {
            let value = invoice_value_with(invoice, &prices);
            total_supplied_value += value;
            if invoice.is_paid {
                total_paid_value += value;
            }
        }

        ContractTotals {
            total_contract_value,
            total_committed_value,
            total_supplied_value,
            total_paid_value,
            total_to_supply_value: total_committed_value - total_supplied_value,
            total_to_receive_value: total_supplied_value - total_paid_value,
        }
    }

    /// Delivered but not yet paid
    pub fn unpaid_value(&self) -> f64 {
        self.total_to_receive_value
    }

    fn accumulate(&mut self, other: &ContractTotals) {
        self.total_contract_value += other.total_contract_value;
        self.total_committed_value += other.total_committed_value;
        self.total_supplied_value += other.total_supplied_value;
        self.total_paid_value += other.total_paid_value;
        self.total_to_supply_value += other.total_to_supply_value;
        self.total_to_receive_value += other.total_to_receive_value;
    }
}

// ============================================================================
// CLIENT SCOPE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientTotals {
    pub client_id: String,
    pub client_name: String,
    pub contract_count: usize,
    #[serde(flatten)]
    pub totals: ContractTotals,
}

impl ClientTotals {
    pub fn new(client_id: &str, client_name: &str) -> Self {
        ClientTotals {
            client_id: client_id.to_string(),
            client_name: client_name.to_string(),
            contract_count: 0,
            totals: ContractTotals::default(),
        }
    }

    pub fn add_contract(&mut self, contract: &Contract) {
        self.contract_count += 1;
        self.totals.accumulate(&ContractTotals::compute(contract));
    }

    /// Sum over the client's contracts created within the filter period
    pub fn compute(client: &Client, filter: &DateFilter) -> Self {
        let mut totals = ClientTotals::new(&client.id, &client.name);
        for contract in client
            .contracts
            .iter()
            .filter(|c| filter.matches(&c.creation_date))
        {
            totals.add_contract(contract);
        }
        totals
    }
}

// ============================================================================
// PORTFOLIO SCOPE
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioTotals {
    pub total_bid_value: f64,
    pub total_committed_value: f64,
    pub total_supplied_value: f64,
    pub total_paid_value: f64,
    /// Accumulated per contract, then summed
    pub total_to_receive_value: f64,
    /// Computed once from the aggregate sums
    pub balance_to_supply_value: f64,

    pub contract_count: usize,
    pub commitment_count: usize,
    pub invoice_count: usize,
    pub pending_commitments: usize,
    pub unpaid_invoices: usize,
}

impl PortfolioTotals {
    pub fn aggregate<'a, I>(contracts: I) -> Self
    where
        I: IntoIterator<Item = &'a Contract>,
    {
        let mut totals = PortfolioTotals::default();

        for contract in contracts {
            let contract_totals = ContractTotals::compute(contract);

            totals.total_bid_value += contract_totals.total_contract_value;
            totals.total_committed_value += contract_totals.total_committed_value;
            totals.total_supplied_value += contract_totals.total_supplied_value;
            totals.total_paid_value += contract_totals.total_paid_value;
            totals.total_to_receive_value += contract_totals.total_to_receive_value;

            totals.contract_count += 1;
            totals.commitment_count += contract.commitments.len();
            totals.invoice_count += contract.invoices.len();
            totals.pending_commitments += contract
                .commitments
                .iter()
                .filter(|c| balance::is_commitment_pending(c, &contract.invoices))
                .count();
            totals.unpaid_invoices += contract.invoices.iter().filter(|i| !i.is_paid).count();
        }

        totals.balance_to_supply_value = totals.total_committed_value - totals.total_supplied_value;
        totals
    }

    /// Totals over every client's contracts within the filter period
    pub fn for_clients(clients: &[Client], filter: &DateFilter) -> Self {
        Self::aggregate(
            clients
                .iter()
                .flat_map(|c| c.contracts.iter())
                .filter(|c| filter.matches(&c.creation_date)),
        )
    }
}
