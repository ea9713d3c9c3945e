// 📊 View Projector - Flattened dashboard records
//
// Turns the client -> contract -> {items, commitments, invoices} tree into
// three flat listings filtered by contract creation date. A commitment or
// invoice is listed iff its contract passes the filter; its own date is
// never consulted for filtering.
//
// Commitment records carry their contract's full commitment and invoice
// lists so a detail view can recompute item balances on its own.

use crate::balance::{self, ItemBalance};
use crate::financial::{self, ClientTotals, PortfolioTotals};
use crate::model::{Client, Commitment, Contract, ContractItem, Invoice};
use crate::period::{self, DateFilter};
use chrono::Datelike;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

// ============================================================================
// DASHBOARD RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardContract {
    #[serde(flatten)]
    pub contract: Contract,
    pub client_name: String,
    pub client_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCommitment {
    #[serde(flatten)]
    pub commitment: Commitment,
    pub client_name: String,
    pub bidding_id: String,
    pub client_id: String,
    pub contract_id: String,
    pub contract_items: Vec<ContractItem>,
    pub is_pending: bool,
    pub all_contract_commitments: Vec<Commitment>,
    pub all_contract_invoices: Vec<Invoice>,
}

impl DashboardCommitment {
    fn project(client: &Client, contract: &Contract, commitment: &Commitment) -> Self {
        DashboardCommitment {
            commitment: commitment.clone(),
            client_name: client.name.clone(),
            bidding_id: contract.bidding_id.clone(),
            client_id: client.id.clone(),
            contract_id: contract.id.clone(),
            contract_items: contract.items.clone(),
            is_pending: balance::is_commitment_pending(commitment, &contract.invoices),
            all_contract_commitments: contract.commitments.clone(),
            all_contract_invoices: contract.invoices.clone(),
        }
    }

    /// Balances of the items this commitment references, from the carried
    /// back-references only. Orphaned lines are skipped; an item referenced
    /// by several lines appears once.
    pub fn balances(&self) -> Vec<ItemBalance> {
        let mut seen = BTreeSet::new();

        self.commitment
            .items
            .iter()
            .filter(|ci| seen.insert(ci.contract_item_id.as_str()))
            .filter_map(|ci| self.contract_items.iter().find(|i| i.id == ci.contract_item_id))
            .map(|item| {
                ItemBalance::compute(item, &self.all_contract_commitments, &self.all_contract_invoices)
            })
            .collect()
    }

    pub fn value(&self) -> f64 {
        financial::commitment_value(&self.commitment, &self.contract_items)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardInvoice {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub client_name: String,
    pub bidding_id: String,
    pub contract_items: Vec<ContractItem>,
    pub client_id: String,
    pub contract_id: String,
}

impl DashboardInvoice {
    fn project(client: &Client, contract: &Contract, invoice: &Invoice) -> Self {
        DashboardInvoice {
            invoice: invoice.clone(),
            client_name: client.name.clone(),
            bidding_id: contract.bidding_id.clone(),
            contract_items: contract.items.clone(),
            client_id: client.id.clone(),
            contract_id: contract.id.clone(),
        }
    }

    pub fn value(&self) -> f64 {
        financial::invoice_value(&self.invoice, &self.contract_items)
    }
}

// ============================================================================
// DASHBOARD
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub contracts: Vec<DashboardContract>,
    pub commitments: Vec<DashboardCommitment>,
    pub invoices: Vec<DashboardInvoice>,
    /// Every contract year, newest first, regardless of the filter
    pub available_years: Vec<i32>,
}

/// Project the portfolio under a period filter. Recomputed from scratch on
/// every call; nothing is cached between calls.
pub fn project(clients: &[Client], filter: &DateFilter) -> Dashboard {
    let mut dashboard = Dashboard {
        available_years: available_years(clients),
        ..Dashboard::default()
    };

    for client in clients {
        for contract in client
            .contracts
            .iter()
            .filter(|c| filter.matches(&c.creation_date))
        {
            dashboard.contracts.push(DashboardContract {
                contract: contract.clone(),
                client_name: client.name.clone(),
                client_id: client.id.clone(),
            });

            dashboard.commitments.extend(
                contract
                    .commitments
                    .iter()
                    .map(|commitment| DashboardCommitment::project(client, contract, commitment)),
            );

            dashboard.invoices.extend(
                contract
                    .invoices
                    .iter()
                    .map(|invoice| DashboardInvoice::project(client, contract, invoice)),
            );
        }
    }

    tracing::debug!(
        contracts = dashboard.contracts.len(),
        commitments = dashboard.commitments.len(),
        invoices = dashboard.invoices.len(),
        "projected dashboard"
    );

    dashboard
}

/// Distinct creation years over all contracts, descending.
/// Contracts with an unparseable date contribute no year.
pub fn available_years(clients: &[Client]) -> Vec<i32> {
    let years: BTreeSet<i32> = clients
        .iter()
        .flat_map(|c| c.contracts.iter())
        .filter_map(|c| c.created_on())
        .map(|d| d.year())
        .collect();

    years.into_iter().rev().collect()
}

impl Dashboard {
    /// Portfolio totals over the projected (filtered) contracts
    pub fn totals(&self) -> PortfolioTotals {
        PortfolioTotals::aggregate(self.contracts.iter().map(|c| &c.contract))
    }

    /// Per-client totals over the projected contracts, in first-seen order
    pub fn client_totals(&self) -> Vec<ClientTotals> {
        let mut result: Vec<ClientTotals> = Vec::new();

        for row in &self.contracts {
            let position = match result.iter().position(|t| t.client_id == row.client_id) {
                Some(position) => position,
                None => {
                    result.push(ClientTotals::new(&row.client_id, &row.client_name));
                    result.len() - 1
                }
            };
            result[position].add_contract(&row.contract);
        }

        result
    }

    pub fn pending_commitments(&self) -> impl Iterator<Item = &DashboardCommitment> {
        self.commitments.iter().filter(|c| c.is_pending)
    }

    pub fn unpaid_invoices(&self) -> impl Iterator<Item = &DashboardInvoice> {
        self.invoices.iter().filter(|i| !i.invoice.is_paid)
    }

    /// Order each listing by its own date, newest first. Unparseable dates
    /// go last; ties keep portfolio order.
    pub fn sort_newest_first(&mut self) {
        self.contracts
            .sort_by(|a, b| newest_first(&a.contract.creation_date, &b.contract.creation_date));
        self.commitments
            .sort_by(|a, b| newest_first(&a.commitment.date, &b.commitment.date));
        self.invoices
            .sort_by(|a, b| newest_first(&a.invoice.date, &b.invoice.date));
    }
}

fn newest_first(a: &str, b: &str) -> Ordering {
    match (period::parse_date(a), period::parse_date(b)) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
