// ⚖️ Balance Calculator - Quantity balances per contract item
//
// Two independent consumption pools per item:
//   quantity_bid        - quantity_committed = balance_to_commit
//   quantity_committed  - quantity_supplied  = balance_to_supply
//
// Invoices consume against the item, never against a specific commitment.
// Balances are signed: over-commitment or over-supply from imported data
// shows up as a negative number and is never clamped here.
//
// Sums saturate at MAX_QUANTITY, so a difference of two figures always fits
// an i64 exactly and nothing panics on oversized imported lines.

use crate::model::{sum_quantities, Commitment, Contract, ContractItem, Invoice, Quantity, MAX_QUANTITY};
use serde::Serialize;

/// Units reserved for `item_id` across every commitment of the contract
pub fn quantity_committed(item_id: &str, commitments: &[Commitment]) -> Quantity {
    sum_quantities(
        commitments
            .iter()
            .flat_map(|c| c.items.iter())
            .filter(|ci| ci.contract_item_id == item_id)
            .map(|ci| ci.quantity),
    )
}

/// Units delivered for `item_id` across every invoice of the contract
pub fn quantity_supplied(item_id: &str, invoices: &[Invoice]) -> Quantity {
    sum_quantities(
        invoices
            .iter()
            .flat_map(|inv| inv.items.iter())
            .filter(|ii| ii.contract_item_id == item_id)
            .map(|ii| ii.quantity_supplied),
    )
}

pub fn balance_to_commit(item: &ContractItem, commitments: &[Commitment]) -> i64 {
    signed(item.quantity_bid) - signed(quantity_committed(&item.id, commitments))
}

pub fn balance_to_supply(item_id: &str, commitments: &[Commitment], invoices: &[Invoice]) -> i64 {
    signed(quantity_committed(item_id, commitments)) - signed(quantity_supplied(item_id, invoices))
}

/// Whether a commitment still has undelivered units.
///
/// Compares the commitment's own committed total against the contract-wide
/// supplied quantity of the items its lines reference, summed line by line.
/// This is an approximation: commitments are not ordered against invoices,
/// so two commitments on the same item both read as fulfilled once the
/// contract-wide deliveries cover either one of them.
pub fn is_commitment_pending(commitment: &Commitment, invoices: &[Invoice]) -> bool {
    let committed: Quantity = commitment.total_quantity();
    let supplied: Quantity = sum_quantities(
        commitment
            .items
            .iter()
            .map(|ci| quantity_supplied(&ci.contract_item_id, invoices)),
    );

    committed > supplied
}

/// Most a new commitment line may reserve on this item (UI clamp ceiling)
pub fn max_committable(item: &ContractItem, commitments: &[Commitment]) -> Quantity {
    balance_to_commit(item, commitments).max(0) as Quantity
}

/// Most a new invoice line may deliver on this item (UI clamp ceiling)
pub fn max_suppliable(item_id: &str, commitments: &[Commitment], invoices: &[Invoice]) -> Quantity {
    balance_to_supply(item_id, commitments, invoices).max(0) as Quantity
}

/// Exact for every quantity up to MAX_QUANTITY; larger values (only
/// reachable by building an item in code) read as MAX_QUANTITY.
fn signed(quantity: Quantity) -> i64 {
    quantity.min(MAX_QUANTITY) as i64
}

// ============================================================================
// ITEM BALANCE
// ============================================================================

/// The four quantity figures for one contract item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBalance {
    pub item_id: String,
    pub quantity_bid: Quantity,
    pub quantity_committed: Quantity,
    pub quantity_supplied: Quantity,
    pub balance_to_commit: i64,
    pub balance_to_supply: i64,
}

impl ItemBalance {
    pub fn compute(item: &ContractItem, commitments: &[Commitment], invoices: &[Invoice]) -> Self {
        let committed = quantity_committed(&item.id, commitments);
        let supplied = quantity_supplied(&item.id, invoices);

        ItemBalance {
            item_id: item.id.clone(),
            quantity_bid: item.quantity_bid.min(MAX_QUANTITY),
            quantity_committed: committed,
            quantity_supplied: supplied,
            balance_to_commit: signed(item.quantity_bid) - signed(committed),
            balance_to_supply: signed(committed) - signed(supplied),
        }
    }

    pub fn is_over_committed(&self) -> bool {
        self.balance_to_commit < 0
    }

    pub fn is_over_supplied(&self) -> bool {
        self.balance_to_supply < 0
    }
}

/// One balance per item, in item order
pub fn item_balances(contract: &Contract) -> Vec<ItemBalance> {
    contract
        .items
        .iter()
        .map(|item| ItemBalance::compute(item, &contract.commitments, &contract.invoices))
        .collect()
}

// ============================================================================
// ORPHANED LINES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSource {
    Commitment,
    Invoice,
}

/// A commitment or invoice line whose item no longer exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanedLine {
    pub source: LineSource,
    pub document_id: String,
    pub contract_item_id: String,
    pub quantity: Quantity,
}

/// Lines pointing at deleted items. They contribute nothing to any balance.
pub fn orphaned_lines(contract: &Contract) -> Vec<OrphanedLine> {
    let mut orphans = Vec::new();

    for commitment in &contract.commitments {
        for ci in &commitment.items {
            if contract.find_item(&ci.contract_item_id).is_none() {
                orphans.push(OrphanedLine {
                    source: LineSource::Commitment,
                    document_id: commitment.id.clone(),
                    contract_item_id: ci.contract_item_id.clone(),
                    quantity: ci.quantity,
                });
            }
        }
    }

    for invoice in &contract.invoices {
        for ii in &invoice.items {
            if contract.find_item(&ii.contract_item_id).is_none() {
                orphans.push(OrphanedLine {
                    source: LineSource::Invoice,
                    document_id: invoice.id.clone(),
                    contract_item_id: ii.contract_item_id.clone(),
                    quantity: ii.quantity_supplied,
                });
            }
        }
    }

    if !orphans.is_empty() {
        tracing::debug!(
            contract_id = %contract.id,
            count = orphans.len(),
            "contract has lines referencing deleted items"
        );
    }

    orphans
}
