// ✏️ Portfolio Mutations - Create / delete / mark paid
//
// The ledger engine only reads snapshots; every change goes through here.
// New ids are UUID v4 strings. Deleting an item does not touch commitment or
// invoice lines that reference it: those lines become orphans and simply
// stop contributing to balances and values.

use crate::balance;
use crate::error::{EntityKind, LedgerError};
use crate::model::{
    BiddingType, Client, Commitment, CommitmentItem, Contract, ContractItem, Invoice, InvoiceItem,
    Portfolio, Quantity,
};
use std::collections::HashMap;

pub type MutationResult<T> = Result<T, LedgerError>;

// ============================================================================
// INPUT SHAPES
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub name: String,
    pub uasg: String,
    pub cnpj: Option<String>,
    pub address: Option<String>,
    pub cep: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewContract {
    pub bidding_id: String,
    pub bidding_type: BiddingType,
    pub creation_date: String,
    pub cnpj: Option<String>,
    pub uasg: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewItem {
    /// Display number; `None` takes the next number after the highest
    pub item: Option<u32>,
    pub description: String,
    pub unit_value: f64,
    pub quantity_bid: Quantity,
}

#[derive(Debug, Clone)]
pub struct NewCommitment {
    pub commitment_number: String,
    pub date: String,
    pub items: Vec<CommitmentItem>,
}

#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub date: String,
    pub items: Vec<InvoiceItem>,
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Next display number for a new item in this contract
pub fn next_item_number(contract: &Contract) -> u32 {
    contract.items.iter().map(|i| i.item).max().map_or(1, |n| n + 1)
}

// ============================================================================
// MUTATIONS
// ============================================================================

impl Portfolio {
    pub fn add_client(&mut self, new: NewClient) -> String {
        let id = new_id();
        self.clients.push(Client {
            id: id.clone(),
            name: new.name,
            uasg: new.uasg,
            cnpj: new.cnpj,
            address: new.address,
            cep: new.cep,
            contracts: Vec::new(),
        });
        tracing::debug!(client_id = %id, "client added");
        id
    }

    pub fn delete_client(&mut self, client_id: &str) -> MutationResult<Client> {
        let position = self
            .clients
            .iter()
            .position(|c| c.id == client_id)
            .ok_or_else(|| LedgerError::not_found(EntityKind::Client, client_id))?;
        Ok(self.clients.remove(position))
    }

    pub fn add_contract(&mut self, client_id: &str, new: NewContract) -> MutationResult<String> {
        let client = self
            .clients
            .iter_mut()
            .find(|c| c.id == client_id)
            .ok_or_else(|| LedgerError::not_found(EntityKind::Client, client_id))?;

        let id = new_id();
        client.contracts.push(Contract {
            id: id.clone(),
            bidding_id: new.bidding_id,
            bidding_type: new.bidding_type,
            creation_date: new.creation_date,
            cnpj: new.cnpj,
            uasg: new.uasg,
            items: Vec::new(),
            commitments: Vec::new(),
            invoices: Vec::new(),
        });
        tracing::debug!(client_id, contract_id = %id, "contract added");
        Ok(id)
    }

    pub fn delete_contract(&mut self, contract_id: &str) -> MutationResult<Contract> {
        for client in &mut self.clients {
            if let Some(position) = client.contracts.iter().position(|c| c.id == contract_id) {
                return Ok(client.contracts.remove(position));
            }
        }
        Err(LedgerError::not_found(EntityKind::Contract, contract_id))
    }

    pub fn add_item(&mut self, contract_id: &str, new: NewItem) -> MutationResult<String> {
        let quantity_bid = LedgerError::check_quantity(new.quantity_bid)?;
        let contract = self.contract_mut(contract_id)?;

        let id = new_id();
        let number = new.item.unwrap_or_else(|| next_item_number(contract));
        contract.items.push(ContractItem {
            id: id.clone(),
            item: number,
            description: new.description,
            unit_value: new.unit_value,
            quantity_bid,
        });
        Ok(id)
    }

    /// Remove an item. Lines that pointed at it are left in place.
    pub fn delete_item(&mut self, contract_id: &str, item_id: &str) -> MutationResult<ContractItem> {
        let contract = self.contract_mut(contract_id)?;
        let position = contract
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| LedgerError::not_found(EntityKind::Item, item_id))?;
        Ok(contract.items.remove(position))
    }

    /// Record a commitment as given. Zero-quantity lines are dropped; no
    /// ceiling is enforced, so balances may go negative.
    pub fn add_commitment(&mut self, contract_id: &str, new: NewCommitment) -> MutationResult<String> {
        for line in &new.items {
            LedgerError::check_quantity(line.quantity)?;
        }
        let contract = self.contract_mut(contract_id)?;

        let lines: Vec<CommitmentItem> = new.items.into_iter().filter(|ci| ci.quantity > 0).collect();
        if lines.is_empty() {
            return Err(LedgerError::EmptyDocument {
                kind: EntityKind::Commitment,
            });
        }

        let id = new_id();
        contract
            .commitments
            .push(Commitment::new(&id, &new.commitment_number, &new.date, lines));
        tracing::debug!(contract_id, commitment_id = %id, "commitment added");
        Ok(id)
    }

    /// Record a commitment with each line clamped to the item's balance to
    /// commit, the way the entry form limits input. Lines on unknown items
    /// and lines clamped to zero are dropped.
    pub fn add_commitment_clamped(
        &mut self,
        contract_id: &str,
        new: NewCommitment,
    ) -> MutationResult<String> {
        let contract = self.contract_mut(contract_id)?;

        let mut taken: HashMap<String, Quantity> = HashMap::new();
        let mut lines = Vec::new();

        for line in new.items {
            let Some(item) = contract.find_item(&line.contract_item_id) else {
                tracing::debug!(item_id = %line.contract_item_id, "dropping line on unknown item");
                continue;
            };

            let already = taken.get(&item.id).copied().unwrap_or(0);
            let ceiling = balance::max_committable(item, &contract.commitments).saturating_sub(already);
            let quantity = line.quantity.min(ceiling);

            if quantity > 0 {
                *taken.entry(item.id.clone()).or_insert(0) += quantity;
                lines.push(CommitmentItem::new(&item.id, quantity));
            }
        }

        self.add_commitment(
            contract_id,
            NewCommitment {
                items: lines,
                ..new
            },
        )
    }

    pub fn delete_commitment(&mut self, contract_id: &str, commitment_id: &str) -> MutationResult<Commitment> {
        let contract = self.contract_mut(contract_id)?;
        let position = contract
            .commitments
            .iter()
            .position(|c| c.id == commitment_id)
            .ok_or_else(|| LedgerError::not_found(EntityKind::Commitment, commitment_id))?;
        Ok(contract.commitments.remove(position))
    }

    /// Record an invoice as given (unpaid). Zero-quantity lines are dropped.
    pub fn add_invoice(&mut self, contract_id: &str, new: NewInvoice) -> MutationResult<String> {
        for line in &new.items {
            LedgerError::check_quantity(line.quantity_supplied)?;
        }
        let contract = self.contract_mut(contract_id)?;

        let lines: Vec<InvoiceItem> = new
            .items
            .into_iter()
            .filter(|ii| ii.quantity_supplied > 0)
            .collect();
        if lines.is_empty() {
            return Err(LedgerError::EmptyDocument {
                kind: EntityKind::Invoice,
            });
        }

        let id = new_id();
        contract
            .invoices
            .push(Invoice::new(&id, &new.invoice_number, &new.date, lines));
        tracing::debug!(contract_id, invoice_id = %id, "invoice added");
        Ok(id)
    }

    /// Record an invoice with each line clamped to the item's balance to
    /// supply. Lines on unknown items and lines clamped to zero are dropped.
    pub fn add_invoice_clamped(&mut self, contract_id: &str, new: NewInvoice) -> MutationResult<String> {
        let contract = self.contract_mut(contract_id)?;

        let mut taken: HashMap<String, Quantity> = HashMap::new();
        let mut lines = Vec::new();

        for line in new.items {
            let Some(item) = contract.find_item(&line.contract_item_id) else {
                tracing::debug!(item_id = %line.contract_item_id, "dropping line on unknown item");
                continue;
            };

            let already = taken.get(&item.id).copied().unwrap_or(0);
            let ceiling = balance::max_suppliable(&item.id, &contract.commitments, &contract.invoices)
                .saturating_sub(already);
            let quantity = line.quantity_supplied.min(ceiling);

            if quantity > 0 {
                *taken.entry(item.id.clone()).or_insert(0) += quantity;
                lines.push(InvoiceItem::new(&item.id, quantity));
            }
        }

        self.add_invoice(
            contract_id,
            NewInvoice {
                items: lines,
                ..new
            },
        )
    }

    pub fn delete_invoice(&mut self, contract_id: &str, invoice_id: &str) -> MutationResult<Invoice> {
        let contract = self.contract_mut(contract_id)?;
        let position = contract
            .invoices
            .iter()
            .position(|i| i.id == invoice_id)
            .ok_or_else(|| LedgerError::not_found(EntityKind::Invoice, invoice_id))?;
        Ok(contract.invoices.remove(position))
    }

    pub fn set_invoice_paid(&mut self, contract_id: &str, invoice_id: &str, paid: bool) -> MutationResult<()> {
        let invoice = self.invoice_mut(contract_id, invoice_id)?;
        invoice.is_paid = paid;
        Ok(())
    }

    /// Flip the paid flag; returns the new value
    pub fn toggle_invoice_paid(&mut self, contract_id: &str, invoice_id: &str) -> MutationResult<bool> {
        let invoice = self.invoice_mut(contract_id, invoice_id)?;
        invoice.is_paid = !invoice.is_paid;
        Ok(invoice.is_paid)
    }

    fn contract_mut(&mut self, contract_id: &str) -> MutationResult<&mut Contract> {
        self.clients
            .iter_mut()
            .flat_map(|c| c.contracts.iter_mut())
            .find(|c| c.id == contract_id)
            .ok_or_else(|| LedgerError::not_found(EntityKind::Contract, contract_id))
    }

    fn invoice_mut(&mut self, contract_id: &str, invoice_id: &str) -> MutationResult<&mut Invoice> {
        self.contract_mut(contract_id)?
            .invoices
            .iter_mut()
            .find(|i| i.id == invoice_id)
            .ok_or_else(|| LedgerError::not_found(EntityKind::Invoice, invoice_id))
    }
}
