// End-to-end ledger workflow: build a portfolio through mutations, read it
// back through balances, totals and the dashboard, persist it.

use contract_ledger::*;

fn portfolio_with_one_item() -> (Portfolio, String, String) {
    let mut portfolio = Portfolio::default();
    let client_id = portfolio.add_client(NewClient {
        name: "Prefeitura de Exemplo".to_string(),
        uasg: "925000".to_string(),
        ..NewClient::default()
    });
    let contract_id = portfolio
        .add_contract(
            &client_id,
            NewContract {
                bidding_id: "PE 12/2024".to_string(),
                bidding_type: BiddingType::Pregao,
                creation_date: "2024-05-01".to_string(),
                cnpj: None,
                uasg: None,
            },
        )
        .unwrap();
    let item_id = portfolio
        .add_item(
            &contract_id,
            NewItem {
                item: None,
                description: "Papel A4".to_string(),
                unit_value: 10.0,
                quantity_bid: 100,
            },
        )
        .unwrap();

    (portfolio, contract_id, item_id)
}

fn commit(portfolio: &mut Portfolio, contract_id: &str, item_id: &str, quantity: u64) -> String {
    portfolio
        .add_commitment(
            contract_id,
            NewCommitment {
                commitment_number: "2024NE0001".to_string(),
                date: "2024-05-02".to_string(),
                items: vec![CommitmentItem::new(item_id, quantity)],
            },
        )
        .unwrap()
}

fn supply(portfolio: &mut Portfolio, contract_id: &str, item_id: &str, quantity: u64) -> String {
    portfolio
        .add_invoice(
            contract_id,
            NewInvoice {
                invoice_number: "101".to_string(),
                date: "2024-05-03".to_string(),
                items: vec![InvoiceItem::new(item_id, quantity)],
            },
        )
        .unwrap()
}

fn contract<'a>(portfolio: &'a Portfolio, contract_id: &str) -> &'a Contract {
    portfolio.find_contract(contract_id).unwrap().1
}

#[test]
fn commit_and_supply_moves_both_pools() {
    let (mut portfolio, contract_id, item_id) = portfolio_with_one_item();
    commit(&mut portfolio, &contract_id, &item_id, 40);
    supply(&mut portfolio, &contract_id, &item_id, 15);

    let contract = contract(&portfolio, &contract_id);
    let balance = &item_balances(contract)[0];
    assert_eq!(balance.quantity_committed, 40);
    assert_eq!(balance.balance_to_commit, 60);
    assert_eq!(balance.quantity_supplied, 15);
    assert_eq!(balance.balance_to_supply, 25);

    let totals = ContractTotals::compute(contract);
    assert_eq!(totals.total_committed_value, 400.0);
    assert_eq!(totals.total_supplied_value, 150.0);

    println!("✅ Commitment and invoice update both balances");
}

#[test]
fn toggling_payment_moves_value_between_paid_and_to_receive() {
    let (mut portfolio, contract_id, item_id) = portfolio_with_one_item();
    commit(&mut portfolio, &contract_id, &item_id, 40);
    let invoice_id = supply(&mut portfolio, &contract_id, &item_id, 15);

    assert!(portfolio.toggle_invoice_paid(&contract_id, &invoice_id).unwrap());
    let totals = ContractTotals::compute(contract(&portfolio, &contract_id));
    assert_eq!(totals.total_paid_value, 150.0);
    assert_eq!(totals.total_to_receive_value, 0.0);

    assert!(!portfolio.toggle_invoice_paid(&contract_id, &invoice_id).unwrap());
    let totals = ContractTotals::compute(contract(&portfolio, &contract_id));
    assert_eq!(totals.total_paid_value, 0.0);
    assert_eq!(totals.total_to_receive_value, 150.0);

    println!("✅ Payment toggle round trip");
}

#[test]
fn separate_commitments_on_one_item_add_up() {
    let (mut portfolio, contract_id, item_id) = portfolio_with_one_item();
    commit(&mut portfolio, &contract_id, &item_id, 20);
    commit(&mut portfolio, &contract_id, &item_id, 20);

    let contract = contract(&portfolio, &contract_id);
    assert_eq!(quantity_committed(&item_id, &contract.commitments), 40);
    assert_eq!(item_balances(contract)[0].balance_to_commit, 60);

    println!("✅ Commitments sum per item");
}

#[test]
fn deleting_a_referenced_item_leaves_orphans_that_count_for_nothing() {
    let (mut portfolio, contract_id, item_id) = portfolio_with_one_item();
    let other_id = portfolio
        .add_item(
            &contract_id,
            NewItem {
                item: None,
                description: "Caneta".to_string(),
                unit_value: 2.0,
                quantity_bid: 50,
            },
        )
        .unwrap();
    commit(&mut portfolio, &contract_id, &item_id, 40);
    commit(&mut portfolio, &contract_id, &other_id, 5);

    portfolio.delete_item(&contract_id, &item_id).unwrap();

    let contract = contract(&portfolio, &contract_id);
    assert_eq!(contract.commitments.len(), 2);
    assert_eq!(orphaned_lines(contract).len(), 1);

    let balances = item_balances(contract);
    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].quantity_committed, 5);
    assert_eq!(ContractTotals::compute(contract).total_committed_value, 10.0);

    println!("✅ Orphaned lines are tolerated");
}

#[test]
fn dashboard_filter_keeps_year_list_intact() {
    let mut portfolio = Portfolio::default();
    let client_id = portfolio.add_client(NewClient {
        name: "Hospital Regional".to_string(),
        uasg: "1".to_string(),
        ..NewClient::default()
    });
    for date in ["2024-05-01", "2024-06-01", "2023-05-01"] {
        portfolio
            .add_contract(
                &client_id,
                NewContract {
                    bidding_id: format!("PE {}", date),
                    bidding_type: BiddingType::Dispensa,
                    creation_date: date.to_string(),
                    cnpj: None,
                    uasg: None,
                },
            )
            .unwrap();
    }

    let dashboard = project(&portfolio.clients, &DateFilter::parse("2024", "5"));
    assert_eq!(dashboard.contracts.len(), 1);
    assert_eq!(dashboard.contracts[0].contract.creation_date, "2024-05-01");
    assert_eq!(dashboard.contracts[0].client_name, "Hospital Regional");
    assert_eq!(dashboard.available_years, vec![2024, 2023]);

    let everything = project(&portfolio.clients, &DateFilter::parse("all", "bogus"));
    assert_eq!(everything.contracts.len(), 3);

    println!("✅ Period filter applies to contracts only");
}

#[test]
fn snapshot_survives_store_round_trip() {
    let (mut portfolio, contract_id, item_id) = portfolio_with_one_item();
    commit(&mut portfolio, &contract_id, &item_id, 40);
    supply(&mut portfolio, &contract_id, &item_id, 15);

    let store = SqliteStore::open_in_memory().unwrap();
    assert!(store.save("portfolio", &portfolio).unwrap());
    assert!(!store.save("portfolio", &portfolio).unwrap());

    let loaded = store.load("portfolio").unwrap().unwrap();
    assert_eq!(loaded, portfolio);
    assert_eq!(
        project(&loaded.clients, &DateFilter::all()).totals(),
        project(&portfolio.clients, &DateFilter::all()).totals()
    );

    println!("✅ Snapshot round trip through SQLite");
}

#[test]
fn item_table_exports_as_csv() {
    let (mut portfolio, contract_id, item_id) = portfolio_with_one_item();
    commit(&mut portfolio, &contract_id, &item_id, 40);

    let table = tabular::items_table(contract(&portfolio, &contract_id));
    let mut out = Vec::new();
    table.write_csv(&mut out, b';').unwrap();
    let text = String::from_utf8(out).unwrap();

    let mut lines = text.lines();
    assert_eq!(lines.next().unwrap().split(';').count(), table.headers.len());
    assert!(lines.next().unwrap().contains("Papel A4"));

    println!("✅ Item table CSV export");
}
