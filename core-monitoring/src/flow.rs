// =====================================================================================
// File: core-monitoring/src/flow.rs
// Description: Transaction flow graph construction and traversal helpers
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::types::Transaction;

/// Node in a transaction flow graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowNode {
    pub node_id: String,
    pub node_type: String,
    pub is_internal: bool,
    pub country: Option<String>,
}

/// Directed edge in a transaction flow graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEdge {
    pub edge_id: Uuid,
    pub source_node_id: String,
    pub target_node_id: String,
    pub transaction_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub transaction_date: DateTime<Utc>,
}

/// Flow graph built from a transaction batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionFlow {
    pub flow_id: Uuid,
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
    pub total_amount: Decimal,
    pub transaction_count: usize,
    pub unique_entities: usize,
    pub countries_involved: Vec<String>,
    pub built_at: DateTime<Utc>,
}

/// Build a flow graph from account-to-account transfers.
///
/// Transactions without both a source and a target account carry no flow
/// information and are skipped.
pub fn build_transaction_flow(transactions: &[Transaction]) -> TransactionFlow {
    let mut nodes: BTreeMap<String, FlowNode> = BTreeMap::new();
    let mut edges = Vec::new();
    let mut countries: Vec<String> = Vec::new();

    for tx in transactions {
        let (source, target) = match (&tx.source_account, &tx.target_account) {
            (Some(source), Some(target)) => (source.clone(), target.clone()),
            _ => continue,
        };

        nodes.entry(source.clone()).or_insert_with(|| FlowNode {
            node_id: source.clone(),
            node_type: "account".to_string(),
            is_internal: true,
            country: None,
        });
        let target_node = nodes.entry(target.clone()).or_insert_with(|| FlowNode {
            node_id: target.clone(),
            node_type: "account".to_string(),
            is_internal: true,
            country: tx.counterparty_country.clone(),
        });
        if target_node.country.is_none() {
            target_node.country = tx.counterparty_country.clone();
        }

        if let Some(country) = &tx.counterparty_country {
            if !countries.contains(country) {
                countries.push(country.clone());
            }
        }

        edges.push(FlowEdge {
            edge_id: Uuid::new_v4(),
            source_node_id: source,
            target_node_id: target,
            transaction_id: tx.transaction_id,
            amount: tx.amount,
            currency: tx.currency.clone(),
            transaction_date: tx.timestamp,
        });
    }

    let total_amount = edges.iter().map(|e| e.amount).sum();
    countries.sort();

    TransactionFlow {
        flow_id: Uuid::new_v4(),
        unique_entities: nodes.len(),
        nodes: nodes.into_values().collect(),
        transaction_count: edges.len(),
        total_amount,
        edges,
        countries_involved: countries,
        built_at: Utc::now(),
    }
}

/// Adjacency view over a flow, keyed by source node
pub fn adjacency(flow: &TransactionFlow) -> HashMap<&str, Vec<&FlowEdge>> {
    let mut map: HashMap<&str, Vec<&FlowEdge>> = HashMap::new();
    for edge in &flow.edges {
        map.entry(edge.source_node_id.as_str()).or_default().push(edge);
    }
    // Deterministic traversal order for the detectors built on top.
    for edges in map.values_mut() {
        edges.sort_by(|a, b| {
            a.transaction_date
                .cmp(&b.transaction_date)
                .then_with(|| a.target_node_id.cmp(&b.target_node_id))
        });
    }
    map
}
