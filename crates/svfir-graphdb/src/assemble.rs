//! Graph Assembler.
//!
//! Moves the session tables into an [`SvfIr`] in dependency order and runs
//! the checks that need the whole graph. Inserting into the composed graph
//! can still fail (for example a block edge whose function never loaded);
//! such failures become [`Diagnostic::Inconsistent`] and the entity is left
//! out. Assembly never aborts.

use std::mem;

use svfir_core::{CoreError, IcfgNodeKind, SvfIr, VarKind};
use tracing::{info, warn};

use crate::diagnostics::{Diagnostic, LoadReport};
use crate::session::LoadSession;

/// The reconstructed graph and everything noticed while building it.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub ir: SvfIr,
    pub report: LoadReport,
}

pub struct GraphAssembler {
    session: LoadSession,
    records_read: usize,
    pages_fetched: usize,
}

fn note<T>(diagnostics: &mut Vec<Diagnostic>, result: Result<T, CoreError>) {
    if let Err(err) = result {
        warn!(error = %err, "entity rejected by the assembled graph");
        diagnostics.push(Diagnostic::Inconsistent {
            detail: err.to_string(),
        });
    }
}

impl GraphAssembler {
    pub fn new(session: LoadSession) -> Self {
        GraphAssembler {
            session,
            records_read: 0,
            pages_fetched: 0,
        }
    }

    /// Read counters to carry into the report.
    pub fn with_counts(mut self, records_read: usize, pages_fetched: usize) -> Self {
        self.records_read = records_read;
        self.pages_fetched = pages_fetched;
        self
    }

    pub fn assemble(mut self) -> Assembly {
        let s = &mut self.session;
        // A session handed over directly still gets its final pass.
        s.resolve_deferred();

        let mut diagnostics = s.take_diagnostics();
        let d = &mut diagnostics;
        let mut ir = SvfIr::new();

        for (_, ty) in mem::take(&mut s.types) {
            note(d, ir.add_type(ty));
        }
        for (_, info) in mem::take(&mut s.st_infos) {
            note(d, ir.add_st_info(info));
        }
        for (_, var) in mem::take(&mut s.vars) {
            note(d, ir.add_var(var));
        }
        for (_, block) in mem::take(&mut s.blocks) {
            note(d, ir.add_basic_block(block));
        }
        for edge in mem::take(&mut s.block_edges) {
            note(d, ir.add_block_edge(edge));
        }
        for (_, node) in mem::take(&mut s.ch_nodes) {
            note(d, ir.add_ch_node(node));
        }
        for edge in mem::take(&mut s.ch_edges) {
            note(d, ir.add_ch_edge(edge));
        }
        for (_, node) in mem::take(&mut s.icfg_nodes) {
            note(d, ir.add_icfg_node(node));
        }
        for (_, edge) in mem::take(&mut s.icfg_edges) {
            note(d, ir.add_icfg_edge(edge));
        }
        for (_, node) in mem::take(&mut s.call_graph_nodes) {
            note(d, ir.add_call_graph_node(node));
        }
        for (_, edge) in mem::take(&mut s.call_graph_edges) {
            note(d, ir.add_call_graph_edge(edge));
        }
        for (_, stmt) in mem::take(&mut s.stmts) {
            note(d, ir.add_stmt(stmt));
        }

        check_function_blocks(&ir, d);
        check_call_pairs(&ir, d);

        let report = LoadReport {
            diagnostics,
            records_read: self.records_read,
            entities_built: self.session.entities_built(),
            pages_fetched: self.pages_fetched,
        };
        info!(
            nodes = ir.node_count(),
            edges = ir.edge_count(),
            diagnostics = report.diagnostics.len(),
            "graph assembled"
        );
        Assembly { ir, report }
    }
}

/// Every function's exit block and reachable blocks must be in its block
/// graph.
fn check_function_blocks(ir: &SvfIr, diagnostics: &mut Vec<Diagnostic>) {
    for var in ir.vars() {
        let VarKind::FunObj(fun) = &var.kind else { continue };
        let graph = ir.block_graph(var.id);
        let known = |block| graph.is_some_and(|g| g.contains(block));
        for block in fun.exit_block.iter().chain(&fun.reachable_blocks) {
            if !known(*block) {
                diagnostics.push(Diagnostic::Inconsistent {
                    detail: format!("function {} names block {} it does not own", var.id, block),
                });
            }
        }
    }
}

/// A return node's call node must name it back.
fn check_call_pairs(ir: &SvfIr, diagnostics: &mut Vec<Diagnostic>) {
    for node in ir.icfg_nodes() {
        let IcfgNodeKind::Ret {
            call_node: Some(call),
            ..
        } = &node.kind
        else {
            continue;
        };
        let paired = match ir.icfg_node(*call).map(|n| &n.kind) {
            Some(IcfgNodeKind::Call(site)) => site.ret_node == node.id,
            _ => false,
        };
        if !paired {
            diagnostics.push(Diagnostic::Inconsistent {
                detail: format!("return node {} is not paired with call node {}", node.id, call),
            });
        }
    }
}
