//! # Tabela de Regras e Autômato Gamma
//!
//! As regras da gramática são pares `entrada → saída` sobre os alfabetos de
//! [`crate::symbols`], com um tipo de cláusula e um rank de peso:
//!
//! ```text
//! WORD TYPE   → STREET SUFTYP   (ARC,   rank 17)
//! NUMBER      → HOUSE           (CIVIC, rank 17)
//! ```
//!
//! ## Compilação
//!
//! 1. Cada sequência de entrada é inserida em uma trie a partir da raiz.
//! 2. A regra entra no fim da lista do nó terminal para o seu tipo de cláusula
//!    (ordem de registro = prioridade entre regras de mesmo tamanho).
//! 3. Transições indefinidas da raiz viram laços para a própria raiz.
//! 4. Em largura, calcula-se o link de falha de cada nó (nó do maior sufixo
//!    reconhecido) e as listas de regras do nó recebem, ao final, as listas do
//!    nó de falha. Assim regras mais curtas embutidas continuam alcançáveis, e
//!    cada lista fica ordenada da regra mais longa para a mais curta.
//! 5. A tabela `nó × símbolo → nó` fica total.
//!
//! ## Execução
//!
//! Varrer uma sequência alvo a partir da raiz registra, para cada prefixo, o
//! nó alcançado (o *registro*). As regras que terminam na posição `i` com a
//! cláusula `c` são `rules_at(registro[i], c)`.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BuildError;
use crate::symbols::{load_value, ClauseType, InputSymbol, OutputSymbol, RANK_COUNT};

/// Capacidade de nós do autômato.
pub const MAX_NODES: usize = 5000;
/// Capacidade de regras.
pub const MAX_RULES: usize = 4500;

pub type NodeId = usize;
pub type RuleId = usize;

/// A raiz sentinela do autômato.
pub const ROOT: NodeId = 0;

/// Marca de fim nas fontes de regras em forma de inteiros.
const END_MARK: i32 = -1;

type ClauseLists = [Vec<RuleId>; ClauseType::COUNT];

#[derive(Debug)]
pub struct Rule {
    pub input: Vec<InputSymbol>,
    pub output: Vec<OutputSymbol>,
    pub clause: ClauseType,
    pub rank: u8,
    hits: AtomicU32,
    best: AtomicU32,
}

impl Rule {
    pub fn len(&self) -> usize {
        self.input.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    /// Valor de um segmento casado por esta regra.
    pub fn value(&self) -> f64 {
        load_value(self.rank) * self.clause.weight()
    }

    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn best(&self) -> u32 {
        self.best.load(Ordering::Relaxed)
    }
}

/// Construtor da tabela de regras. Consumido por [`RuleTableBuilder::build`].
#[derive(Debug)]
pub struct RuleTableBuilder {
    rules: Vec<Rule>,
    trie: Vec<[Option<NodeId>; InputSymbol::COUNT]>,
    own: Vec<ClauseLists>,
    max_nodes: usize,
    max_rules: usize,
}

impl RuleTableBuilder {
    pub fn new() -> Self {
        Self::with_limits(MAX_NODES, MAX_RULES)
    }

    pub fn with_limits(max_nodes: usize, max_rules: usize) -> Self {
        Self {
            rules: Vec::new(),
            trie: vec![[None; InputSymbol::COUNT]],
            own: vec![ClauseLists::default()],
            max_nodes,
            max_rules,
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Registra uma regra tipada.
    pub fn add_rule(
        &mut self,
        input: &[InputSymbol],
        output: &[OutputSymbol],
        clause: ClauseType,
        rank: u8,
    ) -> Result<RuleId, BuildError> {
        let id = self.rules.len();
        if input.is_empty() || output.is_empty() {
            return Err(BuildError::EmptyRule { rule: id });
        }
        if input.len() != output.len() {
            return Err(BuildError::MalformedRule {
                rule: id,
                reason: format!("{} inputs but {} outputs", input.len(), output.len()),
            });
        }
        if rank as usize >= RANK_COUNT {
            return Err(BuildError::BadRank { rule: id, rank: rank as i32 });
        }
        if id >= self.max_rules {
            return Err(BuildError::TooManyRules { limit: self.max_rules });
        }

        let mut node = ROOT;
        for sym in input {
            node = match self.trie[node][sym.index()] {
                Some(next) => next,
                None => {
                    if self.trie.len() >= self.max_nodes {
                        return Err(BuildError::TooManyNodes { limit: self.max_nodes });
                    }
                    let next = self.trie.len();
                    self.trie.push([None; InputSymbol::COUNT]);
                    self.own.push(ClauseLists::default());
                    self.trie[node][sym.index()] = Some(next);
                    next
                }
            };
        }
        self.own[node][clause.index()].push(id);
        self.rules.push(Rule {
            input: input.to_vec(),
            output: output.to_vec(),
            clause,
            rank,
            hits: AtomicU32::new(0),
            best: AtomicU32::new(0),
        });
        Ok(id)
    }

    /// Registra uma regra em forma de inteiros: `entrada… -1 saída… -1 cláusula rank`.
    ///
    /// Um registro que começa com `-1` marca o fim da fonte e devolve `None`.
    pub fn add_record(&mut self, record: &[i32]) -> Result<Option<RuleId>, BuildError> {
        let rule = self.rules.len();
        if record.first().map_or(true, |&v| v == END_MARK) {
            return Ok(None);
        }
        let malformed = |reason: &str| BuildError::MalformedRule {
            rule,
            reason: reason.to_string(),
        };

        let mut values = record.iter().copied();
        let mut input = Vec::new();
        loop {
            match values.next() {
                Some(END_MARK) => break,
                Some(code) => input.push(
                    InputSymbol::from_code(code).ok_or(BuildError::BadInputSymbol { rule, symbol: code })?,
                ),
                None => return Err(malformed("unterminated input")),
            }
        }
        let mut output = Vec::new();
        loop {
            match values.next() {
                Some(END_MARK) => break,
                Some(code) => output.push(
                    OutputSymbol::from_code(code).ok_or(BuildError::BadOutputSymbol { rule, symbol: code })?,
                ),
                None => return Err(malformed("unterminated output")),
            }
        }
        let clause_code = values.next().ok_or_else(|| malformed("missing clause type"))?;
        let clause = ClauseType::from_code(clause_code).ok_or(BuildError::BadClauseType {
            rule,
            clause: clause_code,
        })?;
        let rank_code = values.next().ok_or_else(|| malformed("missing weight rank"))?;
        let rank = u8::try_from(rank_code)
            .ok()
            .filter(|r| (*r as usize) < RANK_COUNT)
            .ok_or(BuildError::BadRank { rule, rank: rank_code })?;
        if values.next().is_some() {
            return Err(malformed("trailing values"));
        }
        self.add_rule(&input, &output, clause, rank).map(Some)
    }

    /// Lê uma fonte textual, um registro por linha. Para na marca de fim.
    pub fn parse(&mut self, source: &str) -> Result<usize, BuildError> {
        let mut added = 0;
        for line in source.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record = line
                .split_whitespace()
                .map(|v| v.parse::<i32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| BuildError::MalformedRule {
                    rule: self.rules.len(),
                    reason: e.to_string(),
                })?;
            match self.add_record(&record)? {
                Some(_) => added += 1,
                None => break,
            }
        }
        Ok(added)
    }

    /// Compila a trie no autômato completo.
    pub fn build(self) -> RuleTable {
        let node_count = self.trie.len();
        let mut gamma = vec![[ROOT; InputSymbol::COUNT]; node_count];
        let mut failure = vec![ROOT; node_count];
        let mut links: Vec<ClauseLists> = vec![ClauseLists::default(); node_count];
        let mut queue = VecDeque::new();

        links[ROOT] = self.own[ROOT].clone();
        for a in 0..InputSymbol::COUNT {
            // transições ausentes da raiz voltam para a raiz
            if let Some(child) = self.trie[ROOT][a] {
                gamma[ROOT][a] = child;
                failure[child] = ROOT;
                queue.push_back(child);
            }
        }

        while let Some(u) = queue.pop_front() {
            let fail = failure[u];
            for cl in 0..ClauseType::COUNT {
                let mut list = self.own[u][cl].clone();
                list.extend_from_slice(&links[fail][cl]);
                links[u][cl] = list;
            }
            for a in 0..InputSymbol::COUNT {
                match self.trie[u][a] {
                    Some(child) => {
                        failure[child] = gamma[fail][a];
                        gamma[u][a] = child;
                        queue.push_back(child);
                    }
                    None => gamma[u][a] = gamma[fail][a],
                }
            }
        }

        debug!(nodes = node_count, rules = self.rules.len(), "rule table compiled");
        RuleTable {
            rules: self.rules,
            gamma,
            links,
            collect_statistics: AtomicBool::new(false),
        }
    }
}

impl Default for RuleTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Autômato compilado. Imutável e compartilhável entre threads; só os
/// contadores de estatística mudam, de forma atômica.
#[derive(Debug)]
pub struct RuleTable {
    rules: Vec<Rule>,
    gamma: Vec<[NodeId; InputSymbol::COUNT]>,
    links: Vec<ClauseLists>,
    collect_statistics: AtomicBool,
}

impl RuleTable {
    /// Compila uma fonte textual de regras.
    pub fn from_source(source: &str) -> Result<Self, BuildError> {
        let mut builder = RuleTableBuilder::new();
        builder.parse(source)?;
        Ok(builder.build())
    }

    pub fn node_count(&self) -> usize {
        self.gamma.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id]
    }

    pub fn transition(&self, node: NodeId, symbol: InputSymbol) -> NodeId {
        self.gamma[node][symbol.index()]
    }

    /// Regras da cláusula `clause` que terminam no nó, da mais longa para a mais curta.
    pub fn rules_at(&self, node: NodeId, clause: ClauseType) -> &[RuleId] {
        &self.links[node][clause.index()]
    }

    /// Preenche o registro: `registry[0] = raiz`, `registry[i+1] = gamma(registry[i], target[i])`.
    pub fn fill_registry(&self, target: &[InputSymbol], registry: &mut Vec<NodeId>) {
        registry.clear();
        registry.push(ROOT);
        let mut node = ROOT;
        for sym in target {
            node = self.transition(node, *sym);
            registry.push(node);
        }
    }

    pub fn set_collect_statistics(&self, on: bool) {
        self.collect_statistics.store(on, Ordering::Relaxed);
    }

    pub fn collects_statistics(&self) -> bool {
        self.collect_statistics.load(Ordering::Relaxed)
    }

    pub(crate) fn record_hit(&self, id: RuleId) {
        if self.collects_statistics() {
            self.rules[id].hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_best(&self, id: RuleId) {
        if self.collects_statistics() {
            self.rules[id].best.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Relatório de uso das regras; zera os contadores. `None` se a coleta
    /// estiver desligada.
    pub fn statistics_report(&self) -> Option<StatisticsReport> {
        if !self.collects_statistics() {
            return None;
        }
        let mut report = StatisticsReport {
            total_rules: self.rules.len(),
            ..StatisticsReport::default()
        };
        for (id, rule) in self.rules.iter().enumerate() {
            let hits = rule.hits.swap(0, Ordering::Relaxed);
            let best = rule.best.swap(0, Ordering::Relaxed);
            report.total_hits += hits as u64;
            report.total_best += best as u64;
            if hits == 0 {
                continue;
            }
            report.entries.push(RuleStatistics {
                rule: id,
                clause: rule.clause,
                rank: rule.rank,
                input: rule.input.iter().map(|s| s.label().to_string()).collect(),
                output: rule.output.iter().map(|s| s.label().to_string()).collect(),
                hits,
                best,
            });
        }
        Some(report)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleStatistics {
    pub rule: RuleId,
    pub clause: ClauseType,
    pub rank: u8,
    pub input: Vec<String>,
    pub output: Vec<String>,
    pub hits: u32,
    pub best: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    pub total_rules: usize,
    pub total_hits: u64,
    pub total_best: u64,
    pub entries: Vec<RuleStatistics>,
}

impl fmt::Display for StatisticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(
                f,
                "Rule {} is of type {} ({})",
                entry.rule,
                entry.clause.index(),
                entry.clause.label()
            )?;
            writeln!(f, ": Input : |{}|", entry.input.join("|"))?;
            writeln!(f, ": Output: |{}|", entry.output.join("|"))?;
            writeln!(
                f,
                "rank {} ( {:.6}): hits {} out of {}, best {}",
                entry.rank,
                load_value(entry.rank),
                entry.hits,
                self.total_hits,
                entry.best
            )?;
        }
        writeln!(
            f,
            "Found {} rules hit out of {} ({} best selections)",
            self.entries.len(),
            self.total_rules,
            self.total_best
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InputSymbol as I;
    use OutputSymbol as O;

    fn sample() -> RuleTable {
        let mut b = RuleTableBuilder::new();
        b.add_rule(&[I::Word, I::Type], &[O::Street, O::SufType], ClauseType::Arc, 17).unwrap();
        b.add_rule(&[I::Type], &[O::SufType], ClauseType::Arc, 5).unwrap();
        b.add_rule(&[I::Number], &[O::House], ClauseType::Civic, 17).unwrap();
        b.add_rule(&[I::Number], &[O::BoxTail], ClauseType::Extra, 9).unwrap();
        b.build()
    }

    #[test]
    fn test_transition_table_is_total() {
        let table = sample();
        for node in 0..table.node_count() {
            for sym in InputSymbol::all() {
                assert!(table.transition(node, *sym) < table.node_count());
            }
        }
        // símbolo sem regra a partir da raiz: laço
        assert_eq!(table.transition(ROOT, I::Mile), ROOT);
    }

    #[test]
    fn test_shared_input_different_clauses() {
        let table = sample();
        let node = table.transition(ROOT, I::Number);
        assert_eq!(table.rules_at(node, ClauseType::Civic), &[2]);
        assert_eq!(table.rules_at(node, ClauseType::Extra), &[3]);
        assert!(table.rules_at(node, ClauseType::Arc).is_empty());
    }

    #[test]
    fn test_failure_links_keep_embedded_rules() {
        let table = sample();
        let mut registry = Vec::new();
        table.fill_registry(&[I::Number, I::Word, I::Type], &mut registry);
        assert_eq!(registry.len(), 4);
        // termina em TYPE: a regra longa primeiro, depois a embutida
        assert_eq!(table.rules_at(registry[3], ClauseType::Arc), &[0, 1]);
        assert_eq!(table.rules_at(registry[1], ClauseType::Civic), &[2]);
        assert!(table.rules_at(registry[2], ClauseType::Arc).is_empty());
    }

    #[test]
    fn test_records_and_end_mark() {
        let mut b = RuleTableBuilder::new();
        let src = "1 2 -1 5 6 -1 2 17\n\n0 -1 1 -1 3 16\n-1\n22 -1 2 -1 2 10\n";
        assert_eq!(b.parse(src).unwrap(), 2);
        let table = b.build();
        assert_eq!(table.rule_count(), 2);
        assert_eq!(table.rule(1).clause, ClauseType::Civic);
        assert!((table.rule(0).value() - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_rules_are_fatal() {
        let mut b = RuleTableBuilder::new();
        assert_eq!(b.add_record(&[31, -1, 1, -1, 2, 3]), Err(BuildError::BadInputSymbol { rule: 0, symbol: 31 }));
        assert_eq!(b.add_record(&[1, -1, 18, -1, 2, 3]), Err(BuildError::BadOutputSymbol { rule: 0, symbol: 18 }));
        assert_eq!(b.add_record(&[1, -1, 5, -1, 7, 3]), Err(BuildError::BadClauseType { rule: 0, clause: 7 }));
        assert_eq!(b.add_record(&[1, -1, 5, -1, 2, 18]), Err(BuildError::BadRank { rule: 0, rank: 18 }));
        assert_eq!(b.add_rule(&[], &[], ClauseType::Arc, 3), Err(BuildError::EmptyRule { rule: 0 }));
        assert!(matches!(b.add_record(&[1, 2, -1, 5]), Err(BuildError::MalformedRule { .. })));
        assert_eq!(b.rule_count(), 0);
    }

    #[test]
    fn test_capacity_limits() {
        let mut b = RuleTableBuilder::with_limits(3, 10);
        b.add_rule(&[I::Word, I::Type], &[O::Street, O::SufType], ClauseType::Arc, 1).unwrap();
        assert_eq!(
            b.add_rule(&[I::Number], &[O::House], ClauseType::Civic, 1),
            Err(BuildError::TooManyNodes { limit: 3 })
        );
        let mut b = RuleTableBuilder::with_limits(100, 1);
        b.add_rule(&[I::Number], &[O::House], ClauseType::Civic, 1).unwrap();
        assert_eq!(
            b.add_rule(&[I::Word], &[O::Street], ClauseType::Arc, 1),
            Err(BuildError::TooManyRules { limit: 1 })
        );
    }

    #[test]
    fn test_statistics_report_resets() {
        let table = sample();
        assert!(table.statistics_report().is_none());
        table.set_collect_statistics(true);
        table.record_hit(2);
        table.record_hit(2);
        table.record_best(2);
        let report = table.statistics_report().unwrap();
        assert_eq!(report.total_hits, 2);
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].best, 1);
        assert!(report.to_string().contains("Rule 2 is of type 3 (CIVIC)"));
        let again = table.statistics_report().unwrap();
        assert_eq!(again.total_hits, 0);
    }
}
