//! # Lista de Candidatos (STZ)
//!
//! Guarda as melhores padronizações encontradas para um campo, em uma lista
//! pequena e limitada:
//!
//! - sempre ordenada por score de forma não crescente;
//! - no máximo [`MAX_CANDIDATES`] entradas; quando cheia, a pior sai e o
//!   score da nova última vira o corte de admissão;
//! - empates no score bruto favorecem quem chegou primeiro: o recém-chegado
//!   recebe o score do anterior menos [`DUPLICATE_PENALTY`].
//!
//! Ao fim da avaliação, [`CandidateList::purge`] remove os candidatos com pares
//! bloqueados (saída, definição) e as duplicatas exatas, de modo que a lista
//! exposta já é a que a seleção entregaria. A recuperação
//! ([`CandidateList::select`]) repete a mesma regra sobre o pedido.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::gamma::RuleId;
use crate::lexicon::{DefinitionId, Lexicon};
use crate::symbols::OutputSymbol;

/// Profundidade da lista.
pub const MAX_CANDIDATES: usize = 6;
/// Corte de admissão enquanto a lista não enche.
pub const INITIAL_CUTOFF: f64 = 0.05;
/// Desconto aplicado a um empate no score bruto.
pub const DUPLICATE_PENALTY: f64 = 0.0025;

/// Uma padronização candidata: para cada lexema, a definição escolhida e o
/// símbolo de saída atribuído (`None` quando nenhum campo o recebeu).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Score de ordenação, já com desempates aplicados.
    pub score: f64,
    /// Score calculado pela árvore de cláusulas.
    pub raw_score: f64,
    pub outputs: Vec<Option<OutputSymbol>>,
    /// Definição escolhida de cada lexema.
    pub definitions: Vec<DefinitionId>,
    /// Índice da definição escolhida dentro do lexema.
    pub selection: Vec<usize>,
    /// Regras do caminho, para as estatísticas de "best".
    #[serde(skip)]
    pub rules: Vec<RuleId>,
}

impl Candidate {
    /// Mesma sequência de saídas e mesmas definições (por identidade).
    pub fn same_standardization(&self, other: &Candidate) -> bool {
        self.outputs == other.outputs && self.definitions == other.definitions
    }
}

/// Lista ranqueada (STZ) de um campo.
#[derive(Debug, Clone)]
pub struct CandidateList {
    items: Vec<Candidate>,
    cutoff: f64,
    capacity: usize,
    /// Último índice entregue por `select`.
    last_output: Option<usize>,
}

impl CandidateList {
    pub fn new() -> Self {
        Self::with_capacity(MAX_CANDIDATES)
    }

    /// Lista com outra profundidade (mínimo 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity + 1),
            cutoff: INITIAL_CUTOFF,
            capacity: capacity.max(1),
            last_output: None,
        }
    }

    /// Esvazia a lista e restaura o corte inicial, sem realocar.
    pub fn reset(&mut self) {
        self.items.clear();
        self.cutoff = INITIAL_CUTOFF;
        self.last_output = None;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.items.get(index)
    }

    /// Candidatos do melhor para o pior.
    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.items.iter()
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Score do primeiro da lista (0 se vazia).
    pub fn best_score(&self) -> f64 {
        self.items.first().map_or(0.0, |c| c.score)
    }

    /// `score` passa pelo corte atual?
    pub fn admits(&self, score: f64) -> bool {
        score >= self.cutoff
    }

    /// Insere mantendo a ordem; devolve a posição ou `None` se abaixo do corte.
    pub fn insert(&mut self, mut candidate: Candidate) -> Option<usize> {
        if !self.admits(candidate.score) {
            return None;
        }
        if self.items.len() == self.capacity {
            self.items.pop();
        }

        let mut pos = self.items.len();
        while pos > 0 {
            let prev = &self.items[pos - 1];
            if candidate.raw_score > prev.raw_score {
                pos -= 1;
                continue;
            }
            if candidate.raw_score == prev.raw_score {
                candidate.score = prev.score - DUPLICATE_PENALTY;
            }
            // a penalidade de um vizinho não pode inverter a ordem
            candidate.score = candidate.score.min(prev.score);
            break;
        }
        if let Some(next) = self.items.get(pos) {
            candidate.score = candidate.score.max(next.score);
        }
        self.items.insert(pos, candidate);

        if self.items.len() == self.capacity {
            if let Some(last) = self.items.last() {
                self.cutoff = last.score;
            }
        }
        Some(pos)
    }

    /// Descarta de uma vez os candidatos bloqueados e as duplicatas de
    /// candidatos anteriores, preservando a ordem. Devolve quantos saíram.
    pub fn purge(&mut self, blocks: &BlockTable) -> usize {
        let before = self.items.len();
        let mut kept: Vec<Candidate> = Vec::with_capacity(before);
        for candidate in self.items.drain(..) {
            if blocks.is_blocked(&candidate) || kept.iter().any(|k| k.same_standardization(&candidate)) {
                continue;
            }
            kept.push(candidate);
        }
        self.items = kept;
        self.last_output = None;
        before - self.items.len()
    }

    fn is_duplicate(&self, index: usize) -> bool {
        let current = &self.items[index];
        self.items[..index]
            .iter()
            .any(|earlier| earlier.same_standardization(current))
    }

    /// Avança para o candidato `request`, descartando antes os bloqueados e,
    /// para pedidos além do primeiro, as duplicatas de candidatos anteriores.
    ///
    /// Pedir de novo o último candidato entregue devolve `None`.
    pub fn select(&mut self, request: usize, blocks: &BlockTable) -> Option<&Candidate> {
        if request >= self.items.len() || self.last_output == Some(request) {
            return None;
        }
        while request < self.items.len() && blocks.is_blocked(&self.items[request]) {
            self.items.remove(request);
        }
        if request > 0 {
            while request < self.items.len() && self.is_duplicate(request) {
                self.items.remove(request);
            }
        }
        if request >= self.items.len() {
            return None;
        }
        self.last_output = Some(request);
        self.items.get(request)
    }

    /// Razão entre o score do candidato `index` e o do primeiro.
    pub fn downgrade(&self, index: usize) -> f64 {
        if index >= self.items.len() {
            return 0.0;
        }
        if index == 0 {
            return 1.0;
        }
        let top = self.items[0].score;
        if top == 0.0 {
            return 0.0;
        }
        self.items[index].score / top
    }
}

impl Default for CandidateList {
    fn default() -> Self {
        Self::new()
    }
}

/// Pares fixos de bloqueio: `(palavra, texto padrão, saída proibida)`.
const DEFAULT_BLOCKS: [(&str, &str, OutputSymbol); 2] = [
    ("ST", "STREET", OutputSymbol::PreType),
    ("ST", "STREET", OutputSymbol::City),
];

/// Definições válidas isoladamente mas erradas para um campo específico.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockTable {
    blocked: Vec<(OutputSymbol, DefinitionId)>,
}

impl BlockTable {
    pub fn new() -> Self {
        Self { blocked: Vec::new() }
    }

    /// Resolve a tabela fixa contra o léxico de endereços.
    pub fn install(lexicon: &Lexicon) -> Self {
        let mut table = Self::new();
        for (lookup, standard, output) in DEFAULT_BLOCKS {
            match lexicon.find_definition(lookup, standard) {
                Some(def) => table.block(output, def.id),
                None => warn!(lookup, standard, "could not find def_block definition"),
            }
        }
        table
    }

    /// Proíbe `definition` no campo `output`.
    pub fn block(&mut self, output: OutputSymbol, definition: DefinitionId) {
        self.blocked.push((output, definition));
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }

    /// Algum lexema do candidato usa um par proibido?
    pub fn is_blocked(&self, candidate: &Candidate) -> bool {
        candidate
            .outputs
            .iter()
            .zip(&candidate.definitions)
            .any(|(output, def)| {
                output.map_or(false, |out| self.blocked.iter().any(|(o, d)| *o == out && d == def))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::InputSymbol;

    fn candidate(score: f64, outputs: &[OutputSymbol], defs: &[DefinitionId]) -> Candidate {
        Candidate {
            score,
            raw_score: score,
            outputs: outputs.iter().map(|o| Some(*o)).collect(),
            definitions: defs.to_vec(),
            selection: vec![0; outputs.len()],
            rules: vec![],
        }
    }

    fn def_ids(n: usize) -> Vec<DefinitionId> {
        let mut lex = Lexicon::new();
        for i in 0..n {
            lex.insert(&format!("W{}", i), InputSymbol::Word, "X", 0);
        }
        (0..n).map(|i| lex.lookup(&format!("W{}", i)).unwrap().definitions[0].id).collect()
    }

    fn assert_sorted(list: &CandidateList) {
        let scores: Vec<f64> = list.iter().map(|c| c.score).collect();
        for pair in scores.windows(2) {
            assert!(pair[0] >= pair[1], "lista fora de ordem: {:?}", scores);
        }
    }

    #[test]
    fn test_insert_sorted_and_bounded() {
        let ids = def_ids(1);
        let mut list = CandidateList::new();
        for score in [0.3, 0.9, 0.1, 0.5, 0.7, 0.2, 0.8, 0.6] {
            list.insert(candidate(score, &[OutputSymbol::Street], &ids));
        }
        assert_eq!(list.len(), MAX_CANDIDATES);
        assert_sorted(&list);
        assert_eq!(list.best_score(), 0.9);
        // lista cheia: o corte sobe para o último
        assert_eq!(list.cutoff(), 0.3);
        assert_eq!(list.insert(candidate(0.25, &[OutputSymbol::Street], &ids)), None);
    }

    #[test]
    fn test_ties_favor_first_arrival() {
        let ids = def_ids(2);
        let mut list = CandidateList::new();
        list.insert(candidate(0.8, &[OutputSymbol::Street], &ids[..1]));
        let pos = list.insert(candidate(0.8, &[OutputSymbol::City], &ids[1..]));
        assert_eq!(pos, Some(1));
        let second = list.get(1).unwrap();
        assert!((second.score - (0.8 - DUPLICATE_PENALTY)).abs() < 1e-12);
        assert_eq!(second.raw_score, 0.8);
        // um score bruto entre os dois não pode furar a ordem
        list.insert(candidate(0.799, &[OutputSymbol::House], &ids[..1]));
        assert_sorted(&list);
    }

    #[test]
    fn test_select_skips_blocked_and_duplicates() {
        let ids = def_ids(2);
        let mut blocks = BlockTable::new();
        blocks.block(OutputSymbol::PreType, ids[0]);

        let mut list = CandidateList::new();
        list.insert(candidate(0.9, &[OutputSymbol::PreType], &ids[..1]));
        list.insert(candidate(0.8, &[OutputSymbol::Street], &ids[..1]));
        list.insert(candidate(0.7, &[OutputSymbol::Street], &ids[..1]));
        list.insert(candidate(0.6, &[OutputSymbol::Street], &ids[1..]));

        let first = list.select(0, &blocks).unwrap();
        assert_eq!(first.outputs, vec![Some(OutputSymbol::Street)]);
        // pedir o mesmo de novo: resultado negativo normal
        assert!(list.select(0, &blocks).is_none());
        // o candidato 0.7 é duplicata do 0.8 e some
        let second = list.select(1, &blocks).unwrap();
        assert_eq!(second.definitions, vec![ids[1]]);
        assert_eq!(list.len(), 2);
        assert!(list.select(2, &blocks).is_none());
        assert!(list.iter().all(|c| !blocks.is_blocked(c)));
    }

    #[test]
    fn test_purge_leaves_unique_unblocked() {
        let ids = def_ids(2);
        let mut blocks = BlockTable::new();
        blocks.block(OutputSymbol::PreType, ids[0]);

        let mut list = CandidateList::new();
        list.insert(candidate(0.9, &[OutputSymbol::PreType], &ids[..1]));
        list.insert(candidate(0.8, &[OutputSymbol::Street], &ids[..1]));
        list.insert(candidate(0.7, &[OutputSymbol::Street], &ids[..1]));
        list.insert(candidate(0.6, &[OutputSymbol::Street], &ids[1..]));

        assert_eq!(list.purge(&blocks), 2);
        let scores: Vec<f64> = list.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![0.8, 0.6]);
        // depois da limpeza, a seleção não descarta mais nada
        assert!(list.select(1, &blocks).is_some());
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_downgrade() {
        let ids = def_ids(1);
        let mut list = CandidateList::new();
        list.insert(candidate(0.8, &[OutputSymbol::Street], &ids));
        list.insert(candidate(0.4, &[OutputSymbol::City], &ids));
        assert_eq!(list.downgrade(0), 1.0);
        assert!((list.downgrade(1) - 0.5).abs() < 1e-12);
        assert_eq!(list.downgrade(5), 0.0);
    }

    #[test]
    fn test_block_table_install() {
        let mut lex = Lexicon::new();
        lex.insert("ST", InputSymbol::Word, "SAINT", 0);
        lex.insert("ST", InputSymbol::Type, "STREET", 1);
        let table = BlockTable::install(&lex);
        assert_eq!(table.len(), 2);
        let street = lex.find_definition("ST", "STREET").unwrap().id;
        let blocked = candidate(0.5, &[OutputSymbol::City], &[street]);
        let allowed = candidate(0.5, &[OutputSymbol::SufType], &[street]);
        assert!(table.is_blocked(&blocked));
        assert!(!table.is_blocked(&allowed));
        // sem entrada no léxico: nada a bloquear
        assert!(BlockTable::install(&Lexicon::new()).is_empty());
    }
}
